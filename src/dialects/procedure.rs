use crate::dialects::base::{DialectDescriptor, ProcWrappingStyle};
use crate::error::ContextError;

/// Render a stored procedure invocation in the dialect's call style.
/// `procedure` is used verbatim; quote it with `wrap_object_name` first.
pub fn wrap_procedure_call(descriptor: &DialectDescriptor, procedure: &str, args: &[String]) -> Result<String, ContextError> {
    let list = args.join(", ");

    let sql = match descriptor.procedure_style() {
        ProcWrappingStyle::Call => format!("CALL {}({})", procedure, list),
        ProcWrappingStyle::Exec if list.is_empty() => format!("EXEC {}", procedure),
        ProcWrappingStyle::Exec => format!("EXEC {} {}", procedure, list),
        ProcWrappingStyle::PostgreSql => format!("SELECT * FROM {}({})", procedure, list),
        ProcWrappingStyle::Oracle => format!("BEGIN {}({}); END;", procedure, list),
        ProcWrappingStyle::ExecuteProcedure => format!("EXECUTE PROCEDURE {}({})", procedure, list),
        ProcWrappingStyle::None => {
            return Err(ContextError::Unsupported {
                dialect: descriptor.rule_name().to_string(),
                feature: "stored procedures".to_string(),
            });
        }
    };

    Ok(sql)
}
