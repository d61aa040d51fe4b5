mod common;
use common::{options_with_channel, FakeProvider};
use dialectic_rs::diagnostics::{DiagnosticEvent, DiagnosticKind, NullSink};
use dialectic_rs::model::{Config, ConfigError};
use dialectic_rs::resolver::ModeState;
use dialectic_rs::{
    ConnectionError, ConnectionMode, ContextError, ContextOptions, DbContext, DbType, DbValue, EngineClass,
    ExecutionType, NoValue, Ownership,
};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

fn quiet(mode: ConnectionMode) -> ContextOptions {
    ContextOptions::default().with_mode(mode).with_sink(Arc::new(NullSink))
}

fn drain(rx: &Receiver<DiagnosticEvent>) -> Vec<DiagnosticEvent> {
    rx.try_iter().collect()
}

#[test]
fn test_standard_mode_hands_out_distinct_exclusive_connections() {
    let (factory, stats) = FakeProvider::postgres().build();
    let ctx = DbContext::connect(factory, quiet(ConnectionMode::Best)).unwrap();

    assert_eq!(ctx.mode(), ConnectionMode::Standard);
    // Probe connection is closed once detection is done.
    assert_eq!(stats.closes(), 1);

    let first = ctx.get_connection(ExecutionType::Write, false).unwrap();
    let second = ctx.get_connection(ExecutionType::Write, true).unwrap();
    assert_eq!(first.ownership(), Ownership::Exclusive);
    assert_eq!(second.ownership(), Ownership::Exclusive);
    assert!(!first.same_handle(&second));
    assert!(first.is_open());

    ctx.close_and_dispose_connection(first).unwrap();
    ctx.close_and_dispose_connection(second).unwrap();
    assert_eq!(stats.closes(), 3);

    ctx.close().unwrap();
    assert_eq!(stats.closes(), 3);
}

#[test]
fn test_single_writer_routes_writes_to_one_shared_handle() {
    let (factory, stats) = FakeProvider::sqlite_file().build();
    let ctx = DbContext::connect(factory, quiet(ConnectionMode::Best)).unwrap();
    assert_eq!(ctx.mode(), ConnectionMode::SingleWriter);
    assert_eq!(ctx.dialect().engine_class(), EngineClass::FileSingleWriter);

    let w1 = ctx.get_connection(ExecutionType::Write, false).unwrap();
    let w2 = ctx.get_connection(ExecutionType::Write, false).unwrap();
    assert!(w1.is_shared());
    assert!(w1.same_handle(&w2));

    let reader = ctx.get_connection(ExecutionType::Read, false).unwrap();
    assert_eq!(reader.ownership(), Ownership::Exclusive);
    assert!(!reader.same_handle(&w1));

    let shared_read = ctx.get_connection(ExecutionType::Read, true).unwrap();
    assert!(shared_read.same_handle(&w1));

    ctx.close_and_dispose_connection(w1).unwrap();
    ctx.close_and_dispose_connection(w2).unwrap();
    ctx.close_and_dispose_connection(shared_read).unwrap();
    assert_eq!(stats.closes(), 0, "shared writer must survive releases");

    ctx.close_and_dispose_connection(reader).unwrap();
    assert_eq!(stats.closes(), 1);

    ctx.close().unwrap();
    assert_eq!(stats.closes(), 2);
}

#[test]
fn test_session_settings_applied_to_every_connection() {
    let (factory, stats) = FakeProvider::sqlite_file().build();
    let ctx = DbContext::connect(factory, quiet(ConnectionMode::SingleWriter)).unwrap();

    let reader = ctx.get_connection(ExecutionType::Read, false).unwrap();
    let executed = stats.executed();
    assert_eq!(executed.len(), 2);
    assert!(executed.iter().all(|sql| sql == "PRAGMA foreign_keys = ON"));

    ctx.close_and_dispose_connection(reader).unwrap();
}

#[test]
fn test_single_connection_never_closes_before_teardown() {
    let (factory, stats) = FakeProvider::sqlite_memory().build();
    let ctx = DbContext::connect(factory, quiet(ConnectionMode::Best)).unwrap();
    assert_eq!(ctx.mode(), ConnectionMode::SingleConnection);

    let mut handles = Vec::new();
    for execution in [ExecutionType::Read, ExecutionType::Write, ExecutionType::Read] {
        handles.push(ctx.get_connection(execution, false).unwrap());
    }
    assert!(handles.iter().all(|h| h.is_shared() && h.same_handle(&handles[0])));

    for handle in handles {
        ctx.close_and_dispose_connection(handle).unwrap();
    }
    assert_eq!(stats.created(), 1);
    assert_eq!(stats.closes(), 0);

    ctx.close().unwrap();
    assert_eq!(stats.closes(), 1);
}

#[test]
fn test_dropping_context_tears_down_once() {
    let (factory, stats) = FakeProvider::sqlite_memory().build();
    let ctx = DbContext::connect(factory, quiet(ConnectionMode::SingleConnection)).unwrap();
    let handle = ctx.get_connection(ExecutionType::Write, false).unwrap();
    drop(handle);

    drop(ctx);
    assert_eq!(stats.closes(), 1);
}

#[test]
fn test_connect_failure_is_the_only_error() {
    let (factory, stats) = FakeProvider::postgres().failing().build();
    let err = DbContext::connect(factory, quiet(ConnectionMode::Best)).unwrap_err();
    assert!(matches!(
        err,
        ContextError::Connectivity(ConnectionError::ConnectionFailed(_))
    ));
    assert_eq!(stats.closes(), 1);
}

#[test]
fn test_connect_failure_survives_failing_probe_close() {
    let (factory, stats) = FakeProvider::postgres().failing().failing_close().build();
    let err = DbContext::connect(factory, quiet(ConnectionMode::Best)).unwrap_err();
    assert!(matches!(
        err,
        ContextError::Connectivity(ConnectionError::ConnectionFailed(ref msg)) if msg == "server unreachable"
    ));
    assert_eq!(stats.closes(), 1);
}

#[tokio::test]
async fn test_async_connect_failure_survives_failing_probe_close() {
    let (factory, stats) = FakeProvider::postgres().failing().failing_close().build();
    let err = DbContext::connect_async(factory, quiet(ConnectionMode::Best)).await.unwrap_err();
    assert!(matches!(err, ContextError::Connectivity(ConnectionError::ConnectionFailed(_))));
    assert_eq!(stats.closes(), 1);
}

#[test]
fn test_options_from_config_reject_short_generated_names() {
    let mut config = Config::default();
    config.context.mode = ConnectionMode::SingleWriter;
    config.database.acquire_timeout_secs = Some(5);

    let options = ContextOptions::from_config(&config).unwrap();
    assert_eq!(options.mode, ConnectionMode::SingleWriter);
    assert_eq!(options.acquire_timeout, Some(Duration::from_secs(5)));

    config.parameters.generated_name_length = 1;
    let err = ContextOptions::from_config(&config).unwrap_err();
    assert!(matches!(err, ContextError::Config(ConfigError::Invalid(_))));
}

#[test]
fn test_unknown_product_degrades_to_fallback() {
    let (factory, _stats) = FakeProvider::new("AcmeDB", "7.1", "acme://db").build();
    let (options, rx) = options_with_channel(ConnectionMode::Best);
    let ctx = DbContext::connect(factory, options).unwrap();

    assert!(ctx.dialect().is_fallback());
    assert_eq!(ctx.dialect().engine_class(), EngineClass::ClientServer);
    assert_eq!(ctx.mode(), ConnectionMode::Standard);
    assert_eq!(ctx.make_parameter_name("id"), "?");

    let events = drain(&rx);
    let detection = events
        .iter()
        .find(|e| e.kind == DiagnosticKind::DialectDetection)
        .expect("fallback should be reported");
    assert_eq!(detection.product, "AcmeDB");
    assert_eq!(detection.version, "7.1");
}

#[test]
fn test_resolution_table_through_context() {
    let cases = [
        (FakeProvider::postgres(), ConnectionMode::Standard, ConnectionMode::Standard, None),
        (
            FakeProvider::postgres(),
            ConnectionMode::SingleWriter,
            ConnectionMode::SingleWriter,
            Some(DiagnosticKind::ModeMismatch),
        ),
        (
            FakeProvider::postgres(),
            ConnectionMode::SingleConnection,
            ConnectionMode::SingleConnection,
            Some(DiagnosticKind::ModeMismatch),
        ),
        (
            FakeProvider::sqlite_file(),
            ConnectionMode::Standard,
            ConnectionMode::SingleWriter,
            Some(DiagnosticKind::ModeCoerced),
        ),
        (FakeProvider::sqlite_file(), ConnectionMode::SingleWriter, ConnectionMode::SingleWriter, None),
        (
            FakeProvider::sqlite_file(),
            ConnectionMode::SingleConnection,
            ConnectionMode::SingleConnection,
            Some(DiagnosticKind::ModeMismatch),
        ),
        (
            FakeProvider::sqlite_memory(),
            ConnectionMode::Standard,
            ConnectionMode::SingleConnection,
            Some(DiagnosticKind::ModeCoerced),
        ),
        (
            FakeProvider::sqlite_memory(),
            ConnectionMode::SingleWriter,
            ConnectionMode::SingleConnection,
            Some(DiagnosticKind::ModeCoerced),
        ),
        (FakeProvider::sqlite_memory(), ConnectionMode::Best, ConnectionMode::SingleConnection, None),
    ];

    for (provider, requested, expected, expected_event) in cases {
        let label = format!("{} {} {}", provider.product, provider.connection_string, requested);
        let (factory, _stats) = provider.build();
        let (options, rx) = options_with_channel(requested);
        let ctx = DbContext::connect(factory, options).unwrap();

        assert_eq!(ctx.mode(), expected, "{}", label);
        assert_eq!(ctx.active_mode().state(), ModeState::Active, "{}", label);
        let expected_state = if expected_event == Some(DiagnosticKind::ModeCoerced) {
            ModeState::Coerced
        } else {
            ModeState::Validated
        };
        assert_eq!(ctx.active_mode().resolution().state, expected_state, "{}", label);

        let mode_events: Vec<_> = drain(&rx)
            .into_iter()
            .filter(|e| matches!(e.kind, DiagnosticKind::ModeCoerced | DiagnosticKind::ModeMismatch))
            .collect();
        match expected_event {
            Some(kind) => {
                assert_eq!(mode_events.len(), 1, "{}", label);
                assert_eq!(mode_events[0].kind, kind, "{}", label);
                assert_eq!(mode_events[0].requested_mode, requested, "{}", label);
                assert_eq!(mode_events[0].resolved_mode, Some(expected), "{}", label);
            }
            None => assert!(mode_events.is_empty(), "{}", label),
        }
    }
}

#[test]
fn test_read_only_context_refuses_writes() {
    let (factory, _stats) = FakeProvider::postgres().build();
    let ctx = DbContext::connect(factory, quiet(ConnectionMode::Standard).read_only(true)).unwrap();
    assert!(ctx.is_read_only());

    let err = ctx.get_connection(ExecutionType::Write, false).unwrap_err();
    assert!(matches!(err, ContextError::ReadOnly));

    let reader = ctx.get_connection(ExecutionType::Read, false).unwrap();
    ctx.close_and_dispose_connection(reader).unwrap();
}

#[test]
fn test_parameters_follow_detected_dialect() {
    let (factory, _stats) = FakeProvider::postgres().build();
    let ctx = DbContext::connect(factory, quiet(ConnectionMode::Best)).unwrap();

    assert_eq!(ctx.wrap_object_name("public.users"), "\"public\".\"users\"");
    assert_eq!(ctx.make_parameter_name("id"), ":id");

    let p = ctx
        .create_parameter(Some("name"), DbType::String, "Ada Lovelace")
        .unwrap();
    assert_eq!(p.size, Some(12));
    assert_eq!(p.value, DbValue::Text("Ada Lovelace".to_string()));

    let missing = ctx.create_parameter(None, DbType::String, NoValue).unwrap();
    assert_eq!(missing.value, DbValue::Null);
    assert_eq!(missing.size, None);
    assert!(!missing.name.is_empty());
    assert!(missing.name.len() <= ctx.dialect().max_parameter_name_length());

    let empty = ctx.create_parameter(None, DbType::AnsiString, "").unwrap();
    assert_eq!(empty.size, Some(1));
}

#[test]
fn test_generated_names_respect_dialect_bound() {
    let (factory, _stats) = FakeProvider::new("AcmeDB", "1.0", "").build();
    let mut options = quiet(ConnectionMode::Best);
    options.generated_name_length = 64;
    let ctx = DbContext::connect(factory, options).unwrap();

    let p = ctx.create_parameter(None, DbType::Int32, 7).unwrap();
    assert_eq!(p.name.len(), ctx.dialect().max_parameter_name_length());
    assert!(p.name.chars().next().unwrap().is_ascii_alphabetic());
}

#[test]
fn test_provider_without_parameters_is_reported() {
    let (factory, _stats) = FakeProvider::postgres().without_parameters().build();
    let ctx = DbContext::connect(factory, quiet(ConnectionMode::Best)).unwrap();

    let err = ctx.create_parameter(Some("id"), DbType::Int64, 1i64).unwrap_err();
    assert!(matches!(err, ContextError::ParameterConstruction(_)));
}

#[test]
fn test_statement_parameters_reject_duplicates() {
    let (factory, _stats) = FakeProvider::postgres().build();
    let ctx = DbContext::connect(factory, quiet(ConnectionMode::Best)).unwrap();

    let mut params = ctx.statement_parameters();
    ctx.add_parameter(&mut params, Some("id"), DbType::Int64, 1i64).unwrap();
    ctx.add_parameter(&mut params, None, DbType::String, "x").unwrap();
    let err = ctx
        .add_parameter(&mut params, Some("ID"), DbType::Int64, 2i64)
        .unwrap_err();
    assert!(matches!(err, ContextError::DuplicateParameter(_)));
    assert_eq!(params.len(), 2);
}

#[test]
fn test_procedure_call_uses_quoted_name() {
    let (factory, _stats) = FakeProvider::new("Microsoft SQL Server", "16.00.4135", "Server=db").build();
    let ctx = DbContext::connect(factory, quiet(ConnectionMode::Best)).unwrap();

    let sql = ctx
        .wrap_procedure_call("dbo.refresh_totals", &["@from".to_string(), "@to".to_string()])
        .unwrap();
    assert_eq!(sql, "EXEC [dbo].[refresh_totals] @from, @to");
}

#[tokio::test]
async fn test_async_acquisition_matches_sync_semantics() {
    let (factory, stats) = FakeProvider::sqlite_file().build();
    let ctx = DbContext::connect_async(factory, quiet(ConnectionMode::Best)).await.unwrap();
    assert_eq!(ctx.mode(), ConnectionMode::SingleWriter);

    let w1 = ctx.get_connection_async(ExecutionType::Write, false).await.unwrap();
    let w2 = ctx.get_connection(ExecutionType::Write, false).unwrap();
    assert!(w1.same_handle(&w2));

    let reader = ctx.get_connection_async(ExecutionType::Read, false).await.unwrap();
    assert!(!reader.is_shared());

    ctx.close_and_dispose_connection_async(w1).await.unwrap();
    ctx.close_and_dispose_connection_async(w2).await.unwrap();
    ctx.close_and_dispose_connection_async(reader).await.unwrap();
    assert_eq!(stats.closes(), 1);

    ctx.close().unwrap();
    assert_eq!(stats.closes(), 2);
}

#[tokio::test]
async fn test_timed_out_acquisition_releases_connection() {
    let (factory, stats) = FakeProvider::postgres().slow_async(Duration::from_millis(500)).build();
    let (options, rx) = options_with_channel(ConnectionMode::Standard);
    let ctx = DbContext::connect(factory, options).unwrap();

    let err = ctx
        .get_connection_timeout(ExecutionType::Read, false, Duration::from_millis(20))
        .await
        .unwrap_err();
    assert!(matches!(err, ContextError::Timeout(_)));

    // Probe plus the abandoned connection, both closed.
    assert_eq!(stats.created(), 2);
    assert_eq!(stats.closes(), 2);

    let lifecycle = drain(&rx)
        .into_iter()
        .filter(|e| e.kind == DiagnosticKind::ConnectionLifecycle)
        .count();
    assert!(lifecycle >= 2);
}

#[tokio::test]
async fn test_configured_timeout_applies_to_async_acquisition() {
    let (factory, _stats) = FakeProvider::postgres().slow_async(Duration::from_millis(500)).build();
    let options = quiet(ConnectionMode::Standard).with_acquire_timeout(Duration::from_millis(20));
    let ctx = DbContext::connect(factory, options).unwrap();

    let err = ctx.get_connection_async(ExecutionType::Write, false).await.unwrap_err();
    assert!(matches!(err, ContextError::Timeout(_)));
}

#[tokio::test]
async fn test_cancelled_acquisition_releases_connection() {
    let (factory, stats) = FakeProvider::postgres().slow_async(Duration::from_millis(500)).build();
    let ctx = DbContext::connect(factory, quiet(ConnectionMode::Standard)).unwrap();

    tokio::select! {
        _ = ctx.get_connection_async(ExecutionType::Read, false) => panic!("acquisition should not finish first"),
        _ = tokio::time::sleep(Duration::from_millis(20)) => {}
    }

    assert_eq!(stats.created(), 2);
    assert_eq!(stats.closes(), 2);
    assert_eq!(stats.opens(), 1);
}

#[tokio::test]
async fn test_shared_handle_needs_no_async_open() {
    let (factory, stats) = FakeProvider::sqlite_memory().slow_async(Duration::from_millis(500)).build();
    let ctx = DbContext::connect(factory, quiet(ConnectionMode::Best)).unwrap();

    let handle = ctx
        .get_connection_timeout(ExecutionType::Write, false, Duration::from_millis(20))
        .await
        .unwrap();
    assert!(handle.is_shared());
    assert_eq!(stats.created(), 1);
}
