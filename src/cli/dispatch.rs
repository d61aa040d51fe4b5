use crate::cli::args::{Cli, Commands};
use dialectic_rs::dialects::{get_registry, DialectDescriptor, DialectDetector};
use dialectic_rs::logger::apply_logging_config;
use dialectic_rs::model::Config;
use dialectic_rs::params::ParameterBuilder;
use dialectic_rs::provider::{ParameterStyle, ServerInfo};
use dialectic_rs::resolver::{resolve_mode, ConnectionMode, ModeResolution};
use log::{debug, error, info, warn};

pub fn handle(cli: Cli) {
    // Load configuration
    let config = match Config::load(cli.config.as_deref(), cli.env.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    apply_logging_config(&config.logging, cli.verbose);
    debug!("Loaded configuration: {:?}", config);

    match cli.command {
        Commands::Detect { conn, mode } => {
            info!("Running DETECT command");
            let final_conn = conn.or(config.database.connection_string.clone()).unwrap_or_else(|| {
                error!("No connection string provided via --conn flag or config file");
                std::process::exit(1);
            });
            let final_mode = match mode {
                Some(mode) => parse_mode(&mode),
                None => config.context.mode,
            };

            debug!("Connection: {}", final_conn);
            debug!("Requested mode: {}", final_mode);
            run_detect(&config, &final_conn, final_mode);
        }

        Commands::Resolve {
            product,
            version,
            conn_string,
            mode,
        } => {
            info!("Running RESOLVE command");
            let requested = parse_mode(&mode);
            let descriptor = describe(&product, &version, &conn_string);
            let resolution = resolve_mode(requested, &descriptor);

            print_descriptor(&descriptor);
            print_resolution(&resolution);
        }

        Commands::Wrap {
            product,
            version,
            identifier,
        } => {
            debug!("Running WRAP command");
            let descriptor = describe(&product, &version, "");
            let builder = ParameterBuilder::new(&descriptor)
                .with_name_length(config.parameters.generated_name_length);
            println!("{}", builder.wrap_object_name(&identifier));
        }

        Commands::Dialects => {
            let registry = get_registry();
            for name in registry.list_dialects() {
                match registry.get(&name) {
                    Some(rule) => println!("{:<20} {:<20} {}", name, rule.engine, rule.description),
                    None => println!("{}", name),
                }
            }
        }

        Commands::Config { output, env } => {
            info!("Running CONFIG command");
            debug!("Output path: {}", output);

            match Config::generate_default_config(&output) {
                Ok(()) => {
                    info!("Generated default configuration file: {}", output);
                    if let Some(env_name) = env {
                        let env_path = format!("config/{}.toml", env_name);
                        match std::fs::create_dir_all("config") {
                            Ok(()) => match Config::generate_default_config(&env_path) {
                                Ok(()) => info!("Generated environment configuration file: {}", env_path),
                                Err(e) => error!("Failed to create environment config: {}", e),
                            },
                            Err(e) => error!("Failed to create config directory: {}", e),
                        }
                    }
                }
                Err(e) => {
                    error!("Failed to generate configuration file: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

fn parse_mode(mode: &str) -> ConnectionMode {
    mode.parse().unwrap_or_else(|e: String| {
        error!("{}", e);
        std::process::exit(1);
    })
}

fn describe(product: &str, version: &str, connection_string: &str) -> DialectDescriptor {
    let info = ServerInfo {
        product_name: product.to_string(),
        product_version: version.to_string(),
    };
    let detection = DialectDetector::new().describe(&info, connection_string, ParameterStyle::Native);
    if let Some(reason) = &detection.degraded {
        warn!("Dialect detection degraded: {}", reason);
    }
    detection.descriptor
}

fn print_descriptor(d: &DialectDescriptor) {
    println!("dialect:            {}", d.rule_name());
    println!("product:            {} {}", d.product_name(), d.product_version());
    println!("standard:           {:?}", d.standard_compliance());
    println!("quoting:            {}name{}", d.quote_prefix(), d.quote_suffix());
    println!("separator:          {}", d.composite_separator());
    println!("parameter marker:   {}", d.parameter_marker());
    println!("named parameters:   {}", d.supports_named_parameters());
    println!("max name length:    {}", d.max_parameter_name_length());
    println!("max parameters:     {}", d.max_parameter_count());
    println!("procedure style:    {:?}", d.procedure_style());
    println!("engine class:       {}", d.engine_class());
    if d.is_fallback() {
        println!("fallback:           true");
    }
}

fn print_resolution(r: &ModeResolution) {
    println!("requested mode:     {}", r.requested);
    println!("resolved mode:      {}", r.resolved);
    println!("state:              {:?}", r.state);
    if r.mismatch {
        println!("mismatch:           true");
    }
    println!("rationale:          {}", r.rationale);
}

#[cfg(feature = "odbc")]
fn run_detect(config: &Config, connection_string: &str, mode: ConnectionMode) {
    use dialectic_rs::provider::odbc::OdbcProviderFactory;
    use dialectic_rs::{ContextOptions, DbContext};
    use std::sync::Arc;

    let factory = Arc::new(OdbcProviderFactory::new(connection_string));
    let options = match ContextOptions::from_config(config) {
        Ok(options) => options.with_mode(mode),
        Err(e) => {
            error!("Invalid context options: {}", e);
            std::process::exit(1);
        }
    };
    let context = match DbContext::connect(factory, options) {
        Ok(context) => context,
        Err(e) => {
            error!("Detect command failed: {}", e);
            std::process::exit(1);
        }
    };

    print_descriptor(context.dialect());
    print_resolution(context.active_mode().resolution());

    if let Err(e) = context.close() {
        error!("Failed to close context: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "odbc"))]
fn run_detect(_config: &Config, _connection_string: &str, _mode: ConnectionMode) {
    error!("This build has no ODBC support; rebuild with `--features odbc` to detect over a live connection");
    std::process::exit(1);
}
