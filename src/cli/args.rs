use clap::{Parser, Subcommand};

/// CLI entry point for dialectic
#[derive(Parser, Debug)]
#[command(
    name = "dialectic",
    version,
    about = "Inspect SQL dialect detection and connection-mode resolution"
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Environment (loads config/{env}.toml)
    #[arg(long, global = true)]
    pub env: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect over ODBC, detect the dialect and resolve the connection mode
    Detect {
        /// ODBC connection string
        #[arg(long)]
        conn: Option<String>,

        /// Requested connection mode (standard, single-connection, single-writer, best)
        #[arg(long)]
        mode: Option<String>,
    },

    /// Resolve a dialect and connection mode from product metadata, offline
    Resolve {
        /// Product name as reported by the driver
        #[arg(long)]
        product: String,

        /// Product version string
        #[arg(long, default_value = "")]
        version: String,

        /// Connection string (used to spot in-memory databases)
        #[arg(long, default_value = "")]
        conn_string: String,

        /// Requested connection mode
        #[arg(long, default_value = "best")]
        mode: String,
    },

    /// Quote an identifier for a product
    Wrap {
        /// Product name as reported by the driver
        #[arg(long)]
        product: String,

        /// Product version string
        #[arg(long, default_value = "")]
        version: String,

        /// Identifier, possibly composite (schema.table)
        identifier: String,
    },

    /// List built-in dialect rules
    Dialects,

    /// Generate configuration file
    Config {
        /// Output path for config file
        #[arg(long, default_value = "config.toml")]
        output: String,

        /// Create environment-specific config
        #[arg(long)]
        env: Option<String>,
    },
}
