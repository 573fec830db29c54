use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "vcache",
    version,
    about = "Serve the latest known-good remote JSON documents over HTTP"
)]
pub struct Args {
    /// Sets log level to debug
    #[arg(long)]
    pub debug: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// JSON config file; environment variables are ignored when set
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// HTTP listen port (overrides VT_HTTP_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory for local copies of remote documents (overrides VT_DATA_DIR)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}
