use burrow_core::TrustedSubnet;
use burrow_storage::Backend;
use burrow_telemetry::LogFormat;
use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const LISTEN_ADDR_ENV: &str = "SERVER_ADDRESS";
pub const BASE_URL_ENV: &str = "BASE_URL";
pub const STORAGE_BACKEND_ENV: &str = "BURROW_STORAGE_BACKEND";
pub const LOG_PATH_ENV: &str = "FILE_STORAGE_PATH";
pub const DATABASE_URL_ENV: &str = "DATABASE_DSN";
pub const TRUSTED_SUBNET_ENV: &str = "TRUSTED_SUBNET";
pub const LOG_FORMAT_ENV: &str = "BURROW_LOG_FORMAT";

pub const DEFAULT_LISTEN_ADDR: &str = "localhost:8080";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_LOG_PATH: &str = "burrow-urls.jsonl";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "log")]
    Log,
    #[value(name = "postgres")]
    Postgres,
    #[value(name = "in-memory")]
    InMemory,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::Log => write!(f, "log"),
            StorageBackendArg::Postgres => write!(f, "postgres"),
            StorageBackendArg::InMemory => write!(f, "in-memory"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "burrow-gateway")]
pub struct CLI {
    /// Address to listen on; host names are resolved.
    #[arg(short = 'a', long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: String,

    #[arg(short = 'b', long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::Log
    )]
    pub storage: StorageBackendArg,

    #[arg(short = 'f', long, env = LOG_PATH_ENV, default_value = DEFAULT_LOG_PATH)]
    pub log_path: PathBuf,

    #[arg(
        short = 'd',
        long,
        env = DATABASE_URL_ENV,
        required_if_eq("storage", "postgres")
    )]
    pub database_url: Option<String>,

    /// CIDR block allowed to read `/api/internal/stats`. Unset denies everyone.
    #[arg(short = 't', long, env = TRUSTED_SUBNET_ENV)]
    pub trusted_subnet: Option<TrustedSubnet>,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Pretty)]
    pub log_format: LogFormatArg,
}

impl CLI {
    pub fn backend(&self) -> Result<Backend, &'static str> {
        match self.storage {
            StorageBackendArg::InMemory => Ok(Backend::InMemory),
            StorageBackendArg::Log => Ok(Backend::Log {
                path: self.log_path.clone(),
            }),
            StorageBackendArg::Postgres => {
                let database_url = self
                    .database_url
                    .clone()
                    .ok_or("database url is required when storage backend is postgres")?;
                Ok(Backend::Postgres { database_url })
            }
        }
    }
}
