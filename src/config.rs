use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use serde::Deserialize;
use sheetledger_core::{LedgerScope, StaticCredentials, TableSource};
use sheetledger_memory::InMemoryTables;
use sheetledger_sqlite::SqliteTables;

use crate::error::AppError;

#[derive(Parser, Debug)]
#[command(name = "sheetledger", about = "SheetLedger - spreadsheet-backed in/out ledger")]
pub struct CliArgs {
    /// Path to config file
    #[arg(short, long, default_value = "sheetledger.toml")]
    pub config: String,

    /// Port to listen on (overrides config file)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Log level (overrides config file)
    #[arg(short, long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Print every entry of a ledger
    List {
        #[arg(long)]
        owner: String,
    },
    /// Print the month by direction totals of a ledger
    Report {
        #[arg(long)]
        owner: String,
    },
    /// Write a ledger to a CSV file
    Export {
        #[arg(long)]
        owner: String,
        /// Defaults to <owner>_exported_data.csv
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    #[serde(default = "default_logging")]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackendKind {
    Memory,
    #[default]
    Sqlite,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackendKind,

    /// SQLite database file; `:memory:` keeps it in process.
    #[serde(default = "default_storage_path")]
    pub path: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    #[default]
    PerUser,
    Shared,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    #[serde(default)]
    pub scope: ScopeKind,

    /// Table used by every caller when `scope = "shared"`.
    #[serde(default = "default_shared_name")]
    pub shared_name: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AuthConfig {
    /// Static username/password pairs. Requests with any other pair are rejected.
    #[serde(default)]
    pub users: Vec<UserEntry>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UserEntry {
    pub username: String,
    pub password: String,
}

fn default_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: default_port(),
    }
}

fn default_logging() -> LoggingConfig {
    LoggingConfig {
        level: default_log_level(),
        json: false,
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_storage_path() -> String {
    "sheetledger.db".to_string()
}

fn default_shared_name() -> String {
    "ledger".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            backend: StorageBackendKind::default(),
            path: default_storage_path(),
        }
    }
}

impl StorageConfig {
    pub fn open(&self) -> Result<Arc<dyn TableSource>, AppError> {
        let tables: Arc<dyn TableSource> = match self.backend {
            StorageBackendKind::Memory => Arc::new(InMemoryTables::new()),
            StorageBackendKind::Sqlite => Arc::new(SqliteTables::new(&self.path)?),
        };
        tracing::info!(backend = ?self.backend, path = %self.path, "Table source opened");
        Ok(tables)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            scope: ScopeKind::default(),
            shared_name: default_shared_name(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: default_server(),
            logging: default_logging(),
            storage: StorageConfig::default(),
            ledger: LedgerConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl Config {
    /// Reads the config file named on the command line and applies CLI overrides.
    /// A missing file yields the defaults; a file that does not parse is an error.
    pub fn load(cli: &CliArgs) -> Result<Self, AppError> {
        let mut config = match std::fs::read_to_string(&cli.config) {
            Ok(contents) => Self::from_toml(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(e) => return Err(AppError::Config(format!("Failed to read {}: {}", cli.config, e))),
        };

        // CLI overrides
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref level) = cli.log_level {
            config.logging.level = level.clone();
        }

        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, AppError> {
        toml::from_str(contents).map_err(|e| AppError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid listen address: {}", e)))
    }

    pub fn ledger_scope(&self) -> LedgerScope {
        match self.ledger.scope {
            ScopeKind::PerUser => LedgerScope::PerUser,
            ScopeKind::Shared => LedgerScope::Shared(self.ledger.shared_name.clone()),
        }
    }

    pub fn credentials(&self) -> StaticCredentials {
        self.auth
            .users
            .iter()
            .map(|u| (u.username.clone(), u.password.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use sheetledger_core::authenticate;

    use super::*;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.storage.backend, StorageBackendKind::Sqlite);
        assert_eq!(config.storage.path, "sheetledger.db");
        assert_eq!(config.ledger_scope(), LedgerScope::PerUser);
        assert!(config.credentials().is_empty());
    }

    #[test]
    fn test_full_file() {
        let config = Config::from_toml(
            r#"
            [server]
            host = "127.0.0.1"
            port = 8080

            [logging]
            level = "debug"
            json = true

            [storage]
            backend = "memory"

            [ledger]
            scope = "shared"
            shared_name = "household"

            [[auth.users]]
            username = "adit"
            password = "shruti"
            "#,
        )
        .unwrap();

        assert_eq!(config.listen_addr().unwrap().to_string(), "127.0.0.1:8080");
        assert!(config.logging.json);
        assert_eq!(config.storage.backend, StorageBackendKind::Memory);
        assert_eq!(config.ledger_scope(), LedgerScope::Shared("household".to_string()));
        assert_eq!(config.credentials().len(), 1);
        assert!(authenticate(&config.credentials(), "adit", "shruti"));
    }

    #[test]
    fn test_bad_file_is_an_error() {
        assert!(matches!(Config::from_toml("[server]\nport = \"many\""), Err(AppError::Config(_))));
    }

    #[test]
    fn test_cli_overrides() {
        let cli = CliArgs::parse_from(["sheetledger", "--config", "does-not-exist.toml", "--port", "9000", "-l", "warn"]);
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.logging.level, "warn");
        assert_eq!(cli.command, None);
    }

    #[test]
    fn test_subcommands_parse() {
        let cli = CliArgs::parse_from(["sheetledger", "export", "--owner", "adit", "-o", "out.csv"]);
        assert_eq!(
            cli.command,
            Some(Command::Export {
                owner: "adit".to_string(),
                output: Some(PathBuf::from("out.csv")),
            })
        );
    }

    #[test]
    fn test_open_memory_storage() {
        let storage = StorageConfig {
            backend: StorageBackendKind::Memory,
            path: String::new(),
        };
        let tables = storage.open().unwrap();
        assert!(tables.list_tables().unwrap().is_empty());
    }

    #[test]
    fn test_bad_listen_address() {
        let mut config = Config::default();
        config.server.host = "not a host".to_string();
        assert!(config.listen_addr().is_err());
    }
}
