//! Settings loading: optional `consultorio.toml` overlaid by environment
//! variables (`DB_HOST`, `DOCSTORE_PATH`, ...)
//!
//! `DOCSTORE_PATH` points at a local SQLite file of JSON documents. It takes
//! the place of the hosted store's credentials file, so
//! `FIREBASE_CREDENTIALS_PATH` is not read; `status` says so when it is set.

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use consultorio_core::config::{
    AppConfig, DatabaseSettings, DocumentStoreSettings, ModelingMode, DEFAULT_CONNECT_TIMEOUT_SECS,
    DEFAULT_DB_HOST, DEFAULT_DB_NAME, DEFAULT_DB_PORT, DEFAULT_DB_USER, DEFAULT_DOCSTORE_PATH,
    DEFAULT_SQLITE_PATH,
};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "consultorio.toml";

/// Credentials setting of the hosted document store, superseded by `DOCSTORE_PATH`
pub const CREDENTIALS_VAR: &str = "FIREBASE_CREDENTIALS_PATH";

/// Operator notice for a credentials path that will not be used
pub fn credentials_notice(credentials: Option<&str>, docstore_path: &str) -> Option<String> {
    let credentials = credentials.map(str::trim).filter(|c| !c.is_empty())?;
    Some(format!(
        "{}={} is ignored; documents are stored in {}",
        CREDENTIALS_VAR, credentials, docstore_path
    ))
}

/// Flat key space shared by the file and the environment
#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawSettings {
    db_host: String,
    db_port: u16,
    db_user: String,
    db_password: String,
    db_name: String,
    db_connect_timeout_secs: u64,
    db_connect_attempts: u32,
    demo: bool,
    db_use_sqlite_fallback: bool,
    sqlite_path: String,
    docstore_path: String,
    docstore_modeling_mode: String,
    docstore_debug: bool,
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            db_host: DEFAULT_DB_HOST.to_string(),
            db_port: DEFAULT_DB_PORT,
            db_user: DEFAULT_DB_USER.to_string(),
            db_password: String::new(),
            db_name: DEFAULT_DB_NAME.to_string(),
            db_connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            db_connect_attempts: 1,
            demo: false,
            db_use_sqlite_fallback: true,
            sqlite_path: DEFAULT_SQLITE_PATH.to_string(),
            docstore_path: DEFAULT_DOCSTORE_PATH.to_string(),
            docstore_modeling_mode: ModelingMode::default().to_string(),
            docstore_debug: false,
        }
    }
}

impl RawSettings {
    fn into_app_config(self) -> Result<AppConfig> {
        let modeling_mode: ModelingMode = self.docstore_modeling_mode.parse()?;
        Ok(AppConfig {
            database: DatabaseSettings {
                host: self.db_host,
                port: self.db_port,
                user: self.db_user,
                password: self.db_password,
                name: self.db_name,
                connect_timeout_secs: self.db_connect_timeout_secs,
                connect_attempts: self.db_connect_attempts.max(1),
                demo: self.demo,
                use_sqlite_fallback: self.db_use_sqlite_fallback,
                sqlite_path: expand(&self.sqlite_path),
            },
            docstore: DocumentStoreSettings {
                path: expand(&self.docstore_path),
                modeling_mode,
                debug: self.docstore_debug,
            },
        })
    }
}

fn expand(path: &str) -> String {
    shellexpand::tilde(path).into_owned()
}

/// Load settings; a missing file is fine, a malformed one is not
pub fn load(config_file: Option<&Path>) -> Result<AppConfig> {
    let file = match config_file {
        Some(path) => File::from(path).required(true),
        None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    let config = Config::builder()
        .add_source(file)
        .add_source(Environment::default())
        .build()
        .context("Failed to read configuration")?;

    from_config(config)
}

fn from_config(config: Config) -> Result<AppConfig> {
    let raw: RawSettings = config
        .try_deserialize()
        .context("Invalid configuration value")?;
    raw.into_app_config()
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(source: &str) -> Result<AppConfig> {
        let config = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?;
        from_config(config)
    }

    #[test]
    fn test_defaults_without_sources() {
        let cfg = from_toml("").unwrap();
        assert_eq!(cfg.database.host, "localhost");
        assert_eq!(cfg.database.port, 3306);
        assert_eq!(cfg.database.name, "consultoriomedico");
        assert!(cfg.database.use_sqlite_fallback);
        assert!(!cfg.database.demo);
        assert!(!cfg.database.sqlite_path.starts_with('~'));
        assert_eq!(cfg.docstore.modeling_mode, ModelingMode::Embedded);
    }

    #[test]
    fn test_file_values_override_defaults() {
        let cfg = from_toml(
            r#"
            db_host = "db.internal"
            db_port = 3307
            demo = "yes"
            sqlite_path = "/tmp/demo.sqlite"
            docstore_modeling_mode = "referenced"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.database.host, "db.internal");
        assert_eq!(cfg.database.port, 3307);
        assert!(cfg.database.demo);
        assert_eq!(cfg.database.sqlite_path, "/tmp/demo.sqlite");
        assert_eq!(cfg.docstore.modeling_mode, ModelingMode::Referenced);
    }

    #[test]
    fn test_unknown_modeling_mode_is_rejected() {
        let err = from_toml(r#"docstore_modeling_mode = "graph""#).unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid modeling mode"));
    }

    #[test]
    fn test_credentials_notice_only_when_set() {
        assert_eq!(credentials_notice(None, "docs.sqlite"), None);
        assert_eq!(credentials_notice(Some("  "), "docs.sqlite"), None);

        let notice = credentials_notice(Some("/etc/firebase.json"), "docs.sqlite").unwrap();
        assert!(notice.contains("/etc/firebase.json"));
        assert!(notice.contains("docs.sqlite"));
    }
}
