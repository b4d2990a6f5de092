// Settings shared by the adapters (loaded by the composition root)

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_PORT: u16 = 3306;
pub const DEFAULT_DB_USER: &str = "root";
pub const DEFAULT_DB_NAME: &str = "consultoriomedico";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_SQLITE_PATH: &str = "~/.consultorio/demo.sqlite";
pub const DEFAULT_DOCSTORE_PATH: &str = "~/.consultorio/documents.sqlite";

/// Relational backend settings (primary MySQL + SQLite fallback)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub connect_timeout_secs: u64,
    pub connect_attempts: u32,
    /// Forces the fallback backend, skipping the primary attempt
    pub demo: bool,
    pub use_sqlite_fallback: bool,
    pub sqlite_path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_DB_HOST.to_string(),
            port: DEFAULT_DB_PORT,
            user: DEFAULT_DB_USER.to_string(),
            password: String::new(),
            name: DEFAULT_DB_NAME.to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            connect_attempts: 1,
            demo: false,
            use_sqlite_fallback: true,
            sqlite_path: DEFAULT_SQLITE_PATH.to_string(),
        }
    }
}

impl DatabaseSettings {
    /// Settings for a demo run against the given SQLite location
    pub fn demo(sqlite_path: impl Into<String>) -> Self {
        Self {
            demo: true,
            sqlite_path: sqlite_path.into(),
            ..Self::default()
        }
    }

    /// `user@host:port/name`, never includes the password
    pub fn primary_label(&self) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.port, self.name)
    }
}

/// Target document shape for the relationship entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelingMode {
    /// Related records copied inline into each appointment document
    #[default]
    Embedded,
    /// Appointment documents hold only the three foreign identifiers
    Referenced,
}

impl ModelingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelingMode::Embedded => "embedded",
            ModelingMode::Referenced => "referenced",
        }
    }
}

impl fmt::Display for ModelingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelingMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "embedded" => Ok(ModelingMode::Embedded),
            "referenced" => Ok(ModelingMode::Referenced),
            other => Err(AppError::Config(format!(
                "Invalid modeling mode: {}. Use 'embedded' or 'referenced'",
                other
            ))),
        }
    }
}

/// Document store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentStoreSettings {
    /// SQLite file (or `sqlite:` URL) holding the JSON documents. There is
    /// no hosted store and no credentials file; this path is the whole
    /// connection setting.
    pub path: String,
    pub modeling_mode: ModelingMode,
    pub debug: bool,
}

impl Default for DocumentStoreSettings {
    fn default() -> Self {
        Self {
            path: DEFAULT_DOCSTORE_PATH.to_string(),
            modeling_mode: ModelingMode::default(),
            debug: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseSettings,
    pub docstore: DocumentStoreSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.database.port, 3306);
        assert!(cfg.database.use_sqlite_fallback);
        assert!(!cfg.database.demo);
        assert_eq!(cfg.docstore.modeling_mode, ModelingMode::Embedded);
    }

    #[test]
    fn test_modeling_mode_parse() {
        assert_eq!(
            "Referenced".parse::<ModelingMode>().unwrap(),
            ModelingMode::Referenced
        );
        let err = "graph".parse::<ModelingMode>().unwrap_err();
        assert!(err.to_string().contains("Invalid modeling mode"));
    }

    #[test]
    fn test_primary_label_hides_password() {
        let mut settings = DatabaseSettings::default();
        settings.password = "secret".to_string();
        assert_eq!(settings.primary_label(), "root@localhost:3306/consultoriomedico");
    }
}
