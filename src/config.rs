use serde::Deserialize;
use std::path::{Path, PathBuf};

fn default_port() -> u16 {
    5000
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./database.db")
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("./uploads")
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

/// Server configuration file structure (TOML)
///
/// Every field is optional in the file; environment variables override the file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Port to listen on (default: 5000)
    #[serde(default = "default_port")]
    pub port: u16,
    /// SQLite database file (default: ./database.db)
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Directory holding uploaded content (default: ./uploads)
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,
    /// Origins allowed to call the API; "*" allows any (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    /// Upper bound on an upload request body in bytes (default: unlimited)
    pub max_upload_bytes: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            database_path: default_database_path(),
            uploads_dir: default_uploads_dir(),
            cors_origins: default_cors_origins(),
            max_upload_bytes: None,
        }
    }
}

impl ServerConfig {
    /// Read a TOML config file
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;
        toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file {}: {}", path.display(), e))
    }

    /// Apply PORT, DATABASE_PATH, UPLOADS_DIR, CORS_ORIGINS and MAX_UPLOAD_BYTES
    pub fn apply_env(&mut self) -> Result<(), String> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (the environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| format!("Invalid PORT '{}'", port))?;
        }
        if let Some(path) = lookup("DATABASE_PATH") {
            self.database_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("UPLOADS_DIR") {
            self.uploads_dir = PathBuf::from(dir);
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.cors_origins = origins
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect();
        }
        if let Some(limit) = lookup("MAX_UPLOAD_BYTES") {
            self.max_upload_bytes = Some(
                limit
                    .trim()
                    .parse()
                    .map_err(|_| format!("Invalid MAX_UPLOAD_BYTES '{}'", limit))?,
            );
        }
        Ok(())
    }

    /// True when any origin may call the API
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|origin| origin == "*")
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("port must be between 1 and 65535".to_string());
        }
        if self.cors_origins.is_empty() {
            return Err("cors_origins must list at least one origin (use \"*\" for any)".to_string());
        }
        if self.max_upload_bytes == Some(0) {
            return Err("max_upload_bytes must be greater than 0 when set".to_string());
        }
        Ok(())
    }
}
