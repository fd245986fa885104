use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string. `None` falls back to the in-memory store
    /// outside production.
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible stores (MinIO, R2, ...). Forces path-style addressing.
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub upload_url_expiry_secs: u64,
    pub download_url_expiry_secs: u64,
    pub max_upload_bytes: u64,
    pub pending_upload_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub max_request_size_bytes: usize,
    pub log_filter: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub cors_origins: Vec<String>,
}

const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v).filter(|s| !s.trim().is_empty());
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Storage overrides
        if let Ok(v) = env::var("STORAGE_BUCKET") {
            self.storage.bucket = v;
        }
        if let Ok(v) = env::var("STORAGE_REGION") {
            self.storage.region = v;
        }
        if let Ok(v) = env::var("STORAGE_ENDPOINT") {
            self.storage.endpoint = Some(v).filter(|s| !s.trim().is_empty());
        }
        if let Ok(v) = env::var("STORAGE_ACCESS_KEY_ID") {
            self.storage.access_key_id = Some(v);
        }
        if let Ok(v) = env::var("STORAGE_SECRET_ACCESS_KEY") {
            self.storage.secret_access_key = Some(v);
        }
        if let Ok(v) = env::var("STORAGE_UPLOAD_URL_EXPIRY_SECS") {
            self.storage.upload_url_expiry_secs = v.parse().unwrap_or(self.storage.upload_url_expiry_secs);
        }
        if let Ok(v) = env::var("STORAGE_DOWNLOAD_URL_EXPIRY_SECS") {
            self.storage.download_url_expiry_secs = v.parse().unwrap_or(self.storage.download_url_expiry_secs);
        }
        if let Ok(v) = env::var("STORAGE_PENDING_UPLOAD_TTL_SECS") {
            self.storage.pending_upload_ttl_secs = v.parse().unwrap_or(self.storage.pending_upload_ttl_secs);
        }
        if let Ok(v) = env::var("STORAGE_SWEEP_INTERVAL_SECS") {
            self.storage.sweep_interval_secs = v.parse().unwrap_or(self.storage.sweep_interval_secs);
        }

        // API overrides
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }
        if let Ok(v) = env::var("RUST_LOG") {
            self.api.log_filter = v;
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
                connection_timeout: 30,
            },
            storage: StorageConfig {
                bucket: "healthtrack-dev".to_string(),
                region: "us-east-1".to_string(),
                endpoint: Some("http://localhost:9000".to_string()),
                access_key_id: None,
                secret_access_key: None,
                upload_url_expiry_secs: 15 * 60,
                download_url_expiry_secs: 15 * 60,
                max_upload_bytes: MAX_UPLOAD_BYTES,
                pending_upload_ttl_secs: 60 * 60,
                sweep_interval_secs: 5 * 60,
            },
            api: ApiConfig {
                max_request_size_bytes: 1024 * 1024, // 1MB, file bodies go straight to storage
                log_filter: "healthtrack_api=debug,tower_http=debug".to_string(),
            },
            security: SecurityConfig {
                jwt_secret: "development-only-secret".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 10,
            },
            storage: StorageConfig {
                bucket: "healthtrack-staging".to_string(),
                region: "us-east-1".to_string(),
                endpoint: None,
                access_key_id: None,
                secret_access_key: None,
                upload_url_expiry_secs: 10 * 60,
                download_url_expiry_secs: 10 * 60,
                max_upload_bytes: MAX_UPLOAD_BYTES,
                pending_upload_ttl_secs: 60 * 60,
                sweep_interval_secs: 10 * 60,
            },
            api: ApiConfig {
                max_request_size_bytes: 512 * 1024,
                log_filter: "healthtrack_api=info,tower_http=info".to_string(),
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 5,
            },
            storage: StorageConfig {
                bucket: "healthtrack".to_string(),
                region: "us-east-1".to_string(),
                endpoint: None,
                access_key_id: None,
                secret_access_key: None,
                upload_url_expiry_secs: 5 * 60,
                download_url_expiry_secs: 5 * 60,
                max_upload_bytes: MAX_UPLOAD_BYTES,
                pending_upload_ttl_secs: 30 * 60,
                sweep_interval_secs: 15 * 60,
            },
            api: ApiConfig {
                max_request_size_bytes: 256 * 1024,
                log_filter: "healthtrack_api=info,tower_http=warn".to_string(),
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 12,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment, Environment::Production)
    }

    /// Checks that must pass before the server starts accepting traffic.
    pub fn validate(&self) -> Result<(), String> {
        if self.security.jwt_secret.is_empty() {
            return Err("JWT_SECRET must be set".to_string());
        }
        if self.is_production() && self.database.url.is_none() {
            return Err("DATABASE_URL must be set in production".to_string());
        }
        if self.storage.max_upload_bytes == 0 {
            return Err("max upload size must be positive".to_string());
        }
        Ok(())
    }
}
