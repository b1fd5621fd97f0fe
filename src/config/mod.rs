use std::env;

/// Which backend the stores talk to. Read once at startup; there is no
/// runtime switching and no per-call override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    Mock,
    Hosted,
}

impl BackendMode {
    fn from_env() -> Self {
        match env::var("BUNDLROS_BACKEND").as_deref() {
            Ok("hosted") => BackendMode::Hosted,
            Ok("mock") | Err(_) => BackendMode::Mock,
            Ok(other) => {
                log::warn!("unrecognized BUNDLROS_BACKEND value {other:?}, using mock");
                BackendMode::Mock
            }
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub backend: BackendMode,
    pub ai: AiConfig,
}

#[derive(Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub username: String,
    pub password: String,
    pub server: String,
    pub port: u32,
    pub database: String,
}

#[derive(Clone)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

fn get_str(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl AppConfig {
    pub fn from_env() -> Self {
        let server = ServerConfig {
            host: get_str("SERVER_HOST", "127.0.0.1"),
            port: env::var("SERVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8470),
        };
        let database = DatabaseConfig {
            username: get_str("TABLES_USERNAME", "bundlros"),
            password: get_str("TABLES_PASSWORD", ""),
            server: get_str("TABLES_SERVER", "localhost"),
            port: env::var("TABLES_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5432),
            database: get_str("TABLES_DATABASE", "bundlros"),
        };
        let ai = AiConfig {
            api_key: env::var("AI_API_KEY").ok().filter(|k| !k.is_empty()),
            base_url: get_str("AI_BASE_URL", "https://api.openai.com"),
        };
        AppConfig {
            server,
            database,
            backend: BackendMode::from_env(),
            ai,
        }
    }

    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.database.username,
            self.database.password,
            self.database.server,
            self.database.port,
            self.database.database
        )
    }
}
