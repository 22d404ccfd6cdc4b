//! Server configuration from environment variables.

/// Runtime configuration.
///
/// Everything comes from the environment with development-friendly
/// defaults; nothing here fails startup — a bad value falls back and logs.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port for HTTP + WebSocket. `PORT`, default 3001.
    pub port: u16,
    /// Allowed CORS origins. `CORS_ORIGIN`, comma-separated; `*` (the
    /// default) allows any origin.
    pub cors_origins: Vec<String>,
    /// State-store DSN. `REDIS_URL`; unset means in-process only.
    pub redis_url: Option<String>,
    /// Deployment tag echoed by `/health`. `ENVIRONMENT`, default
    /// "development".
    pub environment: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            cors_origins: vec!["*".to_string()],
            redis_url: None,
            environment: "development".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| match value.parse() {
                Ok(port) => Some(port),
                Err(_) => {
                    tracing::warn!(value, "unparseable PORT, using default");
                    None
                }
            })
            .unwrap_or(defaults.port);

        let cors_origins = std::env::var("CORS_ORIGIN")
            .ok()
            .map(|value| parse_origins(&value))
            .filter(|origins| !origins.is_empty())
            .unwrap_or(defaults.cors_origins);

        let redis_url = std::env::var("REDIS_URL")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let environment = std::env::var("ENVIRONMENT")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(defaults.environment);

        Self {
            port,
            cors_origins,
            redis_url,
            environment,
        }
    }

    /// Whether any origin is allowed.
    pub fn cors_any(&self) -> bool {
        self.cors_origins.iter().any(|origin| origin == "*")
    }
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
