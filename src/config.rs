use anyhow::{Context, Result};

/// Service configuration, read once from the environment at startup.
/// `bootstrap::init_env` loads a `.env` file first, so local development
/// only needs the file while deployments use real environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

pub fn load() -> Result<Config> {
    let url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT")
        .ok()
        .map(|port| port.parse::<u16>())
        .transpose()
        .context("PORT must be a valid port number")?
        .unwrap_or(3000);

    Ok(Config {
        database: DatabaseConfig { url },
        server: ServerConfig { host, port },
    })
}

/// Bearer token expected on `/admin` routes. Unset or empty means the admin
/// surface is closed entirely; there is no default credential.
pub fn admin_api_token() -> Option<String> {
    std::env::var("ADMIN_API_TOKEN")
        .ok()
        .filter(|token| !token.is_empty())
}
