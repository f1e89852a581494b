use std::path::PathBuf;

use clap::Parser;

use crate::config::GatewayConfig;
use crate::error::ConfigError;

/// Command line and environment overrides
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "lite-gateway")]
#[command(about = "Lightweight API gateway with rate limiting, JWT authentication and proxying")]
pub struct Cli {
    /// JSON configuration file
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "GATEWAY_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "GATEWAY_PORT")]
    pub port: Option<u16>,

    /// Token signing secret
    #[arg(long, env = "GATEWAY_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// Token algorithm (HS256, HS384 or HS512)
    #[arg(long, env = "GATEWAY_ALGORITHM")]
    pub algorithm: Option<String>,

    /// Log level
    #[arg(long, env = "GATEWAY_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, env = "GATEWAY_LOG_JSON")]
    pub log_json: Option<bool>,
}

impl Cli {
    /// Load the configuration file, if any, apply overrides and validate
    pub fn load_config(&self) -> Result<GatewayConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => GatewayConfig::load_from_file(path)?,
            None => GatewayConfig::default(),
        };
        self.apply(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply the overrides that were given
    pub fn apply(&self, config: &mut GatewayConfig) -> Result<(), ConfigError> {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(secret) = &self.secret_key {
            config.auth.secret_key = Some(secret.clone());
        }
        if let Some(algorithm) = &self.algorithm {
            config.auth.algorithm = algorithm.parse().map_err(ConfigError::ValidationError)?;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(json) = self.log_json {
            config.logging.json_format = json;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::models::JwtAlgorithm;

    #[test]
    fn test_overrides_applied() {
        let cli = Cli::try_parse_from([
            "lite-gateway",
            "--port",
            "9000",
            "--secret-key",
            "s3cret",
            "--algorithm",
            "hs512",
            "--log-json",
            "true",
        ])
        .unwrap();

        let mut config = GatewayConfig::default();
        cli.apply(&mut config).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.auth.secret_key.as_deref(), Some("s3cret"));
        assert_eq!(config.auth.algorithm, JwtAlgorithm::HS512);
        assert!(config.logging.json_format);
    }

    #[test]
    fn test_unsupported_algorithm_rejected() {
        let cli = Cli {
            algorithm: Some("RS256".to_string()),
            ..Cli::default()
        };
        let err = cli.apply(&mut GatewayConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_missing_secret_fails_validation() {
        let cli = Cli::default();
        assert!(cli.load_config().is_err());

        let cli = Cli {
            secret_key: Some("x".to_string()),
            ..Cli::default()
        };
        assert!(cli.load_config().is_ok());
    }
}
