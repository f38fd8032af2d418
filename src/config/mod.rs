//! Configuration module for Socksrelay
//!
//! This module provides configuration types and parsing for the server.

mod server;
mod socks;

pub use server::{Config, ServerConfig, TcpConfig};
pub use socks::{AuthMethodKind, ResolverConfig, SocksConfig};

use anyhow::{anyhow, Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

    parse_config(&content)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config =
        toml::from_str(content).with_context(|| "Failed to parse configuration")?;
    config
        .validate()
        .map_err(|e| anyhow!(e))
        .with_context(|| "Invalid configuration")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config("").unwrap();
        assert_eq!(config.server.listen_addr(), "0.0.0.0:5001");
        assert_eq!(config.socks.auth_methods, vec![AuthMethodKind::None]);
        assert_eq!(config.resolver.address, "8.8.8.8:53".parse().unwrap());
    }

    #[test]
    fn test_parse_full_config() {
        let config_str = r#"
[server]
host = "127.0.0.1"
port = 1080

[server.tcp]
nodelay = false
keepalive_secs = 30
keepalive_interval = 10

[socks]
allow_socks4 = true
auth_methods = ["password", "none"]
username = "user"
password = "pass"
bind_timeout_ms = 5000

[resolver]
address = "1.1.1.1:53"
timeout_ms = 1500
"#;

        let config = parse_config(config_str).unwrap();
        assert_eq!(config.server.listen_addr(), "127.0.0.1:1080");
        assert!(!config.server.tcp.nodelay);
        assert_eq!(config.server.tcp.keepalive_secs, 30);
        assert!(config.socks.allow_socks4);
        assert_eq!(
            config.socks.auth_methods,
            vec![AuthMethodKind::Password, AuthMethodKind::None]
        );
        assert_eq!(config.socks.username, Some("user".to_string()));
        assert_eq!(config.socks.bind_timeout(), Duration::from_secs(5));
        assert_eq!(config.resolver.address, "1.1.1.1:53".parse().unwrap());
        assert_eq!(config.resolver.timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn test_parse_config_rejects_password_without_credentials() {
        let config_str = r#"
[socks]
auth_methods = ["password"]
"#;
        let err = parse_config(config_str).unwrap_err();
        assert!(format!("{:#}", err).contains("no credentials configured"));
    }

    #[test]
    fn test_parse_config_rejects_unknown_method() {
        let config_str = r#"
[socks]
auth_methods = ["gssapi"]
"#;
        assert!(parse_config(config_str).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 2080").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.port, 2080);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("/nonexistent/socksrelay.toml");
        assert!(result.is_err());
    }
}
