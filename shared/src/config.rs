use crate::error::ConfigError;
use crate::{DEFAULT_IP, DEFAULT_PORT};
use log::info;
use std::net::{IpAddr, SocketAddr};

/// Server address as typed by the user, parsed on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub ip: String,
    pub port: String,
}

impl NetworkConfig {
    pub fn new(ip: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            port: port.into(),
        }
    }

    /// Local development address, 127.0.0.1:55123.
    pub fn dev_default() -> Self {
        Self::new(DEFAULT_IP, DEFAULT_PORT.to_string())
    }

    /// Builds a config from optional command line values.
    ///
    /// Both values absent falls back to [`NetworkConfig::dev_default`]; only one
    /// of them present is an error.
    pub fn from_args(ip: Option<String>, port: Option<String>) -> Result<Self, ConfigError> {
        match (ip, port) {
            (Some(ip), Some(port)) => Ok(Self::new(ip, port)),
            (None, None) => {
                let config = Self::dev_default();
                info!(
                    "No server address given, using development default {}:{}",
                    config.ip, config.port
                );
                Ok(config)
            }
            _ => Err(ConfigError::Incomplete),
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .ip
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidIp(self.ip.clone()))?;
        let port: u16 = self
            .port
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidPort(self.port.clone()))?;
        Ok(SocketAddr::new(ip, port))
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::dev_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dev_default_address() {
        let addr = NetworkConfig::dev_default().socket_addr().unwrap();
        assert_eq!(addr, "127.0.0.1:55123".parse().unwrap());
    }

    #[test]
    fn test_parses_ipv6() {
        let addr = NetworkConfig::new("::1", "4000").socket_addr().unwrap();
        assert!(addr.is_ipv6());
        assert_eq!(addr.port(), 4000);
    }

    #[test]
    fn test_invalid_ip() {
        let err = NetworkConfig::new("not-an-ip", "55123")
            .socket_addr()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidIp(ip) if ip == "not-an-ip"));
    }

    #[test]
    fn test_invalid_port() {
        let err = NetworkConfig::new("127.0.0.1", "70000")
            .socket_addr()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort(_)));

        let err = NetworkConfig::new("127.0.0.1", "").socket_addr().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort(_)));
    }

    #[test]
    fn test_from_args() {
        assert_eq!(
            NetworkConfig::from_args(None, None).unwrap(),
            NetworkConfig::dev_default()
        );
        assert_eq!(
            NetworkConfig::from_args(Some("10.0.0.1".into()), Some("9000".into())).unwrap(),
            NetworkConfig::new("10.0.0.1", "9000")
        );
        assert!(matches!(
            NetworkConfig::from_args(Some("10.0.0.1".into()), None),
            Err(ConfigError::Incomplete)
        ));
    }
}
