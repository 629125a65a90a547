use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid server ip '{0}'")]
    InvalidIp(String),
    #[error("invalid server port '{0}'")]
    InvalidPort(String),
    #[error("server ip and port must be given together")]
    Incomplete,
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed packet: {0}")]
    Malformed(#[from] bincode::Error),
    #[error("non-finite value in field '{0}'")]
    NonFinite(&'static str),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
}
