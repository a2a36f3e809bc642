//! Error types for shardfs

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Protocol Errors ===
    #[error("Unknown opcode: {0}")]
    UnknownOpcode(String),

    #[error("String field too long: {0} bytes (max 65535)")]
    StringTooLong(usize),

    #[error("Invalid UTF-8 in string field")]
    InvalidUtf8,

    #[error("Invalid size: {0}")]
    InvalidSize(i64),

    #[error("Invalid count: {0}")]
    InvalidCount(i64),

    #[error("Invalid file name: {0:?}")]
    InvalidName(String),

    // === Storage Errors ===
    #[error("Not found: {0}")]
    NotFound(String),

    // === Network Errors ===
    #[error("Connection to {addr} failed: {source}")]
    ConnectionFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Shard {shard} on {addr} failed: {reason}")]
    ShardFailed {
        shard: String,
        addr: String,
        reason: String,
    },

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No storage nodes configured")]
    NoStorageNodes,

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl Error {
    /// Missing-file outcomes are reported to the caller, not treated as faults.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(_: std::string::FromUtf8Error) -> Self {
        Error::InvalidUtf8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(Error::NotFound("a.part1".into()).is_not_found());
        assert!(!Error::NoStorageNodes.is_not_found());

        let refused = Error::ConnectionFailed {
            addr: "127.0.0.1:1".into(),
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        };
        assert!(!refused.is_not_found());
    }

    #[test]
    fn test_display() {
        let err = Error::ShardFailed {
            shard: "report.txt.part2".into(),
            addr: "localhost:5002".into(),
            reason: "short write".into(),
        };
        assert_eq!(
            err.to_string(),
            "Shard report.txt.part2 on localhost:5002 failed: short write"
        );
    }
}
