//! Error type for the tuya-lan crate.

/// Errors raised while talking to a device.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket-level failure (connect, read, write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The device credentials or address cannot be used.
    #[error("invalid device config: {0}")]
    InvalidConfig(String),
    /// A frame failed validation (prefix, length, checksum, suffix).
    #[error("malformed frame: {0}")]
    Frame(String),
    /// Encryption or decryption failed.
    #[error("crypto error: {0}")]
    Crypto(String),
    /// Session key negotiation was rejected or produced bad data.
    #[error("session negotiation failed: {0}")]
    Negotiation(String),
    /// The device acknowledged a command with a non-zero return code.
    #[error("device returned error code {code}")]
    Device { code: u32 },
    /// Command payload could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_device_code() {
        let e = Error::Device { code: 2 };
        assert_eq!(e.to_string(), "device returned error code 2");
    }

    #[test]
    fn io_error_converts() {
        fn inner() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"))?;
            Ok(())
        }
        let err = inner().unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("refused"));
    }
}
