//! Error types for the signing library.
//!
//! Every stage of the signing pipeline fails with one of these variants. An
//! error is terminal for the operation that raised it: no partial output is
//! ever returned.

/// Result type alias for signing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error produced by an external collaborator (remote signer, key vault).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types that can occur while signing a document.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller input rejected before any work was done
    #[error("Invalid input: {0}")]
    InputValidation(String),

    /// The unsigned document could not be parsed
    #[error("Could not load the PDF document: {0}")]
    DocumentParse(String),

    /// The signature placeholder could not be added to the document
    #[error("Failed to build signature placeholder: {0}")]
    PlaceholderConstruction(String),

    /// The sentinel byte range or the reserved signature slot was not found
    #[error("Byte range resolution failed: {0}")]
    ByteRangeResolution(String),

    /// Key material or certificate chain is unusable
    #[error("Signer configuration error: {0}")]
    SignerConfiguration(String),

    /// The remote signer rejected or failed the request
    #[error("Remote signer error: {message}")]
    RemoteSigner {
        /// What the remote call was doing
        message: String,
        /// Error reported by the remote client
        #[source]
        source: BoxError,
    },

    /// The encoded signature does not fit the reserved slot
    #[error("Signature exceeds placeholder length: {required} > {available}")]
    Capacity {
        /// Hex characters needed by the signature
        required: usize,
        /// Hex characters reserved in the document
        available: usize,
    },

    /// CMS or DER encoding failed
    #[error("Signature encoding error: {0}")]
    SignatureEncoding(String),

    /// Application settings could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<der::Error> for Error {
    fn from(err: der::Error) -> Self {
        Error::SignatureEncoding(err.to_string())
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        Error::PlaceholderConstruction(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_error() {
        let err = Error::Capacity {
            required: 20000,
            available: 16384,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("20000"));
        assert!(msg.contains("16384"));
    }

    #[test]
    fn test_remote_signer_error_keeps_source() {
        use std::error::Error as _;

        let source: BoxError = "vault unreachable".into();
        let err = Error::RemoteSigner {
            message: "Error signing the digest in the Key Vault".to_string(),
            source,
        };
        assert!(format!("{}", err).contains("Key Vault"));
        let cause = err.source().expect("source should be preserved");
        assert_eq!(cause.to_string(), "vault unreachable");
    }

    #[test]
    fn test_byte_range_error() {
        let err = Error::ByteRangeResolution("no sentinel".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("Byte range"));
        assert!(msg.contains("no sentinel"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.pdf");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
