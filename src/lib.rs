// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::too_many_arguments)]
#![allow(clippy::enum_variant_names)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # PDF Signet
//!
//! Detached CMS/PKCS#7 signing for PDF documents.
//!
//! ## Core Features
//!
//! - **Signature placeholders**: visible (with an appearance stream) or invisible
//!   signature fields, placed by page, margin and rectangle
//! - **Byte ranges**: exact `/ByteRange` resolution without changing file length
//! - **CMS**: SignedData with content-type, signing-time and message-digest
//!   attributes, SHA-256, RSA PKCS#1 v1.5
//! - **Signers**: PEM key + chain, PKCS#12 containers, and remote key vaults
//!   whose private key never leaves the service
//!
//! ## Quick Start
//!
//! ```ignore
//! use pdf_signet::signatures::{sign, PemSigner, SignatureOptions};
//!
//! # async fn run() -> pdf_signet::Result<()> {
//! let key = std::fs::read_to_string("key.pem")?;
//! let chain = std::fs::read_to_string("fullchain.pem")?;
//! let signer = PemSigner::new(&key, &chain)?;
//!
//! let options = SignatureOptions::new("Jane Doe", "Berlin", "jane@example.com")
//!     .with_reason("Approved")
//!     .with_rect(50.0, 50.0, 200.0, 80.0);
//!
//! let signed = sign(&std::fs::read("document.pdf")?, &signer, &options).await?;
//! std::fs::write("document_signed.pdf", signed)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Error handling
pub mod error;

// Object-model access
pub mod document;

// Rectangles and points
pub mod geometry;

// Digital signatures
pub mod signatures;

// Remote key custody
pub mod keyvault;

// Configuration
pub mod config;

// Re-exports
pub use config::AppSettings;
pub use error::{Error, Result};
pub use signatures::{sign, sign_at, KeyVaultSigner, P12Signer, PemSigner, SignatureOptions, Signer};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        // VERSION is populated from CARGO_PKG_VERSION at compile time
        assert!(VERSION.starts_with("0."));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "pdf_signet");
    }
}
