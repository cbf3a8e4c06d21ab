//! PDF digital signatures.
//!
//! This module adds one detached CMS/PKCS#7 signature (`adbe.pkcs7.detached`)
//! to an unsigned PDF.
//!
//! ## Pipeline
//!
//! 1. **Layout**: decide page, rectangle and visibility from [`SignatureOptions`]
//! 2. **Placeholder**: add the signature field with a sentinel `/ByteRange`
//!    and a zero-filled `/Contents` slot, then rewrite the file
//! 3. **Byte range**: replace the sentinel with the real offsets and cut the
//!    slot out of the file to get the signable bytes
//! 4. **CMS**: build SignedData over the signable bytes, letting the
//!    [`Signer`] produce the signature (possibly asynchronously)
//! 5. **Placement**: hex-encode the DER signature into the slot
//!
//! The file length never changes after step 2.
//!
//! ## Signers
//!
//! - [`PemSigner`]: PEM private key plus certificate chain
//! - [`P12Signer`]: PKCS#12 container
//! - [`KeyVaultSigner`]: remote key, signing through a [`crate::keyvault`] client
//!
//! ## Example
//!
//! ```ignore
//! use pdf_signet::signatures::{sign, P12Signer, SignatureOptions};
//!
//! let signer = P12Signer::new(&std::fs::read("signer.p12")?, Some("password"))?;
//! let options = SignatureOptions::new("Jane Doe", "Berlin", "jane@example.com")
//!     .with_rect(50.0, 50.0, 200.0, 80.0);
//! let signed = sign(&std::fs::read("document.pdf")?, &signer, &options).await?;
//! ```
//!
//! ## PDF Specification Reference
//!
//! - ISO 32000-1:2008 Section 12.8 - Digital Signatures
//! - RFC 5652 - Cryptographic Message Syntax

mod byterange;
pub mod cms;
mod layout;
mod placeholder;
mod signer;
pub mod signers;
mod types;

pub use byterange::{
    place_signature, remove_trailing_newline, resolve_byte_range, ByteRangeCalculator,
    ResolvedPlaceholder,
};
pub use layout::{compute_layout, PageSize, PlaceholderLayout};
pub use placeholder::{
    appearance_content, appearance_lines, format_pdf_date, insert_placeholder, SentinelByteRange,
};
pub use signer::{sign, sign_at};
pub use signers::{
    KeyVaultSigner, LocalRsaKey, P12Signer, PemSigner, SignatureValue, Signer, SigningKey,
};
pub use types::{
    DigestAlgorithm, SignatureOptions, SignatureScheme, BYTE_RANGE_PLACEHOLDER,
    DEFAULT_FONT_SIZE, DEFAULT_PAGE_MARGIN, DEFAULT_SIGNATURE_LENGTH, DEFAULT_SIGNATURE_REASON,
    MAXIMUM_PAGE_MARGIN, MAXIMUM_SIGNATURE_LENGTH, SIGNATURE_FILTER, SIGNATURE_LINE_HORIZONTAL_OFFSET,
    SIGNATURE_LINE_VERTICAL_OFFSET, SIGNATURE_SUB_FILTER,
};
