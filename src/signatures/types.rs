//! Digital signature types and data structures.
//!
//! This module defines the caller-facing signing options, the digest and
//! padding algorithms understood by signers, and the fixed constants of the
//! placeholder format.

use der::asn1::ObjectIdentifier;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};

/// Bytes of DER signature capacity reserved in `/Contents` by default.
pub const DEFAULT_SIGNATURE_LENGTH: usize = 8192;

/// Largest signature capacity a placeholder may reserve (1 MiB of DER).
pub const MAXIMUM_SIGNATURE_LENGTH: usize = 1024 * 1024;

/// Token standing in for each unknown `/ByteRange` number until the file is laid out.
pub const BYTE_RANGE_PLACEHOLDER: &str = "**********";

/// Font size used when the caller gives none.
pub const DEFAULT_FONT_SIZE: f32 = 10.0;

/// Page margin used when the requested one is missing or out of range.
pub const DEFAULT_PAGE_MARGIN: f32 = 36.0;

/// Upper bound for a caller-supplied page margin.
pub const MAXIMUM_PAGE_MARGIN: f32 = 144.0;

/// Left padding between the signature rectangle and its text.
pub const SIGNATURE_LINE_HORIZONTAL_OFFSET: f32 = 5.0;

/// Top padding between the signature rectangle and the first text baseline.
pub const SIGNATURE_LINE_VERTICAL_OFFSET: f32 = 15.0;

/// Reason written when the caller gives none.
pub const DEFAULT_SIGNATURE_REASON: &str = "Digitally signed";

/// `/Filter` of the signature dictionary.
pub const SIGNATURE_FILTER: &str = "Adobe.PPKLite";

/// `/SubFilter` of the signature dictionary (PKCS#7 detached).
pub const SIGNATURE_SUB_FILTER: &str = "adbe.pkcs7.detached";

/// Digest algorithm used for signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestAlgorithm {
    /// SHA-1 (deprecated, but still common in legacy PDFs)
    Sha1,
    /// SHA-256 (recommended)
    #[default]
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl DigestAlgorithm {
    /// Get the OID for this digest algorithm.
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            DigestAlgorithm::Sha1 => ObjectIdentifier::new_unwrap("1.3.14.3.2.26"),
            DigestAlgorithm::Sha256 => ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1"),
            DigestAlgorithm::Sha384 => ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.2"),
            DigestAlgorithm::Sha512 => ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.3"),
        }
    }

    /// Get the name of this algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "SHA-1",
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha384 => "SHA-384",
            DigestAlgorithm::Sha512 => "SHA-512",
        }
    }

    /// Length of the digest output in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha384 => 48,
            DigestAlgorithm::Sha512 => 64,
        }
    }

    /// Hash `data` with this algorithm.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
            DigestAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            DigestAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            DigestAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

/// RSA signature padding scheme requested from a signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureScheme {
    /// RSASSA-PKCS1-v1_5
    #[default]
    Pkcs1v15,
    /// RSASSA-PSS
    Pss,
}

impl SignatureScheme {
    /// Get the name of this scheme.
    pub fn name(&self) -> &'static str {
        match self {
            SignatureScheme::Pkcs1v15 => "RSASSA-PKCS1-V1_5",
            SignatureScheme::Pss => "RSASSA-PSS",
        }
    }
}

fn default_signature_length() -> usize {
    DEFAULT_SIGNATURE_LENGTH
}

/// Options for signing a PDF.
///
/// Identity fields are written into the signature dictionary; the optional
/// placement fields decide whether the signature gets a visible appearance.
/// Deserializes from the camelCase `signatureOptions` block of the settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureOptions {
    /// Name of the signer
    pub name: String,
    /// Location where the document was signed
    pub location: String,
    /// Contact information
    pub contact: String,
    /// Reason for signing
    #[serde(default)]
    pub reason: Option<String>,
    /// Font size of the appearance text
    #[serde(default)]
    pub font_size: Option<f32>,
    /// Page to sign (1-based)
    #[serde(default)]
    pub page_number: Option<i64>,
    /// Minimum distance between the rectangle and the page edges
    #[serde(default)]
    pub page_margin: Option<f32>,
    /// Lower-left x of the signature rectangle
    #[serde(default)]
    pub x_position: Option<f32>,
    /// Lower-left y of the signature rectangle
    #[serde(default)]
    pub y_position: Option<f32>,
    /// Width of the signature rectangle
    #[serde(default)]
    pub width: Option<f32>,
    /// Height of the signature rectangle
    #[serde(default)]
    pub height: Option<f32>,
    /// DER bytes reserved for the signature in `/Contents`
    #[serde(default = "default_signature_length")]
    pub reserved_signature_size: usize,
}

impl SignatureOptions {
    /// Create options for an invisible signature.
    pub fn new(
        name: impl Into<String>,
        location: impl Into<String>,
        contact: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            contact: contact.into(),
            reason: None,
            font_size: None,
            page_number: None,
            page_margin: None,
            x_position: None,
            y_position: None,
            width: None,
            height: None,
            reserved_signature_size: DEFAULT_SIGNATURE_LENGTH,
        }
    }

    /// Set the reason for signing.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Request a visible signature rectangle at `(x, y)` of the given size.
    pub fn with_rect(mut self, x: f32, y: f32, width: f32, height: f32) -> Self {
        self.x_position = Some(x);
        self.y_position = Some(y);
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Set the page to sign (1-based).
    pub fn with_page(mut self, page_number: i64) -> Self {
        self.page_number = Some(page_number);
        self
    }

    /// Set the page margin.
    pub fn with_margin(mut self, margin: f32) -> Self {
        self.page_margin = Some(margin);
        self
    }

    /// Set the appearance font size.
    pub fn with_font_size(mut self, font_size: f32) -> Self {
        self.font_size = Some(font_size);
        self
    }

    /// Set the DER capacity reserved for the signature.
    pub fn with_reserved_size(mut self, bytes: usize) -> Self {
        self.reserved_signature_size = bytes;
        self
    }

    /// Reason to write, falling back to the default text.
    pub fn reason_or_default(&self) -> &str {
        self.reason.as_deref().unwrap_or(DEFAULT_SIGNATURE_REASON)
    }
}
