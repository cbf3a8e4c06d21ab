//! Signing pipeline.
//!
//! Stages run strictly in order: placeholder insertion, byte-range
//! resolution, CMS construction and signature placement. The only await point
//! is the signer's private-key operation.

use chrono::{DateTime, Utc};

use super::byterange::{place_signature, remove_trailing_newline, resolve_byte_range};
use super::cms::create_detached_signature;
use super::placeholder::insert_placeholder;
use super::signers::Signer;
use super::types::SignatureOptions;
use crate::error::{Error, Result};

/// Sign `unsigned` with `signer`, stamping the current time.
///
/// Returns the complete signed document. On failure nothing is returned.
///
/// # Example
///
/// ```ignore
/// use pdf_signet::signatures::{sign, PemSigner, SignatureOptions};
///
/// let signer = PemSigner::new(&key_pem, &chain_pem)?;
/// let options = SignatureOptions::new("Jane Doe", "Berlin", "jane@example.com");
/// let signed = sign(&pdf_bytes, &signer, &options).await?;
/// ```
pub async fn sign(unsigned: &[u8], signer: &dyn Signer, options: &SignatureOptions) -> Result<Vec<u8>> {
    sign_at(unsigned, signer, options, Utc::now()).await
}

/// Sign `unsigned` with an explicit signing time.
///
/// The same time is written to the signature dictionary, the visible
/// appearance and the CMS signing-time attribute.
pub async fn sign_at(
    unsigned: &[u8],
    signer: &dyn Signer,
    options: &SignatureOptions,
    signing_time: DateTime<Utc>,
) -> Result<Vec<u8>> {
    if unsigned.is_empty() {
        return Err(Error::InputValidation("the PDF document is empty".to_string()));
    }
    log::info!(
        "Signing {} byte document ({} signer)",
        unsigned.len(),
        if signer.is_async() { "async" } else { "sync" }
    );

    let with_placeholder = insert_placeholder(unsigned, options, signing_time)?;
    log::info!("Placeholder inserted, document is {} bytes", with_placeholder.len());

    let trimmed = remove_trailing_newline(with_placeholder)?;
    let resolved = resolve_byte_range(trimmed)?;
    log::info!("Byte range resolved: {:?}", resolved.byte_range);

    let signature = create_detached_signature(&resolved.signable, signer, signing_time).await?;
    log::info!("CMS signature created ({} bytes)", signature.len());

    let signed = place_signature(resolved, &signature)?;
    log::info!("Signature placed, signed document is {} bytes", signed.len());
    Ok(signed)
}
