//! Detached CMS/PKCS#7 SignedData construction.
//!
//! Building happens in two phases. [`build_signed_data`] assembles every part
//! of the structure and asks the signer for its signature, which may come back
//! as a pending future. [`UnresolvedSignedData::resolve`] then awaits each
//! pending value once and yields a complete [`SignedData`].
//!
//! Layout of the produced structure (RFC 5652):
//!
//! ```text
//! ContentInfo {
//!   contentType: id-signedData,
//!   content: SignedData {
//!     version: 1,
//!     digestAlgorithms: { sha256 },
//!     encapContentInfo: { id-data }            -- detached, no eContent
//!     certificates: [chain...],
//!     signerInfos: { SignerInfo {
//!       sid: issuerAndSerialNumber,
//!       signedAttrs: { contentType, signingTime, messageDigest },
//!       signatureAlgorithm: rsaEncryption,
//!       signature: RSA(SHA-256(DER(signedAttrs)))
//!     } }
//!   }
//! }
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use cms::cert::{CertificateChoices, IssuerAndSerialNumber};
use cms::content_info::{CmsVersion, ContentInfo};
use cms::signed_data::{
    CertificateSet, EncapsulatedContentInfo, SignedData, SignerIdentifier, SignerInfo, SignerInfos,
};
use der::asn1::{GeneralizedTime, ObjectIdentifier, OctetString, SetOfVec, UtcTime};
use der::{Any, Encode};
use spki::AlgorithmIdentifierOwned;
use x509_cert::attr::{Attribute, Attributes};
use x509_cert::time::Time;

use super::signers::{SignatureValue, Signer};
use super::types::{DigestAlgorithm, SignatureScheme};
use crate::error::{Error, Result};

/// id-data
pub const OID_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");
/// id-signedData
pub const OID_SIGNED_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");
/// id-contentType
pub const OID_CONTENT_TYPE: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.3");
/// id-messageDigest
pub const OID_MESSAGE_DIGEST: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");
/// id-signingTime
pub const OID_SIGNING_TIME: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.5");
/// rsaEncryption
pub const OID_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

const DIGEST_ALGORITHM: DigestAlgorithm = DigestAlgorithm::Sha256;

/// A SignerInfo whose signature may still be pending.
struct PendingSignerInfo {
    sid: SignerIdentifier,
    signed_attrs: Attributes,
    signature: SignatureValue,
}

/// SignedData with every field set except the settled signature values.
pub struct UnresolvedSignedData {
    certificates: CertificateSet,
    signers: Vec<PendingSignerInfo>,
}

impl UnresolvedSignedData {
    /// Number of signer infos still waiting on a remote signature.
    pub fn pending_count(&self) -> usize {
        self.signers.iter().filter(|s| s.signature.is_pending()).count()
    }

    /// Await every pending signature and assemble the final structure.
    pub async fn resolve(self) -> Result<SignedData> {
        let mut signer_infos = Vec::with_capacity(self.signers.len());
        for pending in self.signers {
            let signature = pending.signature.resolve().await?;
            signer_infos.push(SignerInfo {
                version: CmsVersion::V1,
                sid: pending.sid,
                digest_alg: digest_algorithm_identifier(),
                signed_attrs: Some(pending.signed_attrs),
                signature_algorithm: AlgorithmIdentifierOwned {
                    oid: OID_RSA_ENCRYPTION,
                    parameters: Some(Any::null()),
                },
                signature: OctetString::new(signature)?,
                unsigned_attrs: None,
            });
        }

        Ok(SignedData {
            version: CmsVersion::V1,
            digest_algorithms: SetOfVec::try_from(vec![digest_algorithm_identifier()])?,
            encap_content_info: EncapsulatedContentInfo {
                econtent_type: OID_DATA,
                econtent: None,
            },
            certificates: Some(self.certificates),
            crls: None,
            signer_infos: SignerInfos(SetOfVec::try_from(signer_infos)?),
        })
    }
}

fn digest_algorithm_identifier() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: DIGEST_ALGORITHM.oid(),
        parameters: Some(Any::null()),
    }
}

/// Build a detached SignedData over `content` and request its signature.
pub fn build_signed_data(
    content: &[u8],
    signer: &dyn Signer,
    signing_time: DateTime<Utc>,
) -> Result<UnresolvedSignedData> {
    let mut certificates: Vec<CertificateChoices> = Vec::new();
    for cert in signer.certificate_chain() {
        let choice = CertificateChoices::Certificate(cert.clone());
        if !certificates.contains(&choice) {
            certificates.push(choice);
        }
    }
    let certificates = CertificateSet(SetOfVec::try_from(certificates)?);

    let cert = signer.certificate();
    let sid = SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
        issuer: cert.tbs_certificate.issuer.clone(),
        serial_number: cert.tbs_certificate.serial_number.clone(),
    });

    let message_digest = DIGEST_ALGORITHM.digest(content);
    let signed_attrs = signed_attributes(&message_digest, signing_time)?;

    let to_be_signed = DIGEST_ALGORITHM.digest(&signed_attrs.to_der()?);
    let signature = signer
        .key()
        .sign(&to_be_signed, DIGEST_ALGORITHM, SignatureScheme::Pkcs1v15)?;
    log::debug!(
        "Built SignedData with {} certificates, signature {}",
        certificates.0.len(),
        if signature.is_pending() { "pending" } else { "settled" }
    );

    Ok(UnresolvedSignedData {
        certificates,
        signers: vec![PendingSignerInfo {
            sid,
            signed_attrs,
            signature,
        }],
    })
}

fn signed_attributes(message_digest: &[u8], signing_time: DateTime<Utc>) -> Result<Attributes> {
    let attributes = vec![
        attribute(OID_CONTENT_TYPE, Any::encode_from(&OID_DATA)?)?,
        attribute(OID_SIGNING_TIME, Any::encode_from(&asn1_time(signing_time)?)?)?,
        attribute(
            OID_MESSAGE_DIGEST,
            Any::encode_from(&OctetString::new(message_digest)?)?,
        )?,
    ];
    Ok(SetOfVec::try_from(attributes)?)
}

fn attribute(oid: ObjectIdentifier, value: Any) -> Result<Attribute> {
    Ok(Attribute {
        oid,
        values: SetOfVec::try_from(vec![value])?,
    })
}

/// UTCTime up to 2049, GeneralizedTime after.
fn asn1_time(time: DateTime<Utc>) -> Result<Time> {
    let seconds = u64::try_from(time.timestamp()).map_err(|_| {
        Error::SignatureEncoding(format!("signing time {} predates 1970", time))
    })?;
    let since_epoch = Duration::from_secs(seconds);
    match UtcTime::from_unix_duration(since_epoch) {
        Ok(utc) => Ok(Time::UtcTime(utc)),
        Err(_) => Ok(Time::GeneralTime(GeneralizedTime::from_unix_duration(since_epoch)?)),
    }
}

/// DER encoding of `ContentInfo(id-signedData, signed_data)`.
pub fn encode_content_info(signed_data: &SignedData) -> Result<Vec<u8>> {
    let content_info = ContentInfo {
        content_type: OID_SIGNED_DATA,
        content: Any::encode_from(signed_data)?,
    };
    Ok(content_info.to_der()?)
}

/// Build, resolve and encode a detached signature over `content`.
pub async fn create_detached_signature(
    content: &[u8],
    signer: &dyn Signer,
    signing_time: DateTime<Utc>,
) -> Result<Vec<u8>> {
    let unresolved = build_signed_data(content, signer, signing_time)?;
    if unresolved.pending_count() > 0 {
        log::info!("Waiting for {} remote signature(s)", unresolved.pending_count());
    }
    let signed_data = unresolved.resolve().await?;
    let der = encode_content_info(&signed_data)?;
    log::debug!("Encoded CMS signature: {} bytes", der.len());
    Ok(der)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use der::Decode;

    #[test]
    fn test_signing_time_uses_utc_time_before_2050() {
        let time = Utc.with_ymd_and_hms(2024, 5, 17, 12, 30, 0).unwrap();
        assert!(matches!(asn1_time(time).unwrap(), Time::UtcTime(_)));
    }

    #[test]
    fn test_signing_time_uses_generalized_time_after_2049() {
        let time = Utc.with_ymd_and_hms(2050, 1, 1, 0, 0, 0).unwrap();
        assert!(matches!(asn1_time(time).unwrap(), Time::GeneralTime(_)));
    }

    #[test]
    fn test_signing_time_before_epoch_fails() {
        let time = Utc.with_ymd_and_hms(1960, 1, 1, 0, 0, 0).unwrap();
        assert!(matches!(asn1_time(time), Err(Error::SignatureEncoding(_))));
    }

    #[test]
    fn test_signed_attributes_contents() {
        let digest = DigestAlgorithm::Sha256.digest(b"hello");
        let time = Utc.with_ymd_and_hms(2024, 5, 17, 12, 30, 0).unwrap();
        let attrs = signed_attributes(&digest, time).unwrap();
        assert_eq!(attrs.len(), 3);

        let md = attrs
            .iter()
            .find(|a| a.oid == OID_MESSAGE_DIGEST)
            .expect("message digest attribute");
        let value = md.values.get(0).unwrap();
        let octets = OctetString::from_der(&value.to_der().unwrap()).unwrap();
        assert_eq!(octets.as_bytes(), digest.as_slice());

        let content_type = attrs.iter().find(|a| a.oid == OID_CONTENT_TYPE).unwrap();
        let oid = ObjectIdentifier::from_der(&content_type.values.get(0).unwrap().to_der().unwrap())
            .unwrap();
        assert_eq!(oid, OID_DATA);
    }

    #[test]
    fn test_attributes_encode_as_set() {
        let time = Utc.with_ymd_and_hms(2024, 5, 17, 12, 30, 0).unwrap();
        let attrs = signed_attributes(&[0u8; 32], time).unwrap();
        let der = attrs.to_der().unwrap();
        assert_eq!(der[0], 0x31);
    }
}
