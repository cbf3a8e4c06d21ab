//! Signer backed by a PKCS#12 container.
//!
//! The container is read bag by bag rather than through a key-store view:
//! every certificate bag is a candidate for the signing certificate, and key
//! bags are used whether or not they carry a `localKeyId`.
//!
//! ```text
//! PFX { authSafe: Data(AuthenticatedSafe), macData? }
//! AuthenticatedSafe ::= SEQUENCE OF ContentInfo   -- Data | EncryptedData
//! SafeContents      ::= SEQUENCE OF SafeBag       -- certBag | keyBag | pkcs8ShroudedKeyBag
//! ```

use cms::content_info::ContentInfo;
use cms::encrypted_data::EncryptedData;
use der::asn1::{ContextSpecific, ObjectIdentifier, OctetString};
use der::{Any, Decode, Encode};
use hmac::Mac;
use pkcs12::cert_type::CertBag;
use pkcs12::kdf::{self, Pkcs12KeyType};
use pkcs12::mac_data::MacData;
use pkcs12::pbe_params::EncryptedPrivateKeyInfo;
use pkcs12::pfx::Pfx;
use pkcs12::safe_bag::SafeContents;
use pkcs12::{PKCS_12_CERT_BAG_OID, PKCS_12_KEY_BAG_OID, PKCS_12_PKCS8_KEY_BAG_OID, PKCS_12_X509_CERT_OID};
use pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use spki::AlgorithmIdentifierOwned;
use x509_cert::Certificate;

use super::{parse_der_certificate, LocalRsaKey, Signer, SigningKey};
use crate::error::{Error, Result};

const OID_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");
const OID_ENCRYPTED_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.6");
const OID_SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.26");
const OID_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");

/// Local signer loaded from a `.p12`/`.pfx` file.
#[derive(Debug)]
pub struct P12Signer {
    key: LocalRsaKey,
    chain: Vec<Certificate>,
    signing_cert: usize,
}

/// Raw contents of a container: certificate DERs in bag order and PKCS#8 key DERs.
#[derive(Debug, Default)]
struct P12Contents {
    certificates: Vec<Vec<u8>>,
    keys: Vec<Vec<u8>>,
}

impl P12Signer {
    /// Parse a PKCS#12 container. A missing password means the empty one.
    ///
    /// The chain keeps the order of the certificate bags in the file. The
    /// first key with a matching certificate anywhere in that chain wins.
    pub fn new(data: &[u8], password: Option<&str>) -> Result<Self> {
        let contents = read_container(data, password.unwrap_or(""))?;

        if contents.certificates.is_empty() {
            return Err(Error::SignerConfiguration(
                "No certificates found in the P12 file.".to_string(),
            ));
        }
        if contents.keys.is_empty() {
            return Err(Error::SignerConfiguration(
                "No private key found in the P12 file.".to_string(),
            ));
        }

        let chain = contents
            .certificates
            .iter()
            .map(|der| parse_der_certificate(der))
            .collect::<Result<Vec<_>>>()?;

        for der in &contents.keys {
            let key = match RsaPrivateKey::from_pkcs8_der(der) {
                Ok(key) => LocalRsaKey::new(key),
                Err(e) => {
                    log::warn!("Skipping unusable P12 private key: {}", e);
                    continue;
                },
            };
            if let Some(signing_cert) = key.find_certificate(&chain) {
                log::debug!(
                    "P12 signer ready: {} certificates, signing certificate at index {}",
                    chain.len(),
                    signing_cert
                );
                return Ok(Self {
                    key,
                    chain,
                    signing_cert,
                });
            }
        }

        Err(Error::SignerConfiguration(
            "No certificate in the P12 file matches its private key.".to_string(),
        ))
    }
}

fn unreadable(e: impl std::fmt::Display) -> Error {
    Error::SignerConfiguration(format!("Could not read the P12 file: {}", e))
}

fn read_container(data: &[u8], password: &str) -> Result<P12Contents> {
    let pfx = Pfx::from_der(data).map_err(unreadable)?;
    if pfx.auth_safe.content_type != OID_DATA {
        return Err(unreadable("authenticated safe is not plain data"));
    }
    if let Some(mac_data) = &pfx.mac_data {
        verify_mac(mac_data, password, pfx.auth_safe.content.value())?;
    }

    let safes = octet_string_content(&pfx.auth_safe.content)?;
    let safes = Vec::<ContentInfo>::from_der(&safes).map_err(unreadable)?;

    let mut contents = P12Contents::default();
    for safe in &safes {
        let bags = match safe.content_type {
            OID_DATA => octet_string_content(&safe.content)?,
            OID_ENCRYPTED_DATA => {
                let encrypted = EncryptedData::from_der(&safe.content.to_der()?).map_err(unreadable)?;
                match &encrypted.enc_content_info.encrypted_content {
                    Some(ciphertext) => decrypt(
                        &encrypted.enc_content_info.content_enc_alg,
                        ciphertext.as_bytes(),
                        password,
                    )?,
                    None => continue,
                }
            },
            other => {
                log::warn!("Skipping P12 safe with unsupported content type {}", other);
                continue;
            },
        };
        let bags = SafeContents::from_der(&bags).map_err(unreadable)?;
        collect_bags(bags, password, &mut contents)?;
    }

    log::trace!(
        "P12 container holds {} certificate bag(s) and {} key bag(s)",
        contents.certificates.len(),
        contents.keys.len()
    );
    Ok(contents)
}

fn collect_bags(bags: SafeContents, password: &str, contents: &mut P12Contents) -> Result<()> {
    for bag in bags {
        match bag.bag_id {
            PKCS_12_CERT_BAG_OID => {
                let cert_bag: ContextSpecific<CertBag> =
                    ContextSpecific::from_der(&bag.bag_value).map_err(unreadable)?;
                if cert_bag.value.cert_id != PKCS_12_X509_CERT_OID {
                    log::warn!("Skipping non-X.509 certificate bag");
                    continue;
                }
                push_unique(&mut contents.certificates, cert_bag.value.cert_value.as_bytes());
            },
            PKCS_12_PKCS8_KEY_BAG_OID => {
                let shrouded: ContextSpecific<EncryptedPrivateKeyInfo> =
                    ContextSpecific::from_der(&bag.bag_value).map_err(unreadable)?;
                let key = decrypt(
                    &shrouded.value.encryption_algorithm,
                    shrouded.value.encrypted_data.as_bytes(),
                    password,
                )?;
                contents.keys.push(key);
            },
            PKCS_12_KEY_BAG_OID => {
                let plain: ContextSpecific<Any> =
                    ContextSpecific::from_der(&bag.bag_value).map_err(unreadable)?;
                contents.keys.push(plain.value.to_der()?);
            },
            other => log::trace!("Ignoring P12 bag {}", other),
        }
    }
    Ok(())
}

fn octet_string_content(content: &Any) -> Result<Vec<u8>> {
    let octets = OctetString::from_der(&content.to_der()?).map_err(unreadable)?;
    Ok(octets.into_bytes())
}

fn decrypt(algorithm: &AlgorithmIdentifierOwned, ciphertext: &[u8], password: &str) -> Result<Vec<u8>> {
    let algorithm = algorithm.to_der()?;
    let scheme = pkcs5::EncryptionScheme::try_from(algorithm.as_slice()).map_err(|e| {
        Error::SignerConfiguration(format!("Unsupported P12 encryption scheme: {}", e))
    })?;
    scheme
        .decrypt(password.as_bytes(), ciphertext)
        .map_err(|e| Error::SignerConfiguration(format!("Could not decrypt the P12 file: {}", e)))
}

fn verify_mac(mac_data: &MacData, password: &str, content: &[u8]) -> Result<()> {
    let digest = mac_data.mac.digest.as_bytes();
    let verified = match mac_data.mac.algorithm.oid {
        OID_SHA1 => {
            let key = mac_key::<Sha1>(mac_data, password)?;
            let mut mac = hmac::Hmac::<Sha1>::new_from_slice(&key).map_err(unreadable)?;
            mac.update(content);
            mac.verify_slice(digest).is_ok()
        },
        OID_SHA256 => {
            let key = mac_key::<Sha256>(mac_data, password)?;
            let mut mac = hmac::Hmac::<Sha256>::new_from_slice(&key).map_err(unreadable)?;
            mac.update(content);
            mac.verify_slice(digest).is_ok()
        },
        other => {
            return Err(Error::SignerConfiguration(format!(
                "Unsupported P12 MAC algorithm {}",
                other
            )))
        },
    };

    if verified {
        Ok(())
    } else {
        Err(Error::SignerConfiguration(
            "The P12 password is incorrect or the file is corrupted.".to_string(),
        ))
    }
}

fn mac_key<D>(mac_data: &MacData, password: &str) -> Result<Vec<u8>>
where
    D: Digest + sha2::digest::FixedOutputReset + sha2::digest::core_api::BlockSizeUser,
{
    let key = kdf::derive_key_utf8::<D>(
        password,
        mac_data.mac_salt.as_bytes(),
        Pkcs12KeyType::Mac,
        mac_data.iterations,
        <D as Digest>::output_size(),
    )?;
    Ok(key)
}

fn push_unique(certificates: &mut Vec<Vec<u8>>, der: &[u8]) {
    if !certificates.iter().any(|existing| existing == der) {
        certificates.push(der.to_vec());
    }
}

impl Signer for P12Signer {
    fn is_async(&self) -> bool {
        false
    }

    fn certificate(&self) -> &Certificate {
        &self.chain[self.signing_cert]
    }

    fn certificate_chain(&self) -> &[Certificate] {
        &self.chain
    }

    fn key(&self) -> &dyn SigningKey {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_garbage() {
        let result = P12Signer::new(b"definitely not pkcs12", None);
        assert!(matches!(result, Err(Error::SignerConfiguration(_))));
    }

    #[test]
    fn test_push_unique_dedupes() {
        let mut certs = Vec::new();
        push_unique(&mut certs, b"a");
        push_unique(&mut certs, b"b");
        push_unique(&mut certs, b"a");
        assert_eq!(certs, vec![b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn test_empty_container_has_no_certificates() {
        let authenticated_safe = Vec::<ContentInfo>::new().to_der().unwrap();
        let pfx = Pfx {
            version: pkcs12::pfx::Version::V3,
            auth_safe: ContentInfo {
                content_type: OID_DATA,
                content: Any::encode_from(&OctetString::new(authenticated_safe).unwrap()).unwrap(),
            },
            mac_data: None,
        };
        match P12Signer::new(&pfx.to_der().unwrap(), None) {
            Err(Error::SignerConfiguration(msg)) => {
                assert_eq!(msg, "No certificates found in the P12 file.")
            },
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_scheme_is_reported() {
        let legacy = AlgorithmIdentifierOwned {
            // pbeWithSHAAnd3-KeyTripleDES-CBC
            oid: ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.1.3"),
            parameters: None,
        };
        match decrypt(&legacy, &[0u8; 16], "secret") {
            Err(Error::SignerConfiguration(msg)) => {
                assert!(msg.starts_with("Unsupported P12 encryption scheme"))
            },
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
