//! Signer backed by a PEM private key and certificate chain.

use pkcs1::DecodeRsaPrivateKey;
use pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;
use x509_cert::Certificate;

use super::{is_pem_private_key, parse_pem_chain, LocalRsaKey, Signer, SigningKey};
use crate::error::{Error, Result};

/// Local signer loaded from PEM text.
#[derive(Debug)]
pub struct PemSigner {
    key: LocalRsaKey,
    chain: Vec<Certificate>,
    signing_cert: usize,
}

impl PemSigner {
    /// Build a signer from a PEM private key and a PEM certificate chain.
    ///
    /// The key may be PKCS#8 (`PRIVATE KEY`) or PKCS#1 (`RSA PRIVATE KEY`).
    /// The chain is searched for the certificate whose public key matches.
    pub fn new(key_pem: &str, chain_pem: &str) -> Result<Self> {
        if !is_pem_private_key(key_pem) {
            return Err(Error::SignerConfiguration(
                "Invalid PEM format for the private key.".to_string(),
            ));
        }
        let key = parse_private_key(key_pem)?;
        let chain = parse_pem_chain(chain_pem)?;

        let key = LocalRsaKey::new(key);
        let signing_cert = key.find_certificate(&chain).ok_or_else(|| {
            Error::SignerConfiguration(
                "No certificate in the chain matches the private key.".to_string(),
            )
        })?;
        log::debug!(
            "PEM signer ready: {} certificates, signing certificate at index {}",
            chain.len(),
            signing_cert
        );

        Ok(Self {
            key,
            chain,
            signing_cert,
        })
    }
}

fn parse_private_key(pem: &str) -> Result<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|pkcs8_err| {
            RsaPrivateKey::from_pkcs1_pem(pem).map_err(|pkcs1_err| {
                Error::SignerConfiguration(format!(
                    "Could not parse the private key (PKCS#8: {}, PKCS#1: {})",
                    pkcs8_err, pkcs1_err
                ))
            })
        })
}

impl Signer for PemSigner {
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
