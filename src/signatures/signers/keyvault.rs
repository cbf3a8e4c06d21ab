//! Signer whose private key stays in a remote key vault.

use std::fmt;
use std::sync::Arc;

use der::Encode;
use x509_cert::Certificate;

use super::{parse_pem_chain, SignatureValue, Signer, SigningKey};
use crate::error::{Error, Result};
use crate::keyvault::{CryptographyClient, KeyVaultAlgorithm, KeyVaultService};
use crate::signatures::types::{DigestAlgorithm, SignatureScheme};

/// Asynchronous signer delegating the private-key operation to a vault.
pub struct KeyVaultSigner {
    key: RemoteKey,
    chain: Vec<Certificate>,
}

struct RemoteKey {
    client: Arc<dyn CryptographyClient>,
}

impl KeyVaultSigner {
    /// Wrap a remote signing handle and the PEM chain of its certificate.
    ///
    /// The first certificate of the chain is the signing certificate.
    pub fn new(client: Arc<dyn CryptographyClient>, full_chain: &str) -> Result<Self> {
        if client.key_id().is_empty() {
            return Err(Error::SignerConfiguration(
                "Invalid cryptography client provided.".to_string(),
            ));
        }
        let chain = parse_pem_chain(full_chain)?;
        log::debug!(
            "Key vault signer for {} with {} certificates",
            client.key_id(),
            chain.len()
        );
        Ok(Self {
            key: RemoteKey { client },
            chain,
        })
    }

    /// Fetch everything the signer needs from the vault.
    ///
    /// Fails if the leaf of the stored chain is not the vault's certificate.
    pub async fn from_vault(service: &KeyVaultService) -> Result<Self> {
        let full_chain = service.get_certificate_full_chain().await?;
        let certificate = service.get_certificate_with_policy().await?;
        let client = service.get_cryptography_client().await?;

        let signer = Self::new(client, &full_chain)?;
        let leaf = signer.certificate().to_der()?;
        if leaf != certificate.cer {
            return Err(Error::SignerConfiguration(format!(
                "The certificate chain does not start with vault certificate '{}'",
                certificate.name
            )));
        }
        Ok(signer)
    }
}

impl Signer for KeyVaultSigner {
    fn is_async(&self) -> bool {
        true
    }

    fn certificate(&self) -> &Certificate {
        &self.chain[0]
    }

    fn certificate_chain(&self) -> &[Certificate] {
        &self.chain
    }

    fn key(&self) -> &dyn SigningKey {
        &self.key
    }
}

impl SigningKey for RemoteKey {
    fn sign(
        &self,
        digest: &[u8],
        algorithm: DigestAlgorithm,
        scheme: SignatureScheme,
    ) -> Result<SignatureValue> {
        let remote_algorithm = KeyVaultAlgorithm::from_digest(algorithm, scheme)?;
        let client = Arc::clone(&self.client);
        let digest = digest.to_vec();

        Ok(SignatureValue::Pending(Box::pin(async move {
            log::debug!("Signing {} digest with key {}", remote_algorithm, client.key_id());
            client
                .sign_digest(remote_algorithm, &digest)
                .await
                .map_err(|source| Error::RemoteSigner {
                    message: "Error signing the digest in the Key Vault".to_string(),
                    source,
                })
        })))
    }
}

impl fmt::Debug for KeyVaultSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyVaultSigner")
            .field("key_id", &self.key.client.key_id())
            .field("chain", &self.chain.len())
            .finish()
    }
}
