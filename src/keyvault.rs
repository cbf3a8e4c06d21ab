//! Key-custody boundary.
//!
//! The signing core never talks HTTP. An application supplies implementations
//! of [`KeyCustodyClient`] and [`CryptographyClient`] (for example over the
//! Azure Key Vault REST API) and the core drives them through these traits.
//! [`KeyVaultService::credential`] tells that client how to authenticate,
//! derived from the `azureKeyVault` settings.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::config::AzureKeyVaultConfig;
use crate::error::{BoxError, Error, Result};
use crate::signatures::{DigestAlgorithm, SignatureScheme};

/// Remote signing algorithm identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum KeyVaultAlgorithm {
    /// RSASSA-PKCS1-v1_5 with SHA-256
    RS256,
    /// RSASSA-PKCS1-v1_5 with SHA-384
    RS384,
    /// RSASSA-PKCS1-v1_5 with SHA-512
    RS512,
    /// RSASSA-PSS with SHA-256
    PS256,
    /// RSASSA-PSS with SHA-384
    PS384,
    /// RSASSA-PSS with SHA-512
    PS512,
}

impl KeyVaultAlgorithm {
    /// Map a digest algorithm and padding scheme to the remote identifier.
    ///
    /// Only the SHA-2 family is accepted by the remote service.
    pub fn from_digest(digest: DigestAlgorithm, scheme: SignatureScheme) -> Result<Self> {
        use KeyVaultAlgorithm::*;
        let pkcs1 = scheme == SignatureScheme::Pkcs1v15;
        match digest {
            DigestAlgorithm::Sha256 => Ok(if pkcs1 { RS256 } else { PS256 }),
            DigestAlgorithm::Sha384 => Ok(if pkcs1 { RS384 } else { PS384 }),
            DigestAlgorithm::Sha512 => Ok(if pkcs1 { RS512 } else { PS512 }),
            other => Err(Error::SignerConfiguration(format!(
                "Unsupported digest algorithm: {}",
                other.name()
            ))),
        }
    }

    /// Identifier as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyVaultAlgorithm::RS256 => "RS256",
            KeyVaultAlgorithm::RS384 => "RS384",
            KeyVaultAlgorithm::RS512 => "RS512",
            KeyVaultAlgorithm::PS256 => "PS256",
            KeyVaultAlgorithm::PS384 => "PS384",
            KeyVaultAlgorithm::PS512 => "PS512",
        }
    }
}

impl fmt::Display for KeyVaultAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to a remote key that can sign digests.
pub trait CryptographyClient: Send + Sync {
    /// Identifier of the remote key. Empty means the handle is unusable.
    fn key_id(&self) -> &str;

    /// Sign a precomputed digest with the remote key.
    fn sign_digest<'a>(
        &'a self,
        algorithm: KeyVaultAlgorithm,
        digest: &'a [u8],
    ) -> BoxFuture<'a, std::result::Result<Vec<u8>, BoxError>>;
}

/// A certificate as stored in the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyVaultCertificate {
    /// Certificate name in the vault
    pub name: String,
    /// DER encoding of the certificate
    pub cer: Vec<u8>,
}

/// Remote store of certificates, secrets and keys.
pub trait KeyCustodyClient: Send + Sync {
    /// Fetch a certificate by name.
    fn get_certificate<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, std::result::Result<KeyVaultCertificate, BoxError>>;

    /// Fetch a PEM certificate chain stored as a secret.
    fn get_certificate_chain<'a>(
        &'a self,
        secret_name: &'a str,
    ) -> BoxFuture<'a, std::result::Result<String, BoxError>>;

    /// Obtain a signing handle for the key with the given name.
    fn get_cryptography_client<'a>(
        &'a self,
        key_name: &'a str,
    ) -> BoxFuture<'a, std::result::Result<Arc<dyn CryptographyClient>, BoxError>>;
}

/// How the application's custody client should authenticate against the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultCredential {
    /// Client certificate file for a service principal
    ClientCertificate {
        /// Directory tenant
        tenant_id: String,
        /// Application id
        client_id: String,
        /// Path of the client certificate
        certificate_file: String,
    },
    /// Client secret for a service principal
    ClientSecret {
        /// Directory tenant
        tenant_id: String,
        /// Application id
        client_id: String,
        /// Shared secret
        client_secret: String,
    },
    /// Whatever the environment provides
    Default,
}

impl VaultCredential {
    /// Short label for logs; never includes secrets.
    pub fn kind(&self) -> &'static str {
        match self {
            VaultCredential::ClientCertificate { .. } => "client certificate",
            VaultCredential::ClientSecret { .. } => "client secret",
            VaultCredential::Default => "default",
        }
    }

    /// Pick a credential from the vault settings.
    ///
    /// A client certificate wins over a client secret; without either the
    /// ambient environment credential is used.
    pub fn from_config(config: &AzureKeyVaultConfig) -> Self {
        let principal = !config.tenant_id.is_empty() && !config.client_id.is_empty();
        match (&config.client_certificate_file, &config.client_secret) {
            (Some(file), _) if principal && !file.is_empty() => VaultCredential::ClientCertificate {
                tenant_id: config.tenant_id.clone(),
                client_id: config.client_id.clone(),
                certificate_file: file.clone(),
            },
            (_, Some(secret)) if principal && !secret.is_empty() => VaultCredential::ClientSecret {
                tenant_id: config.tenant_id.clone(),
                client_id: config.client_id.clone(),
                client_secret: secret.clone(),
            },
            _ => VaultCredential::Default,
        }
    }
}

/// Vault operations needed for signing, bound to one configured certificate.
pub struct KeyVaultService {
    config: AzureKeyVaultConfig,
    client: Arc<dyn KeyCustodyClient>,
}

impl KeyVaultService {
    /// Bind a custody client to the vault settings.
    pub fn new(config: AzureKeyVaultConfig, client: Arc<dyn KeyCustodyClient>) -> Self {
        log::debug!(
            "Key vault service for {} using {} credential",
            config.vault_url(),
            VaultCredential::from_config(&config).kind()
        );
        Self { config, client }
    }

    /// Credential the custody client should use for this vault.
    pub fn credential(&self) -> VaultCredential {
        VaultCredential::from_config(&self.config)
    }

    /// The vault settings.
    pub fn config(&self) -> &AzureKeyVaultConfig {
        &self.config
    }

    /// Fetch the configured certificate.
    pub async fn get_certificate_with_policy(&self) -> Result<KeyVaultCertificate> {
        self.client
            .get_certificate(&self.config.certificate_name)
            .await
            .map_err(|source| Error::RemoteSigner {
                message: "Could not get the certificate with policy.".to_string(),
                source,
            })
    }

    /// Fetch the PEM chain stored under the configured secret name.
    pub async fn get_certificate_full_chain(&self) -> Result<String> {
        let secret_name = self
            .config
            .certificate_full_chain_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                Error::SignerConfiguration(
                    "The name of the certificate chain secret is not set.".to_string(),
                )
            })?;

        let chain = self
            .client
            .get_certificate_chain(secret_name)
            .await
            .map_err(|source| Error::RemoteSigner {
                message: "Could not get the full certificate chain.".to_string(),
                source,
            })?;
        if chain.trim().is_empty() {
            return Err(Error::SignerConfiguration(
                "Could not get the certificate data.".to_string(),
            ));
        }
        Ok(chain)
    }

    /// Obtain a signing handle for the configured certificate's key.
    pub async fn get_cryptography_client(&self) -> Result<Arc<dyn CryptographyClient>> {
        let client = self
            .client
            .get_cryptography_client(&self.config.certificate_name)
            .await
            .map_err(|source| Error::RemoteSigner {
                message: "Could not get the cryptography client.".to_string(),
                source,
            })?;
        if client.key_id().is_empty() {
            return Err(Error::SignerConfiguration(
                "Could not get the cryptography key.".to_string(),
            ));
        }
        Ok(client)
    }
}

impl fmt::Debug for KeyVaultService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyVaultService")
            .field("vault_url", &self.config.vault_url())
            .field("certificate_name", &self.config.certificate_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AzureKeyVaultConfig {
        AzureKeyVaultConfig {
            vault_name: "contoso".to_string(),
            tenant_id: "tenant".to_string(),
            client_id: "client".to_string(),
            client_secret: None,
            client_certificate_file: None,
            certificate_name: "signing".to_string(),
            certificate_full_chain_name: None,
        }
    }

    #[test]
    fn test_algorithm_mapping() {
        let cases = [
            (DigestAlgorithm::Sha256, SignatureScheme::Pkcs1v15, "RS256"),
            (DigestAlgorithm::Sha384, SignatureScheme::Pkcs1v15, "RS384"),
            (DigestAlgorithm::Sha512, SignatureScheme::Pkcs1v15, "RS512"),
            (DigestAlgorithm::Sha256, SignatureScheme::Pss, "PS256"),
            (DigestAlgorithm::Sha384, SignatureScheme::Pss, "PS384"),
            (DigestAlgorithm::Sha512, SignatureScheme::Pss, "PS512"),
        ];
        for (digest, scheme, expected) in cases {
            let alg = KeyVaultAlgorithm::from_digest(digest, scheme).unwrap();
            assert_eq!(alg.as_str(), expected);
            assert_eq!(alg.to_string(), expected);
        }
    }

    #[test]
    fn test_sha1_rejected() {
        let result = KeyVaultAlgorithm::from_digest(DigestAlgorithm::Sha1, SignatureScheme::Pkcs1v15);
        match result {
            Err(Error::SignerConfiguration(msg)) => assert!(msg.contains("Unsupported digest")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_credential_selection() {
        let mut cfg = config();
        assert_eq!(VaultCredential::from_config(&cfg), VaultCredential::Default);

        cfg.client_secret = Some("s3cret".to_string());
        assert!(matches!(
            VaultCredential::from_config(&cfg),
            VaultCredential::ClientSecret { .. }
        ));

        cfg.client_certificate_file = Some("client.pem".to_string());
        assert!(matches!(
            VaultCredential::from_config(&cfg),
            VaultCredential::ClientCertificate { .. }
        ));

        cfg.tenant_id.clear();
        assert_eq!(VaultCredential::from_config(&cfg), VaultCredential::Default);
    }
}
