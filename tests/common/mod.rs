//! Shared helpers for integration tests.

#![allow(dead_code)]

use cms::content_info::ContentInfo;
use cms::signed_data::SignedData;
use der::asn1::{ObjectIdentifier, OctetString};
use der::{Any, Decode, Encode, SliceReader};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use p12_keystore::{KeyStore, KeyStoreEntry, PrivateKeyChain};
use pdf_signet::signatures::{
    DigestAlgorithm, PemSigner, SignatureScheme, SignatureValue, Signer, SigningKey,
};
use pdf_signet::Result;
use pkcs12::cert_type::CertBag;
use pkcs12::pbe_params::EncryptedPrivateKeyInfo;
use pkcs12::pfx::{Pfx, Version};
use pkcs12::safe_bag::SafeBag;
use pkcs8::{DecodePrivateKey, EncodePrivateKey};
use rsa::RsaPrivateKey;
use spki::AlgorithmIdentifierOwned;
use x509_cert::Certificate;

pub const SIGNER_KEY: &str = include_str!("../fixtures/signer_key.pem");
pub const SIGNER_KEY_PKCS1: &str = include_str!("../fixtures/signer_key_pkcs1.pem");
pub const SIGNER_CERT: &str = include_str!("../fixtures/signer_cert.pem");
pub const OTHER_KEY: &str = include_str!("../fixtures/other_key.pem");
pub const OTHER_CERT: &str = include_str!("../fixtures/other_cert.pem");

/// Build an unsigned PDF with `pages` US Letter pages.
pub fn create_test_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut kids: Vec<Object> = Vec::new();
    for i in 0..pages {
        let content = format!("BT /F1 24 Tf 72 700 Td (Page {}) Tj ET", i + 1);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => pages as i64,
            "Kids" => kids,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save test PDF");
    out
}

pub fn pem_signer() -> PemSigner {
    PemSigner::new(SIGNER_KEY, SIGNER_CERT).expect("fixture PEM signer")
}

pub fn signer_certificate() -> Certificate {
    Certificate::load_pem_chain(SIGNER_CERT.as_bytes()).unwrap().remove(0)
}

pub fn other_certificate() -> Certificate {
    Certificate::load_pem_chain(OTHER_CERT.as_bytes()).unwrap().remove(0)
}

pub fn signer_private_key() -> RsaPrivateKey {
    RsaPrivateKey::from_pkcs8_pem(SIGNER_KEY).unwrap()
}

fn p12_certificate(cert: &Certificate) -> p12_keystore::Certificate {
    p12_keystore::Certificate::from_der(&cert.to_der().unwrap()).unwrap()
}

/// PKCS#12 container holding `key_pem` with `chain` as its certificates.
pub fn build_p12(key_pem: &str, chain: &[Certificate], password: &str) -> Vec<u8> {
    let key = RsaPrivateKey::from_pkcs8_pem(key_pem).unwrap();
    let key_der = key.to_pkcs8_der().unwrap();
    let entry = PrivateKeyChain::new(
        key_der.as_bytes(),
        b"signet-test-key",
        chain.iter().map(p12_certificate),
    );
    let mut store = KeyStore::new();
    store.add_entry("signer", KeyStoreEntry::PrivateKeyChain(entry));
    store.writer(password).write().unwrap()
}

/// PKCS#12 container with a trusted certificate and no key.
pub fn build_certificate_only_p12(cert: &Certificate, password: &str) -> Vec<u8> {
    let mut store = KeyStore::new();
    store.add_entry("ca", KeyStoreEntry::Certificate(p12_certificate(cert)));
    store.writer(password).write().unwrap()
}

/// A certBag holding `cert`, without bag attributes.
pub fn raw_cert_bag(cert: &Certificate) -> SafeBag {
    let bag = CertBag {
        cert_id: pkcs12::PKCS_12_X509_CERT_OID,
        cert_value: OctetString::new(cert.to_der().unwrap()).unwrap(),
    };
    SafeBag {
        bag_id: pkcs12::PKCS_12_CERT_BAG_OID,
        bag_value: bag.to_der().unwrap(),
        bag_attributes: None,
    }
}

/// A pkcs8ShroudedKeyBag for `key_pem`, PBES2-encrypted, without a localKeyId.
pub fn raw_shrouded_key_bag(key_pem: &str, password: &str) -> SafeBag {
    let key_der = RsaPrivateKey::from_pkcs8_pem(key_pem).unwrap().to_pkcs8_der().unwrap();
    let salt = [7u8; 16];
    let iv = [9u8; 16];
    let params = pkcs5::pbes2::Parameters::pbkdf2_sha256_aes256cbc(2048, &salt, &iv).unwrap();
    let encrypted = params.encrypt(password.as_bytes(), key_der.as_bytes()).unwrap();
    let info = EncryptedPrivateKeyInfo {
        encryption_algorithm: AlgorithmIdentifierOwned {
            oid: pkcs5::pbes2::PBES2_OID,
            parameters: Some(Any::from_der(&params.to_der().unwrap()).unwrap()),
        },
        encrypted_data: OctetString::new(encrypted).unwrap(),
    };
    SafeBag {
        bag_id: pkcs12::PKCS_12_PKCS8_KEY_BAG_OID,
        bag_value: info.to_der().unwrap(),
        bag_attributes: None,
    }
}

/// An unencrypted keyBag for `key_pem`.
pub fn raw_plain_key_bag(key_pem: &str) -> SafeBag {
    let key_der = RsaPrivateKey::from_pkcs8_pem(key_pem).unwrap().to_pkcs8_der().unwrap();
    SafeBag {
        bag_id: pkcs12::PKCS_12_KEY_BAG_OID,
        bag_value: key_der.as_bytes().to_vec(),
        bag_attributes: None,
    }
}

/// A PKCS#12 container with one plain-data safe holding `bags` and no MAC.
pub fn build_raw_p12(bags: Vec<SafeBag>) -> Vec<u8> {
    let data_oid = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");
    let safe_contents = bags.to_der().unwrap();
    let safe = ContentInfo {
        content_type: data_oid,
        content: Any::encode_from(&OctetString::new(safe_contents).unwrap()).unwrap(),
    };
    let authenticated_safe = vec![safe].to_der().unwrap();
    let pfx = Pfx {
        version: Version::V3,
        auth_safe: ContentInfo {
            content_type: data_oid,
            content: Any::encode_from(&OctetString::new(authenticated_safe).unwrap()).unwrap(),
        },
        mac_data: None,
    };
    pfx.to_der().unwrap()
}

/// Wraps a local signer and hands back every signature as a pending future.
pub struct DeferredSigner<S: Signer> {
    pub inner: S,
}

impl<S: Signer> Signer for DeferredSigner<S> {
    fn is_async(&self) -> bool {
        true
    }

    fn certificate(&self) -> &Certificate {
        self.inner.certificate()
    }

    fn certificate_chain(&self) -> &[Certificate] {
        self.inner.certificate_chain()
    }

    fn key(&self) -> &dyn SigningKey {
        self
    }
}

impl<S: Signer> SigningKey for DeferredSigner<S> {
    fn sign(
        &self,
        digest: &[u8],
        algorithm: DigestAlgorithm,
        scheme: SignatureScheme,
    ) -> Result<SignatureValue> {
        let settled = self.inner.key().sign(digest, algorithm, scheme)?;
        Ok(SignatureValue::Pending(Box::pin(async move { settled.resolve().await })))
    }
}

/// The signature dictionary of a signed document.
pub struct SignatureFields {
    pub byte_range: [usize; 4],
    pub contents: Vec<u8>,
    pub signature_id: ObjectId,
    pub widget_id: ObjectId,
}

pub fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap(),
        other => other,
    }
}

pub fn acro_form_fields(doc: &Document) -> Vec<ObjectId> {
    let catalog = doc.catalog().unwrap();
    let form = resolve(doc, catalog.get(b"AcroForm").unwrap()).as_dict().unwrap();
    resolve(doc, form.get(b"Fields").unwrap())
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f.as_reference().unwrap())
        .collect()
}

pub fn signature_fields(pdf: &[u8]) -> SignatureFields {
    let doc = Document::load_mem(pdf).expect("signed PDF parses");
    let fields = acro_form_fields(&doc);
    assert_eq!(fields.len(), 1, "exactly one signature field");
    let widget_id = fields[0];
    let widget = doc.get_dictionary(widget_id).unwrap();
    let signature_id = widget.get(b"V").unwrap().as_reference().unwrap();
    let sig = doc.get_dictionary(signature_id).unwrap();

    let range: Vec<usize> = sig
        .get(b"ByteRange")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_i64().unwrap() as usize)
        .collect();
    let contents = sig.get(b"Contents").unwrap().as_str().unwrap().to_vec();

    SignatureFields {
        byte_range: [range[0], range[1], range[2], range[3]],
        contents,
        signature_id,
        widget_id,
    }
}

/// Decode the CMS structure from a NUL-padded `/Contents` value.
pub fn decode_signed_data(contents: &[u8]) -> SignedData {
    let mut reader = SliceReader::new(contents).unwrap();
    let content_info = ContentInfo::decode(&mut reader).unwrap();
    assert_eq!(content_info.content_type, pdf_signet::signatures::cms::OID_SIGNED_DATA);
    SignedData::from_der(&content_info.content.to_der().unwrap()).unwrap()
}
