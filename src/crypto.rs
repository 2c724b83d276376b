//! AES-256-GCM framing for the handshake and encrypted request/response bodies.
//!
//! Wire form is three base64 fields: a 12-byte `iv`, the `ciphertext`, and the
//! 16-byte GCM `tag`, with the tag split off the end of the cipher output.

use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::CryptoError;

/// Size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of the GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// AES-256 key derived from the project secret.
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKey([u8; KEY_SIZE]);

impl SymmetricKey {
    /// `SHA-256(secret)`.
    pub fn derive(secret: &str) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(GenericArray::from_slice(&self.0))
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey([REDACTED])")
    }
}

/// An encrypted JSON document as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPayload {
    pub iv: String,
    pub ciphertext: String,
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_name: Option<String>,
}

impl EncryptedPayload {
    /// Recognize an encrypted envelope inside an arbitrary JSON response.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        if !(obj.contains_key("iv") && obj.contains_key("ciphertext") && obj.contains_key("tag")) {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }
}

/// Encrypt `plaintext` with a fresh random nonce.
pub fn encrypt(key: &SymmetricKey, plaintext: &[u8]) -> Result<(String, String, String), CryptoError> {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce);

    let sealed = key
        .cipher()
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| CryptoError::Cipher)?;

    if sealed.len() < TAG_SIZE {
        return Err(CryptoError::InvalidLength {
            field: "sealed",
            len: sealed.len(),
        });
    }
    let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_SIZE);

    Ok((
        STANDARD.encode(nonce),
        STANDARD.encode(ciphertext),
        STANDARD.encode(tag),
    ))
}

/// Serialize `value` and encrypt it into an [`EncryptedPayload`].
///
/// `project_id` and `screen_name` ride alongside in clear so the server can
/// pick the key before decrypting.
pub fn encrypt_json<T: Serialize>(
    key: &SymmetricKey,
    value: &T,
    project_id: Option<&str>,
    screen_name: Option<&str>,
) -> Result<EncryptedPayload, CryptoError> {
    let plaintext = serde_json::to_vec(value)?;
    let (iv, ciphertext, tag) = encrypt(key, &plaintext)?;
    Ok(EncryptedPayload {
        iv,
        ciphertext,
        tag,
        project_id: project_id.map(str::to_string),
        screen_name: screen_name.map(str::to_string),
    })
}

/// Decrypt a payload back into raw bytes, verifying the tag.
pub fn decrypt(key: &SymmetricKey, payload: &EncryptedPayload) -> Result<Vec<u8>, CryptoError> {
    let iv = decode_field("iv", &payload.iv)?;
    if iv.len() != NONCE_SIZE {
        return Err(CryptoError::InvalidLength {
            field: "iv",
            len: iv.len(),
        });
    }
    let mut sealed = decode_field("ciphertext", &payload.ciphertext)?;
    let tag = decode_field("tag", &payload.tag)?;
    if tag.len() != TAG_SIZE {
        return Err(CryptoError::InvalidLength {
            field: "tag",
            len: tag.len(),
        });
    }
    sealed.extend_from_slice(&tag);

    key.cipher()
        .decrypt(Nonce::from_slice(&iv), sealed.as_slice())
        .map_err(|_| CryptoError::Cipher)
}

/// Decrypt a payload and parse the plaintext as JSON.
pub fn decrypt_json(key: &SymmetricKey, payload: &EncryptedPayload) -> Result<Value, CryptoError> {
    let plaintext = decrypt(key, payload)?;
    Ok(serde_json::from_slice(&plaintext)?)
}

fn decode_field(field: &'static str, text: &str) -> Result<Vec<u8>, CryptoError> {
    STANDARD
        .decode(text)
        .map_err(|source| CryptoError::Base64 { field, source })
}
