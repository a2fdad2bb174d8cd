//! Reversible obfuscation of integer primary keys.
//!
//! Keys are encrypted with AES-256-CBC under a fixed key and IV, so the same
//! id always maps to the same token. That is enough to stop casual
//! enumeration of records; it is not confidentiality.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{PharmacyError, Result};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

pub const DEFAULT_KEY_SECRET: &str = "pharmacy back-office link obfuscation key v1";
pub const DEFAULT_IV_SECRET: &str = "pharmacy-link-iv";

const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;

#[derive(Clone)]
pub struct IdCodec {
    key: [u8; KEY_LEN],
    iv: [u8; IV_LEN],
}

impl std::fmt::Debug for IdCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdCodec").finish_non_exhaustive()
    }
}

impl Default for IdCodec {
    fn default() -> Self {
        Self::new(
            prefix::<KEY_LEN>(DEFAULT_KEY_SECRET.as_bytes()),
            prefix::<IV_LEN>(DEFAULT_IV_SECRET.as_bytes()),
        )
    }
}

fn prefix<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

impl IdCodec {
    pub fn new(key: [u8; KEY_LEN], iv: [u8; IV_LEN]) -> Self {
        Self { key, iv }
    }

    /// Derive key and IV from two secrets: the first 32 (resp. 16) bytes of
    /// their UTF-8 encoding. Shorter secrets are rejected.
    pub fn from_secrets(key_secret: &str, iv_secret: &str) -> Result<Self> {
        let key = key_secret.as_bytes();
        let iv = iv_secret.as_bytes();
        if key.len() < KEY_LEN {
            return Err(PharmacyError::KeyMaterial(format!(
                "key secret must be at least {KEY_LEN} bytes (got {})",
                key.len()
            )));
        }
        if iv.len() < IV_LEN {
            return Err(PharmacyError::KeyMaterial(format!(
                "IV secret must be at least {IV_LEN} bytes (got {})",
                iv.len()
            )));
        }
        Ok(Self::new(prefix(key), prefix(iv)))
    }

    /// Encode an id into a compact URL-safe token.
    pub fn encode(&self, id: i32) -> String {
        let cipher = self.seal(&id.to_le_bytes());
        STANDARD
            .encode(cipher)
            .replace('+', "-")
            .replace('/', "_")
            .trim_end_matches('=')
            .to_string()
    }

    /// Decode a token produced by [`IdCodec::encode`].
    pub fn decode(&self, token: &str) -> Result<i32> {
        let token = token.trim();
        if token.is_empty() {
            return Err(PharmacyError::IdFormat("empty token".to_string()));
        }

        let mut b64 = token.replace('-', "+").replace('_', "/");
        match b64.len() % 4 {
            2 => b64.push_str("=="),
            3 => b64.push('='),
            _ => {}
        }

        let cipher = STANDARD
            .decode(b64.as_bytes())
            .map_err(|e| PharmacyError::IdFormat(e.to_string()))?;

        let plain = Aes256CbcDec::new(&self.key.into(), &self.iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&cipher)
            .map_err(|_| PharmacyError::IdDecryption)?;

        let bytes: [u8; 4] = plain.as_slice().try_into().map_err(|_| {
            PharmacyError::IdFormat(format!(
                "decrypted id has {} bytes, expected 4",
                plain.len()
            ))
        })?;
        Ok(i32::from_le_bytes(bytes))
    }

    fn seal(&self, plain: &[u8]) -> Vec<u8> {
        Aes256CbcEnc::new(&self.key.into(), &self.iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plain)
    }
}
