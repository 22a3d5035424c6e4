//! 令牌编解码
//!
//! 使用 AES-256-GCM 加密序列化后的载荷，密钥为 SHA-256(secret)。
//! 令牌格式: base64url(nonce[12]) "." base64url(ciphertext || tag[16])，无填充。

// Allow deprecated generic-array::from_slice until aes-gcm upgrades
#![allow(deprecated)]

use crate::error::{TokenError, TokenResult};
use crate::payload::Payload;
use crate::secret::SecretSource;
use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit, OsRng},
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::prelude::*;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// nonce 段与密文段之间的分隔符
pub const SEGMENT_SEPARATOR: char = '.';

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// 令牌编解码器
///
/// 进程启动时构造一次，之后只读共享。
#[derive(Clone)]
pub struct TokenCodec {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("cipher", &"AES-256-GCM")
            .finish()
    }
}

impl TokenCodec {
    /// 从 secret 原文派生密钥并创建编解码器
    pub fn from_secret(secret: &str) -> TokenResult<Self> {
        if secret.is_empty() {
            return Err(TokenError::Secret("Secret must not be empty".to_string()));
        }

        let key = Sha256::digest(secret.as_bytes());
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| TokenError::Secret(format!("Failed to create cipher: {e}")))?;

        Ok(Self { cipher })
    }

    /// 从 secret 来源创建编解码器
    pub fn from_source(source: &SecretSource) -> TokenResult<Self> {
        let secret = source.load()?;
        let codec = Self::from_secret(&secret)?;
        info!("Token key derived from {}", source);
        Ok(codec)
    }

    /// 加密载荷
    ///
    /// 每次调用都会生成新的随机 nonce，同一载荷两次加密的结果不同。
    pub fn encrypt(&self, payload: &Payload) -> TokenResult<String> {
        let plaintext =
            serde_json::to_vec(payload).map_err(|e| TokenError::Encode(e.to_string()))?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_slice())
            .map_err(|e| TokenError::Encode(format!("Encryption failed: {e}")))?;

        Ok(format!(
            "{}{}{}",
            URL_SAFE_NO_PAD.encode(nonce_bytes),
            SEGMENT_SEPARATOR,
            URL_SAFE_NO_PAD.encode(&ciphertext)
        ))
    }

    /// 解密令牌
    ///
    /// 所有失败（分段缺失、编码非法、认证失败、载荷格式错误）统一返回 [`TokenError::Decode`]，
    /// 具体原因只记录在 debug 日志中。
    pub fn decrypt(&self, token: &str) -> TokenResult<Payload> {
        let (nonce_segment, cipher_segment) = token
            .split_once(SEGMENT_SEPARATOR)
            .ok_or_else(|| decode_failure("missing segment separator"))?;

        if nonce_segment.is_empty() || cipher_segment.is_empty() {
            return Err(decode_failure("empty segment"));
        }

        let nonce_bytes = URL_SAFE_NO_PAD
            .decode(nonce_segment)
            .map_err(|e| decode_failure(&format!("invalid nonce encoding: {e}")))?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(decode_failure(&format!(
                "invalid nonce size: expected {NONCE_LEN} bytes, got {}",
                nonce_bytes.len()
            )));
        }

        let ciphertext = URL_SAFE_NO_PAD
            .decode(cipher_segment)
            .map_err(|e| decode_failure(&format!("invalid ciphertext encoding: {e}")))?;
        if ciphertext.len() <= TAG_LEN {
            return Err(decode_failure("ciphertext too short"));
        }

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_slice())
            .map_err(|_| decode_failure("authentication failed"))?;

        serde_json::from_slice(&plaintext)
            .map_err(|e| decode_failure(&format!("malformed payload: {e}")))
    }
}

fn decode_failure(reason: &str) -> TokenError {
    debug!("Token decode failed: {}", reason);
    TokenError::Decode
}
