//! Link Token - 限时链接令牌
//!
//! 令牌模块提供以下功能：
//! 1. 从运维提供的 secret 派生进程级对称密钥（SHA-256）
//! 2. 使用 AES-256-GCM 将 `{url, exp}` 载荷加密为 URL 安全的不透明字符串
//! 3. 解码令牌并校验其内嵌的绝对过期时间（Expiry Gate）
//!
//! 系统不保存任何令牌记录：链接所需的全部状态都在令牌本身。

pub mod codec;
pub mod error;
pub mod gate;
pub mod payload;
pub mod secret;

// Re-export commonly used items
pub use codec::{SEGMENT_SEPARATOR, TokenCodec};
pub use error::{TokenError, TokenResult};
pub use gate::{check, check_now, unix_now};
pub use payload::Payload;
pub use secret::{SecretSource, generate_secret};
