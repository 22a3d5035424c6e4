//! # veilink
//!
//! 加密限时短链接服务：发放隐藏源站地址的链接，并在有效期内流式中继源站内容

pub mod service;

// Re-export commonly used types
pub use service::{RelayHttpService, ServiceManager};
pub use veilink_common::config::VeilinkConfig;
