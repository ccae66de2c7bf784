//! # Live Translate
//!
//! 已渲染文档的实时翻译层：识别需要翻译的正文，跳过标题、短代码和罗马音名字，
//! 分批调用翻译服务并原地写回，持续处理新插入的内容而不会重复翻译。
//!
//! ## 模块组织
//!
//! - `parsers` - HTML 解析、序列化以及活动文档
//! - `translation` - 分类、提取、批次、翻译引擎与控制器
//! - `env` - 类型安全的环境变量

pub mod env;
pub mod parsers;
pub mod translation;

// Re-export commonly used items for convenience
pub use parsers::*;
pub use translation::{install_overlay, LiveTranslator, OverlayHandle, TranslationConfig};
