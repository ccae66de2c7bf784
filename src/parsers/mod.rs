//! # 解析器模块
//!
//! 文档边界：HTML解析、DOM操作、序列化以及活动文档的变更通知。
//!
//! # 模块组织
//!
//! - `html` - HTML文档解析、DOM操作、变更记录

pub mod html;

// Re-export commonly used items for convenience
pub use html::{html_to_dom, serialize_document, LiveDocument, MutationKind, MutationRecord};
