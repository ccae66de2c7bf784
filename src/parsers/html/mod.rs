//! HTML解析和处理模块
//!
//! - `dom`: 基础DOM操作
//! - `serializer`: 序列化功能
//! - `live`: 活动文档与变更通知

pub mod dom;
pub mod live;
pub mod serializer;

pub use dom::{
    append_child, detach_node, find_nodes, get_node_attr, get_node_name, get_parent_element,
    get_parent_node, get_text, has_class, html_to_dom, is_ancestor_of, is_connected,
    parse_fragment, set_node_attr, set_text,
};
pub use live::{LiveDocument, MutationKind, MutationReceiver, MutationRecord, MutationSender};
pub use serializer::serialize_document;
