//! 活动文档与变更通知
//!
//! `LiveDocument` 模拟宿主页面：持有 DOM、页面地址以及变更通知通道。
//! 外部代码通过它插入、删除节点或改写文本，每一次结构变化都会生成
//! `MutationRecord`，同一 tick 内的记录在 `flush` 时作为一条通知送出。

use std::cell::RefCell;

use markup5ever_rcdom::{Handle, NodeData, RcDom};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use url::Url;

use super::dom::{append_child, detach_node, find_nodes, get_parent_node, parse_fragment, set_text};

/// 变更类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// 子节点增删
    ChildList,
    /// 文本内容变化
    CharacterData,
    /// 属性变化
    Attributes,
}

/// 单条变更记录
#[derive(Debug, Clone)]
pub struct MutationRecord {
    pub kind: MutationKind,
    /// 发生变化的节点
    pub target: Handle,
    /// 新插入的子树根节点
    pub added_nodes: Vec<Handle>,
}

impl MutationRecord {
    pub fn child_list(target: Handle, added_nodes: Vec<Handle>) -> Self {
        Self {
            kind: MutationKind::ChildList,
            target,
            added_nodes,
        }
    }

    pub fn character_data(target: Handle) -> Self {
        Self {
            kind: MutationKind::CharacterData,
            target,
            added_nodes: Vec::new(),
        }
    }
}

/// 变更通知发送端，每条消息是一个 tick 内的全部记录
pub type MutationSender = UnboundedSender<Vec<MutationRecord>>;
/// 变更通知接收端
pub type MutationReceiver = UnboundedReceiver<Vec<MutationRecord>>;

/// 宿主页面上的活动文档
pub struct LiveDocument {
    dom: RcDom,
    url: Option<Url>,
    feed: Option<MutationSender>,
    pending: RefCell<Vec<MutationRecord>>,
}

impl LiveDocument {
    /// 包装已解析的 DOM
    pub fn new(dom: RcDom, url: Option<Url>) -> Self {
        Self {
            dom,
            url,
            feed: None,
            pending: RefCell::new(Vec::new()),
        }
    }

    /// 从 HTML 字符串创建文档
    pub fn from_html(html: &str, url: Option<Url>) -> Self {
        Self::new(super::dom::html_to_dom(html.as_bytes(), "utf-8"), url)
    }

    /// 文档根节点
    pub fn document(&self) -> Handle {
        self.dom.document.clone()
    }

    /// 页面地址
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// `<body>` 元素，缺失时退回文档根节点
    pub fn body(&self) -> Handle {
        find_nodes(&self.dom.document, vec!["html", "body"])
            .into_iter()
            .next()
            .unwrap_or_else(|| self.dom.document.clone())
    }

    /// 订阅变更通知，只保留最后一个订阅者
    pub fn observe(&mut self) -> MutationReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.feed = Some(tx);
        rx
    }

    /// 关闭变更通知通道，未送出的记录被丢弃
    pub fn disconnect(&mut self) {
        self.pending.borrow_mut().clear();
        self.feed = None;
    }

    /// 解析 HTML 片段并追加到 `parent` 下，返回插入的根节点
    pub fn append_html(&self, parent: &Handle, html: &str) -> Vec<Handle> {
        let nodes = parse_fragment(html);
        for node in &nodes {
            append_child(parent, node);
        }
        self.record(MutationRecord::child_list(parent.clone(), nodes.clone()));
        nodes
    }

    /// 外部写入文本节点
    pub fn set_text(&self, node: &Handle, text: &str) {
        if set_text(node, text) {
            self.record(MutationRecord::character_data(node.clone()));
        }
    }

    /// 从文档中移除节点
    pub fn remove(&self, node: &Handle) {
        let parent = get_parent_node(node);
        detach_node(node);
        if let Some(parent) = parent {
            self.record(MutationRecord::child_list(parent, Vec::new()));
        }
    }

    /// 结束当前 tick，把积累的记录作为一条通知送出
    pub fn flush(&self) {
        let records: Vec<MutationRecord> = self.pending.borrow_mut().drain(..).collect();
        if records.is_empty() {
            return;
        }
        if let Some(feed) = &self.feed {
            if feed.send(records).is_err() {
                tracing::debug!("变更通知无人订阅，已丢弃");
            }
        }
    }

    /// `<body>` 下所有非空白文本节点的值，按文档顺序排列
    pub fn text_values(&self) -> Vec<String> {
        let mut values = Vec::new();
        collect_text_values(&self.body(), &mut values);
        values
    }

    fn record(&self, record: MutationRecord) {
        if self.feed.is_some() {
            self.pending.borrow_mut().push(record);
        }
    }
}

fn collect_text_values(node: &Handle, values: &mut Vec<String>) {
    if let NodeData::Text { contents } = &node.data {
        let text = contents.borrow();
        if !text.trim().is_empty() {
            values.push(text.to_string());
        }
        return;
    }
    for child in node.children.borrow().iter() {
        collect_text_values(child, values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_html_emits_child_list_on_flush() {
        let mut doc = LiveDocument::from_html("<main id=\"feed\"></main>", None);
        let mut rx = doc.observe();
        let main = find_nodes(&doc.document(), vec!["main"]).remove(0);

        let added = doc.append_html(&main, "<p>Loaded later</p>");
        assert_eq!(added.len(), 1);
        assert!(rx.try_recv().is_err(), "nothing is delivered before flush");

        doc.flush();
        let records = rx.try_recv().expect("one notification");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, MutationKind::ChildList);
        assert_eq!(records[0].added_nodes.len(), 1);
    }

    #[test]
    fn test_records_in_one_tick_are_grouped() {
        let mut doc = LiveDocument::from_html("<p>Old text here</p>", None);
        let mut rx = doc.observe();
        let body = doc.body();
        let p = find_nodes(&body, vec!["p"]).remove(0);
        let text = p.children.borrow()[0].clone();

        doc.set_text(&text, "Changed by host");
        doc.append_html(&body, "<p>More</p>");
        doc.flush();

        let records = rx.try_recv().expect("grouped notification");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, MutationKind::CharacterData);
        assert_eq!(doc.text_values(), vec!["Changed by host", "More"]);
    }

    #[test]
    fn test_unobserved_document_does_not_queue() {
        let doc = LiveDocument::from_html("<div></div>", None);
        doc.append_html(&doc.body(), "<p>Quiet</p>");
        assert!(doc.pending.borrow().is_empty());
        doc.flush();
    }

    #[tokio::test]
    async fn test_disconnect_closes_feed() {
        let mut doc = LiveDocument::from_html("<div></div>", None);
        let mut rx = doc.observe();
        doc.append_html(&doc.body(), "<p>Never sent</p>");
        doc.disconnect();
        doc.flush();
        assert!(rx.recv().await.is_none());
    }
}
