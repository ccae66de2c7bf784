//! 文本收集器模块
//!
//! 按文档顺序深度优先遍历子树，产出可翻译的文本单元。
//! 结构性排除（排除标记、非正文容器）会剪掉整棵子树；
//! 单个文本的跳过（过短、短代码）不影响兄弟节点。

use markup5ever_rcdom::{Handle, NodeData};

use super::classifier::TextClassifier;
use crate::parsers::html::{get_text, is_connected, set_text};
use crate::translation::config::constants;

/// 文本单元：一个文本节点以及提取时的原文快照
#[derive(Debug, Clone)]
pub struct TextUnit {
    /// 文本节点本身，作为稳定身份
    pub node: Handle,
    /// 提取时捕获的原文
    pub original: String,
}

/// 写入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// 当前值已与原文不同
    Stale,
    /// 节点已离开文档
    Detached,
}

impl TextUnit {
    pub fn new(node: Handle, original: String) -> Self {
        Self { node, original }
    }

    /// 节点当前的文本值
    pub fn live_text(&self) -> Option<String> {
        get_text(&self.node)
    }

    /// 当前值是否已偏离原文快照
    pub fn is_stale(&self) -> bool {
        !is_connected(&self.node) || self.live_text().as_deref() != Some(self.original.as_str())
    }

    /// 仅当当前值仍等于原文快照时写入
    pub fn write_if_unchanged(&self, text: &str) -> WriteOutcome {
        if !is_connected(&self.node) {
            return WriteOutcome::Detached;
        }

        if self.live_text().as_deref() != Some(self.original.as_str()) {
            return WriteOutcome::Stale;
        }

        if set_text(&self.node, text) {
            WriteOutcome::Written
        } else {
            WriteOutcome::Stale
        }
    }
}

/// 收集统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionStats {
    pub nodes_visited: usize,
    pub subtrees_pruned: usize,
    pub text_nodes_found: usize,
    pub skipped_texts: usize,
    pub units_extracted: usize,
}

/// 文本收集器
pub struct TextCollector<'a> {
    classifier: &'a TextClassifier,
    max_depth: usize,
}

impl<'a> TextCollector<'a> {
    pub fn new(classifier: &'a TextClassifier, max_depth: usize) -> Self {
        Self {
            classifier,
            max_depth,
        }
    }

    /// 提取 `root` 下的可翻译文本
    pub fn extract(&self, root: &Handle) -> Vec<TextUnit> {
        self.extract_with_stats(root).0
    }

    /// 提取并返回统计信息
    pub fn extract_with_stats(&self, root: &Handle) -> (Vec<TextUnit>, CollectionStats) {
        let mut units = Vec::new();
        let mut stats = CollectionStats::default();

        if self.classifier.is_within_exclusion(root) {
            stats.subtrees_pruned += 1;
            tracing::debug!("扫描根节点位于排除区域内，跳过");
            return (units, stats);
        }

        self.collect_recursive(root, 0, &mut units, &mut stats);
        stats.units_extracted = units.len();

        tracing::debug!(
            "文本收集完成: 访问 {} 个节点, 剪枝 {} 棵子树, 产出 {} 个单元",
            stats.nodes_visited,
            stats.subtrees_pruned,
            stats.units_extracted
        );

        (units, stats)
    }

    fn collect_recursive(
        &self,
        node: &Handle,
        depth: usize,
        units: &mut Vec<TextUnit>,
        stats: &mut CollectionStats,
    ) {
        if depth > self.max_depth {
            return;
        }
        stats.nodes_visited += 1;

        match &node.data {
            NodeData::Text { contents } => {
                stats.text_nodes_found += 1;
                let original = contents.borrow().to_string();

                if self.classifier.should_skip(node) || !has_enough_chars(&original) {
                    stats.skipped_texts += 1;
                    return;
                }

                units.push(TextUnit::new(node.clone(), original));
            }
            NodeData::Element { .. } => {
                if self.classifier.is_structural_exclusion(node) {
                    stats.subtrees_pruned += 1;
                    return;
                }
                self.collect_children(node, depth, units, stats);
            }
            NodeData::Document => self.collect_children(node, depth, units, stats),
            _ => {}
        }
    }

    fn collect_children(
        &self,
        node: &Handle,
        depth: usize,
        units: &mut Vec<TextUnit>,
        stats: &mut CollectionStats,
    ) {
        for child in node.children.borrow().iter() {
            self.collect_recursive(child, depth + 1, units, stats);
        }
    }
}

fn has_enough_chars(text: &str) -> bool {
    text.trim().chars().count() >= constants::MIN_EXTRACT_CHARS
}
