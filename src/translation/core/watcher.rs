//! 文档变更监听
//!
//! 只关心新插入的子树。文本内容变化（包括引擎自己的写回）不会触发扫描，
//! 因此译文写入不会形成反馈循环。

use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use markup5ever_rcdom::{Handle, NodeData};
use tokio::task::JoinHandle;

use super::controller::{LiveTranslator, PassReport};
use crate::parsers::html::{is_ancestor_of, is_connected, MutationKind, MutationReceiver, MutationRecord};

/// 监听统计
#[derive(Debug, Default)]
pub struct WatcherStats {
    /// 收到的通知数（每个 tick 一条）
    pub notifications: AtomicUsize,
    /// 被忽略的非结构变更记录数
    pub records_ignored: AtomicUsize,
    /// 启动的局部扫描数
    pub passes_started: AtomicUsize,
}

impl WatcherStats {
    pub fn notifications(&self) -> usize {
        self.notifications.load(Ordering::Relaxed)
    }

    pub fn records_ignored(&self) -> usize {
        self.records_ignored.load(Ordering::Relaxed)
    }

    pub fn passes_started(&self) -> usize {
        self.passes_started.load(Ordering::Relaxed)
    }
}

/// 变更监听器
pub struct ChangeWatcher {
    translator: LiveTranslator,
    stats: WatcherStats,
}

impl ChangeWatcher {
    pub fn new(translator: LiveTranslator) -> Self {
        Self {
            translator,
            stats: WatcherStats::default(),
        }
    }

    /// 从记录中取出新插入的子树根节点
    ///
    /// 已离开文档的节点、重复节点以及嵌套在其他新根之下的节点都会被去掉。
    pub fn added_roots(records: &[MutationRecord]) -> Vec<Handle> {
        let candidates: Vec<Handle> = records
            .iter()
            .filter(|record| record.kind == MutationKind::ChildList)
            .flat_map(|record| record.added_nodes.iter().cloned())
            .filter(|node| matches!(node.data, NodeData::Element { .. } | NodeData::Text { .. }))
            .filter(is_connected)
            .collect();

        let mut roots: Vec<Handle> = Vec::with_capacity(candidates.len());
        for node in candidates {
            if roots.iter().any(|root| Rc::ptr_eq(root, &node) || is_ancestor_of(root, &node)) {
                continue;
            }
            roots.retain(|root| !is_ancestor_of(&node, root));
            roots.push(node);
        }
        roots
    }

    /// 处理一个 tick 内的变更记录
    ///
    /// 先为新元素子树打上排除标记，再对所有新根启动一次局部扫描。
    pub fn handle_records(&self, records: Vec<MutationRecord>) -> Option<JoinHandle<PassReport>> {
        self.stats.notifications.fetch_add(1, Ordering::Relaxed);

        let ignored = records
            .iter()
            .filter(|record| record.kind != MutationKind::ChildList)
            .count();
        self.stats.records_ignored.fetch_add(ignored, Ordering::Relaxed);

        let roots = Self::added_roots(&records);
        if roots.is_empty() {
            return None;
        }

        for root in &roots {
            if let NodeData::Element { .. } = root.data {
                self.translator.mark_exclusions(root);
            }
        }

        tracing::debug!("检测到 {} 个新插入的子树", roots.len());
        self.stats.passes_started.fetch_add(1, Ordering::Relaxed);
        Some(self.translator.spawn_subtree_pass(roots))
    }

    /// 持续消费变更通知，直到文档的通知通道关闭
    ///
    /// 同一时刻已排队的通知合并为一次处理。返回前等待所有已启动的扫描结束。
    pub async fn run(self, mut receiver: MutationReceiver) -> WatcherStats {
        let mut in_flight: Vec<JoinHandle<PassReport>> = Vec::new();

        while let Some(mut records) = receiver.recv().await {
            while let Ok(more) = receiver.try_recv() {
                records.extend(more);
            }

            in_flight.retain(|handle| !handle.is_finished());
            if let Some(handle) = self.handle_records(records) {
                in_flight.push(handle);
            }
        }

        for handle in in_flight {
            if let Err(e) = handle.await {
                tracing::warn!("局部扫描任务异常结束: {}", e);
            }
        }

        tracing::debug!("变更通知通道已关闭，停止监听");
        self.stats
    }

    pub fn get_stats(&self) -> &WatcherStats {
        &self.stats
    }
}
