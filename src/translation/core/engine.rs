//! 翻译引擎核心实现
//!
//! 引擎负责把批次送往翻译服务，并把结果写回文档。
//!
//! ## 工作流程
//! 1. 读取批次中每个单元的原文快照
//! 2. 调用 `TranslationClient::translate`
//! 3. 对每个返回结果重新检查节点的当前值，仍等于原文时才写入
//! 4. 当前值已变化（其他写入者或节点已离开文档）时只丢弃该单元的结果
//!
//! 批次之间严格串行：同一次运行中不会有两个请求同时在途。
//! 某个批次失败只放弃该批次，继续处理下一个批次。
//!
//! 引擎记住自己写入过的节点和写入的译文，后续扫描据此跳过已翻译的文本。

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicUsize, Ordering};

use markup5ever_rcdom::Node;

use crate::parsers::html::{get_text, is_connected};
use crate::translation::{
    client::TranslationClient,
    error::{helpers, TranslationError, TranslationResult},
    pipeline::{Batch, TextUnit, WriteOutcome},
};

/// 翻译引擎
///
/// 引擎本身不可变（`&self`），多个并发的扫描可以共享同一个实例；
/// 统计信息使用原子计数。
pub struct TranslationEngine {
    /// 翻译客户端
    client: Rc<dyn TranslationClient>,
    source_lang: String,
    target_lang: String,
    /// 运行统计
    stats: EngineStats,
    /// 已写入译文的节点
    written: WrittenNodes,
}

/// 引擎写入过的文本节点
///
/// 只持有弱引用；节点被释放或离开文档后，条目在下次写入时清理。
#[derive(Debug, Default)]
struct WrittenNodes {
    entries: RefCell<Vec<(Weak<Node>, String)>>,
}

impl WrittenNodes {
    fn record(&self, unit: &TextUnit, translated: &str) {
        let mut entries = self.entries.borrow_mut();
        entries.retain(|(node, _)| {
            node.upgrade()
                .is_some_and(|n| is_connected(&n) && !Rc::ptr_eq(&n, &unit.node))
        });
        entries.push((Rc::downgrade(&unit.node), translated.to_string()));
    }

    /// 节点的当前值是否仍是引擎写入的译文
    fn contains(&self, unit: &TextUnit) -> bool {
        self.entries.borrow().iter().any(|(node, translated)| {
            node.upgrade().is_some_and(|n| {
                Rc::ptr_eq(&n, &unit.node)
                    && get_text(&n).as_deref() == Some(translated.as_str())
            })
        })
    }

    fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

/// 单个批次的写入结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// 成功写入的单元数
    pub written: usize,
    /// 因当前值已变化而丢弃的单元数
    pub stale: usize,
    /// 译文为空而保持原样的单元数
    pub empty: usize,
    /// 响应较短、没有对应译文的单元数
    pub missing: usize,
}

/// 一次运行中所有批次的汇总
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub batches: usize,
    pub batches_failed: usize,
    pub units_written: usize,
    pub stale_discarded: usize,
    pub empty_translations: usize,
    pub missing_translations: usize,
}

impl ApplyReport {
    fn absorb(&mut self, outcome: &BatchOutcome) {
        self.units_written += outcome.written;
        self.stale_discarded += outcome.stale;
        self.empty_translations += outcome.empty;
        self.missing_translations += outcome.missing;
    }
}

impl TranslationEngine {
    /// 创建新的翻译引擎
    ///
    /// # 参数
    /// - `client`: 翻译客户端，使用 `Rc` 与其他扫描共享
    /// - `source_lang` / `target_lang`: 每次请求携带的语言对
    pub fn new(
        client: Rc<dyn TranslationClient>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Self {
        Self {
            client,
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
            stats: EngineStats::default(),
            written: WrittenNodes::default(),
        }
    }

    /// 单元的文本是否就是本引擎之前写入的译文
    ///
    /// 页面之后改写过的节点不算，会被当作新的原文重新翻译。
    pub fn is_translated(&self, unit: &TextUnit) -> bool {
        self.written.contains(unit)
    }

    /// 当前记录的已翻译节点数
    pub fn translated_nodes(&self) -> usize {
        self.written.len()
    }

    /// 翻译并写回单个批次
    ///
    /// # 错误
    /// - 客户端返回的任何错误（网络、状态码、格式）
    /// - `TranslationError::ParseError`: 响应条数多于请求条数
    ///
    /// 出错时批次中的单元保持原样。
    pub async fn apply(&self, batch: &Batch) -> TranslationResult<BatchOutcome> {
        if batch.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let originals = batch.originals();
        self.stats
            .characters_sent
            .fetch_add(batch.total_chars(), Ordering::Relaxed);

        tracing::debug!("处理批次 {}: {} 个文本单元", batch.id, batch.len());

        let translations = self
            .client
            .translate(&originals, &self.source_lang, &self.target_lang)
            .await?;

        if translations.len() > originals.len() {
            return Err(helpers::malformed_response(format!(
                "响应包含 {} 条译文，但请求只有 {} 条",
                translations.len(),
                originals.len()
            )));
        }

        let mut outcome = BatchOutcome {
            missing: originals.len() - translations.len(),
            ..BatchOutcome::default()
        };

        for (unit, translated) in batch.units.iter().zip(translations.iter()) {
            if translated.trim().is_empty() {
                outcome.empty += 1;
                continue;
            }

            match unit.write_if_unchanged(translated) {
                WriteOutcome::Written => {
                    self.written.record(unit, translated);
                    outcome.written += 1;
                }
                WriteOutcome::Stale | WriteOutcome::Detached => {
                    tracing::debug!("文本已被修改或已离开文档，丢弃译文: {:?}", unit.original);
                    outcome.stale += 1;
                }
            }
        }

        self.stats
            .units_written
            .fetch_add(outcome.written, Ordering::Relaxed);
        self.stats
            .stale_writes
            .fetch_add(outcome.stale, Ordering::Relaxed);

        Ok(outcome)
    }

    /// 按顺序处理所有批次，失败的批次只记录日志
    pub async fn apply_all(&self, batches: Vec<Batch>) -> ApplyReport {
        let mut report = ApplyReport {
            batches: batches.len(),
            ..ApplyReport::default()
        };

        for batch in &batches {
            match self.apply(batch).await {
                Ok(outcome) => {
                    self.stats.batches_processed.fetch_add(1, Ordering::Relaxed);
                    report.absorb(&outcome);
                }
                Err(e) => {
                    self.stats.batches_failed.fetch_add(1, Ordering::Relaxed);
                    report.batches_failed += 1;
                    let e: TranslationError = e.with_context(format!("批次 {}", batch.id));
                    helpers::log_error(&e, "翻译批次已放弃");
                }
            }
        }

        report
    }

    /// 获取统计信息
    pub fn get_stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn source_lang(&self) -> &str {
        &self.source_lang
    }

    pub fn target_lang(&self) -> &str {
        &self.target_lang
    }
}

/// 引擎统计信息
#[derive(Debug, Default)]
pub struct EngineStats {
    pub batches_processed: AtomicUsize,
    pub batches_failed: AtomicUsize,
    pub units_written: AtomicUsize,
    pub stale_writes: AtomicUsize,
    pub characters_sent: AtomicUsize,
}

impl EngineStats {
    /// 统计快照：(成功批次, 失败批次, 写入单元, 丢弃单元)
    pub fn snapshot(&self) -> (usize, usize, usize, usize) {
        (
            self.batches_processed.load(Ordering::Relaxed),
            self.batches_failed.load(Ordering::Relaxed),
            self.units_written.load(Ordering::Relaxed),
            self.stale_writes.load(Ordering::Relaxed),
        )
    }
}
