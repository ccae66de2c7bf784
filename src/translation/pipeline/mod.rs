//! 翻译管道模块
//!
//! 提供文本处理管道，包括分类、收集和批次切分

pub mod batch;
pub mod classifier;
pub mod collector;

// 重新导出主要类型
pub use batch::{batch, Batch, BatchManager, BatchStats};
pub use classifier::{is_marked, mark_excluded, ClassifierConfig, SkipReason, TextClassifier};
pub use collector::{CollectionStats, TextCollector, TextUnit, WriteOutcome};
