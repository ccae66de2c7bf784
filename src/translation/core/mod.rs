//! 翻译系统核心模块
//!
//! ## 架构设计
//!
//! - **控制器** (`controller.rs`): 每个文档一个，记录运行状态并编排各阶段
//! - **引擎** (`engine.rs`): 发送批次、检查过期并写回译文
//! - **监听器** (`watcher.rs`): 把新插入的子树交给控制器做局部扫描
//!
//! ## 模块依赖关系
//!
//! ```text
//! ChangeWatcher (watcher.rs)
//!     └── LiveTranslator (controller.rs)
//!             ├── TextCollector (pipeline/collector.rs)
//!             │       └── TextClassifier (pipeline/classifier.rs)
//!             ├── BatchManager (pipeline/batch.rs)
//!             └── TranslationEngine (engine.rs)
//!                     └── TranslationClient (client/mod.rs)
//! ```

pub mod controller;
pub mod engine;
pub mod watcher;

pub use controller::{LiveTranslator, PassReport, PassScope, RunState};
pub use engine::{ApplyReport, BatchOutcome, EngineStats, TranslationEngine};
pub use watcher::{ChangeWatcher, WatcherStats};
