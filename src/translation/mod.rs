//! 翻译模块
//!
//! 实时翻译层：扫描已渲染的文档，找出需要翻译的文本，排除必须原样保留的
//! 文本（标题、短代码、罗马音名字），分批发送到翻译服务并原地写回，
//! 同时持续处理新插入的内容。
//!
//! - **core**: 控制器、翻译引擎、变更监听
//! - **pipeline**: 文本处理管道（分类、收集、批次）
//! - **client**: 翻译服务客户端
//! - **config**: 配置管理
//! - **error**: 错误处理
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use std::rc::Rc;
//! use live_translate::parsers::html::LiveDocument;
//! use live_translate::translation::{install_overlay, LibreTranslateClient, TranslationConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let local = tokio::task::LocalSet::new();
//! local.run_until(async {
//!     let mut document = LiveDocument::from_html("<p>A new season begins</p>", None);
//!     let config = TranslationConfig::default();
//!     let client = Rc::new(LibreTranslateClient::new(&config)?);
//!
//!     if let Some(overlay) = install_overlay(&mut document, &config, client)? {
//!         if let Some(pass) = overlay.initial_pass {
//!             pass.await?;
//!         }
//!     }
//!     Ok::<_, Box<dyn std::error::Error>>(())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use std::rc::Rc;

use tokio::task::JoinHandle;

/// 翻译服务客户端
pub mod client;

/// 配置管理模块
pub mod config;

/// 核心模块：控制器、引擎与变更监听
pub mod core;

/// 错误处理模块
pub mod error;

/// 文本处理管道模块
pub mod pipeline;

pub use client::{LibreTranslateClient, TranslationClient};
pub use config::{constants, load_translation_config, ConfigManager, TranslationConfig};
pub use self::core::{
    ApplyReport, BatchOutcome, ChangeWatcher, EngineStats, LiveTranslator, PassReport, PassScope,
    RunState, TranslationEngine, WatcherStats,
};
pub use error::{ErrorCategory, ErrorSeverity, TranslationError, TranslationResult};
pub use pipeline::{
    Batch, BatchManager, ClassifierConfig, SkipReason, TextClassifier, TextCollector, TextUnit,
};

use crate::parsers::html::LiveDocument;

/// 已安装的翻译层
pub struct OverlayHandle {
    pub translator: LiveTranslator,
    /// 首次整篇扫描
    pub initial_pass: Option<JoinHandle<PassReport>>,
    /// 变更监听任务，文档的通知通道关闭后结束
    pub watcher: JoinHandle<WatcherStats>,
}

/// 在文档上安装翻译层
///
/// 配置禁用或页面地址不在允许列表中时返回 `Ok(None)`。
/// 安装后立即订阅变更通知并启动整篇扫描，两者都运行在当前的
/// `tokio::task::LocalSet` 上，因此必须在 `LocalSet` 内调用。
pub fn install_overlay(
    document: &mut LiveDocument,
    config: &TranslationConfig,
    client: Rc<dyn TranslationClient>,
) -> TranslationResult<Option<OverlayHandle>> {
    if !config.enabled {
        tracing::info!("翻译功能已禁用");
        return Ok(None);
    }

    if !config.allows_url(document.url()) {
        tracing::info!(
            "页面不在允许列表中，跳过翻译: {}",
            document.url().map(|u| u.as_str()).unwrap_or("<无地址>")
        );
        return Ok(None);
    }

    let translator = LiveTranslator::new(document, config, client)?;

    let receiver = document.observe();
    let watcher = tokio::task::spawn_local(ChangeWatcher::new(translator.clone()).run(receiver));
    let initial_pass = translator.spawn_document_pass();

    tracing::info!(
        "翻译层已安装: {} -> {}",
        config.source_lang,
        config.target_lang
    );

    Ok(Some(OverlayHandle {
        translator,
        initial_pass,
        watcher,
    }))
}
