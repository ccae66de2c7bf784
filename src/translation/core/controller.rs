//! 翻译流程控制器
//!
//! 每个文档对应一个 `LiveTranslator`。它记录运行状态，并负责编排
//! 提取、切分批次、翻译和写回。
//!
//! 状态只有两个：`Idle`（从未开始扫描）和 `Active`（至少开始过一次）。
//! 整篇文档扫描只执行一次；由新插入子树触发的局部扫描总是执行。
//! 任何扫描都不会把本控制器已经写入的译文再次送去翻译。

use std::cell::Cell;
use std::rc::Rc;

use markup5ever_rcdom::Handle;
use tokio::task::JoinHandle;

use super::engine::{ApplyReport, TranslationEngine};
use crate::parsers::html::LiveDocument;
use crate::translation::client::TranslationClient;
use crate::translation::config::TranslationConfig;
use crate::translation::error::TranslationResult;
use crate::translation::pipeline::{
    BatchManager, ClassifierConfig, TextClassifier, TextCollector, TextUnit,
};

/// 文档的运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Active,
}

/// 扫描范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassScope {
    /// 整篇文档
    Document,
    /// 若干新插入的子树
    Subtrees(usize),
}

/// 单次扫描的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub scope: PassScope,
    pub units_extracted: usize,
    /// 已是译文而跳过的单元数
    pub already_translated: usize,
    pub batches: usize,
    pub batches_failed: usize,
    pub units_written: usize,
    pub stale_discarded: usize,
}

impl PassReport {
    fn new(
        scope: PassScope,
        units_extracted: usize,
        already_translated: usize,
        applied: ApplyReport,
    ) -> Self {
        Self {
            scope,
            units_extracted,
            already_translated,
            batches: applied.batches,
            batches_failed: applied.batches_failed,
            units_written: applied.units_written,
            stale_discarded: applied.stale_discarded,
        }
    }
}

struct TranslatorInner {
    root: Handle,
    classifier: TextClassifier,
    batcher: BatchManager,
    engine: TranslationEngine,
    max_depth: usize,
    run_state: Cell<RunState>,
    document_pass_claimed: Cell<bool>,
}

/// 文档级翻译控制器，克隆开销很小
#[derive(Clone)]
pub struct LiveTranslator {
    inner: Rc<TranslatorInner>,
}

impl LiveTranslator {
    /// 为文档创建控制器，整篇扫描从 `<body>` 开始
    pub fn new(
        document: &LiveDocument,
        config: &TranslationConfig,
        client: Rc<dyn TranslationClient>,
    ) -> TranslationResult<Self> {
        config.validate()?;

        let classifier = TextClassifier::new(ClassifierConfig::from(config))?;
        let engine = TranslationEngine::new(client, &config.source_lang, &config.target_lang);

        Ok(Self {
            inner: Rc::new(TranslatorInner {
                root: document.body(),
                classifier,
                batcher: BatchManager::new(config.batch_size),
                engine,
                max_depth: config.max_depth,
                run_state: Cell::new(RunState::Idle),
                document_pass_claimed: Cell::new(false),
            }),
        })
    }

    pub fn run_state(&self) -> RunState {
        self.inner.run_state.get()
    }

    pub fn classifier(&self) -> &TextClassifier {
        &self.inner.classifier
    }

    pub fn engine(&self) -> &TranslationEngine {
        &self.inner.engine
    }

    pub fn batcher(&self) -> &BatchManager {
        &self.inner.batcher
    }

    /// 为子树中的标题区域打上排除标记
    pub fn mark_exclusions(&self, root: &Handle) -> usize {
        self.inner.classifier.mark_exclusions(root)
    }

    /// 整篇文档扫描，之后的调用返回 `None`
    pub async fn translate_document(&self) -> Option<PassReport> {
        if !self.claim_document_pass() {
            return None;
        }
        Some(self.run_document_pass().await)
    }

    /// 扫描新插入的子树
    pub async fn translate_subtrees(&self, roots: Vec<Handle>) -> PassReport {
        self.activate();
        let scope = PassScope::Subtrees(roots.len());
        self.run_pass(scope, &roots).await
    }

    /// 在当前 `LocalSet` 上启动整篇扫描，已经启动过时返回 `None`
    pub fn spawn_document_pass(&self) -> Option<JoinHandle<PassReport>> {
        if !self.claim_document_pass() {
            return None;
        }
        let translator = self.clone();
        Some(tokio::task::spawn_local(async move {
            translator.run_document_pass().await
        }))
    }

    /// 在当前 `LocalSet` 上启动子树扫描
    pub fn spawn_subtree_pass(&self, roots: Vec<Handle>) -> JoinHandle<PassReport> {
        self.activate();
        let translator = self.clone();
        tokio::task::spawn_local(async move { translator.translate_subtrees(roots).await })
    }

    fn claim_document_pass(&self) -> bool {
        self.activate();
        if self.inner.document_pass_claimed.replace(true) {
            tracing::debug!("整篇文档扫描已经启动过，忽略重复触发");
            return false;
        }
        true
    }

    fn activate(&self) {
        if self.inner.run_state.replace(RunState::Active) == RunState::Idle {
            tracing::debug!("翻译状态: Idle -> Active");
        }
    }

    async fn run_document_pass(&self) -> PassReport {
        let root = self.inner.root.clone();
        let marked = self.mark_exclusions(&root);
        if marked > 0 {
            tracing::debug!("标记了 {} 个标题区域", marked);
        }
        self.run_pass(PassScope::Document, &[root]).await
    }

    async fn run_pass(&self, scope: PassScope, roots: &[Handle]) -> PassReport {
        let mut units = self.extract(roots);
        let found = units.len();
        units.retain(|unit| !self.inner.engine.is_translated(unit));
        let already_translated = found - units.len();
        let units_extracted = units.len();

        if already_translated > 0 {
            tracing::debug!("跳过 {} 个已翻译的文本单元", already_translated);
        }

        tracing::info!("开始翻译扫描 {:?}: {} 个文本单元", scope, units_extracted);

        let batches = self.inner.batcher.create_batches(units);
        let applied = self.inner.engine.apply_all(batches).await;
        let report = PassReport::new(scope, units_extracted, already_translated, applied);

        tracing::info!(
            "翻译扫描完成 {:?}: 写入 {} 个, 丢弃 {} 个, 失败批次 {}/{}",
            scope,
            report.units_written,
            report.stale_discarded,
            report.batches_failed,
            report.batches
        );

        report
    }

    fn extract(&self, roots: &[Handle]) -> Vec<TextUnit> {
        let collector = TextCollector::new(&self.inner.classifier, self.inner.max_depth);
        roots.iter().flat_map(|root| collector.extract(root)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::cell::RefCell;
    use tokio::task::LocalSet;

    use crate::translation::error::TranslationError;

    #[derive(Default)]
    struct RecordingClient {
        calls: RefCell<Vec<Vec<String>>>,
        fail: bool,
    }

    #[async_trait(?Send)]
    impl TranslationClient for RecordingClient {
        async fn translate(
            &self,
            texts: &[String],
            _source: &str,
            _target: &str,
        ) -> TranslationResult<Vec<String>> {
            self.calls.borrow_mut().push(texts.to_vec());
            if self.fail {
                return Err(TranslationError::NetworkError("offline".into()));
            }
            Ok(texts.iter().map(|t| format!("[fr] {}", t)).collect())
        }
    }

    fn setup(html: &str, fail: bool) -> (LiveDocument, Rc<RecordingClient>, LiveTranslator) {
        let document = LiveDocument::from_html(html, None);
        let client = Rc::new(RecordingClient {
            fail,
            ..RecordingClient::default()
        });
        let translator =
            LiveTranslator::new(&document, &TranslationConfig::default(), client.clone()).unwrap();
        (document, client, translator)
    }

    #[tokio::test]
    async fn test_document_pass_runs_once() {
        let (document, client, translator) = setup("<p>hello world</p>", false);
        assert_eq!(translator.run_state(), RunState::Idle);

        let report = translator.translate_document().await.unwrap();
        assert_eq!(translator.run_state(), RunState::Active);
        assert_eq!(report.scope, PassScope::Document);
        assert_eq!(report.units_written, 1);
        assert_eq!(document.text_values(), vec!["[fr] hello world"]);

        assert!(translator.translate_document().await.is_none());
        assert_eq!(client.calls.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_document_pass_marks_titles_first() {
        let (document, client, translator) =
            setup("<h2>Frieren</h2><p>Beyond journey's end</p>", false);
        translator.translate_document().await.unwrap();

        assert_eq!(client.calls.borrow()[0], vec!["Beyond journey's end".to_string()]);
        assert_eq!(document.text_values(), vec!["Frieren", "[fr] Beyond journey's end"]);
        let h2 = crate::parsers::html::find_nodes(&document.document(), vec!["h2"]).remove(0);
        assert!(crate::translation::pipeline::is_marked(&h2));
    }

    #[tokio::test]
    async fn test_subtree_pass_before_load_keeps_document_pass() {
        let (document, client, translator) = setup("<p>existing text</p>", false);
        let body = document.body();
        let added = document.append_html(&body, "<p>fresh text</p>");

        let report = translator.translate_subtrees(added).await;
        assert_eq!(report.scope, PassScope::Subtrees(1));
        assert_eq!(report.units_extracted, 1);
        assert_eq!(translator.run_state(), RunState::Active);

        let report = translator.translate_document().await.unwrap();
        assert_eq!(report.scope, PassScope::Document);
        assert_eq!(report.units_extracted, 1);
        assert_eq!(report.already_translated, 1);
        assert_eq!(
            *client.calls.borrow(),
            vec![vec!["fresh text".to_string()], vec!["existing text".to_string()]]
        );
        assert_eq!(document.text_values(), vec!["[fr] existing text", "[fr] fresh text"]);
    }

    #[tokio::test]
    async fn test_subtree_pass_after_document_pass_skips_translated_text() {
        let (document, client, translator) = setup("<div><p>already done</p></div>", false);
        translator.translate_document().await.unwrap();

        let div = crate::parsers::html::find_nodes(&document.document(), vec!["div"]).remove(0);
        document.append_html(&div, "<p>late arrival</p>");

        let report = translator.translate_subtrees(vec![div]).await;
        assert_eq!(report.already_translated, 1);
        assert_eq!(report.units_written, 1);
        assert!(client
            .calls
            .borrow()
            .iter()
            .flatten()
            .all(|text| !text.starts_with("[fr] ")));
        assert_eq!(document.text_values(), vec!["[fr] already done", "[fr] late arrival"]);
    }

    #[tokio::test]
    async fn test_page_rewrite_is_translated_again() {
        let (document, client, translator) = setup("<div><p>first version</p></div>", false);
        translator.translate_document().await.unwrap();

        let p = crate::parsers::html::find_nodes(&document.document(), vec!["p"]).remove(0);
        crate::parsers::html::set_text(&p.children.borrow()[0], "second version");
        let div = crate::parsers::html::find_nodes(&document.document(), vec!["div"]).remove(0);
        let report = translator.translate_subtrees(vec![div]).await;

        assert_eq!(report.already_translated, 0);
        assert_eq!(client.calls.borrow()[1], vec!["second version".to_string()]);
        assert_eq!(document.text_values(), vec!["[fr] second version"]);
    }

    #[tokio::test]
    async fn test_failures_do_not_escape() {
        let (document, _client, translator) = setup("<p>first text</p><p>second text</p>", true);
        let report = translator.translate_document().await.unwrap();
        assert_eq!(report.batches_failed, 1);
        assert_eq!(report.units_written, 0);
        assert_eq!(document.text_values(), vec!["first text", "second text"]);
    }

    #[tokio::test]
    async fn test_spawned_passes() {
        let local = LocalSet::new();
        local
            .run_until(async {
                let (document, _client, translator) = setup("<p>spawned text</p>", false);
                let handle = translator.spawn_document_pass().unwrap();
                assert!(translator.spawn_document_pass().is_none());

                let report = handle.await.unwrap();
                assert_eq!(report.units_written, 1);
                assert_eq!(document.text_values(), vec!["[fr] spawned text"]);
            })
            .await;
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let document = LiveDocument::from_html("<p>text</p>", None);
        let mut config = TranslationConfig::default();
        config.batch_size = 0;
        let result = LiveTranslator::new(&document, &config, Rc::new(RecordingClient::default()));
        assert!(result.is_err());
    }
}
