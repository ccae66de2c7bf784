// 集成测试公共模块
//
// 提供可编排的翻译客户端和文档辅助工具

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::rc::Rc;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::task::LocalSet;

use live_translate::parsers::html::{find_nodes, LiveDocument};
use live_translate::translation::{
    TranslationClient, TranslationConfig, TranslationError, TranslationResult,
};
use markup5ever_rcdom::Handle;

/// 预设的单次回复
pub enum Reply {
    Translate(Vec<String>),
    Fail(TranslationError),
}

impl Reply {
    pub fn ok(texts: &[&str]) -> Self {
        Reply::Translate(texts.iter().map(|s| s.to_string()).collect())
    }

    pub fn network_error() -> Self {
        Reply::Fail(TranslationError::NetworkError("connection refused".into()))
    }
}

/// 挂起请求的闸门
///
/// 调用进入时通知 `entered`，然后等待 `release`。只拦截第一次调用。
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
    armed: Cell<bool>,
}

/// 可编排的翻译客户端
///
/// 先按顺序消费预设回复；回复用完后，`fail_all` 为真时返回网络错误，
/// 否则给每条文本加上 `[fr] ` 前缀。
#[derive(Default)]
pub struct MockTranslationClient {
    replies: RefCell<VecDeque<Reply>>,
    calls: RefCell<Vec<Vec<String>>>,
    fail_all: bool,
    gate: Option<Rc<Gate>>,
}

impl MockTranslationClient {
    pub fn prefixing() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn failing() -> Rc<Self> {
        Rc::new(Self {
            fail_all: true,
            ..Self::default()
        })
    }

    pub fn scripted(replies: Vec<Reply>) -> Rc<Self> {
        Rc::new(Self {
            replies: RefCell::new(replies.into()),
            ..Self::default()
        })
    }

    /// 第一次调用会被闸门挂起
    pub fn gated() -> (Rc<Self>, Rc<Gate>) {
        let gate = Rc::new(Gate::default());
        gate.armed.set(true);
        let client = Rc::new(Self {
            gate: Some(gate.clone()),
            ..Self::default()
        });
        (client, gate)
    }

    /// 每次调用收到的文本
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

#[async_trait(?Send)]
impl TranslationClient for MockTranslationClient {
    async fn translate(
        &self,
        texts: &[String],
        _source: &str,
        _target: &str,
    ) -> TranslationResult<Vec<String>> {
        self.calls.borrow_mut().push(texts.to_vec());

        if let Some(gate) = &self.gate {
            if gate.armed.replace(false) {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
        }

        let reply = self.replies.borrow_mut().pop_front();
        match reply {
            Some(Reply::Translate(texts)) => Ok(texts),
            Some(Reply::Fail(error)) => Err(error),
            None if self.fail_all => Err(TranslationError::NetworkError("service down".into())),
            None => Ok(texts.iter().map(|t| format!("[fr] {}", t)).collect()),
        }
    }
}

pub struct HtmlTestHelper;

impl HtmlTestHelper {
    /// 新番时间表页面片段
    pub fn schedule_page() -> String {
        r#"<html><head><title>Schedule</title></head><body>
            <div class="card">
                <h3 class="title">Attack on Titan</h3>
                <span class="badge">Episode 3</span>
                <p class="synopsis">A new season begins</p>
            </div>
        </body></html>"#
            .to_string()
    }

    /// 生成 `count` 个段落
    pub fn paragraphs(prefix: &str, count: usize) -> String {
        (1..=count)
            .map(|i| format!("<p>{} paragraph number {}</p>", prefix, i))
            .collect()
    }

    pub fn first(document: &LiveDocument, tag: &str) -> Handle {
        find_nodes(&document.document(), vec![tag]).remove(0)
    }

    /// 元素的第一个子节点（通常是文本节点）
    pub fn first_text(element: &Handle) -> Handle {
        element.children.borrow()[0].clone()
    }
}

pub fn config_with_batch_size(batch_size: usize) -> TranslationConfig {
    TranslationConfig {
        batch_size,
        ..TranslationConfig::default()
    }
}

pub fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// 在 `LocalSet` 中运行测试主体
pub async fn run_local<F: Future>(future: F) -> F::Output {
    LocalSet::new().run_until(future).await
}

/// 让出执行权直到条件成立
pub async fn settle(mut done: impl FnMut() -> bool) {
    for _ in 0..200 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached after yielding");
}
