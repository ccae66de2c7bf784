//! 翻译服务客户端
//!
//! `TranslationClient` 是管道与远程翻译服务之间的唯一边界。
//! DOM 句柄是 `Rc`，整个管道运行在单线程上，所以 trait 不要求 `Send`。

use async_trait::async_trait;

use crate::translation::error::TranslationResult;

pub mod libre;

pub use libre::LibreTranslateClient;

/// 翻译客户端
#[async_trait(?Send)]
pub trait TranslationClient {
    /// 翻译一组文本
    ///
    /// 返回的列表与输入按下标对齐，长度可以短于输入（只覆盖前缀），
    /// 失败时返回错误而不是部分结果。
    async fn translate(
        &self,
        texts: &[String],
        source: &str,
        target: &str,
    ) -> TranslationResult<Vec<String>>;
}
