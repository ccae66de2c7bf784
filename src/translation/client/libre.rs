//! LibreTranslate 客户端
//!
//! 请求体为 `{q, source, target, format: "text", api_key?}`。
//! 响应可能是 `[{translatedText}]` 数组，也可能是单个 `{translatedText}` 对象，
//! 后者的值既可能是字符串也可能是字符串数组。

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::TranslationClient;
use crate::translation::config::TranslationConfig;
use crate::translation::error::{helpers, TranslationError, TranslationResult};

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a [String],
    source: &'a str,
    target: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TranslateResponse {
    List(Vec<TranslatedItem>),
    Single(TranslatedItem),
}

#[derive(Debug, Deserialize)]
struct TranslatedItem {
    #[serde(rename = "translatedText", default)]
    translated_text: Option<TranslatedText>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TranslatedText {
    One(String),
    Many(Vec<String>),
}

impl TranslateResponse {
    fn into_texts(self) -> TranslationResult<Vec<String>> {
        match self {
            TranslateResponse::List(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| match item.translated_text {
                    Some(TranslatedText::One(text)) => Ok(text),
                    Some(TranslatedText::Many(mut texts)) if texts.len() == 1 => Ok(texts.remove(0)),
                    Some(TranslatedText::Many(texts)) => Err(helpers::malformed_response(format!(
                        "第 {} 条译文包含 {} 个值",
                        index + 1,
                        texts.len()
                    ))),
                    None => Err(helpers::malformed_response(format!(
                        "第 {} 条译文缺少 translatedText 字段",
                        index + 1
                    ))),
                })
                .collect(),
            TranslateResponse::Single(item) => match item.translated_text {
                Some(TranslatedText::One(text)) => Ok(vec![text]),
                Some(TranslatedText::Many(texts)) => Ok(texts),
                None => Err(helpers::malformed_response("响应缺少 translatedText 字段")),
            },
        }
    }
}

/// LibreTranslate 客户端
#[derive(Debug, Clone)]
pub struct LibreTranslateClient {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

impl LibreTranslateClient {
    /// 按配置创建客户端
    pub fn new(config: &TranslationConfig) -> TranslationResult<Self> {
        let mut builder = Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));

        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| TranslationError::ConfigError(format!("创建 HTTP 客户端失败: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

#[async_trait(?Send)]
impl TranslationClient for LibreTranslateClient {
    async fn translate(
        &self,
        texts: &[String],
        source: &str,
        target: &str,
    ) -> TranslationResult<Vec<String>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = TranslateRequest {
            q: texts,
            source,
            target,
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        tracing::debug!("发送翻译请求: {} 条文本 -> {}", texts.len(), self.api_url);

        let response = self.client.post(&self.api_url).json(&request).send().await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(TranslationError::RateLimitExceeded);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslationError::TranslationServiceError(format!(
                "HTTP {}: {}",
                status,
                body.trim()
            )));
        }

        let body = response.text().await?;
        let parsed: TranslateResponse = serde_json::from_str(&body)
            .map_err(|e| helpers::malformed_response(format!("无法解析翻译响应: {}", e)))?;

        parsed.into_texts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{body_json, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn client_for(server: &MockServer, api_key: Option<&str>) -> LibreTranslateClient {
        let mut config = TranslationConfig::default();
        config.api_url = format!("{}/translate", server.uri());
        config.api_key = api_key.map(str::to_string);
        LibreTranslateClient::new(&config).unwrap()
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_array_response_and_request_shape() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/translate"))
            .and(body_json(json!({
                "q": ["Hello", "World"],
                "source": "en",
                "target": "fr",
                "format": "text",
                "api_key": "secret"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"translatedText": "Bonjour"},
                {"translatedText": "Monde"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("secret"));
        let result = client
            .translate(&texts(&["Hello", "World"]), "en", "fr")
            .await
            .unwrap();
        assert_eq!(result, vec!["Bonjour", "Monde"]);
    }

    #[tokio::test]
    async fn test_wrapped_single_and_list_values() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"translatedText": "Salut"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let result = client.translate(&texts(&["Hi"]), "en", "fr").await.unwrap();
        assert_eq!(result, vec!["Salut"]);

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"translatedText": ["Un", "Deux"]})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let result = client
            .translate(&texts(&["One", "Two"]), "en", "fr")
            .await
            .unwrap();
        assert_eq!(result, vec!["Un", "Deux"]);
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        let error = client_for(&server, None)
            .translate(&texts(&["Hello"]), "en", "fr")
            .await
            .unwrap_err();
        assert!(matches!(error, TranslationError::RateLimitExceeded));

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;
        let error = client_for(&server, None)
            .translate(&texts(&["Hello"]), "en", "fr")
            .await
            .unwrap_err();
        assert!(matches!(error, TranslationError::TranslationServiceError(_)));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;
        let error = client_for(&server, None)
            .translate(&texts(&["Hello"]), "en", "fr")
            .await
            .unwrap_err();
        assert!(matches!(error, TranslationError::ParseError(_)));

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "nope"})))
            .mount(&server)
            .await;
        let error = client_for(&server, None)
            .translate(&texts(&["Hello"]), "en", "fr")
            .await
            .unwrap_err();
        assert!(matches!(error, TranslationError::ParseError(_)));
    }

    #[tokio::test]
    async fn test_list_with_bad_item_is_rejected_whole() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"translatedText": "Un"},
                {"error": "quota"}
            ])))
            .mount(&server)
            .await;
        let error = client_for(&server, None)
            .translate(&texts(&["One", "Two"]), "en", "fr")
            .await
            .unwrap_err();
        assert!(matches!(error, TranslationError::ParseError(_)));

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"translatedText": "Un"},
                {"translatedText": ["Deux", "Trois"]}
            ])))
            .mount(&server)
            .await;
        let error = client_for(&server, None)
            .translate(&texts(&["One", "Two"]), "en", "fr")
            .await
            .unwrap_err();
        assert!(matches!(error, TranslationError::ParseError(_)));
    }

    #[tokio::test]
    async fn test_empty_translated_text_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"translatedText": "Un"},
                {"translatedText": ""}
            ])))
            .mount(&server)
            .await;
        let result = client_for(&server, None)
            .translate(&texts(&["One", "Two"]), "en", "fr")
            .await
            .unwrap();
        assert_eq!(result, vec!["Un", ""]);
    }

    #[tokio::test]
    async fn test_empty_request_skips_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        let result = client_for(&server, None).translate(&[], "en", "fr").await.unwrap();
        assert!(result.is_empty());
    }
}
