//! 简化的配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::constants;
use crate::translation::error::{TranslationError, TranslationResult};

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// 翻译配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TranslationConfig {
    // 基础配置
    pub enabled: bool,
    pub source_lang: String,
    pub target_lang: String,
    pub api_url: String,
    pub api_key: Option<String>,
    /// 单次请求超时（秒），为空时使用传输层默认值
    pub request_timeout_secs: Option<u64>,

    // 批次配置
    pub batch_size: usize,

    // 分类配置
    pub min_text_length: usize,
    pub short_code_max_length: usize,
    pub short_code_tokens: Vec<String>,
    /// 标题区域的 class 名，匹配时不区分 ASCII 大小写
    pub skip_classes: Vec<String>,
    pub heading_tags: Vec<String>,
    pub non_prose_tags: Vec<String>,
    pub max_depth: usize,

    /// 允许安装翻译层的站点，为空表示不限制
    pub allowed_hosts: Vec<String>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source_lang: constants::DEFAULT_SOURCE_LANG.to_string(),
            target_lang: constants::DEFAULT_TARGET_LANG.to_string(),
            api_url: constants::DEFAULT_API_URL.to_string(),
            api_key: None,
            request_timeout_secs: None,

            batch_size: constants::DEFAULT_BATCH_SIZE,

            min_text_length: constants::DEFAULT_MIN_TEXT_LENGTH,
            short_code_max_length: constants::SHORT_CODE_MAX_LENGTH,
            short_code_tokens: owned(constants::SHORT_CODE_TOKENS),
            skip_classes: owned(constants::SKIP_CLASSES),
            heading_tags: owned(constants::HEADING_TAGS),
            non_prose_tags: owned(constants::NON_PROSE_TAGS),
            max_depth: constants::DEFAULT_MAX_DEPTH,

            allowed_hosts: Vec::new(),
        }
    }
}

impl TranslationConfig {
    /// 创建带指定语言的默认配置
    pub fn default_with_lang(target_lang: &str, api_url: Option<&str>) -> Self {
        let mut config = Self::default();
        config.target_lang = target_lang.to_string();
        if let Some(url) = api_url {
            config.api_url = url.to_string();
        }
        config
    }

    /// 验证配置
    pub fn validate(&self) -> TranslationResult<()> {
        if self.batch_size == 0 {
            return Err(TranslationError::ConfigError("批次大小不能为0".to_string()));
        }

        if self.source_lang.trim().is_empty() || self.target_lang.trim().is_empty() {
            return Err(TranslationError::ConfigError("源语言和目标语言不能为空".to_string()));
        }

        if self.short_code_max_length == 0 {
            return Err(TranslationError::ConfigError("短代码长度上限不能为0".to_string()));
        }

        if self.max_depth == 0 {
            return Err(TranslationError::ConfigError("最大遍历深度不能为0".to_string()));
        }

        let url = Url::parse(&self.api_url)
            .map_err(|e| TranslationError::ConfigError(format!("API URL 无效: {}", e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(TranslationError::ConfigError(format!(
                "API URL 必须使用 http 或 https: {}",
                self.api_url
            )));
        }

        Ok(())
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) {
        use crate::env::{translation, EnvVar};

        if let Ok(enabled) = translation::Enabled::get() {
            self.enabled = enabled;
        }

        if let Ok(source_lang) = translation::SourceLang::get() {
            self.source_lang = source_lang;
        }

        if let Ok(target_lang) = translation::TargetLang::get() {
            self.target_lang = target_lang;
        }

        if let Ok(api_url) = translation::ApiUrl::get() {
            self.api_url = api_url;
            tracing::info!("环境变量覆盖 API URL: {}", self.api_url);
        }

        if let Ok(api_key) = translation::ApiKey::get() {
            self.api_key = Some(api_key);
        }

        if let Ok(batch_size) = translation::BatchSize::get() {
            self.batch_size = batch_size;
        }

        if let Ok(min_text_length) = translation::MinTextLength::get() {
            self.min_text_length = min_text_length;
        }

        if let Ok(timeout) = translation::RequestTimeout::get() {
            self.request_timeout_secs = Some(timeout.as_secs());
        }

        if let Ok(hosts) = translation::AllowedHosts::get() {
            self.allowed_hosts = hosts;
        }
    }

    /// 请求超时
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// 页面地址是否允许安装翻译层
    ///
    /// 站点条目同时匹配自身及其子域名；没有地址的文档只在列表为空时允许。
    pub fn allows_url(&self, url: Option<&Url>) -> bool {
        if self.allowed_hosts.is_empty() {
            return true;
        }

        let Some(host) = url.and_then(|u| u.host_str()) else {
            return false;
        };
        let host = host.to_lowercase();

        self.allowed_hosts.iter().any(|allowed| {
            let allowed = allowed.trim().trim_start_matches('.').to_lowercase();
            host == allowed || host.ends_with(&format!(".{}", allowed))
        })
    }
}

/// 简化的配置管理器
pub struct ConfigManager {
    config: TranslationConfig,
}

impl ConfigManager {
    /// 创建新的配置管理器
    pub fn new() -> TranslationResult<Self> {
        let mut config = Self::load_config()?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    /// 从指定文件创建配置管理器
    pub fn from_file(path: &str) -> TranslationResult<Self> {
        Self::load_dotenv();
        let expanded_path = shellexpand::tilde(path);
        let mut config = Self::load_from_file(&expanded_path)?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    /// 获取配置
    pub fn get_config(&self) -> &TranslationConfig {
        &self.config
    }

    /// 取出配置
    pub fn into_config(self) -> TranslationConfig {
        self.config
    }

    /// 从文件加载配置
    fn load_config() -> TranslationResult<TranslationConfig> {
        // 首先尝试加载 .env 文件
        Self::load_dotenv();

        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                return Self::load_from_file(&expanded_path);
            }
        }

        tracing::info!("未找到配置文件，使用默认配置");
        Ok(TranslationConfig::default())
    }

    /// 从指定文件加载配置
    fn load_from_file(path: &str) -> TranslationResult<TranslationConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TranslationError::ConfigError(format!("读取配置文件失败: {}", e)))?;

        if path.ends_with(".json") {
            serde_json::from_str(&content)
                .map_err(|e| TranslationError::ConfigError(format!("解析JSON配置失败: {}", e)))
        } else {
            toml::from_str(&content)
                .map_err(|e| TranslationError::ConfigError(format!("解析TOML配置失败: {}", e)))
        }
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        let env_files = [".env.local", ".env"];

        for env_file in &env_files {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config(path: &str) -> TranslationResult<()> {
        let config = TranslationConfig::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| TranslationError::ConfigError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| TranslationError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}
