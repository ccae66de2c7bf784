//! 翻译配置管理模块
//!
//! 提供简化的配置管理，支持环境变量、配置文件和默认值

pub mod manager;

// 重新导出主要类型
pub use manager::{ConfigManager, TranslationConfig};

/// 配置常量
pub mod constants {
    // 批次处理相关
    pub const DEFAULT_BATCH_SIZE: usize = 30;

    // 文本过滤相关
    pub const DEFAULT_MIN_TEXT_LENGTH: usize = 1;
    /// 提取阶段的最终兜底：去空白后少于该字符数的文本不会产出
    pub const MIN_EXTRACT_CHARS: usize = 2;
    pub const SHORT_CODE_MAX_LENGTH: usize = 20;
    pub const DEFAULT_MAX_DEPTH: usize = 256;

    // 默认API设置
    pub const DEFAULT_API_URL: &str = "http://localhost:5000/translate";
    pub const DEFAULT_SOURCE_LANG: &str = "en";
    pub const DEFAULT_TARGET_LANG: &str = "fr";

    /// 排除标记属性
    pub const EXCLUSION_MARKER_ATTR: &str = "data-no-translate";
    pub const EXCLUSION_MARKER_VALUE: &str = "true";

    // 季度/集数/发行格式缩写
    pub const SHORT_CODE_TOKENS: &[&str] = &["s1", "ep", "bd", "tv", "ova", "ona"];

    // 标题区域的 class
    pub const SKIP_CLASSES: &[&str] = &["title", "heading", "name", "romaji"];

    // 标题标签
    pub const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4"];

    // 非正文容器
    pub const NON_PROSE_TAGS: &[&str] = &[
        "script", "style", "noscript", "template", "code", "pre", "kbd", "samp", "textarea",
        "input", "select", "option",
    ];

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "live-translate.toml",
        ".live-translate.toml",
        "~/.config/live-translate/config.toml",
        "/etc/live-translate/config.toml",
    ];
}

/// 加载配置，失败时退回默认值
pub fn load_translation_config() -> TranslationConfig {
    match ConfigManager::new() {
        Ok(manager) => manager.get_config().clone(),
        Err(e) => {
            tracing::warn!("配置加载失败，使用默认配置: {}", e);
            TranslationConfig::default()
        }
    }
}
