//! 文本分类器模块
//!
//! 判断一个文本节点是否需要翻译。这是启发式规则而不是保证：
//! 漏翻的正文或被误翻的短标题都属于已知局限，调整阈值是配置变更。

use markup5ever_rcdom::{Handle, NodeData};
use regex::{Regex, RegexBuilder};

use crate::parsers::html::{
    get_node_attr, get_node_name, get_parent_element, get_parent_node, has_class, set_node_attr,
};
use crate::translation::config::{constants, TranslationConfig};
use crate::translation::error::{TranslationError, TranslationResult};

/// 跳过原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// 去空白后为空
    Empty,
    /// 不超过最小长度阈值
    TooShort,
    /// 季度/集数之类的短代码
    ShortCode,
    /// 父元素带排除标记
    Excluded,
    /// 父元素是脚本、代码、表单等非正文容器
    NonProse,
    /// 父元素是标题区域
    TitleRegion,
}

impl SkipReason {
    /// 结构性排除会剪掉整棵子树
    pub fn is_structural(self) -> bool {
        matches!(self, SkipReason::Excluded | SkipReason::NonProse)
    }
}

/// 分类器配置
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub min_text_length: usize,
    pub short_code_max_length: usize,
    pub short_code_tokens: Vec<String>,
    pub skip_classes: Vec<String>,
    pub heading_tags: Vec<String>,
    pub non_prose_tags: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self::from(&TranslationConfig::default())
    }
}

impl From<&TranslationConfig> for ClassifierConfig {
    fn from(config: &TranslationConfig) -> Self {
        let lower = |items: &[String]| items.iter().map(|s| s.to_lowercase()).collect();
        Self {
            min_text_length: config.min_text_length,
            short_code_max_length: config.short_code_max_length,
            short_code_tokens: config.short_code_tokens.clone(),
            skip_classes: lower(&config.skip_classes),
            heading_tags: lower(&config.heading_tags),
            non_prose_tags: lower(&config.non_prose_tags),
        }
    }
}

/// 文本分类器
#[derive(Debug, Clone)]
pub struct TextClassifier {
    config: ClassifierConfig,
    /// 为空表示没有配置任何短代码
    short_code_regex: Option<Regex>,
}

impl TextClassifier {
    /// 创建新的分类器
    pub fn new(config: ClassifierConfig) -> TranslationResult<Self> {
        let short_code_regex = Self::build_short_code_regex(&config.short_code_tokens)?;
        Ok(Self {
            config,
            short_code_regex,
        })
    }

    /// 按词首匹配短代码，"Episode 3" 命中 `ep`，"sleep" 不会
    ///
    /// 只对 ASCII 文本生效，所以关闭 Unicode 模式。
    fn build_short_code_regex(tokens: &[String]) -> TranslationResult<Option<Regex>> {
        let alternatives: Vec<String> = tokens
            .iter()
            .map(|token| token.trim())
            .filter(|token| !token.is_empty())
            .map(regex::escape)
            .collect();

        if alternatives.is_empty() {
            return Ok(None);
        }

        RegexBuilder::new(&format!(r"\b(?:{})", alternatives.join("|")))
            .case_insensitive(true)
            .unicode(false)
            .build()
            .map(Some)
            .map_err(|e| TranslationError::ConfigError(format!("短代码规则无效: {}", e)))
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// 文本节点是否应跳过
    pub fn should_skip(&self, unit: &Handle) -> bool {
        self.skip_reason(unit).is_some()
    }

    /// 文本节点的跳过原因，`None` 表示可以翻译
    ///
    /// 只看最近的父元素；祖先上的结构性排除由提取器在遍历时剪枝。
    pub fn skip_reason(&self, unit: &Handle) -> Option<SkipReason> {
        let text = match &unit.data {
            NodeData::Text { contents } => contents.borrow().to_string(),
            _ => return Some(SkipReason::Empty),
        };

        if let Some(reason) = self.classify_text(&text) {
            return Some(reason);
        }

        get_parent_element(unit).and_then(|parent| self.classify_container(&parent))
    }

    /// 纯文本层面的判断
    pub fn classify_text(&self, text: &str) -> Option<SkipReason> {
        let trimmed = text.trim();

        if trimmed.is_empty() {
            return Some(SkipReason::Empty);
        }

        let char_count = trimmed.chars().count();
        if char_count <= self.config.min_text_length {
            return Some(SkipReason::TooShort);
        }

        if self.is_short_code(trimmed, char_count) {
            return Some(SkipReason::ShortCode);
        }

        None
    }

    fn is_short_code(&self, trimmed: &str, char_count: usize) -> bool {
        if char_count > self.config.short_code_max_length || !trimmed.is_ascii() {
            return false;
        }

        self.short_code_regex
            .as_ref()
            .map(|re| re.is_match(trimmed))
            .unwrap_or(false)
    }

    /// 元素层面的判断
    pub fn classify_container(&self, element: &Handle) -> Option<SkipReason> {
        if is_marked(element) {
            return Some(SkipReason::Excluded);
        }

        if self.is_non_prose(element) {
            return Some(SkipReason::NonProse);
        }

        if self.is_title_region(element) {
            return Some(SkipReason::TitleRegion);
        }

        None
    }

    /// 排除标记或非正文容器
    pub fn is_structural_exclusion(&self, element: &Handle) -> bool {
        is_marked(element) || self.is_non_prose(element)
    }

    fn is_non_prose(&self, element: &Handle) -> bool {
        get_node_name(element)
            .map(|tag| self.config.non_prose_tags.iter().any(|t| t.eq_ignore_ascii_case(tag)))
            .unwrap_or(false)
    }

    /// 按标签或 class 判断是否为标题区域
    pub fn is_title_region(&self, element: &Handle) -> bool {
        let Some(tag) = get_node_name(element) else {
            return false;
        };

        if self.config.heading_tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            return true;
        }

        self.config
            .skip_classes
            .iter()
            .any(|class_name| has_class(element, class_name))
    }

    /// 任意严格祖先是否处于结构性排除之下
    pub fn is_within_exclusion(&self, node: &Handle) -> bool {
        let mut current = get_parent_node(node);
        while let Some(ancestor) = current {
            if matches!(ancestor.data, NodeData::Element { .. })
                && self.is_structural_exclusion(&ancestor)
            {
                return true;
            }
            current = get_parent_node(&ancestor);
        }
        false
    }

    /// 为子树中的标题区域打上排除标记，返回新标记的元素数
    pub fn mark_exclusions(&self, root: &Handle) -> usize {
        let mut marked = 0;
        self.mark_recursive(root, &mut marked);
        marked
    }

    fn mark_recursive(&self, node: &Handle, marked: &mut usize) {
        if let NodeData::Element { .. } = node.data {
            if self.is_title_region(node) && !is_marked(node) {
                mark_excluded(node);
                *marked += 1;
            }
        }

        for child in node.children.borrow().iter() {
            self.mark_recursive(child, marked);
        }
    }
}

/// 元素是否带排除标记
///
/// 标记属性的值必须是 `true`（不区分大小写）；`data-no-translate="false"` 不算。
/// 此外也认可 HTML 的 `translate="no"` 和 `notranslate` 类。
pub fn is_marked(element: &Handle) -> bool {
    if get_node_attr(element, constants::EXCLUSION_MARKER_ATTR)
        .map(|value| {
            value
                .trim()
                .eq_ignore_ascii_case(constants::EXCLUSION_MARKER_VALUE)
        })
        .unwrap_or(false)
    {
        return true;
    }

    if get_node_attr(element, "translate")
        .map(|value| value.trim().eq_ignore_ascii_case("no"))
        .unwrap_or(false)
    {
        return true;
    }

    has_class(element, "notranslate")
}

/// 打上排除标记，重复调用无副作用
pub fn mark_excluded(element: &Handle) {
    set_node_attr(
        element,
        constants::EXCLUSION_MARKER_ATTR,
        Some(constants::EXCLUSION_MARKER_VALUE.to_string()),
    );
}
