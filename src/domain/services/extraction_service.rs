// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use thiserror::Error;
use url::Url;

use crate::domain::models::selector::{CompiledRule, SelectorError, SelectorMap, SelectorRule};
use crate::utils::date_utils::parse_date;
use crate::utils::text_utils::{clean_text, extract_keywords, truncate_text};
use crate::utils::url_utils::normalize_url;

/// 摘要回退时的最大字符数
pub const SUMMARY_MAX_CHARS: usize = 200;
/// 关键词回退时的标签数
pub const FALLBACK_TAG_COUNT: usize = 5;
/// 配置了规则后不再回退到默认规则的字段
const REQUIRED_FIELDS: [&str; 2] = ["title", "content"];

/// 提取错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// 必填字段缺失
    #[error("required field '{0}' not found")]
    MissingField(&'static str),
}

/// 从单个页面提取得到的文章字段
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedArticle {
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
}

/// 内置默认规则：字段名、选择器、属性（为空时取文本）、是否多值
const DEFAULT_RULE_TABLE: &[(&str, &str, Option<&str>, bool)] = &[
    ("title", "meta[property='og:title']", Some("content"), false),
    ("title", "h1", None, false),
    ("title", "title", None, false),
    ("content", "article p", None, true),
    ("content", "p", None, true),
    ("summary", "meta[name='description']", Some("content"), false),
    ("summary", "meta[property='og:description']", Some("content"), false),
    ("author", "meta[name='author']", Some("content"), false),
    (
        "published_at",
        "meta[property='article:published_time']",
        Some("content"),
        false,
    ),
    ("published_at", "time[datetime]", Some("datetime"), false),
    ("image_url", "meta[property='og:image']", Some("content"), false),
    ("category", "meta[property='article:section']", Some("content"), false),
    ("tags", "meta[property='article:tag']", Some("content"), true),
];

/// 字段未配置（或可选字段的配置规则无结果）时使用的默认规则，按顺序尝试
static DEFAULT_RULES: Lazy<BTreeMap<&'static str, Vec<CompiledRule>>> = Lazy::new(|| {
    let mut rules: BTreeMap<&'static str, Vec<CompiledRule>> = BTreeMap::new();
    for &(field, selector, attribute, multiple) in DEFAULT_RULE_TABLE {
        let rule = match attribute {
            Some(attribute) => SelectorRule::Attribute {
                selector: selector.to_string(),
                attribute: attribute.to_string(),
                multiple,
            },
            None => SelectorRule::Css {
                selector: selector.to_string(),
                multiple,
            },
        };
        match rule.compile(field) {
            Ok(compiled) => rules.entry(field).or_default().push(compiled),
            Err(e) => tracing::error!("Skipping built-in rule for {}: {}", field, e),
        }
    }
    rules
});

/// 提取计划
///
/// 新闻源的选择器映射在每次运行开始时编译一次，之后对每个页面复用。
#[derive(Debug, Clone)]
pub struct ExtractionPlan {
    rules: BTreeMap<String, CompiledRule>,
}

impl ExtractionPlan {
    /// 编译选择器映射
    ///
    /// # 参数
    ///
    /// * `selectors` - 新闻源配置的选择器映射
    ///
    /// # 返回值
    ///
    /// * `Ok(ExtractionPlan)` - 编译后的提取计划
    /// * `Err(SelectorError)` - 某条规则无法编译
    pub fn compile(selectors: &SelectorMap) -> Result<Self, SelectorError> {
        let rules = selectors
            .iter()
            .map(|(field, rule)| rule.compile(field).map(|compiled| (field.clone(), compiled)))
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(Self { rules })
    }

    /// 落地页文章链接规则
    pub fn article_link_rule(&self) -> Option<&CompiledRule> {
        self.rules.get("article_link")
    }

    /// 从页面中提取文章
    ///
    /// # 参数
    ///
    /// * `html` - 页面HTML
    /// * `page_url` - 页面URL，用于解析相对图片地址
    ///
    /// # 返回值
    ///
    /// * `Ok(ExtractedArticle)` - 提取结果
    /// * `Err(ExtractionError)` - 标题或正文缺失
    pub fn extract(&self, html: &str, page_url: &Url) -> Result<ExtractedArticle, ExtractionError> {
        let document = Html::parse_document(html);
        let field = |name: &str| self.values(&document, html, name);

        let title = field("title")
            .into_iter()
            .next()
            .ok_or(ExtractionError::MissingField("title"))?;

        let content = field("content").join("\n\n");
        if content.is_empty() {
            return Err(ExtractionError::MissingField("content"));
        }

        let summary = first(field("summary"))
            .or_else(|| Some(truncate_text(&clean_text(&content), SUMMARY_MAX_CHARS, "...")));

        let published_at = field("published_at")
            .iter()
            .find_map(|raw| parse_date(raw));

        let image_url = first(field("image_url"))
            .and_then(|raw| normalize_url(page_url, &raw))
            .map(|url| url.to_string());

        let mut tags: Vec<String> = Vec::new();
        for raw in field("tags") {
            for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                if !tags.iter().any(|existing| existing.eq_ignore_ascii_case(tag)) {
                    tags.push(tag.to_string());
                }
            }
        }
        if tags.is_empty() {
            tags = extract_keywords(&content, FALLBACK_TAG_COUNT);
        }

        Ok(ExtractedArticle {
            title,
            content,
            summary,
            author: first(field("author")),
            published_at,
            image_url,
            category: first(field("category")),
            tags,
        })
    }

    /// 依次尝试配置规则和默认规则，返回第一个非空结果
    ///
    /// 必填字段一旦配置了规则就只用该规则，匹配不到即视为缺失
    fn values(&self, document: &Html, raw_html: &str, field: &str) -> Vec<String> {
        let configured = self.rules.get(field);
        if REQUIRED_FIELDS.contains(&field) {
            if let Some(rule) = configured {
                return apply_rule(document, raw_html, rule);
            }
        }

        let defaults = DEFAULT_RULES.get(field).into_iter().flatten();
        configured
            .into_iter()
            .chain(defaults)
            .map(|rule| apply_rule(document, raw_html, rule))
            .find(|values| !values.is_empty())
            .unwrap_or_default()
    }
}

fn first(values: Vec<String>) -> Option<String> {
    values.into_iter().next()
}

fn element_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

fn select_values<'a, F>(document: &'a Html, selector: &Selector, multiple: bool, f: F) -> Vec<String>
where
    F: Fn(ElementRef<'a>) -> Option<String>,
{
    let values = document
        .select(selector)
        .filter_map(f)
        .filter(|value| !value.is_empty());
    if multiple {
        values.collect()
    } else {
        values.take(1).collect()
    }
}

/// 对页面应用一条规则，返回非空的清洗后文本
///
/// # 参数
///
/// * `document` - 已解析的页面
/// * `raw_html` - 原始HTML，正则规则直接作用于它
/// * `rule` - 已编译的规则
pub fn apply_rule(document: &Html, raw_html: &str, rule: &CompiledRule) -> Vec<String> {
    match rule {
        CompiledRule::Css { selector, multiple } => {
            select_values(document, selector, *multiple, |el| Some(element_text(el)))
        }
        CompiledRule::Attribute {
            selector,
            attribute,
            multiple,
        } => select_values(document, selector, *multiple, |el| {
            el.value().attr(attribute).map(clean_text)
        }),
        CompiledRule::Regex { regex, group } => regex
            .captures_iter(raw_html)
            .filter_map(|caps| caps.get(*group).map(|m| clean_text(m.as_str())))
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

#[cfg(test)]
#[path = "extraction_service_test.rs"]
mod tests;
