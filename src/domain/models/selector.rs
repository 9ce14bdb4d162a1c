// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use regex::Regex;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// 新闻源支持的提取字段
pub const KNOWN_FIELDS: &[&str] = &[
    "title",
    "content",
    "summary",
    "author",
    "published_at",
    "image_url",
    "category",
    "tags",
    "article_link",
];

/// 选择器配置错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("unknown selector field '{0}'")]
    UnknownField(String),
    #[error("invalid css selector for '{field}': {message}")]
    InvalidCss { field: String, message: String },
    #[error("invalid regex for '{field}': {message}")]
    InvalidRegex { field: String, message: String },
    #[error("regex for '{field}' has no capture group {group}")]
    MissingGroup { field: String, group: usize },
}

/// 提取规则
///
/// 字段名到提取方式的映射值。JSON 中的纯字符串被视为 `css` 规则的简写。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawSelectorRule")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SelectorRule {
    /// 取匹配元素的文本内容
    Css {
        selector: String,
        #[serde(default)]
        multiple: bool,
    },
    /// 取匹配元素的属性值
    Attribute {
        selector: String,
        attribute: String,
        #[serde(default)]
        multiple: bool,
    },
    /// 对原始 HTML 应用正则，取指定捕获组
    Regex {
        pattern: String,
        #[serde(default = "default_group")]
        group: usize,
    },
}

fn default_group() -> usize {
    1
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSelectorRule {
    Shorthand(String),
    Tagged(TaggedSelectorRule),
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TaggedSelectorRule {
    Css {
        selector: String,
        #[serde(default)]
        multiple: bool,
    },
    Attribute {
        selector: String,
        attribute: String,
        #[serde(default)]
        multiple: bool,
    },
    Regex {
        pattern: String,
        #[serde(default = "default_group")]
        group: usize,
    },
}

impl From<RawSelectorRule> for SelectorRule {
    fn from(raw: RawSelectorRule) -> Self {
        match raw {
            RawSelectorRule::Shorthand(selector) => SelectorRule::Css {
                selector,
                multiple: false,
            },
            RawSelectorRule::Tagged(TaggedSelectorRule::Css { selector, multiple }) => {
                SelectorRule::Css { selector, multiple }
            }
            RawSelectorRule::Tagged(TaggedSelectorRule::Attribute {
                selector,
                attribute,
                multiple,
            }) => SelectorRule::Attribute {
                selector,
                attribute,
                multiple,
            },
            RawSelectorRule::Tagged(TaggedSelectorRule::Regex { pattern, group }) => {
                SelectorRule::Regex { pattern, group }
            }
        }
    }
}

/// 字段名到提取规则的映射
pub type SelectorMap = BTreeMap<String, SelectorRule>;

/// 已编译的提取规则
#[derive(Debug, Clone)]
pub enum CompiledRule {
    Css {
        selector: Selector,
        multiple: bool,
    },
    Attribute {
        selector: Selector,
        attribute: String,
        multiple: bool,
    },
    Regex {
        regex: Regex,
        group: usize,
    },
}

impl SelectorRule {
    /// 编译规则
    ///
    /// # 参数
    ///
    /// * `field` - 所属字段名，用于错误信息
    pub fn compile(&self, field: &str) -> Result<CompiledRule, SelectorError> {
        match self {
            SelectorRule::Css { selector, multiple } => Ok(CompiledRule::Css {
                selector: parse_css(field, selector)?,
                multiple: *multiple,
            }),
            SelectorRule::Attribute {
                selector,
                attribute,
                multiple,
            } => Ok(CompiledRule::Attribute {
                selector: parse_css(field, selector)?,
                attribute: attribute.clone(),
                multiple: *multiple,
            }),
            SelectorRule::Regex { pattern, group } => {
                let regex = Regex::new(pattern).map_err(|e| SelectorError::InvalidRegex {
                    field: field.to_string(),
                    message: e.to_string(),
                })?;
                if *group >= regex.captures_len() {
                    return Err(SelectorError::MissingGroup {
                        field: field.to_string(),
                        group: *group,
                    });
                }
                Ok(CompiledRule::Regex {
                    regex,
                    group: *group,
                })
            }
        }
    }
}

fn parse_css(field: &str, selector: &str) -> Result<Selector, SelectorError> {
    Selector::parse(selector).map_err(|e| SelectorError::InvalidCss {
        field: field.to_string(),
        message: e.to_string(),
    })
}

/// 校验整个选择器映射：字段名必须已知，且所有规则都能编译
pub fn validate_selectors(selectors: &SelectorMap) -> Result<(), SelectorError> {
    for (field, rule) in selectors {
        if !KNOWN_FIELDS.contains(&field.as_str()) {
            return Err(SelectorError::UnknownField(field.clone()));
        }
        rule.compile(field)?;
    }
    Ok(())
}
