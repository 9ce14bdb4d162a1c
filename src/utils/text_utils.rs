// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static KEYWORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[a-zA-Z]{4,}\b").unwrap());

/// 折叠连续空白并去除首尾空白
pub fn clean_text(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// 截断文本
///
/// 超过 `max_chars` 个字符时，截取前 `max_chars - suffix` 个字符并追加后缀，
/// 结果总长度不超过 `max_chars`。
///
/// # 参数
///
/// * `text` - 原始文本
/// * `max_chars` - 最大字符数
/// * `suffix` - 截断后追加的后缀
pub fn truncate_text(text: &str, max_chars: usize, suffix: &str) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(suffix.chars().count());
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(suffix);
    truncated
}

/// 按词频提取关键词（4个及以上字母的单词，小写）
///
/// 词频相同时保持首次出现的顺序
pub fn extract_keywords(text: &str, max_keywords: usize) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for word in KEYWORD.find_iter(&lower).map(|m| m.as_str()) {
        let count = counts.entry(word).or_insert(0);
        if *count == 0 {
            order.push(word);
        }
        *count += 1;
    }

    // sort_by 是稳定排序
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order
        .into_iter()
        .take(max_keywords)
        .map(str::to_string)
        .collect()
}
