// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use url::{ParseError, Url};

/// 将可能为相对路径的URL转换为绝对路径URL
pub fn resolve_url(base_url: &Url, path: &str) -> Result<Url, ParseError> {
    base_url.join(path)
}

/// 规范化URL：解析相对路径、去掉片段，只接受 http/https
///
/// # 参数
///
/// * `base_url` - 用于解析相对路径的基准URL
/// * `raw` - 原始链接文本
///
/// # 返回值
///
/// 规范化后的URL；无法解析或协议不支持时返回 `None`
pub fn normalize_url(base_url: &Url, raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') {
        return None;
    }
    let mut url = resolve_url(base_url, raw).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

/// 两个URL是否属于同一主机（忽略 `www.` 前缀）
pub fn same_host(a: &Url, b: &Url) -> bool {
    fn bare(url: &Url) -> Option<&str> {
        url.host_str()
            .map(|host| host.strip_prefix("www.").unwrap_or(host))
    }
    matches!((bare(a), bare(b)), (Some(x), Some(y)) if x.eq_ignore_ascii_case(y))
}
