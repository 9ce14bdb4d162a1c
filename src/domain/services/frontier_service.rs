// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use sxd_document::parser;
use sxd_xpath::nodeset::Node;
use sxd_xpath::{Context, Factory, Value};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::models::crawl_run::CrawlMode;
use crate::domain::models::selector::CompiledRule;
use crate::domain::models::source::Source;
use crate::domain::services::extraction_service::{apply_rule, ExtractionPlan};
use crate::engines::traits::{EngineError, ScrapeRequest, ScraperEngine};
use crate::utils::date_utils::parse_date;
use crate::utils::robots::RobotsCheckerTrait;
use crate::utils::url_utils::{normalize_url, same_host};

/// Sitemap 索引的最大递归深度
pub const MAX_SITEMAP_DEPTH: usize = 2;

/// 构建抓取边界时的错误
#[derive(Error, Debug)]
pub enum FrontierError {
    /// 输入源无法获取
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: EngineError,
    },
    /// 输入源无法解析
    #[error("failed to parse {url}: {message}")]
    Parse { url: String, message: String },
    /// 地址无效
    #[error("invalid url '{0}'")]
    InvalidUrl(String),
    /// robots.txt 禁止抓取该输入源
    #[error("{0} is disallowed by robots.txt")]
    Disallowed(String),
}

/// 候选条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// 原始链接文本
    pub link: String,
    /// 条目自带的时间戳（pubDate / updated / lastmod）
    pub timestamp: Option<DateTime<Utc>>,
}

/// 解析后的 sitemap 文档
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SitemapDocument {
    /// `urlset` 中的页面
    pub urls: Vec<FrontierEntry>,
    /// `sitemapindex` 中的子 sitemap 地址
    pub children: Vec<String>,
}

/// 对文档根节点求值 XPath，返回按文档顺序排列的节点
fn select_nodes<'d>(
    factory: &Factory,
    context: &Context<'d>,
    node: Node<'d>,
    expr: &str,
) -> Result<Vec<Node<'d>>, String> {
    let xpath = factory
        .build(expr)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("empty xpath '{expr}'"))?;
    match xpath.evaluate(context, node).map_err(|e| e.to_string())? {
        Value::Nodeset(nodes) => Ok(nodes.document_order()),
        _ => Ok(Vec::new()),
    }
}

fn first_text<'d>(
    factory: &Factory,
    context: &Context<'d>,
    node: Node<'d>,
    expr: &str,
) -> Result<Option<String>, String> {
    Ok(select_nodes(factory, context, node, expr)?
        .into_iter()
        .map(|n| n.string_value().trim().to_string())
        .find(|text| !text.is_empty()))
}

fn strip_prolog(xml: &str) -> &str {
    xml.trim_start_matches('\u{feff}').trim_start()
}

/// 解析 RSS 2.0 或 Atom 订阅源
///
/// 元素按 local-name 匹配，不依赖命名空间前缀
pub fn parse_feed(xml: &str) -> Result<Vec<FrontierEntry>, String> {
    let package = parser::parse(strip_prolog(xml)).map_err(|e| e.to_string())?;
    let document = package.as_document();
    let factory = Factory::new();
    let context = Context::new();
    let root: Node = document.root().into();

    let mut entries = Vec::new();

    // RSS 2.0
    for item in select_nodes(&factory, &context, root, "//*[local-name()='item']")? {
        let link = first_text(&factory, &context, item, "*[local-name()='link']")?
            .or(first_text(
                &factory,
                &context,
                item,
                "*[local-name()='guid'][not(@isPermaLink='false')]",
            )?);
        if let Some(link) = link {
            let timestamp = first_text(
                &factory,
                &context,
                item,
                "*[local-name()='pubDate' or local-name()='date']",
            )?
            .and_then(|raw| parse_date(&raw));
            entries.push(FrontierEntry { link, timestamp });
        }
    }

    // Atom
    for entry in select_nodes(&factory, &context, root, "//*[local-name()='entry']")? {
        let link = first_text(
            &factory,
            &context,
            entry,
            "*[local-name()='link'][not(@rel) or @rel='alternate']/@href",
        )?;
        if let Some(link) = link {
            let timestamp = first_text(
                &factory,
                &context,
                entry,
                "*[local-name()='updated' or local-name()='published']",
            )?
            .and_then(|raw| parse_date(&raw));
            entries.push(FrontierEntry { link, timestamp });
        }
    }

    Ok(entries)
}

/// 解析 sitemap（`urlset` 或 `sitemapindex`）
pub fn parse_sitemap(xml: &str) -> Result<SitemapDocument, String> {
    let package = parser::parse(strip_prolog(xml)).map_err(|e| e.to_string())?;
    let document = package.as_document();
    let factory = Factory::new();
    let context = Context::new();
    let root: Node = document.root().into();

    let mut sitemap = SitemapDocument::default();

    for url in select_nodes(&factory, &context, root, "/*[local-name()='urlset']/*[local-name()='url']")? {
        if let Some(link) = first_text(&factory, &context, url, "*[local-name()='loc']")? {
            let timestamp = first_text(&factory, &context, url, "*[local-name()='lastmod']")?
                .and_then(|raw| parse_date(&raw));
            sitemap.urls.push(FrontierEntry { link, timestamp });
        }
    }

    for child in select_nodes(
        &factory,
        &context,
        root,
        "/*[local-name()='sitemapindex']/*[local-name()='sitemap']",
    )? {
        if let Some(loc) = first_text(&factory, &context, child, "*[local-name()='loc']")? {
            sitemap.children.push(loc);
        }
    }

    Ok(sitemap)
}

/// 链接发现器
///
/// 从落地页中发现文章链接
pub struct LinkDiscoverer;

impl LinkDiscoverer {
    /// 从HTML内容中提取链接
    ///
    /// # 参数
    ///
    /// * `html_content` - HTML内容
    /// * `rule` - 可选的 `article_link` 规则；缺省时取全部 `a[href]`
    ///
    /// # 返回值
    ///
    /// 按出现顺序排列的原始链接文本
    pub fn extract_links(html_content: &str, rule: Option<&CompiledRule>) -> Vec<String> {
        let document = Html::parse_document(html_content);
        let Ok(anchor) = Selector::parse("a[href]") else {
            return Vec::new();
        };

        match rule {
            // 链接规则总是取全部匹配；css 规则命中的可能是链接本身，也可能是包裹链接的容器
            Some(CompiledRule::Css { selector, .. }) => document
                .select(selector)
                .filter_map(|element| {
                    element
                        .value()
                        .attr("href")
                        .or_else(|| {
                            element
                                .select(&anchor)
                                .next()
                                .and_then(|a| a.value().attr("href"))
                        })
                        .map(str::to_string)
                })
                .collect(),
            Some(CompiledRule::Attribute {
                selector,
                attribute,
                ..
            }) => document
                .select(selector)
                .filter_map(|element| element.value().attr(attribute).map(str::to_string))
                .collect(),
            Some(regex @ CompiledRule::Regex { .. }) => apply_rule(&document, html_content, regex),
            None => document
                .select(&anchor)
                .filter_map(|a| a.value().attr("href").map(str::to_string))
                .collect(),
        }
    }

    /// 过滤链接：规范化、同主机、去掉落地页自身
    ///
    /// # 参数
    ///
    /// * `links` - 原始链接
    /// * `base_url` - 落地页URL
    pub fn filter_links(links: Vec<String>, base_url: &Url) -> Vec<Url> {
        links
            .iter()
            .filter_map(|link| normalize_url(base_url, link))
            .filter(|url| same_host(url, base_url))
            .filter(|url| url.path() != base_url.path() || url.query() != base_url.query())
            .collect()
    }
}

/// 一次构建所需的参数
pub struct FrontierRequest<'a> {
    pub source: &'a Source,
    pub mode: CrawlMode,
    /// 增量模式下的时间下限：早于它的带时间戳条目被跳过，全量模式忽略
    pub since: Option<DateTime<Utc>>,
    pub plan: &'a ExtractionPlan,
    /// 需要的条目数，达到后停止继续展开 sitemap
    pub limit: usize,
}

/// 抓取边界构建器
///
/// 根据新闻源配置的订阅源、sitemap 或落地页枚举候选文章URL。
pub struct FrontierBuilder {
    engine: Arc<dyn ScraperEngine>,
    timeout: Duration,
    robots: Option<(Arc<dyn RobotsCheckerTrait>, String)>,
}

impl FrontierBuilder {
    pub fn new(engine: Arc<dyn ScraperEngine>, timeout: Duration) -> Self {
        Self {
            engine,
            timeout,
            robots: None,
        }
    }

    /// 获取订阅源、sitemap 和落地页之前先检查 robots.txt
    ///
    /// # 参数
    ///
    /// * `robots` - robots.txt 检查器
    /// * `user_agent` - 用于匹配规则的 User-Agent
    pub fn with_robots(mut self, robots: Arc<dyn RobotsCheckerTrait>, user_agent: &str) -> Self {
        self.robots = Some((robots, user_agent.to_string()));
        self
    }

    /// 构建规范化、去重后的候选URL列表
    ///
    /// 全量模式合并所有已配置的输入，单个输入失败只记录警告，全部失败才返回错误；
    /// 增量模式只使用订阅源、sitemap、落地页中第一个已配置的输入，失败即返回错误。
    pub async fn build(&self, request: &FrontierRequest<'_>) -> Result<Vec<Url>, FrontierError> {
        let source = request.source;
        let base = Url::parse(&source.url).map_err(|_| FrontierError::InvalidUrl(source.url.clone()))?;

        let mut candidates: Vec<(Url, FrontierEntry)> = Vec::new();

        match request.mode {
            CrawlMode::Incremental => {
                let entries = if let Some(feed_url) = &source.rss_url {
                    self.from_feed(feed_url).await?
                } else if let Some(sitemap_url) = &source.sitemap_url {
                    self.from_sitemap(sitemap_url, request.limit).await?
                } else {
                    self.from_landing_page(&base, request.plan).await?
                };
                candidates.extend(entries);
            }
            CrawlMode::Full => {
                let mut failures = Vec::new();
                let mut attempted = 0;

                if let Some(feed_url) = &source.rss_url {
                    attempted += 1;
                    match self.from_feed(feed_url).await {
                        Ok(entries) => candidates.extend(entries),
                        Err(e) => failures.push(e),
                    }
                }
                if let Some(sitemap_url) = &source.sitemap_url {
                    attempted += 1;
                    match self.from_sitemap(sitemap_url, request.limit).await {
                        Ok(entries) => candidates.extend(entries),
                        Err(e) => failures.push(e),
                    }
                }
                attempted += 1;
                match self.from_landing_page(&base, request.plan).await {
                    Ok(entries) => candidates.extend(entries),
                    Err(e) => failures.push(e),
                }

                if failures.len() == attempted {
                    if let Some(first) = failures.into_iter().next() {
                        return Err(first);
                    }
                } else {
                    for failure in failures {
                        warn!("Skipping frontier input for {}: {}", source.name, failure);
                    }
                }
            }
        }

        let mut seen = HashSet::new();
        let mut urls = Vec::new();
        let mut skipped_old = 0usize;
        let since = match request.mode {
            CrawlMode::Incremental => request.since,
            CrawlMode::Full => None,
        };
        for (url, entry) in candidates {
            if let (Some(since), Some(timestamp)) = (since, entry.timestamp) {
                if timestamp < since {
                    skipped_old += 1;
                    continue;
                }
            }
            if seen.insert(url.to_string()) {
                urls.push(url);
            }
        }

        info!(
            "Frontier for {} ({}): {} urls, {} skipped as older than last run",
            source.name,
            request.mode,
            urls.len(),
            skipped_old
        );
        Ok(urls)
    }

    async fn fetch_text(&self, url: &str) -> Result<(String, Url), FrontierError> {
        if let Some((robots, user_agent)) = &self.robots {
            match robots.is_allowed(url, user_agent).await {
                Ok(false) => return Err(FrontierError::Disallowed(url.to_string())),
                Ok(true) => {}
                Err(e) => warn!("robots.txt check failed for {}: {}", url, e),
            }
        }

        let response = self
            .engine
            .scrape(&ScrapeRequest::new(url, self.timeout))
            .await
            .map_err(|source| FrontierError::Fetch {
                url: url.to_string(),
                source,
            })?;
        let final_url =
            Url::parse(&response.final_url).map_err(|_| FrontierError::InvalidUrl(response.final_url.clone()))?;
        Ok((response.content, final_url))
    }

    async fn from_feed(&self, feed_url: &str) -> Result<Vec<(Url, FrontierEntry)>, FrontierError> {
        let (body, final_url) = self.fetch_text(feed_url).await?;
        let entries = parse_feed(&body).map_err(|message| FrontierError::Parse {
            url: feed_url.to_string(),
            message,
        })?;
        debug!("Feed {} yielded {} entries", feed_url, entries.len());
        Ok(resolve_entries(&final_url, entries))
    }

    async fn from_sitemap(
        &self,
        sitemap_url: &str,
        limit: usize,
    ) -> Result<Vec<(Url, FrontierEntry)>, FrontierError> {
        let mut queue = VecDeque::from([(sitemap_url.to_string(), 0usize)]);
        let mut visited = HashSet::new();
        let mut collected = Vec::new();

        while let Some((url, depth)) = queue.pop_front() {
            if collected.len() >= limit || !visited.insert(url.clone()) {
                continue;
            }

            let fetched = self.fetch_text(&url).await.and_then(|(body, final_url)| {
                parse_sitemap(&body)
                    .map(|doc| (doc, final_url))
                    .map_err(|message| FrontierError::Parse {
                        url: url.clone(),
                        message,
                    })
            });
            let (document, final_url) = match fetched {
                Ok(result) => result,
                // 根 sitemap 失败即失败，子 sitemap 失败只跳过
                Err(e) if depth == 0 => return Err(e),
                Err(e) => {
                    warn!("Skipping child sitemap: {}", e);
                    continue;
                }
            };

            collected.extend(resolve_entries(&final_url, document.urls));

            if depth < MAX_SITEMAP_DEPTH {
                for child in document.children {
                    if let Some(child_url) = normalize_url(&final_url, &child) {
                        queue.push_back((child_url.to_string(), depth + 1));
                    }
                }
            } else if !document.children.is_empty() {
                debug!(
                    "Sitemap {} exceeds depth {}, ignoring {} children",
                    url,
                    MAX_SITEMAP_DEPTH,
                    document.children.len()
                );
            }
        }

        Ok(collected)
    }

    async fn from_landing_page(
        &self,
        base: &Url,
        plan: &ExtractionPlan,
    ) -> Result<Vec<(Url, FrontierEntry)>, FrontierError> {
        let (body, final_url) = self.fetch_text(base.as_str()).await?;
        let links = LinkDiscoverer::extract_links(&body, plan.article_link_rule());
        Ok(LinkDiscoverer::filter_links(links, &final_url)
            .into_iter()
            .map(|url| {
                let entry = FrontierEntry {
                    link: url.to_string(),
                    timestamp: None,
                };
                (url, entry)
            })
            .collect())
    }
}

fn resolve_entries(base: &Url, entries: Vec<FrontierEntry>) -> Vec<(Url, FrontierEntry)> {
    entries
        .into_iter()
        .filter_map(|entry| normalize_url(base, &entry.link).map(|url| (url, entry)))
        .collect()
}

#[cfg(test)]
#[path = "frontier_service_test.rs"]
mod tests;
