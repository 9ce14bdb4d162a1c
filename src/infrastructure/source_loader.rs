// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::models::source::{Source, SourceValidationError};
use crate::domain::repositories::source_repository::SourceRepository;
use crate::domain::repositories::RepositoryError;

/// 新闻源文件加载错误
#[derive(Error, Debug)]
pub enum SourceLoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid sources file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid source definition: {0}")]
    Invalid(#[from] SourceValidationError),
    #[error("duplicate source name '{0}'")]
    Duplicate(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// 文件既可以是新闻源列表，也可以是带 `sources` 键的映射
#[derive(Deserialize)]
#[serde(untagged)]
enum SourcesDocument {
    List(Vec<Source>),
    Wrapped { sources: Vec<Source> },
}

/// 解析并校验新闻源定义
///
/// 任何一条定义无效时整体失败
pub fn parse_sources(yaml: &str) -> Result<Vec<Source>, SourceLoadError> {
    let sources = match serde_yaml::from_str::<SourcesDocument>(yaml)? {
        SourcesDocument::List(sources) => sources,
        SourcesDocument::Wrapped { sources } => sources,
    };

    let mut seen = std::collections::HashSet::new();
    for source in &sources {
        source.validate()?;
        if !seen.insert(source.name.as_str()) {
            return Err(SourceLoadError::Duplicate(source.name.clone()));
        }
    }
    Ok(sources)
}

/// 从文件加载新闻源并按名称写入仓库
///
/// # 参数
///
/// * `repo` - 新闻源仓库
/// * `path` - YAML 文件路径
///
/// # 返回值
///
/// * `Ok(usize)` - 写入的新闻源数量；文件不存在时为0
/// * `Err(SourceLoadError)` - 文件无法读取、格式错误或写入失败
pub async fn seed_sources<SR>(repo: &SR, path: &Path) -> Result<usize, SourceLoadError>
where
    SR: SourceRepository + ?Sized,
{
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Sources file {} not found, skipping seeding", path.display());
            return Ok(0);
        }
        Err(source) => {
            return Err(SourceLoadError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let sources = parse_sources(&content)?;
    for source in &sources {
        let saved = repo.upsert_by_name(source).await?;
        info!(
            "Seeded source {} (enabled={}, rate_limit={}/s)",
            saved.name, saved.enabled, saved.rate_limit
        );
    }
    Ok(sources.len())
}
