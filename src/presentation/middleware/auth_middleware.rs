// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::presentation::errors::ApiError;

/// API 密钥请求头
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone, Default)]
pub struct AuthState {
    /// 期望的 API 密钥；为空时不做认证
    pub api_key: Option<Arc<str>>,
}

impl AuthState {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()).map(Arc::from),
        }
    }
}

pub async fn auth_middleware(State(state): State<AuthState>, req: Request, next: Next) -> Response {
    let Some(expected) = state.api_key.as_deref() else {
        return next.run(req).await;
    };

    let path = req.uri().path().to_string();
    debug!("AuthMiddleware processing path: {}", path);

    let provided = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match provided {
        None => ApiError::new(StatusCode::FORBIDDEN, "No API key provided").into_response(),
        Some(key) if key != expected => {
            warn!("Invalid API key for {}", path);
            ApiError::new(StatusCode::FORBIDDEN, "Invalid API key").into_response()
        }
        Some(_) => next.run(req).await,
    }
}
