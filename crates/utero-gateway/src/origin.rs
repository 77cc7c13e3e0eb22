//! Origin allow-list

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::warn;
use utero_core::ProxyConfig;

#[derive(Clone, Debug)]
pub struct OriginGuard {
    allowed: Vec<String>,
}

impl OriginGuard {
    pub fn new(allowed: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            allowed: allowed
                .into_iter()
                .map(|o| o.into().trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &ProxyConfig) -> Self {
        Self::new(config.allowed_origins.iter().cloned())
    }

    /// Parse a comma-separated origin list, as in `ALLOWED_ORIGINS`.
    pub fn parse_list(list: &str) -> Vec<String> {
        list.split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect()
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    /// Requests without an `Origin` header (same-origin, curl) pass.
    pub fn allows(&self, origin: Option<&str>) -> bool {
        match origin {
            None => true,
            Some(origin) => self.allowed.iter().any(|o| o == origin),
        }
    }
}

pub async fn check_origin(State(guard): State<Arc<OriginGuard>>, request: Request, next: Next) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .map(|v| v.to_str().unwrap_or_default().to_string());
    if guard.allows(origin.as_deref()) {
        return next.run(request).await;
    }
    warn!("Rejected request from origin {:?}", origin);
    (
        StatusCode::FORBIDDEN,
        Json(serde_json::json!({ "error": "Origin not allowed" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list() {
        let guard = OriginGuard::new(["http://localhost:5173"]);
        assert!(guard.allows(None));
        assert!(guard.allows(Some("http://localhost:5173")));
        assert!(!guard.allows(Some("http://evil.example")));
        assert!(!guard.allows(Some("")));
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            OriginGuard::parse_list("http://a.test, http://b.test,,"),
            vec!["http://a.test", "http://b.test"]
        );
    }
}
