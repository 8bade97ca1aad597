//! Static and SPA route registration.
//!
//! # Responsibilities
//! - Keep API and short-link paths away from the bundle
//! - Serve `/assets/*` with a long-lived immutable cache directive
//! - Serve every other unknown path as the root document
//!
//! # Design Decisions
//! - Registered as the router fallback, so any explicit API route wins
//! - Cache header wraps only the assets route, and only on success

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{header, header::InvalidHeaderValue, HeaderValue, Method, Response, StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::assets::provider::{content_type, AssetProvider};
use crate::config::{AssetsConfig, API_PREFIX};
use crate::http::error::ApiError;

/// Root document served for SPA fallback.
pub const INDEX_DOCUMENT: &str = "index.html";

const ASSETS_DIR: &str = "assets";

/// Path prefixes that must never be resolved against the bundle.
#[derive(Debug, Clone)]
pub struct SkipRule {
    prefixes: Vec<String>,
}

impl SkipRule {
    pub fn new(prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// The API root, any extra reserved prefixes, and the short-link prefix.
    pub fn from_config(config: &AssetsConfig) -> Self {
        let mut prefixes = vec![API_PREFIX.to_string()];
        for prefix in config
            .api_prefixes
            .iter()
            .chain(std::iter::once(&config.redirect_prefix))
        {
            if !prefixes.contains(prefix) {
                prefixes.push(prefix.clone());
            }
        }
        Self::new(prefixes)
    }

    /// True if `path` belongs to an API or short-link prefix.
    ///
    /// The bare prefix without its trailing slash (`/api`) also matches.
    pub fn matches(&self, path: &str) -> bool {
        self.prefixes
            .iter()
            .any(|p| path.starts_with(p.as_str()) || path == p.trim_end_matches('/'))
    }
}

#[derive(Clone)]
struct StaticState {
    provider: Arc<dyn AssetProvider>,
    skip: SkipRule,
}

/// Build the static router: the immutable assets mount plus the SPA fallback.
///
/// Merge it last so API routes registered elsewhere take precedence. Fails
/// if `cache_control` is not a valid header value.
pub fn static_router(
    provider: Arc<dyn AssetProvider>,
    config: &AssetsConfig,
) -> Result<Router, InvalidHeaderValue> {
    let cache_control = HeaderValue::from_str(&config.cache_control)?;
    let state = StaticState {
        provider,
        skip: SkipRule::from_config(config),
    };

    let cache_layer = SetResponseHeaderLayer::overriding(
        header::CACHE_CONTROL,
        move |res: &Response<Body>| res.status().is_success().then(|| cache_control.clone()),
    );

    Ok(Router::new()
        .route(
            "/assets/{*path}",
            get(serve_immutable_asset).layer(cache_layer),
        )
        .fallback(serve_spa)
        .with_state(state))
}

async fn serve_immutable_asset(
    State(state): State<StaticState>,
    Path(path): Path<String>,
) -> Response<Body> {
    let located = normalize(&format!("{}/{}", ASSETS_DIR, path))
        .and_then(|rel| state.provider.open(&rel).map(|bytes| (rel, bytes)));

    match located {
        Some((rel, bytes)) => file_response(&rel, bytes, false),
        None => ApiError::NotFound(format!("asset /{}/{}", ASSETS_DIR, path)).into_response(),
    }
}

async fn serve_spa(State(state): State<StaticState>, method: Method, uri: Uri) -> Response<Body> {
    let path = uri.path();

    if state.skip.matches(path) {
        return ApiError::NotFound(format!("no route for {}", path)).into_response();
    }

    if method != Method::GET && method != Method::HEAD {
        let mut response = ApiError::MethodNotAllowed.into_response();
        response
            .headers_mut()
            .insert(header::ALLOW, HeaderValue::from_static("GET, HEAD"));
        return response;
    }
    let head = method == Method::HEAD;

    if let Some(rel) = normalize(path) {
        if let Some(bytes) = state.provider.open(&rel) {
            return file_response(&rel, bytes, head);
        }
    }

    match state.provider.open(INDEX_DOCUMENT) {
        Some(bytes) => file_response(INDEX_DOCUMENT, bytes, head),
        None => ApiError::NotFound(format!("no file for {}", path)).into_response(),
    }
}

fn file_response(path: &str, bytes: Bytes, head: bool) -> Response<Body> {
    let len = bytes.len();
    let body = if head { Body::empty() } else { Body::from(bytes) };
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type(path)),
            (header::CONTENT_LENGTH, HeaderValue::from(len)),
        ],
        body,
    )
        .into_response()
}

/// Map a request path to a bundle-relative file path.
///
/// Directory paths resolve to their `index.html`. Returns `None` for paths
/// that could escape the bundle or are otherwise malformed.
fn normalize(path: &str) -> Option<String> {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        return Some(INDEX_DOCUMENT.to_string());
    }

    let (body, is_dir) = match trimmed.strip_suffix('/') {
        Some(body) => (body, true),
        None => (trimmed, false),
    };

    let mut segments = Vec::new();
    for segment in body.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
            return None;
        }
        segments.push(segment);
    }

    let mut rel = segments.join("/");
    if is_dir {
        rel.push('/');
        rel.push_str(INDEX_DOCUMENT);
    }
    Some(rel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::provider::MemoryAssets;
    use axum::http::Request;
    use tower::ServiceExt;

    fn bundle() -> Arc<dyn AssetProvider> {
        Arc::new(
            MemoryAssets::new()
                .with_file("index.html", "<html>root</html>")
                .with_file("favicon.ico", "ico")
                .with_file("docs/index.html", "<html>docs</html>")
                .with_file("assets/app.abc123.js", "console.log('app')")
                .with_file("api/v1/x", "should never be served"),
        )
    }

    fn router() -> Router {
        static_router(bundle(), &AssetsConfig::default()).unwrap()
    }

    async fn send(router: Router, method: Method, uri: &str) -> Response<Body> {
        router
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_text(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn normalize_paths() {
        assert_eq!(normalize("/").as_deref(), Some("index.html"));
        assert_eq!(normalize("/favicon.ico").as_deref(), Some("favicon.ico"));
        assert_eq!(normalize("/docs/").as_deref(), Some("docs/index.html"));
        assert_eq!(normalize("/a/../etc/passwd"), None);
        assert_eq!(normalize("/a//b"), None);
        assert_eq!(normalize("/a\\b"), None);
    }

    #[test]
    fn skip_rule_matches_prefixes() {
        let rule = SkipRule::from_config(&AssetsConfig::default());
        assert!(rule.matches("/api/v1/x"));
        assert!(rule.matches("/api"));
        assert!(rule.matches("/s/abc"));
        assert!(!rule.matches("/apiary"));
        assert!(!rule.matches("/settings"));
    }

    #[test]
    fn api_root_is_always_reserved() {
        let config = AssetsConfig {
            api_prefixes: Vec::new(),
            redirect_prefix: "/go/".into(),
            ..AssetsConfig::default()
        };
        let rule = SkipRule::from_config(&config);
        assert!(rule.matches("/api/v1/status"));
        assert!(rule.matches("/go/abc"));
        assert!(!rule.matches("/s/abc"));
    }

    #[test]
    fn invalid_cache_control_is_rejected() {
        let config = AssetsConfig {
            cache_control: "max-age=60\nX-Injected: 1".into(),
            ..AssetsConfig::default()
        };
        assert!(static_router(bundle(), &config).is_err());
    }

    #[tokio::test]
    async fn configured_cache_control_is_applied() {
        let config = AssetsConfig {
            cache_control: "public, max-age=60".into(),
            ..AssetsConfig::default()
        };
        let router = static_router(bundle(), &config).unwrap();
        let response = send(router, Method::GET, "/assets/app.abc123.js").await;
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "public, max-age=60"
        );
    }

    #[tokio::test]
    async fn api_paths_never_hit_bundle() {
        let response = send(router(), Method::GET, "/api/v1/x").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(!body_text(response).await.contains("should never be served"));
    }

    #[tokio::test]
    async fn unknown_path_falls_back_to_index() {
        let response = send(router(), Method::GET, "/foo/bar").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
        assert_eq!(body_text(response).await, "<html>root</html>");
    }

    #[tokio::test]
    async fn directory_index_is_served() {
        let response = send(router(), Method::GET, "/docs/").await;
        assert_eq!(body_text(response).await, "<html>docs</html>");
    }

    #[tokio::test]
    async fn assets_are_immutable() {
        let response = send(router(), Method::GET, "/assets/app.abc123.js").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "max-age=31536000, immutable"
        );
    }

    #[tokio::test]
    async fn other_files_have_no_cache_directive() {
        let response = send(router(), Method::GET, "/favicon.ico").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::CACHE_CONTROL).is_none());
        assert_eq!(body_text(response).await, "ico");
    }

    #[tokio::test]
    async fn missing_asset_is_404_without_cache_header() {
        let response = send(router(), Method::GET, "/assets/app.old999.js").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(header::CACHE_CONTROL).is_none());
    }

    #[tokio::test]
    async fn head_returns_headers_only() {
        let response = send(router(), Method::HEAD, "/favicon.ico").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(header::CONTENT_LENGTH).unwrap(), "3");
        assert!(body_text(response).await.is_empty());
    }

    #[tokio::test]
    async fn post_to_static_is_rejected() {
        let response = send(router(), Method::POST, "/foo").await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(header::ALLOW).unwrap(), "GET, HEAD");
    }

    #[tokio::test]
    async fn missing_index_is_404() {
        let empty: Arc<dyn AssetProvider> = Arc::new(MemoryAssets::new());
        let router = static_router(empty, &AssetsConfig::default()).unwrap();
        let response = send(router, Method::GET, "/x").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
