//! Static files served next to the WebSocket endpoints
//!
//! The content is handed in at construction so the library carries no
//! embedded files of its own; the binary supplies its monitoring page.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;

#[derive(Debug, Clone)]
struct Asset {
    content_type: &'static str,
    body: Vec<u8>,
}

/// Read-only map of request path to file content
#[derive(Debug, Clone, Default)]
pub struct StaticAssets {
    files: Arc<HashMap<String, Asset>>,
}

impl StaticAssets {
    /// No files; every path answers 404
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` at `/` and `/index.html`
    pub fn with_index(self, html: impl Into<Vec<u8>>) -> Self {
        self.with_file("/index.html", "text/html; charset=utf-8", html)
    }

    /// Add a file at `path`, which is normalized to start with `/`
    pub fn with_file(
        self,
        path: &str,
        content_type: &'static str,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        let mut files = Arc::unwrap_or_clone(self.files);
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        files.insert(
            path,
            Asset {
                content_type,
                body: body.into(),
            },
        );
        Self {
            files: Arc::new(files),
        }
    }

    /// Content type and body for a request path.
    ///
    /// `/` maps to `/index.html`; any other path ending in `/` is a directory
    /// and never matches.
    pub fn get(&self, path: &str) -> Option<(&'static str, &[u8])> {
        let path = match path {
            "" | "/" => "/index.html",
            p if p.ends_with('/') => return None,
            p => p,
        };
        self.files
            .get(path)
            .map(|asset| (asset.content_type, asset.body.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Fallback router answering from these assets
    pub fn router(&self) -> Router {
        Router::new()
            .fallback(serve_asset)
            .with_state(self.clone())
    }
}

async fn serve_asset(State(assets): State<StaticAssets>, uri: Uri) -> Response {
    match assets.get(uri.path()) {
        Some((content_type, body)) => {
            ([(header::CONTENT_TYPE, content_type)], body.to_vec()).into_response()
        }
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}
