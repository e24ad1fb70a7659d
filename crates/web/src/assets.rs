use std::path::{Component, Path, PathBuf};

use axum::extract::State;
use axum::http::{HeaderValue, Method, Uri, header};
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::WebState;
use crate::error::ApiError;

const INDEX: &str = "index.html";

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain; charset=utf-8",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}

/// Map a request path onto the static root, refusing anything that climbs out.
fn resolve(root: &Path, uri_path: &str) -> Option<PathBuf> {
    let mut resolved = root.to_path_buf();
    for component in Path::new(uri_path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(resolved)
}

async fn read_file(path: &Path) -> Option<Response> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    if !metadata.is_file() {
        return None;
    }
    let bytes = tokio::fs::read(path).await.ok()?;
    let mut resp = bytes.into_response();
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type(path)),
    );
    Some(resp)
}

/// Serve files from the static directory, falling back to `index.html`.
pub(crate) async fn static_fallback(
    State(state): State<WebState>,
    method: Method,
    uri: Uri,
) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return ApiError::NotFound.into_response();
    }
    let Some(root) = state.config.static_dir.as_deref() else {
        return ApiError::NotFound.into_response();
    };

    if let Some(candidate) = resolve(root, uri.path()) {
        if let Some(resp) = read_file(&candidate).await {
            return resp;
        }
    }

    debug!(path = uri.path(), "serving index.html fallback");
    match read_file(&root.join(INDEX)).await {
        Some(resp) => resp,
        None => ApiError::NotFound.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_rejects_parent_components() {
        let root = Path::new("/srv/public");
        assert_eq!(resolve(root, "/../etc/passwd"), None);
        assert_eq!(resolve(root, "/a/../../b"), None);
    }

    #[test]
    fn resolve_joins_normal_paths() {
        let root = Path::new("/srv/public");
        assert_eq!(
            resolve(root, "/css/site.css"),
            Some(PathBuf::from("/srv/public/css/site.css"))
        );
        assert_eq!(resolve(root, "/"), Some(PathBuf::from("/srv/public")));
    }

    #[test]
    fn known_extensions_get_content_types() {
        assert_eq!(content_type(Path::new("app.js")), "text/javascript; charset=utf-8");
        assert_eq!(content_type(Path::new("index.html")), "text/html; charset=utf-8");
        assert_eq!(content_type(Path::new("blob.bin")), "application/octet-stream");
    }
}
