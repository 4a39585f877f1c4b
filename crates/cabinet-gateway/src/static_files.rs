//! Static asset serving with single-page-app fallback
//!
//! Every path outside the API prefix lands here. A path that names an
//! existing file under the root is served as is; anything else falls back to
//! the index document so client-side routes keep working on reload.

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use bytes::Bytes;
use cabinet_core::{ApiError, ResultCode};
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

/// Bytes read from disk per body frame
const CHUNK_SIZE: usize = 64 * 1024;

/// Frames buffered between the reader task and the connection
const STREAM_BUFFER: usize = 8;

/// Serves files from a directory
#[derive(Clone, Debug)]
pub struct StaticFiles {
    root: PathBuf,
    index_file: String,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>, index_file: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            index_file: index_file.into(),
        }
    }

    /// Map a request path to the file that will be served
    pub async fn resolve(&self, request_path: &str) -> Result<PathBuf, ApiError> {
        let relative = sanitize(request_path)?;
        let index = self.root.join(&self.index_file);

        if !relative.as_os_str().is_empty() {
            let candidate = self.root.join(&relative);
            if is_file(&candidate).await {
                return Ok(candidate);
            }
        }

        if is_file(&index).await {
            return Ok(index);
        }

        Err(ApiError::custom(
            ResultCode::NotFound,
            format!("404 not found: {request_path}"),
        ))
    }

    /// Serve the file behind `request_path`, streaming it from disk
    pub async fn serve(&self, request_path: &str) -> Result<Response, ApiError> {
        let path = self.resolve(request_path).await?;
        file_response(&path).await
    }
}

/// Open a resolved file and stream it. I/O errors here are not a missing
/// asset and surface as `UNKNOWN`.
async fn file_response(path: &Path) -> Result<Response, ApiError> {
    let file = File::open(path).await?;
    let length = file.metadata().await?.len();

    debug!(path = %path.display(), length, "Serving static file");

    let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(STREAM_BUFFER);
    tokio::spawn(stream_file(file, tx));

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type(path))
        .header(header::CONTENT_LENGTH, length)
        .body(Body::from_stream(ReceiverStream::new(rx)))?;

    Ok(response)
}

/// Content type for a file, looked up by extension
pub fn content_type(path: &Path) -> HeaderValue {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    HeaderValue::from_str(mime.as_ref())
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"))
}

/// Percent-decode the request path and reduce it to plain relative segments.
/// `/` and the empty path become an empty relative path.
fn sanitize(request_path: &str) -> Result<PathBuf, ApiError> {
    let decoded = urlencoding::decode(request_path)
        .map_err(|_| ApiError::message(format!("malformed path: {request_path}")))?;

    let mut relative = PathBuf::new();
    for segment in decoded.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }

        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => relative.push(part),
            _ => return Err(ApiError::message(format!("illegal path: {request_path}"))),
        }
    }

    Ok(relative)
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

/// Pump the file into the body channel. The file is dropped when this task
/// ends, whether the copy finished, failed, or the client went away.
async fn stream_file(mut file: File, tx: mpsc::Sender<io::Result<Bytes>>) {
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match file.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(Ok(Bytes::copy_from_slice(&buf[..n]))).await.is_err() {
                    break;
                }
            }
            Err(err) => {
                let _ = tx.send(Err(err)).await;
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cabinet_core::Failure;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    fn bundle(with_index: bool) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        if with_index {
            fs::write(dir.path().join("index.html"), "<html>app</html>").unwrap();
        }
        fs::create_dir_all(dir.path().join("static/css")).unwrap();
        fs::write(dir.path().join("static/css/app.css"), "body{margin:0}").unwrap();
        fs::write(dir.path().join("logo.png"), [0x89, b'P', b'N', b'G']).unwrap();
        dir
    }

    async fn body_bytes(response: Response) -> Bytes {
        axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap()
    }

    #[rstest]
    #[case("index.html", "text/html")]
    #[case("style.css", "text/css")]
    #[case("logo.png", "image/png")]
    #[case("data.json", "application/json")]
    #[case("README", "application/octet-stream")]
    fn test_content_type(#[case] file: &str, #[case] expected: &str) {
        assert_eq!(content_type(Path::new(file)), expected);
    }

    #[tokio::test]
    async fn test_serves_existing_file() {
        let dir = bundle(true);
        let files = StaticFiles::new(dir.path(), "index.html");

        let response = files.serve("/static/css/app.css").await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "text/css");
        assert_eq!(response.headers().get(header::CONTENT_LENGTH).unwrap(), "14");
        assert_eq!(body_bytes(response).await, "body{margin:0}");
    }

    #[tokio::test]
    async fn test_root_serves_index() {
        let dir = bundle(true);
        let files = StaticFiles::new(dir.path(), "index.html");

        for path in ["/", ""] {
            let response = files.serve(path).await.unwrap();
            assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "text/html");
            assert_eq!(body_bytes(response).await, "<html>app</html>");
        }
    }

    #[tokio::test]
    async fn test_unknown_path_falls_back_to_index() {
        let dir = bundle(true);
        let files = StaticFiles::new(dir.path(), "index.html");

        let resolved = files.resolve("/matter/list").await.unwrap();
        assert_eq!(resolved, dir.path().join("index.html"));

        // directories are not files either
        let resolved = files.resolve("/static/css").await.unwrap();
        assert_eq!(resolved, dir.path().join("index.html"));
    }

    #[tokio::test]
    async fn test_missing_index_is_not_found() {
        let dir = bundle(false);
        let files = StaticFiles::new(dir.path(), "index.html");

        let err = files.resolve("/matter/list").await.unwrap_err();
        let result = err.into_web_result();
        assert_eq!(result.code, ResultCode::NotFound);
        assert!(result.msg.contains("/matter/list"));
    }

    #[tokio::test]
    async fn test_percent_encoded_path() {
        let dir = bundle(true);
        fs::write(dir.path().join("my notes.txt"), "hi").unwrap();
        let files = StaticFiles::new(dir.path(), "index.html");

        let resolved = files.resolve("/my%20notes.txt").await.unwrap();
        assert_eq!(resolved, dir.path().join("my notes.txt"));
    }

    #[tokio::test]
    async fn test_file_gone_after_resolve_is_unknown() {
        let dir = bundle(true);
        let path = dir.path().join("logo.png");
        fs::remove_file(&path).unwrap();

        let result = file_response(&path).await.unwrap_err().into_web_result();
        assert_eq!(result.code, ResultCode::Unknown);
        assert_eq!(result.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_file_is_unknown() {
        use std::os::unix::fs::PermissionsExt;

        let dir = bundle(true);
        let path = dir.path().join("static/css/app.css");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read(&path).is_ok() {
            // privileged users read through permission bits
            return;
        }

        let files = StaticFiles::new(dir.path(), "index.html");
        let result = files
            .serve("/static/css/app.css")
            .await
            .unwrap_err()
            .into_web_result();
        assert_eq!(result.code, ResultCode::Unknown);
    }

    #[rstest]
    #[case("/../secret")]
    #[case("/static/../../secret")]
    #[case("/%2e%2e/secret")]
    #[tokio::test]
    async fn test_traversal_rejected(#[case] path: &str) {
        let dir = bundle(true);
        let files = StaticFiles::new(dir.path(), "index.html");

        let err = files.resolve(path).await.unwrap_err();
        assert!(matches!(err.failure(), Failure::Message(_)));
    }
}
