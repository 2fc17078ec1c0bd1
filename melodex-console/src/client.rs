//! Shared HTTP client for the catalog backend
//!
//! Every request goes through [`ApiClient`]: it attaches the bearer token,
//! applies the fixed timeout, maps transport and HTTP failures onto the common
//! error taxonomy, and normalizes the envelope into a [`Payload`].

use melodex_common::config::ClientConfig;
use melodex_common::envelope::{self, Envelope};
use melodex_common::{Error, Payload, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, StatusCode};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::session::SessionStore;

const USER_AGENT: &str = concat!("melodex/", env!("CARGO_PKG_VERSION"));

/// Upload body chunk; one progress callback per chunk
pub const UPLOAD_CHUNK: usize = 64 * 1024;

/// Progress callback: `(bytes_sent, bytes_total)`
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// Where request parameters travel; the backend is not consistent about it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyShape {
    Query,
    Form,
    Json,
}

/// One backend operation
///
/// `path` may contain `{id}` and `{scope}` placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub method: Method,
    pub path: &'static str,
    pub shape: BodyShape,
}

impl Endpoint {
    pub const fn new(method: Method, path: &'static str, shape: BodyShape) -> Self {
        Self { method, path, shape }
    }

    pub fn takes_id_in_path(&self) -> bool {
        self.path.contains("{id}")
    }
}

/// Accepted files for an upload endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadRules {
    /// Multipart field carrying the file
    pub field: &'static str,
    /// Lowercase extensions without the dot
    pub extensions: &'static [&'static str],
    pub max_bytes: u64,
}

impl UploadRules {
    /// Reject wrong type or oversized files before anything is sent
    pub fn check(&self, file: &Path, size: u64) -> Result<()> {
        let ext = file
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        if !self.extensions.iter().any(|allowed| *allowed == ext) {
            return Err(Error::Validation(format!(
                "Unsupported file type {:?}; expected one of: {}",
                ext,
                self.extensions.join(", ")
            )));
        }
        if size == 0 {
            return Err(Error::Validation("File is empty".to_string()));
        }
        if size > self.max_bytes {
            return Err(Error::Validation(format!(
                "File is too large ({} bytes, limit {} bytes)",
                size, self.max_bytes
            )));
        }
        Ok(())
    }
}

fn mime_for(file: &Path) -> &'static str {
    match file
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .as_deref()
    {
        Some("mp3") => "audio/mpeg",
        Some("flac") => "audio/flac",
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",
        Some("m4a") => "audio/mp4",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// A resolved request ready to send
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub shape: BodyShape,
    pub params: Vec<(String, Value)>,
}

impl ApiRequest {
    /// Fill in path placeholders; an id with nowhere to go in the path
    /// becomes an `id` parameter
    pub fn for_endpoint(endpoint: &Endpoint, id: Option<i64>, scope: Option<&str>) -> Self {
        let mut path = endpoint.path.to_string();
        let mut params = Vec::new();
        if let Some(scope) = scope {
            path = path.replace("{scope}", scope);
        }
        if let Some(id) = id {
            if endpoint.takes_id_in_path() {
                path = path.replace("{id}", &id.to_string());
            } else {
                params.push(("id".to_string(), Value::from(id)));
            }
        }
        Self {
            method: endpoint.method,
            path,
            shape: endpoint.shape,
            params,
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn params(mut self, extra: impl IntoIterator<Item = (String, Value)>) -> Self {
        self.params.extend(extra);
        self
    }

    /// Parameters flattened to strings for query strings and form bodies
    fn string_pairs(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .map(|(k, v)| (k.clone(), value_to_param(v)))
            .collect()
    }

    fn json_body(&self) -> Value {
        let map: Map<String, Value> = self.params.iter().cloned().collect();
        Value::Object(map)
    }
}

fn value_to_param(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(items) => items
            .iter()
            .map(value_to_param)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

/// Backend HTTP client
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<dyn SessionStore>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, session: Arc<dyn SessionStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    /// Absolute URLs pass through; relative paths are joined to the base URL
    pub fn resolve_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    fn builder(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let builder = match method {
            Method::Get => self.http.get(url),
            Method::Post => self.http.post(url),
            Method::Put => self.http.put(url),
            Method::Delete => self.http.delete(url),
        };
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and normalize the envelope
    pub async fn send(&self, request: ApiRequest) -> Result<Payload> {
        let url = self.resolve_url(&request.path);
        debug!(method = ?request.method, url = %url, params = request.params.len(), "Sending request");

        let builder = self.builder(request.method, &url);
        let builder = match request.shape {
            BodyShape::Query => builder.query(&request.string_pairs()),
            BodyShape::Form => builder.form(&request.string_pairs()),
            BodyShape::Json => builder.json(&request.json_body()),
        };

        self.finish(builder, &url).await
    }

    /// Multipart upload with per-chunk progress
    ///
    /// Validation happens before the file is read or anything is sent.
    pub async fn upload(
        &self,
        endpoint: &Endpoint,
        file: &Path,
        rules: &UploadRules,
        extra: Vec<(String, String)>,
        progress: ProgressFn,
    ) -> Result<Payload> {
        let metadata = tokio::fs::metadata(file).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Validation(format!("File not found: {}", file.display()))
            } else {
                Error::Io(e)
            }
        })?;
        rules.check(file, metadata.len())?;

        let bytes = tokio::fs::read(file).await?;
        let total = bytes.len() as u64;
        let chunks: Vec<Vec<u8>> = bytes.chunks(UPLOAD_CHUNK).map(<[u8]>::to_vec).collect();

        let mut sent = 0u64;
        let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len() as u64;
            progress(sent, total);
            Ok::<_, std::io::Error>(chunk)
        }));

        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let part = Part::stream_with_length(Body::wrap_stream(stream), total)
            .file_name(file_name)
            .mime_str(mime_for(file))
            .map_err(|e| Error::Validation(e.to_string()))?;

        let mut form = Form::new().part(rules.field, part);
        for (key, value) in extra {
            form = form.text(key, value);
        }

        let request = ApiRequest::for_endpoint(endpoint, None, None);
        let url = self.resolve_url(&request.path);
        debug!(url = %url, bytes = total, "Uploading file");

        let builder = self.builder(request.method, &url).multipart(form);
        self.finish(builder, &url).await
    }

    async fn finish(&self, builder: reqwest::RequestBuilder, url: &str) -> Result<Payload> {
        let response = builder
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(url = %url, status = status.as_u16(), "Session rejected, clearing token");
            self.session.clear();
            return Err(Error::Unauthorized(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<Envelope>(&body)
                .ok()
                .and_then(|env| env.message());
            return Err(Error::Application {
                code: status.as_u16().to_string(),
                message,
            });
        }

        envelope::normalize_body(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySession;
    use serde_json::json;
    use std::path::PathBuf;

    const AUDIO: UploadRules = UploadRules {
        field: "file",
        extensions: &["mp3", "flac"],
        max_bytes: 100,
    };

    #[test]
    fn test_id_in_path() {
        let ep = Endpoint::new(Method::Delete, "/song/{id}", BodyShape::Query);
        let req = ApiRequest::for_endpoint(&ep, Some(9), None);
        assert_eq!(req.path, "/song/9");
        assert!(req.params.is_empty());
    }

    #[test]
    fn test_id_as_param_and_scope() {
        let ep = Endpoint::new(Method::Post, "/tag/{scope}/remove", BodyShape::Form);
        let req = ApiRequest::for_endpoint(&ep, Some(3), Some("12"));
        assert_eq!(req.path, "/tag/12/remove");
        assert_eq!(req.params, vec![("id".to_string(), json!(3))]);
    }

    #[test]
    fn test_param_flattening() {
        let ep = Endpoint::new(Method::Post, "/x", BodyShape::Form);
        let req = ApiRequest::for_endpoint(&ep, None, None)
            .param("ids", json!([1, 2, 3]))
            .param("name", "Blue");
        assert_eq!(
            req.string_pairs(),
            vec![
                ("ids".to_string(), "1,2,3".to_string()),
                ("name".to_string(), "Blue".to_string())
            ]
        );
        assert_eq!(req.json_body(), json!({"ids": [1, 2, 3], "name": "Blue"}));
    }

    #[test]
    fn test_upload_rules() {
        assert!(AUDIO.check(&PathBuf::from("a.MP3"), 10).is_ok());
        assert!(matches!(
            AUDIO.check(&PathBuf::from("a.exe"), 10),
            Err(Error::Validation(_))
        ));
        assert!(AUDIO.check(&PathBuf::from("a.flac"), 101).is_err());
        assert!(AUDIO.check(&PathBuf::from("a.flac"), 0).is_err());
        assert!(AUDIO.check(&PathBuf::from("noext"), 10).is_err());
    }

    #[test]
    fn test_resolve_url() {
        let config = ClientConfig {
            base_url: "http://host:1/api".to_string(),
            ..Default::default()
        };
        let client = ApiClient::new(&config, Arc::new(MemorySession::default())).unwrap();
        assert_eq!(client.resolve_url("/song/list"), "http://host:1/api/song/list");
        assert_eq!(client.resolve_url("media/a.mp3"), "http://host:1/api/media/a.mp3");
        assert_eq!(client.resolve_url("https://cdn/x.mp3"), "https://cdn/x.mp3");
    }

    #[test]
    fn test_mime_lookup() {
        assert_eq!(mime_for(Path::new("x.Mp3")), "audio/mpeg");
        assert_eq!(mime_for(Path::new("x.jpeg")), "image/jpeg");
        assert_eq!(mime_for(Path::new("x")), "application/octet-stream");
    }
}
