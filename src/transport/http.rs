//! HTTP transport
//!
//! Talks to the processing backend over two endpoints:
//! - `POST {base}/upload/`  multipart body with a single `file` field
//! - `POST {base}/process/` JSON body `{data, natural_language_input}`
//!
//! Both requests are capped by the configured timeout (30 s by default).
//! Non-2xx responses are turned into [`TransportError::Status`] carrying the
//! `message` field of the error body when present.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{
    ProcessingTransport, TransportError, UploadFile, UploadTransport, PROCESS_FALLBACK_MESSAGE,
    UPLOAD_FALLBACK_MESSAGE,
};
use crate::config::ApiConfig;
use crate::intake::PatternRequest;
use crate::normalize::RawProcessingPayload;
use crate::types::{Dataset, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Upload,
    Process,
}

impl Endpoint {
    fn path(self) -> &'static str {
        match self {
            Endpoint::Upload => "/upload/",
            Endpoint::Process => "/process/",
        }
    }

    fn fallback_message(self) -> &'static str {
        match self {
            Endpoint::Upload => UPLOAD_FALLBACK_MESSAGE,
            Endpoint::Process => PROCESS_FALLBACK_MESSAGE,
        }
    }
}

#[derive(Serialize)]
struct ProcessRequest<'a> {
    data: &'a [Row],
    natural_language_input: &'a str,
}

#[derive(Deserialize)]
struct UploadResponse {
    data: Vec<Row>,
    columns: Vec<Value>,
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    row_count: Option<u64>,
    #[serde(default)]
    column_count: Option<u64>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

pub struct HttpTransport {
    client: Client,
    base_url: String,
    timeout_ms: u64,
}

impl HttpTransport {
    pub fn new(config: &ApiConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| TransportError::Network {
                message: "Could not create HTTP client".to_string(),
                detail: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_ms: config.timeout_ms,
        })
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    fn request_error(&self, endpoint: Endpoint, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                message: endpoint.fallback_message().to_string(),
                timeout_ms: self.timeout_ms,
            }
        } else {
            TransportError::Network {
                message: endpoint.fallback_message().to_string(),
                detail: err.to_string(),
            }
        }
    }

    /// Send a request and return the body of a 2xx response
    async fn send(
        &self,
        endpoint: Endpoint,
        request: RequestBuilder,
    ) -> Result<bytes::Bytes, TransportError> {
        let response = request
            .send()
            .await
            .map_err(|e| self.request_error(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response, endpoint.fallback_message()).await;
            warn!(endpoint = endpoint.path(), status = status.as_u16(), %message, "backend rejected request");
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.request_error(endpoint, e))?;

        debug!(endpoint = endpoint.path(), bytes = body.len(), "backend response received");
        Ok(body)
    }
}

/// Pull `message` out of a structured error body, falling back to a generic text
async fn error_message(response: Response, fallback: &str) -> String {
    let body = response.bytes().await.unwrap_or_default();
    serde_json::from_slice::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Spreadsheet headers may arrive as numbers; row keys are always their
/// JSON text (`2023`, `1.5`)
fn column_name(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn invalid_response(endpoint: Endpoint, detail: impl ToString) -> TransportError {
    TransportError::InvalidResponse {
        message: endpoint.fallback_message().to_string(),
        detail: detail.to_string(),
    }
}

#[async_trait]
impl UploadTransport for HttpTransport {
    async fn upload(&self, file: &UploadFile) -> Result<Dataset, TransportError> {
        let endpoint = Endpoint::Upload;

        let contents = file
            .read_contents()
            .await
            .map_err(|e| TransportError::ReadFile {
                message: endpoint.fallback_message().to_string(),
                path: file.info.name.clone(),
                detail: e.to_string(),
            })?;

        let mime = mime_guess::from_path(&file.info.name).first_or_octet_stream();
        let part = Part::bytes(contents.to_vec())
            .file_name(file.info.name.clone())
            .mime_str(mime.as_ref())
            .map_err(|e| self.request_error(endpoint, e))?;
        let form = Form::new().part("file", part);

        info!(file = %file.info.name, size_bytes = file.info.size_bytes, "uploading file");

        let body = self
            .send(endpoint, self.client.post(self.url(endpoint)).multipart(form))
            .await?;

        let parsed: UploadResponse =
            serde_json::from_slice(&body).map_err(|e| invalid_response(endpoint, e))?;

        let columns = parsed.columns.iter().map(column_name).collect();
        let dataset = Dataset::new(columns, parsed.data)
            .map_err(|e| invalid_response(endpoint, e))?
            .with_metadata(parsed.file_name, parsed.row_count, parsed.column_count);

        info!(
            columns = dataset.columns().len(),
            rows = dataset.rows().len(),
            total_rows = dataset.total_rows(),
            "upload complete"
        );
        Ok(dataset)
    }
}

#[async_trait]
impl ProcessingTransport for HttpTransport {
    async fn process(
        &self,
        dataset: &Dataset,
        pattern: &PatternRequest,
    ) -> Result<RawProcessingPayload, TransportError> {
        let endpoint = Endpoint::Process;
        let request = ProcessRequest {
            data: dataset.rows(),
            natural_language_input: pattern.as_str(),
        };

        info!(rows = dataset.rows().len(), instruction = %pattern, "sending processing request");

        let body = self
            .send(endpoint, self.client.post(self.url(endpoint)).json(&request))
            .await?;

        let payload: serde_json::Value =
            serde_json::from_slice(&body).map_err(|e| invalid_response(endpoint, e))?;

        Ok(RawProcessingPayload::new(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::FileSource;
    use crate::intake::FileInfo;
    use mockito::Matcher;
    use serde_json::json;
    use std::path::PathBuf;

    fn transport_for(server: &mockito::ServerGuard) -> HttpTransport {
        HttpTransport::new(&ApiConfig {
            base_url: format!("{}/api/", server.url()),
            timeout_ms: 2_000,
        })
        .unwrap()
    }

    fn sample_dataset() -> Dataset {
        let rows = vec![json!({"email": "a@b.com"}).as_object().cloned().unwrap()];
        Dataset::new(vec!["email".into()], rows).unwrap()
    }

    #[tokio::test]
    async fn test_upload_sends_multipart_and_parses_dataset() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/upload/")
            .match_header("content-type", Matcher::Regex("^multipart/form-data".into()))
            .match_body(Matcher::Regex(r#"name="file"; filename="people.csv""#.into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "success": true,
                    "file_name": "people.csv",
                    "data": [{"name": "Ann", "email": "ann@example.com"}],
                    "columns": ["name", "email"],
                    "row_count": 1,
                    "column_count": 2
                })
                .to_string(),
            )
            .create_async()
            .await;

        let transport = transport_for(&server);
        let file = UploadFile::from_bytes("people.csv", "name,email\nAnn,ann@example.com\n");
        let dataset = transport.upload(&file).await.unwrap();

        mock.assert_async().await;
        assert_eq!(dataset.columns(), ["name".to_string(), "email".to_string()]);
        assert_eq!(dataset.rows().len(), 1);
        assert_eq!(dataset.file_name(), Some("people.csv"));
        let keys: Vec<&String> = dataset.rows()[0].keys().collect();
        assert_eq!(keys, ["name", "email"]);
    }

    #[tokio::test]
    async fn test_upload_accepts_numeric_headers() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/upload/")
            .with_status(200)
            .with_body(
                json!({
                    "data": [{"2023": 10, "1.5": "x", "name": "Ann"}],
                    "columns": [2023, 1.5, "name"]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let dataset = transport_for(&server)
            .upload(&UploadFile::from_bytes("sales.xlsx", "xlsx"))
            .await
            .unwrap();

        assert_eq!(dataset.columns(), ["2023", "1.5", "name"]);
        assert_eq!(dataset.rows()[0]["2023"], json!(10));
    }

    #[tokio::test]
    async fn test_upload_error_uses_server_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/upload/")
            .with_status(400)
            .with_body(
                json!({"error": "File validation failed.", "message": "File size exceeds the maximum limit."})
                    .to_string(),
            )
            .create_async()
            .await;

        let err = transport_for(&server)
            .upload(&UploadFile::from_bytes("a.csv", "a\n1\n"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            TransportError::Status {
                status: 400,
                message: "File size exceeds the maximum limit.".into()
            }
        );
    }

    #[tokio::test]
    async fn test_upload_error_without_message_falls_back() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/upload/")
            .with_status(400)
            .with_body(json!({"error": "Invalid file upload."}).to_string())
            .create_async()
            .await;
        server
            .mock("POST", "/api/process/")
            .with_status(502)
            .with_body("<html>Bad Gateway</html>")
            .create_async()
            .await;

        let transport = transport_for(&server);

        let err = transport
            .upload(&UploadFile::from_bytes("a.csv", "a\n1\n"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "File upload failed");
        assert_eq!(err.status(), Some(400));

        let pattern = PatternRequest::parse("mask emails", 1000).unwrap();
        let err = transport.process(&sample_dataset(), &pattern).await.unwrap_err();
        assert_eq!(err.to_string(), "Data processing failed");
        assert_eq!(err.status(), Some(502));
    }

    #[tokio::test]
    async fn test_upload_rejects_malformed_success_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/upload/")
            .with_status(200)
            .with_body(json!({"data": [], "columns": []}).to_string())
            .create_async()
            .await;

        let err = transport_for(&server)
            .upload(&UploadFile::from_bytes("a.csv", "a\n"))
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_unreadable_file_never_reaches_the_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/upload/")
            .expect(0)
            .create_async()
            .await;

        let file = UploadFile {
            info: FileInfo::new("missing.csv", 10),
            source: FileSource::Path(PathBuf::from("/definitely/not/here/missing.csv")),
        };
        let err = transport_for(&server).upload(&file).await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, TransportError::ReadFile { .. }));
    }

    #[tokio::test]
    async fn test_process_posts_rows_and_instruction() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/process/")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "data": [{"email": "a@b.com"}],
                "natural_language_input": "mask emails"
            })))
            .with_status(200)
            .with_body(
                json!({
                    "success": true,
                    "processed_data": [{"email": "***"}],
                    "state": {"total_rows": 1, "matched_rows": 1, "replaced_rows": 1, "unmatched_rows": 0},
                    "regex_pattern": "\\S+@\\S+",
                    "replacement": "***"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let pattern = PatternRequest::parse("  mask emails  ", 1000).unwrap();
        let payload = transport_for(&server)
            .process(&sample_dataset(), &pattern)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(payload.as_value()["replacement"], json!("***"));
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((socket, _)) = listener.accept().await {
                tokio::time::sleep(Duration::from_secs(5)).await;
                drop(socket);
            }
        });

        let transport = HttpTransport::new(&ApiConfig {
            base_url: format!("http://{}", addr),
            timeout_ms: 100,
        })
        .unwrap();

        let err = transport
            .upload(&UploadFile::from_bytes("a.csv", "a\n1\n"))
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "File upload failed (timed out after 100 ms)");
    }

    #[test]
    fn test_url_join_ignores_trailing_slash() {
        let transport = HttpTransport::new(&ApiConfig {
            base_url: "http://localhost:8000/api/".into(),
            timeout_ms: 1000,
        })
        .unwrap();
        assert_eq!(transport.url(Endpoint::Upload), "http://localhost:8000/api/upload/");
        assert_eq!(transport.url(Endpoint::Process), "http://localhost:8000/api/process/");
    }
}
