//! HTTP service.
//!
//! Endpoints:
//! - GET  /             - status, provider and usage
//! - POST /extract-text - PDF to text (multipart `file` field or raw body)
//! - POST /analyze      - full multi-agent analysis
//! - POST /chat         - question answering over a document
//! - POST /translate    - translation
//! - POST /tts          - text to speech
//! - POST /report       - downloadable report for an analysis
//!
//! One request per connection (`Connection: close`).

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{error, info};

use nyaya_core::{AnalysisReport, DocumentInfo, Language};
use nyaya_runtime::{AnalysisPipeline, ServiceError, Services};

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Largest accepted request line plus headers.
const MAX_HEAD_BYTES: usize = 64 * 1024;

const ROUTES: &[(&str, &str)] = &[
    ("GET", "/"),
    ("POST", "/extract-text"),
    ("POST", "/analyze"),
    ("POST", "/chat"),
    ("POST", "/translate"),
    ("POST", "/tts"),
    ("POST", "/report"),
];

/// Shared handler state.
pub struct App {
    pipeline: Arc<AnalysisPipeline>,
    services: Arc<Services>,
}

impl App {
    pub fn new(pipeline: Arc<AnalysisPipeline>, services: Arc<Services>) -> Self {
        Self { pipeline, services }
    }
}

/// Bind and serve until the process is stopped.
pub async fn run(host: &str, port: u16, pipeline: Arc<AnalysisPipeline>, services: Arc<Services>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address {}:{}: {}", host, port, e))?;

    let app = Arc::new(App::new(pipeline, services));
    let listener = TcpListener::bind(addr).await?;

    info!(
        address = %addr,
        provider = %app.pipeline.gateway().provider_name(),
        model = %app.pipeline.gateway().model(),
        speech = app.services.speech.is_some(),
        "Nyaya listening"
    );

    loop {
        let (stream, remote_addr) = listener.accept().await?;
        let app = Arc::clone(&app);

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, app, remote_addr).await {
                error!(remote = %remote_addr, error = %e, "Connection error");
            }
        });
    }
}

async fn handle_connection(mut stream: tokio::net::TcpStream, app: Arc<App>, remote_addr: SocketAddr) -> Result<()> {
    let (method, path, response) = match read_request(&mut stream).await {
        Ok(request) => {
            let response = route_request(&app, &request).await;
            (request.method, request.path, response)
        }
        Err(RequestError::Io(e)) => return Err(e.into()),
        Err(e) => (String::new(), String::new(), HttpResponse::from(e)),
    };

    info!(
        method = %method,
        path = %path,
        remote = %remote_addr,
        status = response.status,
        "Request"
    );

    stream.write_all(&response.to_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct HttpRequest {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl HttpRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Error, Debug)]
enum RequestError {
    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("request body of {0} bytes exceeds the {max} byte limit", max = MAX_BODY_BYTES)]
    TooLarge(usize),

    #[error("request headers exceed {max} bytes", max = MAX_HEAD_BYTES)]
    HeadTooLarge,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<RequestError> for HttpResponse {
    fn from(error: RequestError) -> Self {
        match error {
            RequestError::TooLarge(_) | RequestError::HeadTooLarge => {
                HttpResponse::error(413, &error.to_string())
            }
            _ => HttpResponse::error(400, &error.to_string()),
        }
    }
}

/// Read one request: the head up to the blank line, then `Content-Length`
/// body bytes.
async fn read_request<R: AsyncRead + Unpin>(reader: &mut R) -> Result<HttpRequest, RequestError> {
    let mut buffer = Vec::with_capacity(8192);
    let mut chunk = [0u8; 8192];

    let head_end = loop {
        if let Some(pos) = find_subslice(&buffer, b"\r\n\r\n") {
            break pos;
        }
        if buffer.len() > MAX_HEAD_BYTES {
            return Err(RequestError::HeadTooLarge);
        }
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Err(RequestError::Malformed("connection closed before end of headers".to_string()));
        }
        buffer.extend_from_slice(&chunk[..n]);
    };

    let (method, path, headers) = parse_head(&buffer[..head_end])?;

    let content_length = match headers.iter().find(|(key, _)| key == "content-length") {
        Some((_, value)) => value
            .parse::<usize>()
            .map_err(|_| RequestError::Malformed(format!("invalid Content-Length: {}", value)))?,
        None => 0,
    };
    if content_length > MAX_BODY_BYTES {
        return Err(RequestError::TooLarge(content_length));
    }

    let mut body = buffer.split_off(head_end + 4);
    while body.len() < content_length {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Err(RequestError::Malformed(format!(
                "body ended after {} of {} bytes",
                body.len(),
                content_length
            )));
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    Ok(HttpRequest {
        method,
        path,
        headers,
        body,
    })
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

type Head = (String, String, Vec<(String, String)>);

fn parse_head(head: &[u8]) -> Result<Head, RequestError> {
    let text = std::str::from_utf8(head)
        .map_err(|_| RequestError::Malformed("request head is not UTF-8".to_string()))?;
    let mut lines = text.split("\r\n");

    let request_line = lines
        .next()
        .filter(|l| !l.is_empty())
        .ok_or_else(|| RequestError::Malformed("empty request".to_string()))?;
    let mut parts = request_line.split_whitespace();
    let (method, target) = match (parts.next(), parts.next()) {
        (Some(method), Some(target)) => (method, target),
        _ => return Err(RequestError::Malformed(format!("invalid request line: {}", request_line))),
    };

    // Query strings are ignored.
    let path = target.split('?').next().unwrap_or(target);

    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    Ok((method.to_ascii_uppercase(), path.to_string(), headers))
}

#[derive(Debug)]
struct HttpResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl HttpResponse {
    fn bytes(status: u16, content_type: &str, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), content_type.to_string())],
            body,
        }
    }

    fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::bytes(200, "application/json", body),
            Err(e) => Self::error(500, &format!("Failed to serialize response: {}", e)),
        }
    }

    fn error(status: u16, message: &str) -> Self {
        let body = serde_json::json!({ "error": message }).to_string().into_bytes();
        Self::bytes(status, "application/json", body)
    }

    fn no_content() -> Self {
        Self {
            status: 204,
            headers: vec![
                ("Access-Control-Allow-Methods".to_string(), "GET, POST, OPTIONS".to_string()),
                ("Access-Control-Allow-Headers".to_string(), "*".to_string()),
            ],
            body: Vec::new(),
        }
    }

    fn with_header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.push((key.to_string(), value.into()));
        self
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut response = format!("HTTP/1.1 {} {}\r\n", self.status, status_text(self.status));

        for (key, value) in &self.headers {
            response.push_str(&format!("{}: {}\r\n", key, value));
        }

        response.push_str("Access-Control-Allow-Origin: *\r\n");
        response.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        response.push_str("Connection: close\r\n");
        response.push_str("\r\n");

        let mut bytes = response.into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

async fn route_request(app: &App, request: &HttpRequest) -> HttpResponse {
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/") => handle_status(app).await,
        ("POST", "/extract-text") => handle_extract_text(app, request).await,
        ("POST", "/analyze") => handle_analyze(app, &request.body).await,
        ("POST", "/chat") => handle_chat(app, &request.body).await,
        ("POST", "/translate") => handle_translate(app, &request.body).await,
        ("POST", "/tts") => handle_tts(app, &request.body).await,
        ("POST", "/report") => handle_report(app, &request.body),

        ("OPTIONS", path) if is_known_path(path) => HttpResponse::no_content(),
        (_, path) if is_known_path(path) => HttpResponse::error(405, "Method Not Allowed"),
        _ => HttpResponse::error(404, "Not Found"),
    }
}

fn is_known_path(path: &str) -> bool {
    ROUTES.iter().any(|(_, known)| *known == path)
}

fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, HttpResponse> {
    serde_json::from_slice(body).map_err(|e| HttpResponse::error(400, &format!("Invalid request body: {}", e)))
}

fn service_error(error: ServiceError) -> HttpResponse {
    let status = match &error {
        ServiceError::NotConfigured(_) | ServiceError::Unavailable { .. } => 503,
        ServiceError::UnsupportedLanguage(_) => 400,
        ServiceError::Failed { .. } => 500,
    };
    error!(error = %error, "Collaborator failed");
    HttpResponse::error(status, &error.to_string())
}

async fn handle_status(app: &App) -> HttpResponse {
    let gateway = app.pipeline.gateway();
    HttpResponse::json(&serde_json::json!({
        "status": "backend running",
        "version": env!("CARGO_PKG_VERSION"),
        "provider": gateway.provider_name(),
        "provider_ready": gateway.health_check().await,
        "model": gateway.model(),
        "usage": app.pipeline.usage(),
    }))
}

async fn handle_extract_text(app: &App, request: &HttpRequest) -> HttpResponse {
    let uploaded;
    let pdf = match request.header("content-type") {
        Some(content_type) if content_type.starts_with("multipart/") => {
            uploaded = match multipart_file(content_type, &request.body).await {
                Ok(bytes) => bytes,
                Err(response) => return response,
            };
            uploaded.as_slice()
        }
        _ => request.body.as_slice(),
    };
    if pdf.is_empty() {
        return HttpResponse::error(400, "Request must contain PDF bytes");
    }

    match app.services.pdf.extract_text(pdf).await {
        Ok(text) => HttpResponse::json(&serde_json::json!({ "extracted_text": text })),
        Err(e) => service_error(e),
    }
}

/// The `file` field of a `multipart/form-data` body.
async fn multipart_file(content_type: &str, body: &[u8]) -> Result<Vec<u8>, HttpResponse> {
    let invalid = |e: multer::Error| HttpResponse::error(400, &format!("Invalid multipart body: {}", e));

    let boundary = multer::parse_boundary(content_type).map_err(invalid)?;
    let body = body.to_vec();
    let stream = futures::stream::once(async move { Ok::<_, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        if field.name() == Some("file") {
            return Ok(field.bytes().await.map_err(invalid)?.to_vec());
        }
    }
    Err(HttpResponse::error(400, "Multipart body has no 'file' field"))
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    text: String,
}

async fn handle_analyze(app: &App, body: &[u8]) -> HttpResponse {
    let request: AnalyzeRequest = match parse_json(body) {
        Ok(r) => r,
        Err(response) => return response,
    };
    HttpResponse::json(&app.pipeline.analyze(&request.text).await)
}

fn default_language() -> String {
    Language::default().code().to_string()
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    question: String,
    document_info: DocumentInfo,
    #[serde(default = "default_language")]
    language: String,
}

async fn handle_chat(app: &App, body: &[u8]) -> HttpResponse {
    let request: ChatRequest = match parse_json(body) {
        Ok(r) => r,
        Err(response) => return response,
    };
    let answer = app
        .pipeline
        .ask(&request.question, &request.document_info, &request.language)
        .await;
    HttpResponse::json(&answer)
}

#[derive(Debug, Deserialize)]
struct TranslateRequest {
    text: String,
    target_language: String,
    #[serde(default)]
    source_language: Option<String>,
}

#[derive(Debug, Serialize)]
struct TranslateResponse {
    translated_text: String,
    target_language: String,
}

async fn handle_translate(app: &App, body: &[u8]) -> HttpResponse {
    let request: TranslateRequest = match parse_json(body) {
        Ok(r) => r,
        Err(response) => return response,
    };

    match app
        .pipeline
        .translate(&request.text, &request.target_language, request.source_language.as_deref())
        .await
    {
        Ok(translated_text) => HttpResponse::json(&TranslateResponse {
            translated_text,
            target_language: Language::from_code_or_default(&request.target_language)
                .code()
                .to_string(),
        }),
        Err(e) => {
            error!(error = %e, "Translation failed");
            HttpResponse::error(500, &format!("Translation failed: {}", e))
        }
    }
}

#[derive(Debug, Deserialize)]
struct TtsRequest {
    text: String,
    #[serde(default = "default_language")]
    language: String,
}

async fn handle_tts(app: &App, body: &[u8]) -> HttpResponse {
    let request: TtsRequest = match parse_json(body) {
        Ok(r) => r,
        Err(response) => return response,
    };
    let language: Language = match request.language.parse() {
        Ok(language) => language,
        Err(e) => return service_error(ServiceError::UnsupportedLanguage(e)),
    };
    let Some(speech) = &app.services.speech else {
        return service_error(ServiceError::NotConfigured("Speech synthesis"));
    };

    match speech.synthesize(&request.text, language).await {
        Ok(audio) => HttpResponse::bytes(200, &audio.content_type, audio.bytes),
        Err(e) => service_error(e),
    }
}

fn handle_report(app: &App, body: &[u8]) -> HttpResponse {
    let report: AnalysisReport = match parse_json(body) {
        Ok(r) => r,
        Err(response) => return response,
    };

    match app.services.renderer.render(&report) {
        Ok(document) => HttpResponse::bytes(200, &document.content_type, document.bytes).with_header(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", document.file_name),
        ),
        Err(e) => service_error(e),
    }
}
