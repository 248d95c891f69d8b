use std::sync::{Arc, Mutex};

use actix_cors::Cors;
use actix_web::dev::Server;
use actix_web::http::{header, StatusCode};
use actix_web::{
    delete, get, post, put, web, App, HttpResponse, HttpServer, ResponseError, Scope,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::application::PipelineOrchestrator;
use crate::domain::error::{self, AppError, FileFailure};
use crate::domain::keywords::KeywordSet;
use crate::domain::table::InputFile;
use crate::infrastructure::config::ServerSettings;

const MAX_LOG_ENTRIES: usize = 100;
pub const SKIPPED_FILES_HEADER: &str = "X-Skipped-Files";

static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]").expect("static regex"));

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

pub struct HttpState {
    pub orchestrator: Arc<PipelineOrchestrator>,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct KeywordsRequest {
    #[serde(alias = "keywords")]
    #[validate(length(max = 10000, message = "too many keywords in one request"))]
    pub entries: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KeywordsResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    pub keywords: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UploadedFile {
    #[validate(length(min = 1, max = 255, message = "file name must be 1-255 characters"))]
    pub name: String,
    /// Base64 file body; a `data:...;base64,` prefix is accepted
    pub content: String,
    #[serde(default)]
    pub delimiter: Option<char>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProcessRequest {
    #[validate(length(min = 1, message = "at least one file is required"))]
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SkippedFile {
    pub file: String,
    pub kind: String,
    pub message: String,
}

impl From<&FileFailure> for SkippedFile {
    fn from(failure: &FileFailure) -> Self {
        Self {
            file: failure.file.clone(),
            kind: failure.error.kind().to_string(),
            message: failure.error.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedFile>,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AllFilesFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Internal(_)
            | AppError::PersistenceError(_)
            | AppError::ExportError(_)
            | AppError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let skipped = match self {
            AppError::AllFilesFailed(failures) => failures.iter().map(SkippedFile::from).collect(),
            _ => Vec::new(),
        };
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
            skipped,
        })
    }
}

fn blocking_error(err: actix_web::error::BlockingError) -> AppError {
    AppError::Internal(format!("Worker pool unavailable: {}", err))
}

fn validation_error(err: validator::ValidationErrors) -> AppError {
    AppError::ValidationError(err.to_string())
}

#[get("/keywords")]
async fn get_keywords(data: web::Data<HttpState>) -> HttpResponse {
    let keywords = data.orchestrator.keywords();
    HttpResponse::Ok().json(KeywordsResponse {
        success: None,
        keywords: keywords.as_slice().to_vec(),
    })
}

#[post("/keywords")]
async fn merge_keywords(
    data: web::Data<HttpState>,
    req: web::Json<KeywordsRequest>,
) -> Result<HttpResponse, AppError> {
    let request = req.into_inner();
    request.validate().map_err(validation_error)?;
    let KeywordsRequest { entries } = request;
    let submitted = entries.len();

    let orchestrator = Arc::clone(&data.orchestrator);
    let result = web::block(move || orchestrator.commit_keywords(&entries))
        .await
        .map_err(blocking_error)?;

    respond_with_keywords(&data, result, &format!("Merged {} submitted keywords", submitted))
}

#[put("/keywords")]
async fn replace_keywords(
    data: web::Data<HttpState>,
    req: web::Json<KeywordsRequest>,
) -> Result<HttpResponse, AppError> {
    let request = req.into_inner();
    request.validate().map_err(validation_error)?;

    let orchestrator = Arc::clone(&data.orchestrator);
    let result = web::block(move || orchestrator.replace_keywords(&request.entries))
        .await
        .map_err(blocking_error)?;

    respond_with_keywords(&data, result, "Replaced keyword list")
}

#[delete("/keywords")]
async fn clear_keywords(data: web::Data<HttpState>) -> Result<HttpResponse, AppError> {
    let orchestrator = Arc::clone(&data.orchestrator);
    let result = web::block(move || orchestrator.replace_keywords(&[]))
        .await
        .map_err(blocking_error)?;

    respond_with_keywords(&data, result, "Cleared keyword list")
}

fn respond_with_keywords(
    data: &HttpState,
    result: error::Result<Arc<KeywordSet>>,
    action: &str,
) -> Result<HttpResponse, AppError> {
    match result {
        Ok(set) => {
            add_log(
                &data.logs,
                "INFO",
                "Keywords",
                &format!("{} ({} stored)", action, set.len()),
            );
            Ok(HttpResponse::Ok().json(KeywordsResponse {
                success: Some(true),
                keywords: set.as_slice().to_vec(),
            }))
        }
        Err(e) => {
            add_log(
                &data.logs,
                "ERROR",
                "Keywords",
                &format!("Keyword update failed: {}", e),
            );
            Err(e)
        }
    }
}

#[post("/process")]
async fn process(
    data: web::Data<HttpState>,
    req: web::Json<ProcessRequest>,
) -> Result<HttpResponse, AppError> {
    let request = req.into_inner();
    request.validate().map_err(validation_error)?;
    check_uploads(&request.files)?;

    add_log(
        &data.logs,
        "INFO",
        "Pipeline",
        &format!("Processing {} files", request.files.len()),
    );

    let orchestrator = Arc::clone(&data.orchestrator);
    let files = request.files;
    let outcome = web::block(move || {
        orchestrator.process(files.into_iter().map(into_input_file))
    })
    .await
    .map_err(blocking_error)?;

    let report = match outcome {
        Ok(report) => report,
        Err(failure) => {
            add_log(
                &data.logs,
                "ERROR",
                "Pipeline",
                &format!("Processing failed: {}", failure),
            );
            return Err(failure.into());
        }
    };

    for failure in &report.failures {
        add_log(
            &data.logs,
            "WARN",
            "Pipeline",
            &format!("Skipped {}: {}", failure.file, failure.error),
        );
    }
    add_log(
        &data.logs,
        "INFO",
        "Pipeline",
        &format!(
            "Exported {} rows to {}",
            report.row_count, report.document.filename
        ),
    );

    let skipped: Vec<SkippedFile> = report.failures.iter().map(SkippedFile::from).collect();
    let skipped_header = serde_json::to_string(&skipped)
        .map(|json| escape_non_ascii(&json))
        .map_err(|e| AppError::Internal(format!("Failed to encode skipped files: {}", e)))?;

    Ok(HttpResponse::Ok()
        .content_type(report.document.content_type)
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"{}\"",
                sanitize_filename(&report.document.filename)
            ),
        ))
        .insert_header((SKIPPED_FILES_HEADER, skipped_header))
        .body(report.document.bytes.to_vec()))
}

#[get("/logs")]
async fn get_logs(data: web::Data<HttpState>) -> HttpResponse {
    let logs = data.logs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    HttpResponse::Ok().json(&*logs)
}

/// Reject bad names, delimiters and base64 before the pipeline starts.
///
/// Decoding goes through one scratch buffer so only a single file is held decoded.
fn check_uploads(files: &[UploadedFile]) -> Result<(), AppError> {
    let mut scratch = Vec::new();
    for file in files {
        file.validate().map_err(validation_error)?;
        declared_delimiter(file)?;

        scratch.clear();
        STANDARD
            .decode_vec(base64_payload(&file.content), &mut scratch)
            .map_err(|e| {
                AppError::ValidationError(format!(
                    "File '{}' is not valid base64: {}",
                    file.name, e
                ))
            })?;
    }
    Ok(())
}

/// Decode one upload. Called lazily while the batch is consolidated.
fn into_input_file(file: UploadedFile) -> InputFile {
    let delimiter = declared_delimiter(&file).ok().flatten();
    let bytes = STANDARD
        .decode(base64_payload(&file.content))
        .unwrap_or_default();
    let input = InputFile::new(file.name, bytes);
    match delimiter {
        Some(d) => input.with_delimiter(d),
        None => input,
    }
}

fn base64_payload(content: &str) -> &str {
    let encoded = match content.find("base64,") {
        Some(pos) if content.starts_with("data:") => &content[pos + 7..],
        _ => content,
    };
    encoded.trim()
}

fn declared_delimiter(file: &UploadedFile) -> Result<Option<u8>, AppError> {
    match file.delimiter {
        Some(c) => u8::try_from(c)
            .ok()
            .filter(u8::is_ascii)
            .map(Some)
            .ok_or_else(|| {
                AppError::ValidationError(format!(
                    "File '{}' declares a non-ASCII delimiter",
                    file.name
                ))
            }),
        None => Ok(None),
    }
}

fn sanitize_filename(name: &str) -> String {
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(name, "_");
    if cleaned.is_empty() {
        "export.xlsx".to_string()
    } else {
        cleaned.into_owned()
    }
}

/// Header values must be visible ASCII.
fn escape_non_ascii(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if (' '..='~').contains(&c) {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    out
}

pub fn add_log_entry(
    logs: &Mutex<Vec<LogEntry>>,
    level: &str,
    source: &str,
    message: &str,
) -> LogEntry {
    match level {
        "ERROR" => tracing::error!(source, "{}", message),
        "WARN" => tracing::warn!(source, "{}", message),
        "DEBUG" => tracing::debug!(source, "{}", message),
        _ => tracing::info!(source, "{}", message),
    }

    let entry = LogEntry {
        time: Local::now().format("%H:%M:%S").to_string(),
        level: level.to_string(),
        source: source.to_string(),
        message: message.to_string(),
    };
    let mut logs = logs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    logs.push(entry.clone());
    if logs.len() > MAX_LOG_ENTRIES {
        logs.remove(0);
    }
    entry
}

pub fn add_log(logs: &Mutex<Vec<LogEntry>>, level: &str, source: &str, message: &str) {
    add_log_entry(logs, level, source, message);
}

/// JSON extractor settings: body limit sized for a full batch, errors as 400.
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _req| {
            AppError::ValidationError(format!("Invalid request body: {}", err)).into()
        })
}

pub fn api_scope() -> Scope {
    web::scope("/api")
        .service(get_keywords)
        .service(merge_keywords)
        .service(replace_keywords)
        .service(clear_keywords)
        .service(process)
        .service(get_logs)
}

pub fn start_server(
    orchestrator: Arc<PipelineOrchestrator>,
    logs: Arc<Mutex<Vec<LogEntry>>>,
    settings: &ServerSettings,
) -> std::io::Result<Server> {
    let config = orchestrator.config();
    // base64 inflates by 4/3; leave room for the JSON envelope.
    let body_limit = config
        .max_files
        .saturating_mul(config.max_file_bytes)
        .saturating_mul(4)
        / 3
        + 64 * 1024;

    let state = web::Data::new(HttpState { orchestrator, logs });

    let server = HttpServer::new(move || {
        let cors = Cors::permissive(); // Local tool; the UI is served from another origin

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .app_data(json_config(body_limit))
            .service(api_scope())
    })
    .bind((settings.host.as_str(), settings.port))?
    .run();

    Ok(server)
}
