//! Multipart parsing and upload storage

use crate::{Error, HttpRequest};
use bytes::Bytes;
use memchr::memmem;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error};

/// One part of a multipart body
#[derive(Debug, Clone, PartialEq)]
pub struct MultipartField {
    pub name: String,
    /// Present for file inputs
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl MultipartField {
    /// True when the part carries a chosen file
    pub fn is_file(&self) -> bool {
        self.filename.as_deref().is_some_and(|f| !f.is_empty())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// Multipart form data parser
pub struct MultipartParser {
    boundary: String,
}

impl MultipartParser {
    /// Create a new multipart parser from Content-Type header
    pub fn from_content_type(content_type: &str) -> Result<Self, Error> {
        // Example: "multipart/form-data; boundary=----WebKitFormBoundary7MA4YWxkTrZu0gW"
        let boundary = content_type
            .split(';')
            .find_map(|part| {
                part.trim()
                    .strip_prefix("boundary=")
                    .map(|b| b.trim_matches('"').to_string())
            })
            .filter(|b| !b.is_empty())
            .ok_or_else(|| Error::BadRequest("Missing boundary in Content-Type".to_string()))?;

        Ok(Self { boundary })
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Split `body` into parts. Part contents are slices of `body`.
    pub fn parse(&self, body: &Bytes) -> Result<Vec<MultipartField>, Error> {
        let delimiter = format!("--{}", self.boundary);
        let next_part = format!("\r\n--{}", self.boundary);
        let next_part = memmem::Finder::new(next_part.as_bytes());

        let mut fields = Vec::new();
        let Some(first) = memmem::find(body, delimiter.as_bytes()) else {
            return Err(Error::BadRequest("Multipart boundary not found".to_string()));
        };
        let mut cursor = first + delimiter.len();

        loop {
            let rest = &body[cursor..];
            if rest.starts_with(b"--") {
                break;
            }
            let header_start = cursor + line_break_len(rest);

            let Some(header_len) = memmem::find(&body[header_start..], b"\r\n\r\n") else {
                return Err(Error::BadRequest("Malformed multipart part headers".to_string()));
            };
            let headers = String::from_utf8_lossy(&body[header_start..header_start + header_len]);
            let content_start = header_start + header_len + 4;

            let Some(content_len) = next_part.find(&body[content_start..]) else {
                return Err(Error::BadRequest("Unterminated multipart body".to_string()));
            };
            let content_end = content_start + content_len;

            fields.push(parse_part(&headers, body.slice(content_start..content_end))?);
            cursor = content_end + next_part.needle().len();
        }

        Ok(fields)
    }
}

fn line_break_len(rest: &[u8]) -> usize {
    if rest.starts_with(b"\r\n") {
        2
    } else if rest.starts_with(b"\n") {
        1
    } else {
        0
    }
}

fn parse_part(headers: &str, data: Bytes) -> Result<MultipartField, Error> {
    let mut name = None;
    let mut filename = None;
    let mut content_type = None;

    for line in headers.lines() {
        let Some((header, value)) = line.split_once(':') else {
            continue;
        };
        if header.trim().eq_ignore_ascii_case("content-disposition") {
            for attr in value.split(';') {
                let attr = attr.trim();
                if let Some(v) = attr.strip_prefix("name=") {
                    name = Some(v.trim_matches('"').to_string());
                } else if let Some(v) = attr.strip_prefix("filename=") {
                    filename = Some(v.trim_matches('"').to_string());
                }
            }
        } else if header.trim().eq_ignore_ascii_case("content-type") {
            content_type = Some(value.trim().to_string());
        }
    }

    let name = name.ok_or_else(|| Error::BadRequest("Missing field name".to_string()))?;
    Ok(MultipartField {
        name,
        filename,
        content_type,
        data,
    })
}

/// Replace every character outside `[A-Za-z0-9.-_]` with `_`
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// An uploaded file.
///
/// The content stays available in memory; `storage_path` is set when the
/// upload store persisted it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadedFile {
    pub field_name: String,
    pub original_filename: String,
    pub sanitized_filename: String,
    pub stored_filename: String,
    pub storage_path: Option<PathBuf>,
    pub content_type: String,
    pub size: usize,
    #[serde(skip)]
    pub data: Bytes,
}

impl UploadedFile {
    /// Get file extension
    pub fn extension(&self) -> Option<&str> {
        self.original_filename
            .rsplit_once('.')
            .map(|(_, ext)| ext)
    }

    /// Check if file is an image
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

/// Names and (optionally) persists uploaded files under one directory
#[derive(Debug)]
pub struct UploadStore {
    directory: PathBuf,
    persist: bool,
    sequence: AtomicU64,
}

impl UploadStore {
    pub fn new(directory: impl Into<PathBuf>, persist: bool) -> Self {
        Self {
            directory: directory.into(),
            persist,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// `<millis>-<seq>_<sanitized>`, unique within this store
    pub fn stored_name(&self, sanitized: &str) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!(
            "{}-{}_{}",
            chrono::Utc::now().timestamp_millis(),
            seq,
            sanitized
        )
    }

    /// Record a file part, writing it to disk when persistence is on
    pub async fn store(&self, field: &MultipartField) -> Result<UploadedFile, Error> {
        let original = field.filename.clone().unwrap_or_default();
        let sanitized = sanitize_filename(&original);
        let stored = self.stored_name(&sanitized);

        let storage_path = if self.persist {
            let path = self.directory.join(&stored);
            tokio::fs::create_dir_all(&self.directory)
                .await
                .map_err(|e| storage_error(&self.directory, e))?;
            tokio::fs::write(&path, &field.data)
                .await
                .map_err(|e| storage_error(&path, e))?;
            debug!(path = %path.display(), size = field.data.len(), "Stored upload");
            Some(path)
        } else {
            None
        };

        Ok(UploadedFile {
            field_name: field.name.clone(),
            original_filename: original,
            sanitized_filename: sanitized,
            stored_filename: stored,
            storage_path,
            content_type: field
                .content_type
                .clone()
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            size: field.data.len(),
            data: field.data.clone(),
        })
    }
}

fn storage_error(path: &Path, err: std::io::Error) -> Error {
    error!(path = %path.display(), error = %err, "Failed to store upload");
    Error::Storage(format!("{}: {}", path.display(), err))
}

/// Everything extracted from a multipart request
#[derive(Debug, Clone, Default)]
pub struct MultipartPayload {
    /// Stored files in submission order
    pub files: Vec<UploadedFile>,
    /// Raw content of every part, file or not, by field name
    pub raw: BTreeMap<String, Bytes>,
    /// Plain (non-file) fields in submission order
    pub texts: Vec<(String, String)>,
}

impl MultipartPayload {
    /// Parse the request body and store its files
    pub async fn read(request: &HttpRequest, uploads: &UploadStore) -> Result<Self, Error> {
        let content_type = request
            .content_type()
            .ok_or_else(|| Error::BadRequest("Missing Content-Type".to_string()))?;
        let parser = MultipartParser::from_content_type(content_type)?;

        let mut payload = Self::default();
        for field in parser.parse(&request.body)? {
            payload.raw.insert(field.name.clone(), field.data.clone());
            if field.is_file() {
                payload.files.push(uploads.store(&field).await?);
            } else if field.filename.is_none() {
                payload.texts.push((field.name.clone(), field.text()));
            }
        }
        Ok(payload)
    }

    /// First file submitted under exactly `name`
    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| f.field_name == name)
    }

    /// Files submitted as `name` or `name[...]`
    pub fn files_for(&self, name: &str) -> Vec<&UploadedFile> {
        let indexed = format!("{}[", name);
        self.files
            .iter()
            .filter(|f| f.field_name == name || f.field_name.starts_with(&indexed))
            .collect()
    }
}
