//! Local disk storage for avatars, case files and videos.
//!
//! Files are streamed chunk by chunk; the size limit and MIME allowlist are
//! enforced before anything is left on disk. Paths handed back to callers are
//! relative to the upload root and always use `/`.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use axum::extract::multipart::Field;
use axum::extract::Multipart;
use chrono::{Datelike, Utc};
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::config::UploadConfig;

const MAX_SAFE_NAME_LEN: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("File type '{0}' is not allowed")]
    UnsupportedType(String),
    #[error("File exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },
    #[error("At most {max} files may be uploaded at once")]
    TooManyFiles { max: usize },
    #[error("Malformed multipart body: {0}")]
    Multipart(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Avatar,
    CaseFile,
    Video,
}

impl UploadKind {
    fn dir(self) -> &'static str {
        match self {
            UploadKind::Avatar => "avatars",
            UploadKind::CaseFile => "cases",
            UploadKind::Video => "videos",
        }
    }

    pub fn allowed_types(self) -> &'static [&'static str] {
        match self {
            UploadKind::Avatar => &["image/jpeg", "image/png", "image/webp"],
            UploadKind::CaseFile => &["image/jpeg", "image/png", "application/pdf", "video/mp4"],
            UploadKind::Video => &[
                "video/mp4",
                "video/mpeg",
                "video/quicktime",
                "video/x-msvideo",
                "video/x-ms-wmv",
            ],
        }
    }
}

/// Text fields and stored files from one multipart request.
#[derive(Debug, Default)]
pub struct UploadForm {
    /// Repeated names keep every value in arrival order; `name[]` is stored as `name`.
    pub fields: HashMap<String, Vec<String>>,
    pub files: Vec<StoredFile>,
}

impl UploadForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn all(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn take_paths(&self) -> Vec<String> {
        self.files.iter().map(|f| f.relative_path.clone()).collect()
    }
}

/// A file fully written to disk.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub relative_path: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: u64,
    /// Lowercase hex sha256 of the content.
    pub checksum: String,
}

#[derive(Clone)]
pub struct UploadStore {
    root: PathBuf,
    limits: UploadConfig,
}

impl UploadStore {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            root: config.root.clone(),
            limits: config.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn limit(&self, kind: UploadKind) -> u64 {
        match kind {
            UploadKind::Avatar => self.limits.max_avatar_bytes,
            UploadKind::CaseFile => self.limits.max_case_file_bytes,
            UploadKind::Video => self.limits.max_video_bytes,
        }
    }

    pub fn absolute(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Open a destination file for one upload after checking its type.
    pub async fn begin(
        &self,
        kind: UploadKind,
        owner_id: i64,
        raw_name: &str,
        mime_type: &str,
    ) -> Result<PendingUpload, UploadError> {
        if !kind.allowed_types().contains(&mime_type) {
            return Err(UploadError::UnsupportedType(mime_type.to_string()));
        }

        let original_name = repair_latin1(raw_name);
        let now = Utc::now();
        let dir = match kind {
            UploadKind::Avatar => format!("{}/{}", kind.dir(), owner_id),
            _ => format!(
                "{}/{:04}/{:02}/{}",
                kind.dir(),
                now.year(),
                now.month(),
                owner_id
            ),
        };
        let (stem, ext) = split_name(&original_name);
        let base = format!("{}/{}_{}", dir, now.timestamp_millis(), sanitize(stem));
        fs::create_dir_all(self.absolute(&dir)).await?;

        // Same-millisecond uploads of one name get a numeric suffix.
        let mut attempt = 0u32;
        let (relative, absolute, file) = loop {
            let relative = match attempt {
                0 => format!("{}{}", base, ext),
                n => format!("{}-{}{}", base, n, ext),
            };
            let absolute = self.absolute(&relative);
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&absolute)
                .await
            {
                Ok(file) => break (relative, absolute, file),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && attempt < 100 => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        };
        debug!(path = %relative, "Receiving upload");

        Ok(PendingUpload {
            file,
            absolute,
            relative,
            original_name,
            mime_type: mime_type.to_string(),
            size: 0,
            limit: self.limit(kind),
            hasher: Sha256::new(),
        })
    }

    /// Stream one multipart file field to disk.
    pub async fn store_field(
        &self,
        mut field: Field<'_>,
        kind: UploadKind,
        owner_id: i64,
    ) -> Result<StoredFile, UploadError> {
        let raw_name = field.file_name().unwrap_or("file").to_string();
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let mut pending = self.begin(kind, owner_id, &raw_name, &mime_type).await?;

        loop {
            let chunk = match field.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    pending.abort().await;
                    return Err(UploadError::Multipart(e.to_string()));
                }
            };
            if let Err(e) = pending.write(&chunk).await {
                pending.abort().await;
                return Err(e);
            }
        }
        pending.finish().await
    }

    /// Drain a multipart body, storing every part named `file_field`.
    ///
    /// Any failure removes the files stored so far.
    pub async fn collect_form(
        &self,
        mut multipart: Multipart,
        kind: UploadKind,
        owner_id: i64,
        file_field: &str,
        max_files: usize,
    ) -> Result<UploadForm, UploadError> {
        let mut form = UploadForm::default();
        let result = loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break Ok(()),
                Err(e) => break Err(UploadError::Multipart(e.to_string())),
            };
            let name = field.name().unwrap_or_default().to_string();

            if name == file_field && field.file_name().is_some() {
                if form.files.len() >= max_files {
                    break Err(UploadError::TooManyFiles { max: max_files });
                }
                match self.store_field(field, kind, owner_id).await {
                    Ok(stored) => form.files.push(stored),
                    Err(e) => break Err(e),
                }
            } else {
                match field.text().await {
                    Ok(value) => {
                        let key = name.strip_suffix("[]").unwrap_or(&name).to_string();
                        form.fields.entry(key).or_default().push(value);
                    }
                    Err(e) => break Err(UploadError::Multipart(e.to_string())),
                }
            }
        };

        if let Err(e) = result {
            self.remove_all(form.take_paths()).await;
            return Err(e);
        }
        Ok(form)
    }

    /// Delete a stored file; failures are logged and otherwise ignored.
    pub async fn remove(&self, relative: &str) {
        if let Err(e) = fs::remove_file(self.absolute(relative)).await {
            warn!(path = %relative, error = %e, "Could not remove uploaded file");
        }
    }

    pub async fn remove_all<I>(&self, relatives: I)
    where
        I: IntoIterator<Item = String>,
    {
        let paths: Vec<String> = relatives.into_iter().collect();
        futures::future::join_all(paths.iter().map(|path| self.remove(path))).await;
    }
}

pub struct PendingUpload {
    file: fs::File,
    absolute: PathBuf,
    relative: String,
    original_name: String,
    mime_type: String,
    size: u64,
    limit: u64,
    hasher: Sha256,
}

impl PendingUpload {
    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), UploadError> {
        let size = self.size + chunk.len() as u64;
        if size > self.limit {
            return Err(UploadError::TooLarge { limit: self.limit });
        }
        self.file.write_all(chunk).await?;
        self.hasher.update(chunk);
        self.size = size;
        Ok(())
    }

    pub async fn finish(mut self) -> Result<StoredFile, UploadError> {
        if let Err(e) = self.file.flush().await {
            self.abort().await;
            return Err(e.into());
        }
        Ok(StoredFile {
            relative_path: self.relative,
            original_name: self.original_name,
            mime_type: self.mime_type,
            size: self.size,
            checksum: format!("{:x}", self.hasher.finalize()),
        })
    }

    /// Drop the partial file.
    pub async fn abort(self) {
        drop(self.file);
        if let Err(e) = fs::remove_file(&self.absolute).await {
            warn!(path = %self.relative, error = %e, "Could not remove partial upload");
        }
    }
}

/// Keep `[A-Za-z0-9_-]`, replace everything else with `_`, cap the length.
pub fn sanitize(name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_SAFE_NAME_LEN)
        .collect();
    if safe.is_empty() {
        "file".to_string()
    } else {
        safe
    }
}

/// Stem plus a lowercase `.ext` that survived sanitising (empty when none).
fn split_name(name: &str) -> (&str, String) {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.len() <= 10
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            (stem, format!(".{}", ext.to_ascii_lowercase()))
        }
        _ => (base, String::new()),
    }
}

fn has_cjk(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(c,
            '\u{3400}'..='\u{4DBF}'
            | '\u{4E00}'..='\u{9FFF}'
            | '\u{F900}'..='\u{FAFF}'
            | '\u{3040}'..='\u{30FF}'
            | '\u{AC00}'..='\u{D7AF}')
    })
}

/// Undo UTF-8 names that a client sent through a Latin-1 decoder.
pub fn repair_latin1(raw: &str) -> String {
    if raw.chars().any(|c| c as u32 > 0xFF) {
        return raw.to_string();
    }
    let bytes: Vec<u8> = raw.chars().map(|c| c as u32 as u8).collect();
    match String::from_utf8(bytes) {
        Ok(decoded) if !decoded.contains('\u{FFFD}') && has_cjk(&decoded) && !has_cjk(raw) => {
            decoded
        }
        _ => raw.to_string(),
    }
}
