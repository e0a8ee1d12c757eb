//! Source resolution: turn a user-supplied path or URL into a [`Source`].
//!
//! URLs are passed to the backend as-is (`POST /transcribe`); the backend does
//! the download. Local paths are checked for existence and read permission
//! up front so the user gets a clear error instead of a failed upload. The
//! file's content type is deliberately not inspected: the backend decides
//! what it can transcribe.

use crate::error::ClientError;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// What to submit to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Local media file, sent as a multipart upload.
    File(PathBuf),
    /// Remote media URL, sent for server-side download.
    Url(String),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::File(path) => write!(f, "{}", path.display()),
            Source::Url(url) => f.write_str(url),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a [`Source`].
pub fn resolve_source(input: &str) -> Result<Source, ClientError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ClientError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        return Ok(Source::Url(input.to_string()));
    }
    resolve_local(input)
}

fn resolve_local(path_str: &str) -> Result<Source, ClientError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(ClientError::FileNotFound { path });
    }
    if path.is_dir() {
        return Err(ClientError::InvalidInput {
            input: path_str.to_string(),
        });
    }

    // Check read permission by attempting to open
    match std::fs::File::open(&path) {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ClientError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(ClientError::FileNotFound { path });
        }
    }

    debug!("Resolved local media file: {}", path.display());
    Ok(Source::File(path))
}
