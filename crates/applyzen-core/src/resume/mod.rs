//! Resume upload and processing.
//!
//! The processing backend does not exist yet: the upload is attempted against
//! the configured endpoint, and if that fails for any reason the result is
//! produced locally. Either way the caller sees progress in 10% steps over a
//! fixed processing delay and gets back a [`ProcessedResume`]. The processed
//! document is saved as `Tailored_Resume.<ext>`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::ProcessedResume;

// ============================================================================
// Constants
// ============================================================================

/// Upload timeout for the processing endpoint
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(2);

/// Time the processing step takes
const DEFAULT_PROCESSING_DELAY: Duration = Duration::from_secs(2);

/// Number of progress updates reported while processing (10% each)
const PROGRESS_STEPS: u8 = 10;

/// Multipart field name for the uploaded file
const RESUME_FIELD: &str = "resume";

/// File stem of the saved processed document
pub const OUTPUT_STEM: &str = "Tailored_Resume";

#[derive(Error, Debug)]
pub enum ResumeError {
    #[error("Please upload a resume.")]
    Missing,

    #[error("Please upload a PDF or Word document.")]
    UnsupportedType,

    #[error("Failed to read resume: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to save processed resume to {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Document formats accepted for upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeKind {
    Pdf,
    Doc,
    Docx,
}

impl ResumeKind {
    /// Detect the format from the file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(ResumeKind::Pdf),
            "doc" => Some(ResumeKind::Doc),
            "docx" => Some(ResumeKind::Docx),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ResumeKind::Pdf => "pdf",
            ResumeKind::Doc => "doc",
            ResumeKind::Docx => "docx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ResumeKind::Pdf => "application/pdf",
            ResumeKind::Doc => "application/msword",
            ResumeKind::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

pub struct ResumeProcessor {
    client: Client,
    endpoint: String,
    processing_delay: Duration,
}

impl ResumeProcessor {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(UPLOAD_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: config.resume_endpoint.clone(),
            processing_delay: DEFAULT_PROCESSING_DELAY,
        })
    }

    pub fn with_processing_delay(mut self, delay: Duration) -> Self {
        self.processing_delay = delay;
        self
    }

    /// Upload and process the resume at `path`, saving the processed
    /// document to `output` (default: `Tailored_Resume.<ext>` next to the
    /// input).
    ///
    /// `on_progress` is called with 10, 20, ... 100 as processing advances.
    pub async fn process<F>(
        &self,
        path: Option<&Path>,
        output: Option<&Path>,
        mut on_progress: F,
    ) -> Result<ProcessedResume, ResumeError>
    where
        F: FnMut(u8),
    {
        let path = path.ok_or(ResumeError::Missing)?;
        let kind = ResumeKind::from_path(path).ok_or(ResumeError::UnsupportedType)?;
        let bytes = tokio::fs::read(path).await?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "resume".to_string());
        let size_bytes = bytes.len() as u64;

        debug!(file = %file_name, size_bytes, content_type = kind.content_type(), "Uploading resume");
        let simulated = match self.upload(&file_name, kind, bytes.clone()).await {
            Ok(()) => false,
            Err(e) => {
                warn!(error = %e, "Resume service unavailable, processing locally");
                true
            }
        };

        let step = self.processing_delay / u32::from(PROGRESS_STEPS);
        for i in 1..=PROGRESS_STEPS {
            tokio::time::sleep(step).await;
            on_progress(i * (100 / PROGRESS_STEPS));
        }

        // Processing does not transform the document yet
        let output_path = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_output_path(path, kind));
        tokio::fs::write(&output_path, &bytes)
            .await
            .map_err(|source| ResumeError::Save {
                path: output_path.clone(),
                source,
            })?;

        info!(file = %file_name, output = %output_path.display(), simulated, "Resume processed");
        Ok(ProcessedResume {
            file_name,
            content_type: kind.content_type().to_string(),
            size_bytes,
            processed_at: Utc::now(),
            output_path,
            simulated,
        })
    }

    async fn upload(&self, file_name: &str, kind: ResumeKind, bytes: Vec<u8>) -> Result<(), reqwest::Error> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(kind.content_type())?;
        let form = Form::new().part(RESUME_FIELD, part);

        self.client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// `Tailored_Resume.<ext>` in the directory of `input`
pub fn default_output_path(input: &Path, kind: ResumeKind) -> PathBuf {
    let name = format!("{}.{}", OUTPUT_STEM, kind.extension());
    match input.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_path() {
        assert_eq!(ResumeKind::from_path(Path::new("cv.pdf")), Some(ResumeKind::Pdf));
        assert_eq!(ResumeKind::from_path(Path::new("CV.PDF")), Some(ResumeKind::Pdf));
        assert_eq!(ResumeKind::from_path(Path::new("cv.doc")), Some(ResumeKind::Doc));
        assert_eq!(ResumeKind::from_path(Path::new("a/b/cv.docx")), Some(ResumeKind::Docx));
        assert_eq!(ResumeKind::from_path(Path::new("cv.txt")), None);
        assert_eq!(ResumeKind::from_path(Path::new("cv")), None);
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/home/ada/cv.PDF"), ResumeKind::Pdf),
            PathBuf::from("/home/ada/Tailored_Resume.pdf")
        );
        assert_eq!(
            default_output_path(Path::new("cv.docx"), ResumeKind::Docx),
            PathBuf::from("Tailored_Resume.docx")
        );
    }

    #[test]
    fn test_content_types() {
        assert_eq!(ResumeKind::Pdf.content_type(), "application/pdf");
        assert!(ResumeKind::Doc.content_type().contains("msword"));
        assert!(ResumeKind::Docx.content_type().contains("wordprocessingml"));
    }
}
