//! Conversion of non-PDF uploads to PDF.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

/// Default converter executable.
pub const DEFAULT_CONVERTER_BIN: &str = "libreoffice";

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("Failed to start converter: {0}")]
    Spawn(std::io::Error),

    #[error("Converter exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("Converter produced no output at {}", .0.display())]
    MissingOutput(PathBuf),

    #[error("Scratch file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Converts a document on disk to PDF.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    /// Convert `input` into `out_dir`, returning the produced PDF path.
    async fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, ConvertError>;
}

/// Runs `<binary> --headless --convert-to pdf --outdir <dir> <input>`.
///
/// The child is killed if the returned future is dropped, so a deadline
/// applied by the caller terminates a hung conversion.
#[derive(Debug, Clone)]
pub struct LibreOfficeConverter {
    binary: PathBuf,
}

impl LibreOfficeConverter {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for LibreOfficeConverter {
    fn default() -> Self {
        Self::new(DEFAULT_CONVERTER_BIN)
    }
}

#[async_trait]
impl DocumentConverter for LibreOfficeConverter {
    async fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, ConvertError> {
        let output = Command::new(&self.binary)
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(out_dir)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(ConvertError::Spawn)?;

        if !output.status.success() {
            return Err(ConvertError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let produced = pdf_path_for(input, out_dir);
        if !tokio::fs::try_exists(&produced).await? {
            return Err(ConvertError::MissingOutput(produced));
        }
        Ok(produced)
    }
}

/// Where the converter writes its output: same stem, `.pdf` extension.
pub fn pdf_path_for(input: &Path, out_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    out_dir.join(format!("{stem}.pdf"))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn output_keeps_input_stem() {
        let path = pdf_path_for(Path::new("/tmp/in/abc.docx"), Path::new("/tmp/out"));
        assert_eq!(path, PathBuf::from("/tmp/out/abc.pdf"));
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let converter = LibreOfficeConverter::new("/nonexistent/cuedeck-converter");

        let result = converter
            .convert(&dir.path().join("a.txt"), dir.path())
            .await;

        assert_matches!(result, Err(ConvertError::Spawn(_)));
    }

    #[tokio::test]
    async fn non_zero_exit_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let converter = LibreOfficeConverter::new("false");

        let result = converter
            .convert(&dir.path().join("a.txt"), dir.path())
            .await;

        assert_matches!(result, Err(ConvertError::Failed { .. }));
    }

    #[tokio::test]
    async fn silent_success_without_output_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let converter = LibreOfficeConverter::new("true");

        let result = converter
            .convert(&dir.path().join("a.txt"), dir.path())
            .await;

        assert_matches!(result, Err(ConvertError::MissingOutput(p)) if p.ends_with("a.pdf"));
    }
}
