use std::{
    path::{Path, PathBuf},
    process::Command,
};

use tracing::trace;

use crate::error::{Error, Result};

pub const DEFAULT_TESSERACT: &str = "tesseract";
pub const TESSERACT_ENV_VAR: &str = "OCRDEX_TESSERACT";

/// Extracts the text visible in an image.
pub trait Recognizer {
    /// Recognize the text in `path` using the given language codes.
    ///
    /// Fragments are joined with single spaces; an image without text
    /// yields an empty string.
    fn recognize(
        &mut self,
        path: &Path,
        languages: &[String],
    ) -> Result<String>;
}

/// Runs the `tesseract` command-line engine once per image.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    binary: PathBuf,
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TesseractRecognizer {
    /// Creates a recognizer. The binary is resolved from:
    /// 1. The `OCRDEX_TESSERACT` environment variable, if set
    /// 2. Otherwise, `tesseract` on `PATH`
    pub fn new() -> Self {
        let binary = std::env::var_os(TESSERACT_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TESSERACT));
        Self { binary }
    }

    pub fn with_binary(binary: PathBuf) -> Self {
        Self { binary }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl Recognizer for TesseractRecognizer {
    fn recognize(
        &mut self,
        path: &Path,
        languages: &[String],
    ) -> Result<String> {
        let failure = |reason: String| Error::Recognition {
            path: path.to_path_buf(),
            reason,
        };

        let mut cmd = Command::new(&self.binary);
        cmd.arg(path).arg("stdout");
        if !languages.is_empty() {
            cmd.arg("-l").arg(languages.join("+"));
        }

        let output = cmd.output().map_err(|e| {
            failure(format!("cannot run {}: {e}", self.binary.display()))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| {
                    format!("engine exited with {}", output.status)
                });
            return Err(failure(reason));
        }

        let text = join_fragments(&String::from_utf8_lossy(&output.stdout));
        trace!(path = %path.display(), chars = text.len(), "recognized");
        Ok(text)
    }
}

/// Collapse recognized fragments into one space-separated string.
pub fn join_fragments(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
