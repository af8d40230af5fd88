use std::path::{Path, PathBuf};

use crate::{
    data_dir::DataDir,
    error::{Error, Result},
    recognizer::TesseractRecognizer,
};

pub const LANGS_ENV_VAR: &str = "OCRDEX_LANGS";
pub const DEFAULT_LANGUAGES: &[&str] = &["eng"];

/// Process-wide settings, resolved once at startup.
///
/// Language codes are kept as given and only validated by
/// [`Config::languages`], so commands that never run OCR are not held
/// back by a bad `OCRDEX_LANGS`.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: DataDir,
    /// `--lang` values exactly as passed on the command line.
    pub cli_languages: Vec<String>,
    /// Raw value of `OCRDEX_LANGS` at startup.
    pub env_languages: Option<String>,
    /// Explicit engine binary; `None` defers to the environment.
    pub tesseract: Option<PathBuf>,
}

impl Config {
    pub fn load(
        data_dir: Option<&Path>,
        languages: &[String],
        tesseract: Option<&Path>,
    ) -> Result<Self> {
        Ok(Self {
            data_dir: DataDir::resolve(data_dir)?,
            cli_languages: languages.to_vec(),
            env_languages: std::env::var(LANGS_ENV_VAR).ok(),
            tesseract: tesseract.map(Path::to_path_buf),
        })
    }

    /// OCR language codes, in the order handed to the engine.
    pub fn languages(&self) -> Result<Vec<String>> {
        resolve_languages(&self.cli_languages, self.env_languages.clone())
    }

    pub fn recognizer(&self) -> TesseractRecognizer {
        match &self.tesseract {
            Some(bin) => TesseractRecognizer::with_binary(bin.clone()),
            None => TesseractRecognizer::new(),
        }
    }
}

/// Pick language codes from the command line, then the environment, then
/// the default. Codes may be separated by `,` or `+`.
pub fn resolve_languages(
    cli: &[String],
    env: Option<String>,
) -> Result<Vec<String>> {
    let raw: Vec<String> = if !cli.is_empty() {
        cli.to_vec()
    } else if let Some(env) = env.filter(|v| !v.trim().is_empty()) {
        vec![env]
    } else {
        return Ok(DEFAULT_LANGUAGES.iter().map(|l| l.to_string()).collect());
    };

    let mut languages: Vec<String> = Vec::new();
    for code in raw.iter().flat_map(|r| r.split([',', '+'])) {
        let code = code.trim();
        if code.is_empty()
            || !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(Error::Config(format!(
                "invalid OCR language code: '{code}'"
            )));
        }
        if !languages.iter().any(|l| l == code) {
            languages.push(code.to_string());
        }
    }
    Ok(languages)
}
