//! Tesseract command-line backend.
//!
//! Each pass pipes a PNG rendition of the variant into `tesseract stdin
//! stdout` and reads the TSV (structured) or plain text output back. The
//! binary is queried once, on first use, for its version and installed
//! language packs.
//!
//! # Installation
//!
//! ```bash
//! sudo apt-get install tesseract-ocr tesseract-ocr-ara   # Debian/Ubuntu
//! brew install tesseract tesseract-lang                  # macOS
//! ```

use super::{encode_png, tsv, OcrEngine, OcrProvider, PassConfig, RawWord};
use crate::config::EngineConfig;
use crate::error::{OcrError, Result};
use image::GrayImage;
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use tracing::{debug, info};

/// What the installed binary reports about itself
#[derive(Debug, Clone, PartialEq)]
pub struct EngineInfo {
    pub version: String,
    pub languages: Vec<String>,
}

/// Backend that shells out to the `tesseract` executable
pub struct TesseractCliProvider {
    command: String,
    name: String,
    info: OnceLock<std::result::Result<EngineInfo, String>>,
}

impl TesseractCliProvider {
    /// Use `command` (a name on `PATH` or an absolute path)
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            name: "tesseract_medical".to_string(),
            info: OnceLock::new(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.tesseract_command.clone()).with_engine_name(config.engine_name.clone())
    }

    pub fn with_engine_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Version and language packs, queried once and cached
    pub fn engine_info(&self) -> Result<&EngineInfo> {
        self.info
            .get_or_init(|| query_engine(&self.command))
            .as_ref()
            .map_err(|e| OcrError::EngineUnavailable(e.clone()))
    }

    pub fn available_languages(&self) -> Result<Vec<String>> {
        Ok(self.engine_info()?.languages.clone())
    }

    fn ensure_languages(&self, language: &str) -> Result<()> {
        let info = self.engine_info()?;
        // Some builds cannot list their packs; let tesseract itself complain
        if info.languages.is_empty() {
            return Ok(());
        }
        match language
            .split('+')
            .find(|lang| !info.languages.iter().any(|l| l == lang))
        {
            Some(missing) => Err(OcrError::EngineUnavailable(format!(
                "language pack '{missing}' is not installed"
            ))),
            None => Ok(()),
        }
    }

    fn run(&self, image: &GrayImage, pass: &PassConfig, structured: bool) -> Result<String> {
        self.ensure_languages(&pass.language)?;
        let png = encode_png(image)?;
        let args = build_args(pass, structured);
        debug!(command = %self.command, ?args, bytes = png.len(), "Running tesseract");

        let mut command = Command::new(&self.command);
        command.args(&args);
        pipe_through(&mut command, &png)
    }
}

impl Default for TesseractCliProvider {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl OcrProvider for TesseractCliProvider {
    fn recognize_words(&self, image: &GrayImage, pass: &PassConfig) -> Result<Vec<RawWord>> {
        let output = self.run(image, pass, true)?;
        Ok(tsv::parse_tsv(&output))
    }

    fn recognize_text(&self, image: &GrayImage, pass: &PassConfig) -> Result<String> {
        self.run(image, pass, false)
    }

    fn engine_name(&self) -> &str {
        &self.name
    }

    fn engine_type(&self) -> OcrEngine {
        OcrEngine::TesseractCli
    }

    fn check_availability(&self) -> Result<()> {
        self.engine_info().map(|_| ())
    }
}

/// Feed `input` to the child's stdin and collect its stdout.
///
/// The child is always waited on, even when the write fails, so a process
/// that exits early is reaped and its own exit status is reported.
fn pipe_through(command: &mut Command, input: &[u8]) -> Result<String> {
    let program = command.get_program().to_string_lossy().into_owned();
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| OcrError::EngineUnavailable(format!("failed to start '{program}': {e}")))?;

    let written = match child.stdin.take() {
        // Dropping stdin closes the pipe before we wait
        Some(mut stdin) => stdin.write_all(input),
        None => Ok(()),
    };
    let output = child.wait_with_output()?;

    if !output.status.success() {
        return Err(OcrError::Engine(format!(
            "{program} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    written?;

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Command-line arguments for one invocation
fn build_args(pass: &PassConfig, structured: bool) -> Vec<String> {
    let mut args = vec![
        "stdin".to_string(),
        "stdout".to_string(),
        "-l".to_string(),
        pass.language.clone(),
        "--psm".to_string(),
        pass.psm.to_psm_value().to_string(),
        "--oem".to_string(),
        pass.oem.to_oem_value().to_string(),
    ];
    if let Some(whitelist) = &pass.char_whitelist {
        args.push("-c".to_string());
        args.push(format!("tessedit_char_whitelist={whitelist}"));
    }
    if structured {
        args.push("tsv".to_string());
    }
    args
}

fn query_engine(command: &str) -> std::result::Result<EngineInfo, String> {
    let version = Command::new(command)
        .arg("--version")
        .output()
        .map_err(|e| format!("'{command}' not found: {e}"))?;
    if !version.status.success() {
        return Err(format!("'{command} --version' exited with {}", version.status));
    }
    // Older releases print the banner on stderr
    let banner = if version.stdout.is_empty() {
        String::from_utf8_lossy(&version.stderr).into_owned()
    } else {
        String::from_utf8_lossy(&version.stdout).into_owned()
    };

    let languages = Command::new(command)
        .arg("--list-langs")
        .output()
        .map(|out| {
            let listing = if out.stdout.is_empty() { out.stderr } else { out.stdout };
            parse_language_list(&String::from_utf8_lossy(&listing))
        })
        .unwrap_or_default();

    let info = EngineInfo {
        version: parse_version(&banner),
        languages,
    };
    info!(version = %info.version, languages = ?info.languages, "Tesseract available");
    Ok(info)
}

fn parse_version(banner: &str) -> String {
    banner
        .lines()
        .next()
        .map(|line| line.trim_start_matches("tesseract").trim().to_string())
        .unwrap_or_default()
}

fn parse_language_list(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter(|line| !line.starts_with("List of available languages"))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
