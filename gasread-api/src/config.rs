use anyhow::{Context, Result};
use gasread::{OcrEngine, OcrPipeline, PipelineConfig};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";

/// Server settings taken from the environment
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// `GASREAD_ADDR`
    pub addr: SocketAddr,
    /// `GASREAD_CONFIG`: pipeline configuration file (JSON)
    pub pipeline_config: Option<PathBuf>,
    /// `GASREAD_ENGINE`: `tesseract_cli` (default), `tesseract` or `mock`
    pub engine: OcrEngine,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let addr = lookup("GASREAD_ADDR")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr
            .parse()
            .with_context(|| format!("GASREAD_ADDR is not a socket address: {addr}"))?;

        let pipeline_config = lookup("GASREAD_CONFIG")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let engine = match lookup("GASREAD_ENGINE").filter(|v| !v.trim().is_empty()) {
            Some(name) => serde_json::from_value(serde_json::Value::String(name.clone()))
                .with_context(|| format!("GASREAD_ENGINE is not a known engine: {name}"))?,
            None => OcrEngine::TesseractCli,
        };

        Ok(Self {
            addr,
            pipeline_config,
            engine,
        })
    }

    /// Load the pipeline configuration and start the shared pipeline
    pub fn build_pipeline(&self) -> Result<OcrPipeline> {
        let config = match &self.pipeline_config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("Failed to load pipeline config {}", path.display()))?,
            None => PipelineConfig::default(),
        };
        OcrPipeline::with_engine(self.engine, config).context("Failed to start OCR pipeline")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.addr, DEFAULT_ADDR.parse().unwrap());
        assert_eq!(config.pipeline_config, None);
        assert_eq!(config.engine, OcrEngine::TesseractCli);
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("GASREAD_ADDR", "127.0.0.1:8080"),
            ("GASREAD_CONFIG", "/etc/gasread.json"),
            ("GASREAD_ENGINE", "mock"),
        ]))
        .unwrap();
        assert_eq!(config.addr.port(), 8080);
        assert_eq!(config.pipeline_config, Some(PathBuf::from("/etc/gasread.json")));
        assert_eq!(config.engine, OcrEngine::Mock);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(ServerConfig::from_lookup(lookup(&[("GASREAD_ADDR", "nowhere")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("GASREAD_ENGINE", "easyocr")])).is_err());
    }

    #[test]
    fn test_missing_pipeline_config_file() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("GASREAD_CONFIG", "/nonexistent/gasread.json"),
            ("GASREAD_ENGINE", "mock"),
        ]))
        .unwrap();
        assert!(config.build_pipeline().is_err());
    }
}
