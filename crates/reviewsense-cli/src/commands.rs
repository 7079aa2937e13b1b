//! Command implementations, kept free of process setup so they can be tested

use anyhow::{Context, Result};
use reviewsense_inference::{InferenceConfig, InferenceService};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Load the configuration file, falling back to defaults when it is absent
pub fn load_config(path: &Path, model_dir: Option<PathBuf>) -> Result<InferenceConfig> {
    let config = if path.exists() {
        let config = InferenceConfig::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?;
        info!(path = %path.display(), "Configuration loaded");
        config
    } else {
        info!(path = %path.display(), "No configuration file, using defaults");
        InferenceConfig::default()
    };

    Ok(match model_dir {
        Some(dir) => config.with_model_dir(dir),
        None => config,
    })
}

/// Classify texts and write one JSON result per line
pub fn predict(service: &InferenceService, texts: &[String], out: &mut impl Write) -> Result<()> {
    let texts: Vec<&str> = texts.iter().map(String::as_str).collect();
    for result in service.classify_batch(&texts) {
        serde_json::to_writer(&mut *out, &result).context("failed to encode prediction")?;
        writeln!(out)?;
    }
    Ok(())
}

/// Non-empty lines of a reader, trimmed
pub fn read_texts(reader: impl BufRead) -> Result<Vec<String>> {
    let mut texts = Vec::new();
    for line in reader.lines() {
        let line = line.context("failed to read input")?;
        let line = line.trim();
        if !line.is_empty() {
            texts.push(line.to_string());
        }
    }
    Ok(texts)
}

/// Write the status report as pretty JSON
pub fn status(service: &InferenceService, out: &mut impl Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, &service.status()).context("failed to encode status")?;
    writeln!(out)?;
    Ok(())
}
