use std::sync::Arc;

use futures::StreamExt;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, info};

use super::backend::UnitBackend;
use super::error::{PoolError, Result};

static SIZE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([\d.]+)([KMGT]?)$").expect("size pattern is valid"));

/// Reports a unit's real occupancy by running `du` against its storage mount.
///
/// Nothing is cached: every call goes to the backend.
pub struct CapacityOracle {
    backend: Arc<dyn UnitBackend>,
    storage_path: String,
}

impl CapacityOracle {
    pub fn new(backend: Arc<dyn UnitBackend>, storage_path: impl Into<String>) -> Self {
        Self {
            backend,
            storage_path: storage_path.into(),
        }
    }

    pub async fn measure_used_bytes(&self, unit_id: &str) -> Result<u64> {
        let cmd = vec![
            "du".to_string(),
            "-sh".to_string(),
            self.storage_path.clone(),
        ];

        let mut stream = self.backend.exec(unit_id, &cmd).await.map_err(|e| {
            error!("Failed to run du in unit {}: {}", unit_id, e);
            PoolError::exec(format!("du in unit {unit_id}"), e)
        })?;

        let mut output = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                error!("Output stream of unit {} failed: {}", unit_id, e);
                PoolError::exec(format!("reading du output of unit {unit_id}"), e)
            })?;
            output.extend_from_slice(&chunk);
        }

        let text = String::from_utf8_lossy(&output);
        let token = first_token(&text);
        let bytes = parse_size(&token).inspect_err(|e| {
            error!("Unit {} reported unusable size: {}", unit_id, e);
        })?;

        info!("Unit {} currently holds {} bytes", unit_id, bytes);
        Ok(bytes)
    }
}

/// First field of `du` output (`"482M\t/app/storage\n"` -> `"482M"`), cleaned.
fn first_token(output: &str) -> String {
    output
        .split(char::is_whitespace)
        .map(clean_token)
        .find(|token| !token.is_empty())
        .unwrap_or_default()
}

fn clean_token(raw: &str) -> String {
    raw.chars()
        .filter(|c| (' '..='~').contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Parses a human-readable size (`512`, `4K`, `2.5M`, `1g`) into bytes.
pub fn parse_size(token: &str) -> Result<u64> {
    let caps = SIZE_PATTERN
        .captures(token)
        .ok_or_else(|| PoolError::SizeParse(token.to_string()))?;

    let value: f64 = caps[1]
        .parse()
        .map_err(|_| PoolError::SizeParse(token.to_string()))?;

    let multiplier: u64 = match caps[2].to_ascii_uppercase().as_str() {
        "K" => 1024,
        "M" => 1024u64.pow(2),
        "G" => 1024u64.pow(3),
        "T" => 1024u64.pow(4),
        _ => 1,
    };

    Ok((value * multiplier as f64).round() as u64)
}
