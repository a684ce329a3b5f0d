//! Hex fixtures: one byte per line, two hex digits.
//!
//! Used to persist request/response frames for offline replay. Blank lines
//! are skipped and values are masked to 8 bits on load; saved files use
//! uppercase digits.
//!
//! # Example
//!
//! ```
//! use nnfpga_link::fixture::{format_hex_bytes, parse_hex_bytes};
//!
//! let text = format_hex_bytes(&[0xA5, 0x5A, 0x01]);
//! assert_eq!(text, "A5\n5A\n01\n");
//! assert_eq!(parse_hex_bytes(&text).unwrap(), vec![0xA5, 0x5A, 0x01]);
//! ```

use std::fmt::Write as _;
use std::path::Path;

use crate::error::{LinkError, Result};

/// Parse fixture text into bytes.
pub fn parse_hex_bytes(text: &str) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let digits = line
            .strip_prefix("0x")
            .or_else(|| line.strip_prefix("0X"))
            .unwrap_or(line);
        let value = u64::from_str_radix(digits, 16).map_err(|e| LinkError::HexFixture {
            line: idx + 1,
            message: format!("{:?}: {}", line, e),
        })?;
        out.push((value & 0xFF) as u8);
    }
    Ok(out)
}

/// Render bytes as fixture text.
pub fn format_hex_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for b in bytes {
        let _ = writeln!(out, "{:02X}", b);
    }
    out
}

/// Load a fixture file.
pub async fn load_hex_file(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let text = tokio::fs::read_to_string(path.as_ref()).await?;
    let bytes = parse_hex_bytes(&text)?;
    tracing::debug!("Loaded {} bytes from {}", bytes.len(), path.as_ref().display());
    Ok(bytes)
}

/// Save bytes as a fixture file, creating parent directories.
pub async fn save_hex_file(path: impl AsRef<Path>, bytes: &[u8]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(path, format_hex_bytes(bytes)).await?;
    tracing::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
