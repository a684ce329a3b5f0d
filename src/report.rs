//! Machine-readable report output.
//!
//! Reports go to stdout, one per line; logs go to stderr through
//! `tracing` so the two never interleave.
//!
//! # Example
//!
//! ```ignore
//! use nnfpga_link::report::write_stdout_json;
//!
//! write_stdout_json(&report)?;
//! ```

use std::io::Write;

/// Write a line to stdout.
///
/// Writes the string followed by a single `\n` and flushes.
///
/// # Errors
///
/// Returns IO error if write or flush fails.
pub fn write_stdout_line(line: &str) -> std::io::Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    handle.write_all(line.as_bytes())?;
    handle.write_all(b"\n")?;
    handle.flush()?;
    Ok(())
}

/// Write a value to stdout as a single JSON line.
///
/// # Errors
///
/// Returns error if serialization or write fails.
pub fn write_stdout_json<T: serde::Serialize>(value: &T) -> std::io::Result<()> {
    let json = serde_json::to_string(value)?;
    write_stdout_line(&json)
}

/// Render values as a compact list for human-readable output.
pub fn format_values(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{}", v)).collect();
    format!("[{}]", parts.join(", "))
}
