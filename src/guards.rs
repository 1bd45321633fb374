//! Guard-key extraction from db_bench results logs
//!
//! The `sstables` benchmark dumps per-level SSTable listings mixed with
//! `Guard Key:` lines. Each guard key is a hex dump of an internal key:
//! a `0x` prefix, the user-key payload, and a fixed-width trailer
//! (sequence number + value type) that carries no guard identity.
//! This module strips the wrapper and rewrites the payload as a plain
//! decimal integer, copying `--- level ` markers through verbatim so the
//! side file keeps the per-level structure of the log.

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Per-level marker lines, copied through byte for byte.
pub const LEVEL_PREFIX: &str = "--- level ";
/// Lines carrying a hex-encoded guard key as their third token.
pub const GUARD_PREFIX: &str = "Guard Key: ";

/// Token logged for a guard with no usable key.
const BAD_KEY_TOKEN: &str = "(bad)";
/// Leading `0x` on every guard key token.
const HEX_PREFIX_LEN: usize = 2;
/// Fixed-width internal-key trailer appended to every guard key.
const KEY_SUFFIX_LEN: usize = 17;

/// What a single log line contributes to the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Unrecognized line, or a `(bad)` guard: nothing to emit.
    Skip,
    /// A level marker, emitted verbatim.
    Level(String),
    /// A decoded guard-key payload, emitted in decimal.
    Guard(u128),
}

/// Classify one log line into the record it contributes, if any.
///
/// Fails on a `Guard Key:` line that does not match the expected shape:
/// fewer than three tokens, a key token too short to hold both the `0x`
/// prefix and the internal-key trailer, or a non-hex payload.
pub fn classify_line(line: &str) -> Result<LineOutcome> {
    if line.starts_with(LEVEL_PREFIX) {
        return Ok(LineOutcome::Level(line.to_string()));
    }
    if !line.starts_with(GUARD_PREFIX) {
        return Ok(LineOutcome::Skip);
    }

    let words: Vec<&str> = line.split_whitespace().collect();
    let key = match words.get(2) {
        Some(key) => *key,
        None => bail!("Guard key line has fewer than 3 tokens: {:?}", line),
    };
    if key == BAD_KEY_TOKEN {
        return Ok(LineOutcome::Skip);
    }

    if key.len() <= HEX_PREFIX_LEN + KEY_SUFFIX_LEN {
        bail!(
            "Guard key token {:?} is too short: expected a hex payload between the 0x prefix and the {}-char internal-key suffix",
            key,
            KEY_SUFFIX_LEN
        );
    }
    let payload = key
        .get(HEX_PREFIX_LEN..key.len() - KEY_SUFFIX_LEN)
        .with_context(|| format!("Guard key token {:?} is not ASCII hex", key))?;
    let value = u128::from_str_radix(payload, 16)
        .with_context(|| format!("Guard key payload {:?} is not valid hex", payload))?;

    Ok(LineOutcome::Guard(value))
}

/// Extract guard records from `input` into `output`.
///
/// Processes the log in a single pass, preserving input order. The output
/// file is created (truncated) fresh each run and holds one record per
/// line: verbatim level markers and decimal guard values. Returns the
/// number of records written. Any I/O or shape error aborts the pass.
pub fn extract_guards(input: &Path, output: &Path) -> Result<u64> {
    let reader = BufReader::new(
        File::open(input)
            .with_context(|| format!("Failed to open results log {}", input.display()))?,
    );
    let mut writer = BufWriter::new(
        File::create(output)
            .with_context(|| format!("Failed to create {}", output.display()))?,
    );

    let mut emitted = 0u64;
    for line in reader.lines() {
        let line = line.with_context(|| format!("Failed to read {}", input.display()))?;
        match classify_line(&line)? {
            LineOutcome::Skip => {}
            LineOutcome::Level(text) => {
                writeln!(writer, "{}", text)?;
                emitted += 1;
            }
            LineOutcome::Guard(value) => {
                writeln!(writer, "{}", value)?;
                emitted += 1;
            }
        }
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!("Extracted {} guard records to {}", emitted, output.display());
    Ok(emitted)
}
