//! Command implementations behind the `img2svg` binary.

use anyhow::{Context, Result};
use std::io::Write;

use crate::keys::{CacheKey, ConvertKeys};

pub mod config;
mod convert;

pub use convert::{ConvertOptions, convert, encode_image, mime_for_path};

/// Prints the cache keys, one JSON array per line.
pub fn keys(out: &mut dyn Write) -> Result<()> {
    for key in [ConvertKeys::all(), ConvertKeys::convert()] {
        writeln!(out, "{}", render_key(key)?).context("Failed to write cache key")?;
    }
    Ok(())
}

fn render_key(key: CacheKey) -> Result<String> {
    serde_json::to_string(key).context("Failed to encode cache key")
}
