use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::info;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::api::{ConversionRequest, ConvertClient};

/// What to convert and where the SVG goes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConvertOptions {
    pub input: PathBuf,
    /// Write the SVG here instead of to `out`.
    pub output: Option<PathBuf>,
    pub quality: Option<u8>,
    pub transparent_bg: bool,
}

/// Converts one image file and writes the resulting SVG.
#[tracing::instrument(skip(client, out))]
pub async fn convert(
    client: &ConvertClient,
    options: &ConvertOptions,
    out: &mut dyn Write,
) -> Result<()> {
    let original = encode_image(&options.input)?;
    let filename = options
        .input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());

    let request = ConversionRequest {
        original,
        filename,
        quality: options.quality,
        // Only sent when requested; the service default applies otherwise.
        transparent_bg: options.transparent_bg.then_some(true),
    };

    info!("Converting {:?}...", options.input);
    let response = client.convert(&request).await?;

    // An ok envelope can still report failure.
    let result = match response.data {
        Some(result) if response.success => result,
        _ => anyhow::bail!(
            "Conversion of {:?} failed: {}",
            options.input,
            response.error.as_deref().unwrap_or("no SVG returned")
        ),
    };

    match &options.output {
        Some(path) => {
            std::fs::write(path, result.svg.as_bytes())
                .with_context(|| format!("Failed to write SVG to {:?}", path))?;
            info!("Wrote {:?}", path);
        }
        None => {
            out.write_all(result.svg.as_bytes())
                .context("Failed to write SVG")?;
            writeln!(out).context("Failed to write SVG")?;
        }
    }

    eprintln!("Converted {}x{} image", result.width, result.height);
    Ok(())
}

/// Reads an image file into a base64 data URL.
pub fn encode_image(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read image {:?}", path))?;
    Ok(format!(
        "data:{};base64,{}",
        mime_for_path(path),
        STANDARD.encode(bytes)
    ))
}

/// Guesses the image MIME type from the file extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}
