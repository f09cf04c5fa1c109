use serde::{Deserialize, Serialize};

/// Body of a conversion call.
///
/// `original` is the string-encoded raster (usually a base64 data URL).
/// Unset optional fields are left out of the JSON body entirely.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRequest {
    pub original: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Ordinal 1-10. Not range-checked here; the service decides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparent_bg: Option<bool>,
}

impl ConversionRequest {
    pub fn new(original: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            ..Default::default()
        }
    }

    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn transparent_bg(mut self, transparent_bg: bool) -> Self {
        self.transparent_bg = Some(transparent_bg);
        self
    }
}

/// Produced SVG plus the source image's pixel dimensions.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub svg: String,
    pub width: u32,
    pub height: u32,
}

/// Envelope returned by the conversion endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ConversionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ConversionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
