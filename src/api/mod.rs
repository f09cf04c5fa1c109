//! Typed client for the image-to-SVG conversion API.

mod client;
mod error;
mod types;

pub use client::{CONVERT_PATH, ClientConfig, ConvertClient, DEFAULT_REQUEST_TIMEOUT};
pub use error::{ApiError, FALLBACK_ERROR_MESSAGE};
pub use types::{ConversionRequest, ConversionResponse, ConversionResult};
