//! Cache keys for scoping invalidation of conversion results.

/// Ordered key tuple understood by an external cache layer.
pub type CacheKey = &'static [&'static str];

const ALL: CacheKey = &["converter"];
const CONVERT: CacheKey = &["converter", "convert"];

/// Key factory for the conversion API.
pub struct ConvertKeys;

impl ConvertKeys {
    /// Root key covering everything this client produces.
    pub fn all() -> CacheKey {
        ALL
    }

    /// Key for conversion results. Extends [`ConvertKeys::all`].
    pub fn convert() -> CacheKey {
        CONVERT
    }
}
