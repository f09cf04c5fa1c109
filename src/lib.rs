//! Client SDK for the image-to-SVG conversion API.
//!
//! [`api::ConvertClient`] sends conversion requests through an injected
//! [`http::NetworkClient`] and retries transient failures with exponential
//! backoff. [`mutation::ConvertMutation`] exposes the same call as an
//! observable pending / success / error lifecycle, and [`keys::ConvertKeys`]
//! names the cache scopes its results live under.

pub mod api;
pub mod commands;
pub mod http;
pub mod keys;
pub mod mutation;
