//! # tapmon-render
//!
//! Turns parsed sessions into SVG chart artifacts and memoizes them behind a
//! content fingerprint with bounded eviction.
//!
//! ## Key Types
//!
//! - [`Renderer`] - The rendering seam; [`SvgRenderer`] is the default
//! - [`Fingerprint`] - Deterministic digest of a session's change-relevant
//!   attributes, embedding the session id for tag-based purging
//! - [`ArtifactCache`] - Size-bounded cache keyed by fingerprint

mod cache;
mod fingerprint;
mod svg;

pub use cache::{Artifact, ArtifactCache, CacheLimits};
pub use fingerprint::Fingerprint;
pub use svg::SvgRenderer;

use tapmon_sessions::Session;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    /// The renderer itself failed. Never cached; the next request retries.
    #[error("render failed: {0}")]
    Failed(String),

    /// The caller's deadline expired before the renderer finished.
    #[error("render timed out")]
    Timeout,
}

/// A rendering collaborator: session in, opaque artifact bytes out. Must be
/// deterministic for identical input, which is what makes fingerprint-keyed
/// caching sound.
pub trait Renderer: Send + Sync {
    fn render(&self, session: &Session, display_name: &str) -> Result<Vec<u8>, RenderError>;
}
