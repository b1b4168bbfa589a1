//! Error types for the drawer engine.
//!
//! Component operations return these errors so callers can tell *why*
//! something did nothing. The [`PlaylistDrawer`](crate::engine::PlaylistDrawer)
//! facade never lets them reach the host: every variant is logged and
//! degrades to a no-op or the last known good state.
//!
//! # Taxonomy
//!
//! - [`Error::GeometryUnavailable`]: dependencies not laid out yet, retried
//! - [`Error::InvalidTransition`]: interaction while locked or without a playlist
//! - [`Error::StaleIdentity`]: an id that is no longer rendered
//! - [`Error::Configuration`]: unrecognized action id or mode value
//!
//! The binary uses `anyhow` on top of these.

use std::path::PathBuf;

use crate::playlist::ItemId;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Host geometry has not been laid out yet (zero-sized dependencies)
    #[error("Geometry unavailable: {what}")]
    GeometryUnavailable { what: String },

    /// Interaction requested while the drawer is locked or has no playlist
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Reference to an item that is no longer rendered
    #[error("Stale item id: {0}")]
    StaleIdentity(ItemId),

    /// Unrecognized configuration value
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// File I/O error
    #[error("IO error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file could not be parsed
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a geometry-unavailable error.
    pub fn geometry(what: impl Into<String>) -> Self {
        Self::GeometryUnavailable { what: what.into() }
    }

    /// Create an invalid-transition error.
    pub fn transition(reason: impl Into<String>) -> Self {
        Self::InvalidTransition(reason.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create an I/O error for a path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }

    /// Whether the failure is transient and the operation should be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::GeometryUnavailable { .. } => true,
            Self::WithContext { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}
