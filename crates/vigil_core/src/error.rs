//! Integration fault taxonomy
//!
//! Nothing in the engine fails in a user-visible way. These errors describe
//! faults in the platform services the engine is wired to; callers catch them
//! at the UI-handler boundary and downgrade them to a logged no-op.

use thiserror::Error;

/// A fault raised by an external platform service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrationError {
    /// The platform cannot observe element visibility.
    #[error("intersection observer unavailable: {0}")]
    ObserverUnavailable(String),

    /// The analytics collector rejected or failed an emission.
    #[error("analytics emission failed: {0}")]
    AnalyticsFailed(String),

    /// No scroll anchor with the given id exists in the current document.
    #[error("scroll target not found: #{0}")]
    ScrollTargetMissing(String),

    /// The router produced a path no page is registered for.
    #[error("no page registered for route {0:?}")]
    UnknownRoute(String),
}

pub type Result<T> = std::result::Result<T, IntegrationError>;
