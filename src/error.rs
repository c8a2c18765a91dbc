use thiserror::Error;

/// Errors surfaced by the catalog, the favorite store and the resolver.
#[derive(Debug, Error)]
pub enum Error {
    /// Network failure, timeout, non-success status or unreadable payload.
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// The catalog answered, but has no movie with this id.
    #[error("movie {0} not found in catalog")]
    NotFound(i32),

    /// Popular listings are 1-based.
    #[error("invalid page {0}: pages start at 1")]
    InvalidPage(u32),

    /// The favorite store could not be read or written.
    #[error("favorite store failure: {0}")]
    Persistence(String),

    /// Every id of a non-empty batch failed to resolve.
    #[error("resolution aborted: all {attempted} ids failed")]
    ResolutionAborted { attempted: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
