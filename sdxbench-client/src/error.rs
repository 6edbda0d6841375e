use thiserror::Error;

/// Errors raised by the LDP client and typed queries
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{method} {url} returned status {status}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
    },

    #[error("invalid IRI {iri:?}: {message}")]
    Iri { iri: String, message: String },

    #[error("failed to parse Turtle from {url}: {message}")]
    Turtle { url: String, message: String },

    #[error("{0} is neither an LDP container nor an LDP resource")]
    UnknownResourceType(String),

    #[error("entity {id} is not in range of target URL {target}")]
    OutOfRange { id: String, target: String },

    #[error("no target URL could be resolved for class {0}")]
    Unresolved(String),
}
