//! Target resolution
//!
//! A typed query names a class; the resolver decides which container or
//! document on the pod holds instances of it.

use crate::error::ClientError;
use oxiri::Iri;

/// Maps a class IRI to the URL that holds its instances
pub trait TargetResolver {
    /// Target URL for `class_iri`, `None` when unknown
    fn resolve(&self, class_iri: &str) -> Option<&str>;
}

/// Sends every class to the same URL
#[derive(Debug, Clone)]
pub struct StaticTargetResolver {
    target: String,
}

impl StaticTargetResolver {
    /// Resolver for a fixed target; the URL must be an absolute IRI.
    pub fn new(target: impl Into<String>) -> Result<Self, ClientError> {
        let target = target.into();
        let checked = Iri::parse(target.as_str())
            .map(|_| ())
            .map_err(|e| e.to_string());
        match checked {
            Ok(()) => Ok(Self { target }),
            Err(message) => Err(ClientError::Iri {
                iri: target,
                message,
            }),
        }
    }
}

impl TargetResolver for StaticTargetResolver {
    fn resolve(&self, _class_iri: &str) -> Option<&str> {
        Some(&self.target)
    }
}
