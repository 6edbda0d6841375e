//! Typed queries over LDP pods
//!
//! A query names the class it returns and, optionally, the id of a single
//! instance. [`SolidClient`] turns that into HTTP fetches: resolve the target,
//! classify it with a HEAD request, download the right document(s), then hand
//! the graph to the query for decoding.

use crate::error::ClientError;
use crate::graph::{Graph, Term};
use crate::ldp::{LdpClient, ResourceType};
use crate::resolver::TargetResolver;
use oxiri::Iri;
use tracing::trace;

/// `schema:Person`
pub const SCHEMA_PERSON: &str = "http://schema.org/Person";
const SCHEMA_GIVEN_NAME: &str = "http://schema.org/givenName";
const SCHEMA_FAMILY_NAME: &str = "http://schema.org/familyName";
const SCHEMA_EMAIL: &str = "http://schema.org/email";

/// Where a query starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entrypoint<'a> {
    /// A single instance by absolute or target-relative id
    Instance(&'a str),
    /// Every instance of the class under the target
    Collection,
}

/// A structured query with a typed result
pub trait Query {
    /// Decoded result
    type Output;

    /// Class the entrypoint returns
    fn class_iri(&self) -> &str;

    /// Instance or collection lookup
    fn entrypoint(&self) -> Entrypoint<'_>;

    /// Decode the matching `subjects` of `graph`.
    ///
    /// `request_url` qualifies relative subject ids.
    fn decode(&self, graph: &Graph, subjects: &[&Term], request_url: &str) -> Self::Output;
}

/// A contact card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub id: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub email: Option<String>,
}

impl Contact {
    fn decode(graph: &Graph, subject: &Term, request_url: &str) -> Self {
        let scalar = |predicate: &str| {
            graph
                .objects(subject, predicate)
                .next()
                .map(|o| o.value().to_string())
        };

        let id = subject.value();
        let id = if id.is_empty() || id.starts_with('#') {
            format!("{request_url}{id}")
        } else {
            id.to_string()
        };

        Contact {
            id,
            given_name: scalar(SCHEMA_GIVEN_NAME),
            family_name: scalar(SCHEMA_FAMILY_NAME),
            email: scalar(SCHEMA_EMAIL),
        }
    }
}

/// `contact(id: ...) { id givenName familyName email }`
#[derive(Debug, Clone)]
pub struct GetContactBasic {
    id: String,
}

impl GetContactBasic {
    /// Query for the contact with this id
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Query for GetContactBasic {
    type Output = Option<Contact>;

    fn class_iri(&self) -> &str {
        SCHEMA_PERSON
    }

    fn entrypoint(&self) -> Entrypoint<'_> {
        Entrypoint::Instance(&self.id)
    }

    fn decode(&self, graph: &Graph, subjects: &[&Term], request_url: &str) -> Option<Contact> {
        subjects
            .first()
            .map(|s| Contact::decode(graph, s, request_url))
    }
}

/// `contacts { id givenName familyName email }`
#[derive(Debug, Clone, Default)]
pub struct GetContacts;

impl Query for GetContacts {
    type Output = Vec<Contact>;

    fn class_iri(&self) -> &str {
        SCHEMA_PERSON
    }

    fn entrypoint(&self) -> Entrypoint<'_> {
        Entrypoint::Collection
    }

    fn decode(&self, graph: &Graph, subjects: &[&Term], request_url: &str) -> Vec<Contact> {
        subjects
            .iter()
            .map(|s| Contact::decode(graph, s, request_url))
            .collect()
    }
}

/// Executes typed queries against an LDP pod
#[derive(Debug, Clone)]
pub struct SolidClient {
    ldp: LdpClient,
}

impl SolidClient {
    /// Client with a fresh HTTP connection pool
    pub fn new() -> Result<Self, ClientError> {
        Ok(Self::with_ldp(LdpClient::new()?))
    }

    /// Client over an existing LDP client
    pub fn with_ldp(ldp: LdpClient) -> Self {
        Self { ldp }
    }

    /// Run `query`, locating its data through `resolver`.
    pub async fn query<Q: Query>(
        &self,
        query: &Q,
        resolver: &dyn TargetResolver,
    ) -> Result<Q::Output, ClientError> {
        let class = query.class_iri();
        let target = resolver
            .resolve(class)
            .ok_or_else(|| ClientError::Unresolved(class.to_string()))?;
        let resource_type = self.ldp.fetch_resource_type(target).await?;
        trace!(%target, ?resource_type, "resolved query target");

        match query.entrypoint() {
            Entrypoint::Instance(id) => {
                let document = match resource_type {
                    ResourceType::Document => target.to_string(),
                    ResourceType::Container => absolute_url(id, target)?,
                };
                if !document.starts_with(target) {
                    return Err(ClientError::OutOfRange {
                        id: document,
                        target: target.to_string(),
                    });
                }

                let graph = self.ldp.download_document_graph(&document).await?;
                let subject = Term::iri(absolute_url(id, target)?);
                let subjects: Vec<&Term> = if graph.has_type(&subject, class) {
                    vec![&subject]
                } else {
                    Vec::new()
                };
                Ok(query.decode(&graph, &subjects, target))
            }
            Entrypoint::Collection => {
                let graph = match resource_type {
                    ResourceType::Document => self.ldp.download_document_graph(target).await?,
                    ResourceType::Container => self.ldp.download_container_as_graph(target).await?,
                };
                let subjects: Vec<&Term> = graph.subjects_of_type(class).collect();
                Ok(query.decode(&graph, &subjects, target))
            }
        }
    }
}

/// Resolve `id` against `base` unless it already is absolute
fn absolute_url(id: &str, base: &str) -> Result<String, ClientError> {
    if let Ok(iri) = Iri::parse(id) {
        return Ok(iri.into_inner().to_string());
    }
    let base_iri = Iri::parse(base).map_err(|e| ClientError::Iri {
        iri: base.to_string(),
        message: e.to_string(),
    })?;
    base_iri
        .resolve(id)
        .map(|iri| iri.into_inner())
        .map_err(|e| ClientError::Iri {
            iri: id.to_string(),
            message: e.to_string(),
        })
}
