//! SdxBench Client
//!
//! Just enough of a Solid client to benchmark: an LDP document client, a
//! Turtle-backed triple graph, target resolvers and typed contact queries.

mod error;
mod graph;
mod ldp;
mod query;
mod resolver;

pub use error::ClientError;
pub use graph::{Graph, RDF_TYPE, Term, Triple};
pub use ldp::{
    CONTENT_TYPE_TURTLE, LDP_CONTAINS, LdpClient, ResourceType, classify_link_headers,
    document_url,
};
pub use query::{Contact, Entrypoint, GetContactBasic, GetContacts, Query, SCHEMA_PERSON, SolidClient};
pub use resolver::{StaticTargetResolver, TargetResolver};
