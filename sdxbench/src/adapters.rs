//! The two benchmarked operations
//!
//! Both hold an async HTTP client and a current-thread runtime for the
//! lifetime of a fork, and block on one complete request per invocation.

use anyhow::Context;
use sdxbench_client::{GetContactBasic, LdpClient, SolidClient, StaticTargetResolver};
use sdxbench_core::Operation;
use tokio::runtime::Runtime;

/// Container the typed query resolves to
pub const CONTACTS_TARGET: &str = "http://localhost:3000/contacts/";

/// Document the baseline fetches
pub const CONTACTS_DOCUMENT: &str = "http://localhost:3000/contacts/contacts.ttl";

/// Contact both operations look up
pub const CONTACT_ID: &str = "http://localhost:3000/contacts/contacts.ttl#jdoe";

fn current_thread_runtime() -> anyhow::Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create async runtime")
}

/// `sdxTest`: the `GetContactBasic` typed query through the SDX client
pub struct SdxQueryOperation {
    runtime: Runtime,
    client: SolidClient,
    resolver: StaticTargetResolver,
    query: GetContactBasic,
}

impl SdxQueryOperation {
    /// Query `contact_id` with every class resolved to `target`
    pub fn new(target: &str, contact_id: &str) -> anyhow::Result<Self> {
        Ok(Self {
            runtime: current_thread_runtime()?,
            client: SolidClient::new()?,
            resolver: StaticTargetResolver::new(target)?,
            query: GetContactBasic::new(contact_id),
        })
    }

    /// Per-fork setup against the local pod
    pub fn setup() -> anyhow::Result<Box<dyn Operation>> {
        Ok(Box::new(Self::new(CONTACTS_TARGET, CONTACT_ID)?))
    }
}

impl Operation for SdxQueryOperation {
    fn invoke(&mut self) -> anyhow::Result<()> {
        let contact = self
            .runtime
            .block_on(self.client.query(&self.query, &self.resolver))?;
        std::hint::black_box(contact);
        Ok(())
    }
}

/// `baseline`: raw GET of the contacts document, parse, first matching triple
pub struct BaselineOperation {
    runtime: Runtime,
    ldp: LdpClient,
    document: String,
    subject: String,
}

impl BaselineOperation {
    /// Fetch `document` and look for the first triple about `subject`
    pub fn new(document: &str, subject: &str) -> anyhow::Result<Self> {
        Ok(Self {
            runtime: current_thread_runtime()?,
            ldp: LdpClient::new()?,
            document: document.to_string(),
            subject: subject.to_string(),
        })
    }

    /// Per-fork setup against the local pod
    pub fn setup() -> anyhow::Result<Box<dyn Operation>> {
        Ok(Box::new(Self::new(CONTACTS_DOCUMENT, CONTACT_ID)?))
    }
}

impl Operation for BaselineOperation {
    fn invoke(&mut self) -> anyhow::Result<()> {
        let graph = self
            .runtime
            .block_on(self.ldp.download_document_graph(&self.document))?;
        let triple = graph
            .first_with_subject(&self.subject)
            .cloned()
            .with_context(|| format!("no triple with subject <{}>", self.subject))?;
        std::hint::black_box(triple);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_target_fails_setup() {
        assert!(SdxQueryOperation::new("contacts/", CONTACT_ID).is_err());
    }

    #[test]
    fn test_unreachable_server_is_an_operation_error() {
        // Bind then drop to get a port nobody listens on.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let document = format!("http://127.0.0.1:{port}/contacts/contacts.ttl");

        let mut op = BaselineOperation::new(&document, &format!("{document}#jdoe")).unwrap();
        assert!(op.invoke().is_err());
    }
}
