//! Linked Data Platform document client

use crate::error::ClientError;
use crate::graph::{Graph, Term};
use reqwest::header::{ACCEPT, LINK};
use tracing::debug;

/// Media type requested for every document
pub const CONTENT_TYPE_TURTLE: &str = "text/turtle";

/// `ldp:contains`
pub const LDP_CONTAINS: &str = "http://www.w3.org/ns/ldp#contains";

const CONTAINER_LINK: &str = "<http://www.w3.org/ns/ldp#Container>; rel=\"type\"";
const RESOURCE_LINK: &str = "<http://www.w3.org/ns/ldp#Resource>; rel=\"type\"";

/// Kind of resource behind a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    /// Lists other resources through `ldp:contains`
    Container,
    /// A single RDF document
    Document,
}

/// Classify a resource from its `Link` header values.
///
/// A container is also a resource, so the container relation wins.
pub fn classify_link_headers<'a, I>(values: I) -> Option<ResourceType>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut resource = false;
    for link in values.into_iter().flat_map(|v| v.split(',')).map(str::trim) {
        if link == CONTAINER_LINK {
            return Some(ResourceType::Container);
        }
        resource |= link == RESOURCE_LINK;
    }
    resource.then_some(ResourceType::Document)
}

/// Strip the fragment; it never reaches the server
pub fn document_url(url: &str) -> &str {
    url.split_once('#').map_or(url, |(doc, _)| doc)
}

/// Thin client over the HTTP calls an LDP pod answers
#[derive(Debug, Clone)]
pub struct LdpClient {
    http: reqwest::Client,
}

impl LdpClient {
    /// Client over a default `reqwest::Client`
    pub fn new() -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self::with_http(http))
    }

    /// Client over an existing `reqwest::Client`
    pub fn with_http(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// GET a document as Turtle and parse it with the document URL as base.
    pub async fn download_document_graph(&self, url: &str) -> Result<Graph, ClientError> {
        let url = document_url(url);
        let response = self
            .http
            .get(url)
            .header(ACCEPT, CONTENT_TYPE_TURTLE)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                method: "GET",
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        Graph::parse_turtle(&body, url)
    }

    /// GET a container index and merge the graphs of everything it contains.
    pub async fn download_container_as_graph(&self, url: &str) -> Result<Graph, ClientError> {
        let index = self.download_document_graph(url).await?;
        let container = Term::iri(document_url(url));

        let mut merged = Graph::new();
        for member in index.objects(&container, LDP_CONTAINS) {
            if let Term::Iri(member_url) = member {
                debug!(container = %url, member = %member_url, "downloading container member");
                merged.merge(self.download_document_graph(member_url).await?);
            }
        }
        Ok(merged)
    }

    /// HEAD a URL and classify it from its `Link` headers.
    pub async fn fetch_resource_type(&self, url: &str) -> Result<ResourceType, ClientError> {
        let response = self.http.head(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                method: "HEAD",
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let links = response
            .headers()
            .get_all(LINK)
            .iter()
            .filter_map(|v| v.to_str().ok());
        classify_link_headers(links).ok_or_else(|| ClientError::UnknownResourceType(url.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;

    /// Canned response served by [`serve`]
    pub(crate) struct Route {
        pub method: &'static str,
        pub path: &'static str,
        pub link: Option<&'static str>,
        pub body: &'static str,
    }

    /// Serve `routes` on an ephemeral port until the test process exits.
    /// Unknown requests get a 404.
    pub(crate) fn serve(routes: Vec<Route>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut reader = BufReader::new(stream.try_clone().unwrap());

                let mut request_line = String::new();
                if reader.read_line(&mut request_line).is_err() {
                    continue;
                }
                loop {
                    let mut header = String::new();
                    match reader.read_line(&mut header) {
                        Ok(0) => break,
                        Ok(_) if header == "\r\n" => break,
                        Ok(_) => {}
                        Err(_) => break,
                    }
                }

                let mut parts = request_line.split_whitespace();
                let method = parts.next().unwrap_or_default();
                let path = parts.next().unwrap_or_default();
                let route = routes
                    .iter()
                    .find(|r| r.method == method && r.path == path);

                let response = match route {
                    Some(route) => {
                        let link = route
                            .link
                            .map(|l| format!("Link: {l}\r\n"))
                            .unwrap_or_default();
                        let body = if method == "HEAD" { "" } else { route.body };
                        format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: text/turtle\r\n{link}Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                            route.body.len()
                        )
                    }
                    None => "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                        .to_string(),
                };
                let _ = stream.write_all(response.as_bytes());
            }
        });

        format!("http://{addr}")
    }

    #[test]
    fn test_classify_link_headers() {
        assert_eq!(
            classify_link_headers([RESOURCE_LINK]),
            Some(ResourceType::Document)
        );
        assert_eq!(
            classify_link_headers([RESOURCE_LINK, CONTAINER_LINK]),
            Some(ResourceType::Container)
        );
        let joined = format!("<http://www.w3.org/ns/ldp#BasicContainer>; rel=\"type\", {CONTAINER_LINK}");
        assert_eq!(
            classify_link_headers([joined.as_str()]),
            Some(ResourceType::Container)
        );
        assert_eq!(classify_link_headers(["<http://example.org/x>; rel=\"acl\""]), None);
    }

    #[test]
    fn test_document_url_strips_fragment() {
        assert_eq!(
            document_url("http://localhost:3000/contacts/contacts.ttl#jdoe"),
            "http://localhost:3000/contacts/contacts.ttl"
        );
        assert_eq!(document_url("http://localhost:3000/"), "http://localhost:3000/");
    }

    #[tokio::test]
    async fn test_download_and_classify() {
        let base = serve(vec![
            Route {
                method: "HEAD",
                path: "/doc.ttl",
                link: Some(RESOURCE_LINK),
                body: "<#me> <http://schema.org/name> \"Me\" .",
            },
            Route {
                method: "GET",
                path: "/doc.ttl",
                link: Some(RESOURCE_LINK),
                body: "<#me> <http://schema.org/name> \"Me\" .",
            },
        ]);
        let client = LdpClient::new().unwrap();
        let url = format!("{base}/doc.ttl");

        assert_eq!(
            client.fetch_resource_type(&url).await.unwrap(),
            ResourceType::Document
        );
        let graph = client.download_document_graph(&url).await.unwrap();
        assert!(graph.first_with_subject(&format!("{url}#me")).is_some());
    }

    #[tokio::test]
    async fn test_container_members_are_merged() {
        let base = serve(vec![
            Route {
                method: "GET",
                path: "/box/",
                link: Some(CONTAINER_LINK),
                body: "<> <http://www.w3.org/ns/ldp#contains> <a.ttl>, <b.ttl> .",
            },
            Route {
                method: "GET",
                path: "/box/a.ttl",
                link: None,
                body: "<#a> a <http://schema.org/Person> .",
            },
            Route {
                method: "GET",
                path: "/box/b.ttl",
                link: None,
                body: "<#b> a <http://schema.org/Person> .",
            },
        ]);
        let client = LdpClient::new().unwrap();

        let graph = client
            .download_container_as_graph(&format!("{base}/box/"))
            .await
            .unwrap();
        assert_eq!(graph.subjects_of_type("http://schema.org/Person").count(), 2);
    }

    #[tokio::test]
    async fn test_not_found_is_a_status_error() {
        let base = serve(Vec::new());
        let client = LdpClient::new().unwrap();
        let err = client
            .download_document_graph(&format!("{base}/missing.ttl"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 404, .. }));
    }
}
