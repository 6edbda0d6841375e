//! In-memory triple graph
//!
//! Documents are small (one contact card, one container index), so the graph
//! is a flat vector scanned linearly.

use crate::error::ClientError;
use oxiri::Iri;
use rio_api::model;
use rio_api::parser::TriplesParser;
use rio_turtle::{TurtleError, TurtleParser};

/// `rdf:type`
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// An owned RDF term
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// Absolute IRI
    Iri(String),
    /// Blank node label, scoped to one document
    BlankNode(String),
    /// Literal with its lexical form
    Literal {
        value: String,
        datatype: Option<String>,
        language: Option<String>,
    },
}

impl Term {
    /// IRI term
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(iri.into())
    }

    /// Plain string literal
    pub fn literal(value: impl Into<String>) -> Self {
        Term::Literal {
            value: value.into(),
            datatype: None,
            language: None,
        }
    }

    /// IRI, blank node label or literal lexical form
    pub fn value(&self) -> &str {
        match self {
            Term::Iri(v) | Term::BlankNode(v) => v,
            Term::Literal { value, .. } => value,
        }
    }

    /// Whether this term is the given IRI
    pub fn is_iri(&self, iri: &str) -> bool {
        matches!(self, Term::Iri(v) if v == iri)
    }
}

/// A subject-predicate-object fact
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Triple {
    pub subject: Term,
    pub predicate: String,
    pub object: Term,
}

/// A set of triples parsed from one or more documents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    triples: Vec<Triple>,
}

impl Graph {
    /// Empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a Turtle document, resolving relative IRIs against `base`.
    pub fn parse_turtle(body: &str, base: &str) -> Result<Self, ClientError> {
        let base_iri = Iri::parse(base.to_string()).map_err(|e| ClientError::Iri {
            iri: base.to_string(),
            message: e.to_string(),
        })?;

        let mut graph = Graph::new();
        let mut parser = TurtleParser::new(body.as_bytes(), Some(base_iri));
        parser
            .parse_all(&mut |t| -> Result<(), TurtleError> {
                if let Some(triple) = own_triple(&t) {
                    graph.triples.push(triple);
                }
                Ok(())
            })
            .map_err(|e| ClientError::Turtle {
                url: base.to_string(),
                message: e.to_string(),
            })?;

        Ok(graph)
    }

    /// Add one triple
    pub fn insert(&mut self, triple: Triple) {
        self.triples.push(triple);
    }

    /// Append every triple of `other`
    pub fn merge(&mut self, other: Graph) {
        self.triples.extend(other.triples);
    }

    /// Triple count
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    /// Whether the graph holds no triple
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// All triples in document order
    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    /// Triples matching a pattern; `None` is a wildcard
    pub fn find<'a>(
        &'a self,
        subject: Option<&'a Term>,
        predicate: Option<&'a str>,
        object: Option<&'a Term>,
    ) -> impl Iterator<Item = &'a Triple> + 'a {
        self.triples.iter().filter(move |t| {
            subject.map_or(true, |s| &t.subject == s)
                && predicate.map_or(true, |p| t.predicate == p)
                && object.map_or(true, |o| &t.object == o)
        })
    }

    /// First triple whose subject is the IRI `subject`
    pub fn first_with_subject(&self, subject: &str) -> Option<&Triple> {
        self.triples.iter().find(|t| t.subject.is_iri(subject))
    }

    /// Objects of `subject predicate ?o`, in document order
    pub fn objects<'a>(
        &'a self,
        subject: &'a Term,
        predicate: &'a str,
    ) -> impl Iterator<Item = &'a Term> + 'a {
        self.find(Some(subject), Some(predicate), None)
            .map(|t| &t.object)
    }

    /// Subjects typed `class_iri`
    pub fn subjects_of_type<'a>(&'a self, class_iri: &'a str) -> impl Iterator<Item = &'a Term> + 'a {
        self.triples
            .iter()
            .filter(move |t| t.predicate == RDF_TYPE && t.object.is_iri(class_iri))
            .map(|t| &t.subject)
    }

    /// Whether `subject` is typed `class_iri`
    pub fn has_type(&self, subject: &Term, class_iri: &str) -> bool {
        self.objects(subject, RDF_TYPE).any(|o| o.is_iri(class_iri))
    }
}

// Quoted triples (RDF-star) have no counterpart here and are skipped.
fn own_triple(t: &model::Triple<'_>) -> Option<Triple> {
    let subject = match t.subject {
        model::Subject::NamedNode(n) => Term::Iri(n.iri.to_string()),
        model::Subject::BlankNode(b) => Term::BlankNode(b.id.to_string()),
        _ => return None,
    };
    let object = match t.object {
        model::Term::NamedNode(n) => Term::Iri(n.iri.to_string()),
        model::Term::BlankNode(b) => Term::BlankNode(b.id.to_string()),
        model::Term::Literal(model::Literal::Simple { value }) => Term::literal(value),
        model::Term::Literal(model::Literal::LanguageTaggedString { value, language }) => {
            Term::Literal {
                value: value.to_string(),
                datatype: None,
                language: Some(language.to_string()),
            }
        }
        model::Term::Literal(model::Literal::Typed { value, datatype }) => Term::Literal {
            value: value.to_string(),
            datatype: Some(datatype.iri.to_string()),
            language: None,
        },
        _ => return None,
    };
    Some(Triple {
        subject,
        predicate: t.predicate.iri.to_string(),
        object,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://localhost:3000/contacts/contacts.ttl";

    const CONTACTS: &str = r#"
@prefix schema: <http://schema.org/> .

<#jdoe> a schema:Person ;
    schema:givenName "John" ;
    schema:familyName "Doe" ;
    schema:email "jdoe@example.org" .

<#asmith> a schema:Person ;
    schema:givenName "Alice"@en .
"#;

    #[test]
    fn test_relative_iris_resolve_against_base() {
        let graph = Graph::parse_turtle(CONTACTS, BASE).unwrap();
        let first = graph
            .first_with_subject("http://localhost:3000/contacts/contacts.ttl#jdoe")
            .unwrap();
        assert_eq!(first.predicate, RDF_TYPE);
        assert!(first.object.is_iri("http://schema.org/Person"));
    }

    #[test]
    fn test_pattern_matching() {
        let graph = Graph::parse_turtle(CONTACTS, BASE).unwrap();
        assert_eq!(graph.len(), 6);

        let people: Vec<&str> = graph
            .subjects_of_type("http://schema.org/Person")
            .map(Term::value)
            .collect();
        assert_eq!(
            people,
            vec![
                "http://localhost:3000/contacts/contacts.ttl#jdoe",
                "http://localhost:3000/contacts/contacts.ttl#asmith",
            ]
        );

        let alice = Term::iri("http://localhost:3000/contacts/contacts.ttl#asmith");
        let names: Vec<&Term> = graph.objects(&alice, "http://schema.org/givenName").collect();
        assert_eq!(
            names,
            vec![&Term::Literal {
                value: "Alice".to_string(),
                datatype: None,
                language: Some("en".to_string()),
            }]
        );
    }

    #[test]
    fn test_missing_subject() {
        let graph = Graph::parse_turtle(CONTACTS, BASE).unwrap();
        assert!(graph
            .first_with_subject("http://localhost:3000/contacts/contacts.ttl#nobody")
            .is_none());
    }

    #[test]
    fn test_malformed_turtle_is_an_error() {
        let err = Graph::parse_turtle("<#a> <#b> .", BASE).unwrap_err();
        assert!(matches!(err, ClientError::Turtle { .. }));
    }

    #[test]
    fn test_invalid_base_is_an_error() {
        let err = Graph::parse_turtle("", "not a url").unwrap_err();
        assert!(matches!(err, ClientError::Iri { .. }));
    }

    #[test]
    fn test_merge() {
        let mut a = Graph::parse_turtle("<#x> <#p> <#y> .", BASE).unwrap();
        let b = Graph::parse_turtle("<#y> <#p> <#z> .", BASE).unwrap();
        a.merge(b);
        assert_eq!(a.len(), 2);
    }
}
