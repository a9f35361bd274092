//! In-memory graphs: [`CaseGraph`] collects emitted triples and serializes
//! them; [`GraphStore`] loads a graph file for reconstruction.
//!
//! A loaded graph is held twice. The oxigraph [`Store`] answers SPARQL and is
//! only used to discover nodes; it canonicalizes typed literals on insert
//! (`+00:00` becomes `Z`, trailing fraction zeros go). Facet values are read
//! from the parsed [`Graph`], which keeps each lexical form as written.

use std::fs;
use std::io::Write;
use std::path::Path;

use oxigraph::io::{RdfParser, RdfSerializer};
use oxigraph::model::{Graph, GraphNameRef, NamedNode, NamedNodeRef, SubjectRef, Term, TermRef, TripleRef};
use oxigraph::sparql::{QueryResults, QuerySolution};
use oxigraph::store::Store;
use tracing::{debug, info};

use super::format::GraphFormat;
use super::vocab::{self, Namespace};
use crate::error::AppError;

// ── CaseGraph ─────────────────────────────────────────────────────────────────

/// Triples produced by one emission run, plus the prefix bindings used when
/// they are serialized.
#[derive(Debug, Clone)]
pub struct CaseGraph {
    graph: Graph,
    namespaces: Vec<Namespace>,
}

impl CaseGraph {
    /// Empty graph bound to the standard namespaces plus the knowledge-base prefix.
    pub fn new(kb_prefix_label: &str, kb_prefix_iri: &str) -> Self {
        let mut namespaces = vocab::standard_namespaces();
        namespaces.retain(|ns| ns.prefix != kb_prefix_label);
        namespaces.push(Namespace::new(kb_prefix_label, kb_prefix_iri));
        namespaces.sort_by(|a, b| a.prefix.cmp(&b.prefix));
        Self { graph: Graph::new(), namespaces }
    }

    /// Insert a triple; returns `false` if it was already present.
    pub fn insert<'a>(
        &mut self,
        subject: impl Into<SubjectRef<'a>>,
        predicate: impl Into<NamedNodeRef<'a>>,
        object: impl Into<TermRef<'a>>,
    ) -> bool {
        self.graph.insert(TripleRef::new(subject, predicate, object))
    }

    pub fn contains<'a>(
        &self,
        subject: impl Into<SubjectRef<'a>>,
        predicate: impl Into<NamedNodeRef<'a>>,
        object: impl Into<TermRef<'a>>,
    ) -> bool {
        self.graph.contains(TripleRef::new(subject, predicate, object))
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn namespaces(&self) -> &[Namespace] {
        &self.namespaces
    }

    pub fn iter(&self) -> impl Iterator<Item = TripleRef<'_>> {
        self.graph.iter()
    }

    /// Named subjects typed `class`, sorted by IRI.
    pub fn instances_of(&self, class: NamedNodeRef<'_>) -> Vec<NamedNode> {
        let mut out: Vec<NamedNode> = self
            .graph
            .subjects_for_predicate_object(vocab::RDF_TYPE, class)
            .filter_map(|s| match s {
                SubjectRef::NamedNode(n) => Some(n.into_owned()),
                _ => None,
            })
            .collect();
        out.sort();
        out
    }

    /// Objects of `subject predicate ?o`.
    pub fn objects(&self, subject: NamedNodeRef<'_>, predicate: NamedNodeRef<'_>) -> Vec<Term> {
        self.graph
            .objects_for_subject_predicate(subject, predicate)
            .map(TermRef::into_owned)
            .collect()
    }

    /// Serialize into a byte buffer.
    pub fn serialize(&self, format: GraphFormat) -> Result<Vec<u8>, AppError> {
        // JSON-LD output ignores the prefixes and writes full IRIs.
        let mut serializer = RdfSerializer::from_format(format.rdf_format());
        for ns in &self.namespaces {
            serializer = serializer
                .with_prefix(ns.prefix.as_str(), ns.iri.as_str())
                .map_err(|e| AppError::Graph(format!("invalid prefix '{}': {e}", ns.prefix)))?;
        }
        let mut writer = serializer.for_writer(Vec::new());
        for triple in self.graph.iter() {
            writer
                .serialize_triple(triple)
                .map_err(|e| AppError::Graph(format!("serialize {format}: {e}")))?;
        }
        writer
            .finish()
            .map_err(|e| AppError::Graph(format!("serialize {format}: {e}")))
    }

    /// Serialize and write to `path` in one step.
    pub fn write_to_path(&self, path: &Path, format: GraphFormat) -> Result<(), AppError> {
        let bytes = self.serialize(format)?;
        let mut file = fs::File::create(path)?;
        file.write_all(&bytes)?;
        info!(path = %path.display(), %format, triples = self.len(), "graph written");
        Ok(())
    }
}

// ── GraphStore ────────────────────────────────────────────────────────────────

/// A loaded graph, queried read-only.
pub struct GraphStore {
    store: Store,
    graph: Graph,
    namespaces: Vec<Namespace>,
    prologue: String,
}

impl GraphStore {
    fn empty() -> Result<Self, AppError> {
        let store = Store::new().map_err(|e| AppError::Graph(format!("cannot open store: {e}")))?;
        let namespaces = vocab::standard_namespaces();
        let prologue = vocab::sparql_prologue(&namespaces);
        Ok(Self { store, graph: Graph::new(), namespaces, prologue })
    }

    fn insert(&mut self, triple: TripleRef<'_>) -> Result<(), AppError> {
        if self.graph.insert(triple) {
            self.store
                .insert(triple.in_graph(GraphNameRef::DefaultGraph))
                .map_err(|e| AppError::Graph(format!("store insert: {e}")))?;
        }
        Ok(())
    }

    /// Parse `bytes` in `format`. Named graphs are merged into the default one.
    pub fn from_bytes(bytes: &[u8], format: GraphFormat) -> Result<Self, AppError> {
        let mut store = Self::empty()?;
        let mut parser = RdfParser::from_format(format.rdf_format()).for_slice(bytes);
        for quad in parser.by_ref() {
            let quad = quad.map_err(|e| AppError::Graph(format!("cannot parse {format} graph: {e}")))?;
            store.insert(quad.as_ref().into())?;
        }
        for (prefix, iri) in parser.prefixes() {
            if !store.namespaces.iter().any(|known| known.prefix == prefix) {
                store.namespaces.push(Namespace::new(prefix, iri));
            }
        }
        debug!(%format, triples = store.len(), "graph loaded");
        Ok(store)
    }

    /// Read and parse a graph file.
    pub fn load_path(path: &Path, format: GraphFormat) -> Result<Self, AppError> {
        let bytes = fs::read(path)
            .map_err(|e| AppError::Graph(format!("cannot read {}: {e}", path.display())))?;
        let store = Self::from_bytes(&bytes, format)?;
        info!(path = %path.display(), %format, triples = store.len(), "graph loaded");
        Ok(store)
    }

    /// Copy an emitted graph without serializing it.
    pub fn from_graph(graph: &CaseGraph) -> Result<Self, AppError> {
        let mut store = Self::empty()?;
        for triple in graph.iter() {
            store.insert(triple)?;
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn namespaces(&self) -> &[Namespace] {
        &self.namespaces
    }

    /// Run a SELECT query. The standard `PREFIX` prologue is prepended;
    /// prefixes read from the input are not, so queries stay well-formed.
    pub fn select(&self, query: &str) -> Result<Vec<QuerySolution>, AppError> {
        let full = format!("{}{query}", self.prologue);
        let results = self
            .store
            .query(full.as_str())
            .map_err(|e| AppError::Graph(format!("query failed: {e}\n{query}")))?;
        let QueryResults::Solutions(solutions) = results else {
            return Err(AppError::Graph("expected SELECT results".into()));
        };
        solutions
            .map(|s| s.map_err(|e| AppError::Graph(format!("query evaluation: {e}"))))
            .collect()
    }

    /// Objects of `subject predicate ?o`, literals in their input lexical form.
    pub fn objects<'a>(&self, subject: impl Into<SubjectRef<'a>>, predicate: NamedNodeRef<'a>) -> Vec<Term> {
        self.graph
            .objects_for_subject_predicate(subject, predicate)
            .map(TermRef::into_owned)
            .collect()
    }

    /// Whether `node rdf:type class` is asserted.
    pub fn has_type<'a>(&self, node: impl Into<SubjectRef<'a>>, class: NamedNodeRef<'a>) -> bool {
        self.graph.contains(TripleRef::new(node, vocab::RDF_TYPE, class))
    }
}
