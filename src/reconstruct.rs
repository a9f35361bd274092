//! CASE graph → DFXML reconstruction.
//!
//! The graph keeps no positional structure, so volume grouping is recovered
//! with SPARQL: file systems by type, their partition offsets through
//! `drafting:StorageMediumRange` relationships, and their files through
//! `Child_Of` relationships. Files no volume claims become document-level
//! files. The loaded store is only read.

use std::collections::{BTreeMap, BTreeSet};

use oxigraph::model::{NamedNode, NamedNodeRef, SubjectRef, Term};
use oxigraph::sparql::QuerySolution;
use tracing::{debug, info, warn};

use crate::dfxml::{DfxmlDocument, DfxmlMetadata, FileObject, LibraryObject, VolumeObject};
use crate::emit::FILE_FACET_FIELDS;
use crate::error::AppError;
use crate::graph::GraphStore;
use crate::graph::vocab::{self, HashMethod};

pub const TRANSCRIPTION_DC_TYPE: &str = "CASE transcription";
pub const TRANSCRIPTION_PROGRAM: &str = "case_to_dfxml";

/// Reflexive-transitive `rdfs:subClassOf` closures of the root classes the
/// reconstructor looks for, computed once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeHierarchy {
    pub file_system: Vec<NamedNode>,
    pub file: Vec<NamedNode>,
}

impl TypeHierarchy {
    pub fn compute(store: &GraphStore) -> Result<Self, AppError> {
        Ok(Self {
            file_system: subclass_closure(store, vocab::FILE_SYSTEM)?,
            file: subclass_closure(store, vocab::FILE)?,
        })
    }
}

fn subclass_closure(store: &GraphStore, root: NamedNodeRef<'_>) -> Result<Vec<NamedNode>, AppError> {
    let rows = store.select(&format!(
        "SELECT DISTINCT ?nClass WHERE {{ ?nClass rdfs:subClassOf* <{}> . }}",
        root.as_str()
    ))?;
    let mut classes: BTreeSet<NamedNode> = rows.iter().filter_map(|row| named(row, "nClass")).collect();
    classes.insert(root.into_owned());
    debug!(root = %root, classes = classes.len(), "subclass closure");
    Ok(classes.into_iter().collect())
}

fn values_block(var: &str, classes: &[NamedNode]) -> String {
    let terms: Vec<String> = classes.iter().map(|c| c.to_string()).collect();
    format!("VALUES ?{var} {{ {} }}", terms.join(" "))
}

fn named(row: &QuerySolution, var: &str) -> Option<NamedNode> {
    match row.get(var) {
        Some(Term::NamedNode(n)) => Some(n.clone()),
        _ => None,
    }
}

fn literal_value(term: &Term) -> Option<&str> {
    match term {
        Term::Literal(l) => Some(l.value()),
        _ => None,
    }
}

fn as_subject(term: &Term) -> Option<SubjectRef<'_>> {
    match term {
        Term::NamedNode(n) => Some(n.into()),
        Term::BlankNode(b) => Some(b.into()),
        _ => None,
    }
}

/// A file reachable from more than one volume through `Child_Of`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousMembership {
    pub file: NamedNode,
    /// The volume the file was attached to.
    pub kept_in: NamedNode,
    pub also_claimed_by: NamedNode,
}

#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub document: DfxmlDocument,
    pub ambiguities: Vec<AmbiguousMembership>,
}

/// Provenance stamped on every reconstructed document. The command line is
/// left for the caller.
pub fn transcription_metadata() -> DfxmlMetadata {
    DfxmlMetadata {
        dc_type: Some(TRANSCRIPTION_DC_TYPE.to_string()),
        program: Some(TRANSCRIPTION_PROGRAM.to_string()),
        program_version: Some(env!("CARGO_PKG_VERSION").to_string()),
        command_line: None,
        libraries: vec![LibraryObject::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))],
    }
}

pub struct Reconstructor<'s> {
    store: &'s GraphStore,
    types: TypeHierarchy,
}

impl<'s> Reconstructor<'s> {
    pub fn new(store: &'s GraphStore) -> Result<Self, AppError> {
        let types = TypeHierarchy::compute(store)?;
        Ok(Self { store, types })
    }

    pub fn types(&self) -> &TypeHierarchy {
        &self.types
    }

    /// Rebuild the DFXML tree.
    pub fn reconstruct(&self) -> Result<Reconstruction, AppError> {
        let mut document = DfxmlDocument::new();
        document.metadata = transcription_metadata();

        let mut pool = self.file_pool()?;
        let mut claimed: BTreeMap<NamedNode, NamedNode> = BTreeMap::new();
        let mut ambiguities = Vec::new();

        for (node, ftype) in self.volumes()? {
            let mut volume = VolumeObject {
                ftype_str: ftype.map(|t| t.to_lowercase()),
                partition_offset: self.partition_offset(&node)?,
                files: Vec::new(),
            };

            for file in self.children(&node)? {
                if let Some(owner) = claimed.get(&file) {
                    warn!(file = %file, kept_in = %owner, also_claimed_by = %node, "file claimed by more than one volume");
                    ambiguities.push(AmbiguousMembership {
                        file,
                        kept_in: owner.clone(),
                        also_claimed_by: node.clone(),
                    });
                    continue;
                }
                volume.files.push(self.materialize(file.as_ref())?);
                pool.remove(&file);
                claimed.insert(file, node.clone());
            }

            debug!(volume = %node, files = volume.files.len(), "volume reconstructed");
            document.push(volume);
        }

        let orphans = pool.len();
        for file in pool {
            document.push(self.materialize(file.as_ref())?);
        }

        info!(
            volumes = document.volumes().len(),
            files = document.file_count(),
            orphans,
            ambiguous = ambiguities.len(),
            "reconstruction complete"
        );
        Ok(Reconstruction { document, ambiguities })
    }

    /// Every node typed with a File subclass.
    fn file_pool(&self) -> Result<BTreeSet<NamedNode>, AppError> {
        let query = format!(
            "SELECT DISTINCT ?nFile WHERE {{\n  {}\n  ?nFile a ?tFile .\n}}",
            values_block("tFile", &self.types.file)
        );
        Ok(self.store.select(&query)?.iter().filter_map(|row| named(row, "nFile")).collect())
    }

    /// File systems ordered by IRI, each with its first `fileSystemType`.
    fn volumes(&self) -> Result<Vec<(NamedNode, Option<String>)>, AppError> {
        let query = format!(
            r#"SELECT DISTINCT ?nFileSystem ?lFileSystemType
WHERE {{
  {}
  ?nFileSystem a ?tFileSystem .
  OPTIONAL {{
    ?nFileSystem uco-core:hasFacet / uco-observable:fileSystemType ?lFileSystemType .
  }}
}}
ORDER BY ?nFileSystem ?lFileSystemType"#,
            values_block("tFileSystem", &self.types.file_system)
        );

        let mut out: Vec<(NamedNode, Option<String>)> = Vec::new();
        for row in self.store.select(&query)? {
            let Some(node) = named(&row, "nFileSystem") else {
                continue;
            };
            let ftype = row.get("lFileSystemType").and_then(literal_value).map(str::to_string);
            match out.last() {
                Some((last, _)) if *last == node => {
                    debug!(volume = %node, extra = ?ftype, "additional fileSystemType ignored");
                }
                _ => out.push((node, ftype)),
            }
        }
        Ok(out)
    }

    fn partition_offset(&self, volume: &NamedNode) -> Result<Option<u64>, AppError> {
        let query = format!(
            r#"SELECT ?lPartitionOffset
WHERE {{
  ?nRelationship
    a drafting:StorageMediumRange ;
    uco-core:source {volume} ;
    uco-core:hasFacet / uco-observable:rangeOffset ?lPartitionOffset .
}}
ORDER BY ?lPartitionOffset"#
        );
        let rows = self.store.select(&query)?;
        let Some(term) = rows.first().and_then(|row| row.get("lPartitionOffset")) else {
            return Ok(None);
        };
        if rows.len() > 1 {
            debug!(volume = %volume, offsets = rows.len(), "several partition offsets; first kept");
        }
        let text = literal_value(term)
            .ok_or_else(|| AppError::Graph(format!("rangeOffset of {volume} is not a literal: {term}")))?;
        text.trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| AppError::Graph(format!("rangeOffset of {volume} is not a byte offset: '{text}': {e}")))
    }

    /// Sources of `Child_Of` relationships targeting `volume`, ordered by IRI.
    fn children(&self, volume: &NamedNode) -> Result<Vec<NamedNode>, AppError> {
        let query = format!(
            r#"SELECT DISTINCT ?nFile
WHERE {{
  ?nRelationship
    uco-core:kindOfRelationship "{kind}" ;
    uco-core:source ?nFile ;
    uco-core:target {volume} .
}}
ORDER BY ?nFile"#,
            kind = vocab::KIND_CHILD_OF
        );
        Ok(self.store.select(&query)?.iter().filter_map(|row| named(row, "nFile")).collect())
    }

    /// Assemble a FileObject from the facets of `file`. Values are taken
    /// in the lexical form the graph was written with.
    pub fn materialize(&self, file: NamedNodeRef<'_>) -> Result<FileObject, AppError> {
        let mut out = FileObject::default();
        for facet in self.store.objects(file, vocab::HAS_FACET) {
            let Some(facet) = as_subject(&facet) else {
                continue;
            };
            if self.store.has_type(facet, vocab::CONTENT_DATA_FACET) {
                self.read_content_data(facet, &mut out)?;
            } else if self.store.has_type(facet, vocab::FILE_FACET) {
                for (field, predicate) in FILE_FACET_FIELDS {
                    let values = self.store.objects(facet, predicate);
                    if let Some(value) = values.iter().find_map(literal_value) {
                        out.set_facet_field(field, value.to_string());
                    }
                }
            }
        }
        Ok(out)
    }

    fn read_content_data(&self, facet: SubjectRef<'_>, out: &mut FileObject) -> Result<(), AppError> {
        if let Some(size) = self.store.objects(facet, vocab::SIZE_IN_BYTES).iter().find_map(literal_value) {
            let parsed = size
                .trim()
                .parse::<i64>()
                .map_err(|e| AppError::Graph(format!("sizeInBytes is not an integer: '{size}': {e}")))?;
            out.filesize = Some(parsed);
        }

        for hash in self.store.objects(facet, vocab::HASH) {
            let Some(hash) = as_subject(&hash) else {
                continue;
            };
            let methods = self.store.objects(hash, vocab::HASH_METHOD);
            let Some(method) = methods.iter().filter_map(literal_value).find_map(HashMethod::from_vocab_name)
            else {
                continue;
            };
            if let Some(value) = self.store.objects(hash, vocab::HASH_VALUE).iter().find_map(literal_value) {
                out.set_hash(method, value.to_string());
            }
        }
        Ok(())
    }
}

/// Load-free entry point: reconstruct from an already loaded store.
pub fn reconstruct(store: &GraphStore) -> Result<Reconstruction, AppError> {
    Reconstructor::new(store)?.reconstruct()
}
