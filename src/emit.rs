//! DFXML → CASE graph emission.
//!
//! The per-object functions ([`TreeEmitter::emit_volume`],
//! [`TreeEmitter::emit_file`]) take their anchors as arguments. Two walks
//! drive them: [`TreeEmitter::emit_document`] recurses over a parsed tree,
//! and [`TreeEmitter::emit_events`] consumes the lazy reader stream with an
//! explicit [`TraversalStacks`]. Both produce the same graph for the same
//! document, identifier policy permitting.

use oxigraph::model::{Literal, NamedNode, NamedNodeRef, Term};
use tracing::{debug, info};

use crate::config::Config;
use crate::dfxml::{ChildObject, DfxmlDocument, DfxmlEvent, DfxmlNode, FileFacetField, FileObject, VolumeObject};
use crate::error::AppError;
use crate::graph::CaseGraph;
use crate::graph::vocab::{self, HashMethod};
use crate::identity::{IdentityAssigner, IdentitySettings, IriKind};

/// FileFacet properties and the DFXML fields they carry. Timestamps are
/// typed `xsd:dateTime`; the path is a plain string.
pub const FILE_FACET_FIELDS: [(FileFacetField, NamedNodeRef<'static>); 5] = [
    (FileFacetField::Filename, vocab::FILE_PATH),
    (FileFacetField::Atime, vocab::ACCESSED_TIME),
    (FileFacetField::Ctime, vocab::METADATA_CHANGE_TIME),
    (FileFacetField::Crtime, vocab::OBSERVABLE_CREATED_TIME),
    (FileFacetField::Mtime, vocab::MODIFIED_TIME),
];

/// Volume `ftype_str` emitted as an archive file rather than a file system.
const ARCHIVE_FTYPE: &str = "7z";

/// Counts reported at the end of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EmitStats {
    pub images: usize,
    pub volumes: usize,
    pub files: usize,
    pub hashes: usize,
    pub relationships: usize,
    pub placeholders: usize,
}

/// Containing-medium and immediate-parent anchors for the event walk.
#[derive(Debug, Default)]
pub struct TraversalStacks {
    pub media: Vec<NamedNode>,
    pub parents: Vec<NamedNode>,
}

impl TraversalStacks {
    fn push(&mut self, id: NamedNode) {
        self.media.push(id.clone());
        self.parents.push(id);
    }

    fn pop(&mut self) -> Result<(), AppError> {
        match (self.media.pop(), self.parents.pop()) {
            (Some(_), Some(_)) => Ok(()),
            _ => Err(AppError::Dfxml("container end without a matching start".into())),
        }
    }

    fn is_empty(&self) -> bool {
        self.media.is_empty() && self.parents.is_empty()
    }
}

/// Properties of one facet, collected before the facet node exists.
struct FacetDraft {
    class: NamedNodeRef<'static>,
    properties: Vec<(NamedNodeRef<'static>, Term)>,
}

impl FacetDraft {
    fn new(class: NamedNodeRef<'static>) -> Self {
        Self { class, properties: Vec::new() }
    }

    fn set(&mut self, predicate: NamedNodeRef<'static>, object: impl Into<Term>) {
        self.properties.push((predicate, object.into()));
    }

    /// Emit the facet on `owner`, unless no property was set.
    fn emit(self, owner: &NamedNode, emitter: &mut TreeEmitter) -> Option<NamedNode> {
        if self.properties.is_empty() {
            return None;
        }
        let facet = emitter.ids.facet_identifier(owner.as_ref(), self.class);
        let graph = &mut emitter.graph;
        graph.insert(&facet, vocab::RDF_TYPE, self.class);
        graph.insert(owner, vocab::HAS_FACET, &facet);
        for (predicate, object) in &self.properties {
            graph.insert(&facet, *predicate, object);
        }
        Some(facet)
    }
}

pub struct TreeEmitter {
    graph: CaseGraph,
    ids: IdentityAssigner,
    stats: EmitStats,
}

impl TreeEmitter {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let ids = IdentityAssigner::new(&IdentitySettings::from_config(config))?;
        let graph = CaseGraph::new(&config.graph.kb_prefix_label, &config.graph.kb_prefix_iri);
        Ok(Self { graph, ids, stats: EmitStats::default() })
    }

    pub fn graph(&self) -> &CaseGraph {
        &self.graph
    }

    pub fn stats(&self) -> EmitStats {
        self.stats
    }

    pub fn finish(self) -> CaseGraph {
        info!(
            images = self.stats.images,
            volumes = self.stats.volumes,
            files = self.stats.files,
            hashes = self.stats.hashes,
            relationships = self.stats.relationships,
            placeholders = self.stats.placeholders,
            triples = self.graph.len(),
            "emission complete"
        );
        self.graph
    }

    // ── per-object emission ──────────────────────────────────────────────────

    /// Identifier for a disk image. Images emit no triples of their own.
    pub fn disk_image(&mut self) -> NamedNode {
        self.stats.images += 1;
        self.ids.new_identifier(IriKind::Image)
    }

    pub fn emit_volume(&mut self, volume: &VolumeObject, medium: Option<&NamedNode>) -> NamedNode {
        self.stats.volumes += 1;

        if volume.ftype_str.as_deref() == Some(ARCHIVE_FTYPE) {
            let archive = self.ids.new_identifier(IriKind::File);
            self.graph.insert(&archive, vocab::RDF_TYPE, vocab::ARCHIVE_FILE);
            debug!(node = %archive, "archive volume emitted as ArchiveFile");
            return archive;
        }

        let fs = self.ids.new_identifier(IriKind::FileSystem);
        self.graph.insert(&fs, vocab::RDF_TYPE, vocab::FILE_SYSTEM);

        let mut facet = FacetDraft::new(vocab::FILE_SYSTEM_FACET);
        if let Some(ftype) = &volume.ftype_str {
            facet.set(vocab::FILE_SYSTEM_TYPE, Literal::new_simple_literal(ftype.to_uppercase()));
        }
        facet.emit(&fs, self);

        if let Some(offset) = volume.partition_offset {
            let container = match medium {
                Some(m) => m.clone(),
                None => self.placeholder_medium(),
            };
            self.declare_storage_medium_range();
            let relationship = self.relationship(&fs, &container, vocab::KIND_CONTAINED_WITHIN);
            self.graph.insert(&relationship, vocab::RDF_TYPE, vocab::STORAGE_MEDIUM_RANGE);

            let mut range = FacetDraft::new(vocab::DATA_RANGE_FACET);
            range.set(vocab::RANGE_OFFSET, Literal::new_typed_literal(offset.to_string(), vocab::XSD_INTEGER));
            range.emit(&relationship, self);
        }

        fs
    }

    pub fn emit_file(&mut self, file: &FileObject, parent: Option<&NamedNode>) -> NamedNode {
        self.stats.files += 1;
        let node = self.ids.new_identifier(IriKind::File);
        self.graph.insert(&node, vocab::RDF_TYPE, vocab::FILE);

        let mut file_facet = FacetDraft::new(vocab::FILE_FACET);
        for (field, predicate) in FILE_FACET_FIELDS {
            if let Some(value) = file.facet_field(field) {
                let literal = if field.is_timestamp() {
                    Literal::new_typed_literal(value, vocab::XSD_DATE_TIME)
                } else {
                    Literal::new_simple_literal(value)
                };
                file_facet.set(predicate, literal);
            }
        }
        file_facet.emit(&node, self);

        let mut content = FacetDraft::new(vocab::CONTENT_DATA_FACET);
        if let Some(size) = file.filesize {
            content.set(vocab::SIZE_IN_BYTES, Literal::new_typed_literal(size.to_string(), vocab::XSD_INTEGER));
        }
        for method in HashMethod::ALL {
            if let Some(digest) = file.hash(method) {
                let hash = self.hash_node(method, digest);
                content.set(vocab::HASH, hash);
            }
        }
        content.emit(&node, self);

        if let Some(parent) = parent {
            self.relationship(&node, parent, vocab::KIND_CHILD_OF);
        }
        node
    }

    fn hash_node(&mut self, method: HashMethod, digest: &str) -> NamedNode {
        self.stats.hashes += 1;
        let hash = self.ids.hash_node_identifier(method, digest);
        self.graph.insert(&hash, vocab::RDF_TYPE, vocab::HASH_CLASS);
        self.graph.insert(
            &hash,
            vocab::HASH_METHOD,
            &Literal::new_typed_literal(method.vocab_name(), vocab::HASH_NAME_VOCAB),
        );
        self.graph.insert(
            &hash,
            vocab::HASH_VALUE,
            &Literal::new_typed_literal(digest, vocab::XSD_HEX_BINARY),
        );
        hash
    }

    fn relationship(&mut self, source: &NamedNode, target: &NamedNode, kind: &str) -> NamedNode {
        self.stats.relationships += 1;
        let rel = self.ids.new_identifier(IriKind::Relationship);
        self.graph.insert(&rel, vocab::RDF_TYPE, vocab::OBSERVABLE_RELATIONSHIP);
        self.graph.insert(&rel, vocab::IS_DIRECTIONAL, &Literal::from(true));
        self.graph.insert(&rel, vocab::KIND_OF_RELATIONSHIP, &Literal::new_simple_literal(kind));
        self.graph.insert(&rel, vocab::SOURCE, source);
        self.graph.insert(&rel, vocab::TARGET, target);
        rel
    }

    fn placeholder_medium(&mut self) -> NamedNode {
        self.stats.placeholders += 1;
        let node = self.ids.new_identifier(IriKind::ObservableObject);
        self.graph.insert(&node, vocab::RDF_TYPE, vocab::OBSERVABLE_OBJECT);
        self.graph.insert(&node, vocab::RDFS_COMMENT, &Literal::new_simple_literal(vocab::PLACEHOLDER_COMMENT));
        debug!(node = %node, "partition offset without a containing medium; placeholder created");
        node
    }

    fn declare_storage_medium_range(&mut self) {
        let class = vocab::STORAGE_MEDIUM_RANGE;
        if self.graph.contains(class, vocab::RDF_TYPE, vocab::OWL_CLASS) {
            return;
        }
        self.graph.insert(class, vocab::RDF_TYPE, vocab::OWL_CLASS);
        self.graph.insert(
            class,
            vocab::RDFS_LABEL,
            &Literal::new_language_tagged_literal_unchecked("StorageMediumRange", "en"),
        );
        self.graph.insert(class, vocab::RDFS_SUB_CLASS_OF, vocab::OBSERVABLE_RELATIONSHIP);
    }

    // ── walks ────────────────────────────────────────────────────────────────

    /// Recursive descent over a parsed document.
    pub fn emit_document(&mut self, document: &DfxmlDocument) {
        self.emit_children(&document.children, None, None);
    }

    fn emit_children(&mut self, children: &[ChildObject], medium: Option<&NamedNode>, parent: Option<&NamedNode>) {
        for child in children {
            match child {
                ChildObject::DiskImage(image) => {
                    let id = self.disk_image();
                    self.emit_children(&image.children, Some(&id), Some(&id));
                }
                ChildObject::Volume(volume) => {
                    let id = self.emit_volume(volume, medium);
                    for file in &volume.files {
                        self.emit_file(file, Some(&id));
                    }
                }
                ChildObject::File(file) => {
                    self.emit_file(file, parent);
                }
            }
        }
    }

    /// Consume a DFXML event stream in document order.
    pub fn emit_events<I>(&mut self, events: I) -> Result<(), AppError>
    where
        I: IntoIterator<Item = Result<DfxmlEvent, AppError>>,
    {
        let mut stacks = TraversalStacks::default();
        for event in events {
            match event? {
                DfxmlEvent::Start(DfxmlNode::DiskImage) => {
                    let id = self.disk_image();
                    stacks.push(id);
                }
                DfxmlEvent::Start(DfxmlNode::Volume(volume)) => {
                    let id = self.emit_volume(&volume, stacks.media.last());
                    stacks.push(id);
                }
                DfxmlEvent::Start(DfxmlNode::File(_)) => {}
                DfxmlEvent::End(DfxmlNode::DiskImage) | DfxmlEvent::End(DfxmlNode::Volume(_)) => stacks.pop()?,
                DfxmlEvent::End(DfxmlNode::File(file)) => {
                    self.emit_file(&file, stacks.parents.last());
                }
            }
        }
        if !stacks.is_empty() {
            return Err(AppError::Dfxml("event stream ended inside an open container".into()));
        }
        Ok(())
    }
}
