//! CASE/UCO vocabulary used by the mapping.
//!
//! Every class and predicate the emitter writes or the reconstructor reads is
//! declared here once, as a `'static` [`NamedNodeRef`].

use oxigraph::model::NamedNodeRef;

/// A prefix label bound to a namespace IRI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub prefix: String,
    pub iri: String,
}

impl Namespace {
    pub fn new(prefix: impl Into<String>, iri: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), iri: iri.into() }
    }
}

pub const UCO_CORE: &str = "https://ontology.unifiedcyberontology.org/uco/core/";
pub const UCO_OBSERVABLE: &str = "https://ontology.unifiedcyberontology.org/uco/observable/";
pub const UCO_TYPES: &str = "https://ontology.unifiedcyberontology.org/uco/types/";
pub const UCO_VOCABULARY: &str = "https://ontology.unifiedcyberontology.org/uco/vocabulary/";
pub const DRAFTING: &str = "http://example.org/ontology/drafting/";
pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const OWL: &str = "http://www.w3.org/2002/07/owl#";
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

/// Namespace bindings written into every serialized graph and prepended to
/// every SPARQL query. The knowledge-base prefix is added per run.
pub fn standard_namespaces() -> Vec<Namespace> {
    vec![
        Namespace::new("drafting", DRAFTING),
        Namespace::new("owl", OWL),
        Namespace::new("rdf", RDF),
        Namespace::new("rdfs", RDFS),
        Namespace::new("uco-core", UCO_CORE),
        Namespace::new("uco-observable", UCO_OBSERVABLE),
        Namespace::new("uco-types", UCO_TYPES),
        Namespace::new("uco-vocabulary", UCO_VOCABULARY),
        Namespace::new("xsd", XSD),
    ]
}

/// Render `PREFIX` declarations for a SPARQL query.
pub fn sparql_prologue(namespaces: &[Namespace]) -> String {
    namespaces
        .iter()
        .map(|ns| format!("PREFIX {}: <{}>\n", ns.prefix, ns.iri))
        .collect()
}

// ── RDF / RDFS / OWL / XSD ───────────────────────────────────────────────────

pub const RDF_TYPE: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/1999/02/22-rdf-syntax-ns#type");
pub const RDFS_COMMENT: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2000/01/rdf-schema#comment");
pub const RDFS_LABEL: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2000/01/rdf-schema#label");
pub const RDFS_SUB_CLASS_OF: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2000/01/rdf-schema#subClassOf");
pub const OWL_CLASS: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#Class");
pub const XSD_BOOLEAN: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#boolean");
pub const XSD_DATE_TIME: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#dateTime");
pub const XSD_DOUBLE: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#double");
pub const XSD_HEX_BINARY: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#hexBinary");
pub const XSD_INTEGER: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#integer");
pub const XSD_STRING: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#string");

// ── uco-core ─────────────────────────────────────────────────────────────────

pub const HAS_FACET: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("https://ontology.unifiedcyberontology.org/uco/core/hasFacet");
pub const IS_DIRECTIONAL: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("https://ontology.unifiedcyberontology.org/uco/core/isDirectional");
pub const KIND_OF_RELATIONSHIP: NamedNodeRef<'static> = NamedNodeRef::new_unchecked(
    "https://ontology.unifiedcyberontology.org/uco/core/kindOfRelationship",
);
pub const SOURCE: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("https://ontology.unifiedcyberontology.org/uco/core/source");
pub const TARGET: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("https://ontology.unifiedcyberontology.org/uco/core/target");

// ── uco-observable classes ───────────────────────────────────────────────────

pub const ARCHIVE_FILE: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("https://ontology.unifiedcyberontology.org/uco/observable/ArchiveFile");
pub const CONTENT_DATA_FACET: NamedNodeRef<'static> = NamedNodeRef::new_unchecked(
    "https://ontology.unifiedcyberontology.org/uco/observable/ContentDataFacet",
);
pub const DATA_RANGE_FACET: NamedNodeRef<'static> = NamedNodeRef::new_unchecked(
    "https://ontology.unifiedcyberontology.org/uco/observable/DataRangeFacet",
);
pub const FILE: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("https://ontology.unifiedcyberontology.org/uco/observable/File");
pub const FILE_FACET: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("https://ontology.unifiedcyberontology.org/uco/observable/FileFacet");
pub const FILE_SYSTEM: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("https://ontology.unifiedcyberontology.org/uco/observable/FileSystem");
pub const FILE_SYSTEM_FACET: NamedNodeRef<'static> = NamedNodeRef::new_unchecked(
    "https://ontology.unifiedcyberontology.org/uco/observable/FileSystemFacet",
);
pub const OBSERVABLE_OBJECT: NamedNodeRef<'static> = NamedNodeRef::new_unchecked(
    "https://ontology.unifiedcyberontology.org/uco/observable/ObservableObject",
);
pub const OBSERVABLE_RELATIONSHIP: NamedNodeRef<'static> = NamedNodeRef::new_unchecked(
    "https://ontology.unifiedcyberontology.org/uco/observable/ObservableRelationship",
);

// ── uco-observable properties ────────────────────────────────────────────────

pub const ACCESSED_TIME: NamedNodeRef<'static> = NamedNodeRef::new_unchecked(
    "https://ontology.unifiedcyberontology.org/uco/observable/accessedTime",
);
pub const FILE_PATH: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("https://ontology.unifiedcyberontology.org/uco/observable/filePath");
pub const FILE_SYSTEM_TYPE: NamedNodeRef<'static> = NamedNodeRef::new_unchecked(
    "https://ontology.unifiedcyberontology.org/uco/observable/fileSystemType",
);
pub const HASH: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("https://ontology.unifiedcyberontology.org/uco/observable/hash");
pub const METADATA_CHANGE_TIME: NamedNodeRef<'static> = NamedNodeRef::new_unchecked(
    "https://ontology.unifiedcyberontology.org/uco/observable/metadataChangeTime",
);
pub const MODIFIED_TIME: NamedNodeRef<'static> = NamedNodeRef::new_unchecked(
    "https://ontology.unifiedcyberontology.org/uco/observable/modifiedTime",
);
pub const OBSERVABLE_CREATED_TIME: NamedNodeRef<'static> = NamedNodeRef::new_unchecked(
    "https://ontology.unifiedcyberontology.org/uco/observable/observableCreatedTime",
);
pub const RANGE_OFFSET: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("https://ontology.unifiedcyberontology.org/uco/observable/rangeOffset");
pub const SIZE_IN_BYTES: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("https://ontology.unifiedcyberontology.org/uco/observable/sizeInBytes");

// ── uco-types / uco-vocabulary ───────────────────────────────────────────────

pub const HASH_CLASS: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("https://ontology.unifiedcyberontology.org/uco/types/Hash");
pub const HASH_METHOD: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("https://ontology.unifiedcyberontology.org/uco/types/hashMethod");
pub const HASH_VALUE: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("https://ontology.unifiedcyberontology.org/uco/types/hashValue");
pub const HASH_NAME_VOCAB: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("https://ontology.unifiedcyberontology.org/uco/vocabulary/HashNameVocab");

/// Digest algorithms carried by both representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HashMethod {
    Md5,
    Sha1,
    Sha256,
}

impl HashMethod {
    pub const ALL: [HashMethod; 3] = [HashMethod::Md5, HashMethod::Sha1, HashMethod::Sha256];

    /// `hashdigest/@type` in DFXML.
    pub fn dfxml_type(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }

    /// Lexical value of the `HashNameVocab` literal.
    pub fn vocab_name(self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
        }
    }

    pub fn from_dfxml_type(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.dfxml_type().eq_ignore_ascii_case(value.trim()))
    }

    pub fn from_vocab_name(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.vocab_name() == value)
    }
}

// ── drafting ─────────────────────────────────────────────────────────────────

/// Locally-defined relationship subclass anchoring a partition offset to the
/// storage medium it is measured from.
pub const STORAGE_MEDIUM_RANGE: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://example.org/ontology/drafting/StorageMediumRange");

// ── relationship kinds ───────────────────────────────────────────────────────

pub const KIND_CHILD_OF: &str = "Child_Of";
pub const KIND_CONTAINED_WITHIN: &str = "Contained_Within";

/// Comment attached to synthesized containing-medium placeholders.
pub const PLACEHOLDER_COMMENT: &str = "This object was created as a placeholder for a file system object that described itself as having a location-offset from its most-directly-containing storage medium, but without having a recorded reference to the storage medium object.";

/// Local name of a class IRI (text after the last `/` or `#`).
pub fn local_name(iri: &str) -> &str {
    iri.rsplit(['/', '#']).next().unwrap_or(iri)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_name_of_observable_class() {
        assert_eq!(local_name(FILE_FACET.as_str()), "FileFacet");
        assert_eq!(local_name(XSD_INTEGER.as_str()), "integer");
    }

    #[test]
    fn class_constants_live_in_their_namespace() {
        for class in [FILE, FILE_SYSTEM, ARCHIVE_FILE, FILE_FACET, CONTENT_DATA_FACET] {
            assert!(class.as_str().starts_with(UCO_OBSERVABLE));
        }
        assert!(HASH_CLASS.as_str().starts_with(UCO_TYPES));
        assert!(STORAGE_MEDIUM_RANGE.as_str().starts_with(DRAFTING));
    }

    #[test]
    fn hash_method_names() {
        assert_eq!(HashMethod::from_dfxml_type("SHA256"), Some(HashMethod::Sha256));
        assert_eq!(HashMethod::from_dfxml_type("sha512"), None);
        assert_eq!(HashMethod::from_vocab_name("SHA1"), Some(HashMethod::Sha1));
        assert_eq!(HashMethod::from_vocab_name("sha1"), None);
    }

    #[test]
    fn prologue_lists_every_binding() {
        let prologue = sparql_prologue(&standard_namespaces());
        assert!(prologue.contains("PREFIX uco-core: <https://ontology.unifiedcyberontology.org/uco/core/>"));
        assert_eq!(prologue.lines().count(), standard_namespaces().len());
    }
}
