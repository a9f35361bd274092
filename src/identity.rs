//! Node identifiers for emitted graphs.
//!
//! Every individual is named `<kb><Kind>-<uuid>`. Three policies:
//!
//! * random (default): a fresh UUIDv4 per node;
//! * deterministic: a UUIDv8 whose first eight bytes are `SHA256(seed)[..8]`
//!   and whose last eight are a per-run counter, so fixtures regenerate
//!   byte-identically and IRIs sort in creation order;
//! * inherent (facets and hashes only): UUIDv5 derived from the owner node or
//!   from the digest, so equal content gets an equal IRI.

use oxigraph::model::{NamedNode, NamedNodeRef};
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::graph::vocab::{self, HashMethod};

/// Local-name prefixes of the identifiers the emitter mints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IriKind {
    File,
    FileSystem,
    Image,
    Relationship,
    ObservableObject,
    Hash,
}

impl IriKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "File",
            Self::FileSystem => "FileSystem",
            Self::Image => "Image",
            Self::Relationship => "Relationship",
            Self::ObservableObject => "ObservableObject",
            Self::Hash => "Hash",
        }
    }
}

#[derive(Debug, Clone)]
pub struct IdentitySettings {
    pub kb_prefix_iri: String,
    pub use_inherent_uuids: bool,
    pub deterministic: bool,
    pub seed: String,
}

impl IdentitySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            kb_prefix_iri: config.graph.kb_prefix_iri.clone(),
            use_inherent_uuids: config.graph.use_inherent_uuids,
            deterministic: config.identifiers.deterministic,
            seed: config.identifiers.seed.clone(),
        }
    }
}

/// Mints identifiers for one emission run.
#[derive(Debug)]
pub struct IdentityAssigner {
    kb: String,
    use_inherent_uuids: bool,
    sequence: Option<Sequence>,
}

#[derive(Debug)]
struct Sequence {
    prefix: [u8; 8],
    counter: u64,
}

impl Sequence {
    fn next(&mut self) -> Uuid {
        self.counter += 1;
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&self.prefix);
        bytes[8..].copy_from_slice(&self.counter.to_be_bytes());
        Uuid::new_v8(bytes)
    }
}

impl IdentityAssigner {
    pub fn new(settings: &IdentitySettings) -> Result<Self, AppError> {
        NamedNode::new(settings.kb_prefix_iri.as_str()).map_err(|e| {
            AppError::Config(format!("invalid kb prefix IRI '{}': {e}", settings.kb_prefix_iri))
        })?;

        let sequence = settings.deterministic.then(|| {
            let digest = Sha256::digest(settings.seed.as_bytes());
            let mut prefix = [0u8; 8];
            prefix.copy_from_slice(&digest[..8]);
            debug!(seed = %settings.seed, "deterministic identifiers enabled");
            Sequence { prefix, counter: 0 }
        });

        Ok(Self {
            kb: settings.kb_prefix_iri.clone(),
            use_inherent_uuids: settings.use_inherent_uuids,
            sequence,
        })
    }

    pub fn uses_inherent_uuids(&self) -> bool {
        self.use_inherent_uuids
    }

    fn next_uuid(&mut self) -> Uuid {
        match &mut self.sequence {
            Some(seq) => seq.next(),
            None => Uuid::new_v4(),
        }
    }

    // `kb` was validated as an IRI in `new`; a kind label and a UUID keep it one.
    fn named(&self, label: &str, id: Uuid) -> NamedNode {
        NamedNode::new_unchecked(format!("{}{label}-{id}", self.kb))
    }

    /// `<kb><kind>-<uuid>` with the run's UUID policy.
    pub fn new_identifier(&mut self, kind: IriKind) -> NamedNode {
        let id = self.next_uuid();
        self.named(kind.as_str(), id)
    }

    /// Identifier for the `facet_class` facet of `owner`.
    pub fn facet_identifier(&mut self, owner: NamedNodeRef<'_>, facet_class: NamedNodeRef<'_>) -> NamedNode {
        let label = vocab::local_name(facet_class.as_str());
        if self.use_inherent_uuids {
            let id = Uuid::new_v5(&inherence_uuid(owner.as_str()), facet_class.as_str().as_bytes());
            self.named(label, id)
        } else {
            let id = self.next_uuid();
            self.named(label, id)
        }
    }

    /// Identifier for the hash node carrying `value` under `method`.
    pub fn hash_node_identifier(&mut self, method: HashMethod, value: &str) -> NamedNode {
        if self.use_inherent_uuids {
            self.named(IriKind::Hash.as_str(), hash_method_value_uuid(method, value))
        } else {
            self.new_identifier(IriKind::Hash)
        }
    }
}

/// The UUID an inherent facet is derived from: the owner IRI's own UUID
/// suffix when it has one, else a URL-namespace UUIDv5 of the IRI.
pub fn inherence_uuid(owner_iri: &str) -> Uuid {
    owner_iri
        .len()
        .checked_sub(36)
        .and_then(|start| owner_iri.get(start..))
        .and_then(|tail| Uuid::parse_str(tail).ok())
        .unwrap_or_else(|| Uuid::new_v5(&Uuid::NAMESPACE_URL, owner_iri.as_bytes()))
}

/// Content-derived UUID for a digest, keyed on `value` exactly as written.
/// Digests differing only in case get distinct nodes, so each file keeps
/// its own spelling through a round trip.
pub fn hash_method_value_uuid(method: HashMethod, value: &str) -> Uuid {
    let method_iri = format!("{}#{}", vocab::HASH_NAME_VOCAB.as_str(), method.vocab_name());
    let method_ns = Uuid::new_v5(&Uuid::NAMESPACE_URL, method_iri.as_bytes());
    Uuid::new_v5(&method_ns, value.as_bytes())
}

// ── tests ─────────────────────────────────────────────────────────────────────
