//! Graph side of the mapping: vocabulary, serialization formats, and the
//! in-memory graphs the emitter writes and the reconstructor queries.

pub mod format;
pub mod store;
pub mod vocab;

pub use format::GraphFormat;
pub use store::{CaseGraph, GraphStore};
pub use vocab::Namespace;
