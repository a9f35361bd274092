//! DFXML: object model, pull reader, and writer.

pub mod objects;
pub mod reader;
pub mod writer;

pub use objects::{
    ChildObject, DfxmlDocument, DfxmlMetadata, DiskImageObject, FileFacetField, FileObject, LibraryObject,
    VolumeObject,
};
pub use reader::{DfxmlEvent, DfxmlNode, DfxmlReader, TreeBuilder, read_bytes, read_path};
pub use writer::{to_bytes, write_document, write_path};
