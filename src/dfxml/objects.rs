//! DFXML object types: the document, its containers, and file entries.

use crate::graph::vocab::HashMethod;

pub const DFXML_VERSION: &str = "1.2.0";
pub const XMLNS_DFXML: &str = "http://www.forensicswiki.org/wiki/Category:Digital_Forensics_XML";
pub const XMLNS_DC: &str = "http://purl.org/dc/elements/1.1/";
pub const XMLNS_DELTA: &str =
    "http://www.forensicswiki.org/wiki/Separating_file_system_differencing_from_DFXML";

/// A `<library name version/>` entry in the creator block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryObject {
    pub name: String,
    pub version: String,
}

impl LibraryObject {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self { name: name.into(), version: version.into() }
    }
}

/// Provenance recorded in `<metadata>` and `<creator>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DfxmlMetadata {
    pub dc_type: Option<String>,
    pub program: Option<String>,
    pub program_version: Option<String>,
    pub command_line: Option<String>,
    pub libraries: Vec<LibraryObject>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DfxmlDocument {
    pub version: String,
    pub metadata: DfxmlMetadata,
    pub children: Vec<ChildObject>,
}

impl Default for DfxmlDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl DfxmlDocument {
    pub fn new() -> Self {
        Self { version: DFXML_VERSION.to_string(), metadata: DfxmlMetadata::default(), children: Vec::new() }
    }

    pub fn push(&mut self, child: impl Into<ChildObject>) {
        self.children.push(child.into());
    }

    /// Every volume, depth-first in document order.
    pub fn volumes(&self) -> Vec<&VolumeObject> {
        let mut out = Vec::new();
        collect_volumes(&self.children, &mut out);
        out
    }

    /// Files outside any volume: at document level or directly under a disk image.
    pub fn loose_files(&self) -> Vec<&FileObject> {
        let mut out = Vec::new();
        collect_loose_files(&self.children, &mut out);
        out
    }

    /// Total file count, volumes included.
    pub fn file_count(&self) -> usize {
        self.loose_files().len() + self.volumes().iter().map(|v| v.files.len()).sum::<usize>()
    }
}

fn collect_volumes<'a>(children: &'a [ChildObject], out: &mut Vec<&'a VolumeObject>) {
    for child in children {
        match child {
            ChildObject::Volume(v) => out.push(v),
            ChildObject::DiskImage(d) => collect_volumes(&d.children, out),
            ChildObject::File(_) => {}
        }
    }
}

fn collect_loose_files<'a>(children: &'a [ChildObject], out: &mut Vec<&'a FileObject>) {
    for child in children {
        match child {
            ChildObject::File(f) => out.push(f),
            ChildObject::DiskImage(d) => collect_loose_files(&d.children, out),
            ChildObject::Volume(_) => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildObject {
    DiskImage(DiskImageObject),
    Volume(VolumeObject),
    File(FileObject),
}

impl From<DiskImageObject> for ChildObject {
    fn from(value: DiskImageObject) -> Self {
        Self::DiskImage(value)
    }
}

impl From<VolumeObject> for ChildObject {
    fn from(value: VolumeObject) -> Self {
        Self::Volume(value)
    }
}

impl From<FileObject> for ChildObject {
    fn from(value: FileObject) -> Self {
        Self::File(value)
    }
}

/// A containing medium. Holds volumes, files, and nested images.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiskImageObject {
    pub children: Vec<ChildObject>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeObject {
    pub ftype_str: Option<String>,
    /// Byte offset within the containing medium.
    pub partition_offset: Option<u64>,
    pub files: Vec<FileObject>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileObject {
    pub filename: Option<String>,
    pub filesize: Option<i64>,
    pub mtime: Option<String>,
    pub ctime: Option<String>,
    pub atime: Option<String>,
    pub crtime: Option<String>,
    pub md5: Option<String>,
    pub sha1: Option<String>,
    pub sha256: Option<String>,
}

/// The text-valued fields a FileFacet carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFacetField {
    Filename,
    Mtime,
    Ctime,
    Atime,
    Crtime,
}

impl FileFacetField {
    pub fn name(self) -> &'static str {
        match self {
            Self::Filename => "filename",
            Self::Mtime => "mtime",
            Self::Ctime => "ctime",
            Self::Atime => "atime",
            Self::Crtime => "crtime",
        }
    }

    pub fn is_timestamp(self) -> bool {
        !matches!(self, Self::Filename)
    }
}

impl FileObject {
    pub fn facet_field(&self, field: FileFacetField) -> Option<&str> {
        match field {
            FileFacetField::Filename => self.filename.as_deref(),
            FileFacetField::Mtime => self.mtime.as_deref(),
            FileFacetField::Ctime => self.ctime.as_deref(),
            FileFacetField::Atime => self.atime.as_deref(),
            FileFacetField::Crtime => self.crtime.as_deref(),
        }
    }

    pub fn set_facet_field(&mut self, field: FileFacetField, value: String) {
        let slot = match field {
            FileFacetField::Filename => &mut self.filename,
            FileFacetField::Mtime => &mut self.mtime,
            FileFacetField::Ctime => &mut self.ctime,
            FileFacetField::Atime => &mut self.atime,
            FileFacetField::Crtime => &mut self.crtime,
        };
        *slot = Some(value);
    }

    pub fn hash(&self, method: HashMethod) -> Option<&str> {
        match method {
            HashMethod::Md5 => self.md5.as_deref(),
            HashMethod::Sha1 => self.sha1.as_deref(),
            HashMethod::Sha256 => self.sha256.as_deref(),
        }
    }

    pub fn set_hash(&mut self, method: HashMethod, value: String) {
        let slot = match method {
            HashMethod::Md5 => &mut self.md5,
            HashMethod::Sha1 => &mut self.sha1,
            HashMethod::Sha256 => &mut self.sha256,
        };
        *slot = Some(value);
    }
}
