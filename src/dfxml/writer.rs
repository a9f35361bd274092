//! DFXML serialization.

use std::fs;
use std::io::Write;
use std::path::Path;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tracing::info;

use super::objects::{
    ChildObject, DfxmlDocument, DfxmlMetadata, FileObject, VolumeObject, XMLNS_DC, XMLNS_DELTA, XMLNS_DFXML,
};
use crate::error::AppError;
use crate::graph::vocab::HashMethod;

struct DfxmlWriter<W: Write> {
    inner: Writer<W>,
}

impl<W: Write> DfxmlWriter<W> {
    fn event(&mut self, event: Event<'_>) -> Result<(), AppError> {
        self.inner
            .write_event(event)
            .map_err(|e| AppError::Dfxml(format!("write failed: {e}")))
    }

    fn start(&mut self, element: BytesStart<'_>) -> Result<(), AppError> {
        self.event(Event::Start(element))
    }

    fn end(&mut self, name: &str) -> Result<(), AppError> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn text_element(&mut self, name: &str, value: &str) -> Result<(), AppError> {
        self.start(BytesStart::new(name))?;
        self.event(Event::Text(BytesText::new(value)))?;
        self.end(name)
    }

    fn optional(&mut self, name: &str, value: Option<&str>) -> Result<(), AppError> {
        match value {
            Some(v) => self.text_element(name, v),
            None => Ok(()),
        }
    }

    fn document(&mut self, doc: &DfxmlDocument) -> Result<(), AppError> {
        self.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        let mut root = BytesStart::new("dfxml");
        root.push_attribute(("version", doc.version.as_str()));
        root.push_attribute(("xmlns", XMLNS_DFXML));
        root.push_attribute(("xmlns:dc", XMLNS_DC));
        root.push_attribute(("xmlns:delta", XMLNS_DELTA));
        self.start(root)?;

        self.metadata(&doc.metadata)?;
        for child in &doc.children {
            self.child(child)?;
        }

        self.end("dfxml")
    }

    fn metadata(&mut self, meta: &DfxmlMetadata) -> Result<(), AppError> {
        if let Some(dc_type) = &meta.dc_type {
            self.start(BytesStart::new("metadata"))?;
            self.text_element("dc:type", dc_type)?;
            self.end("metadata")?;
        }

        let has_creator = meta.program.is_some()
            || meta.program_version.is_some()
            || meta.command_line.is_some()
            || !meta.libraries.is_empty();
        if !has_creator {
            return Ok(());
        }
        self.start(BytesStart::new("creator"))?;
        self.optional("program", meta.program.as_deref())?;
        self.optional("version", meta.program_version.as_deref())?;
        if !meta.libraries.is_empty() {
            self.start(BytesStart::new("build_environment"))?;
            for lib in &meta.libraries {
                let mut el = BytesStart::new("library");
                el.push_attribute(("name", lib.name.as_str()));
                el.push_attribute(("version", lib.version.as_str()));
                self.event(Event::Empty(el))?;
            }
            self.end("build_environment")?;
        }
        if let Some(command_line) = &meta.command_line {
            self.start(BytesStart::new("execution_environment"))?;
            self.text_element("command_line", command_line)?;
            self.end("execution_environment")?;
        }
        self.end("creator")
    }

    fn child(&mut self, child: &ChildObject) -> Result<(), AppError> {
        match child {
            ChildObject::DiskImage(image) => {
                self.start(BytesStart::new("diskimageobject"))?;
                for c in &image.children {
                    self.child(c)?;
                }
                self.end("diskimageobject")
            }
            ChildObject::Volume(volume) => self.volume(volume),
            ChildObject::File(file) => self.file(file),
        }
    }

    fn volume(&mut self, volume: &VolumeObject) -> Result<(), AppError> {
        self.start(BytesStart::new("volume"))?;
        if let Some(offset) = volume.partition_offset {
            self.text_element("partition_offset", &offset.to_string())?;
        }
        self.optional("ftype_str", volume.ftype_str.as_deref())?;
        for file in &volume.files {
            self.file(file)?;
        }
        self.end("volume")
    }

    fn file(&mut self, file: &FileObject) -> Result<(), AppError> {
        self.start(BytesStart::new("fileobject"))?;
        self.optional("filename", file.filename.as_deref())?;
        if let Some(size) = file.filesize {
            self.text_element("filesize", &size.to_string())?;
        }
        self.optional("mtime", file.mtime.as_deref())?;
        self.optional("ctime", file.ctime.as_deref())?;
        self.optional("atime", file.atime.as_deref())?;
        self.optional("crtime", file.crtime.as_deref())?;
        for method in HashMethod::ALL {
            if let Some(digest) = file.hash(method) {
                let mut el = BytesStart::new("hashdigest");
                el.push_attribute(("type", method.dfxml_type()));
                self.start(el)?;
                self.event(Event::Text(BytesText::new(digest)))?;
                self.end("hashdigest")?;
            }
        }
        self.end("fileobject")
    }
}

/// Serialize `doc` as indented DFXML.
pub fn write_document<W: Write>(doc: &DfxmlDocument, out: W) -> Result<(), AppError> {
    let mut writer = DfxmlWriter { inner: Writer::new_with_indent(out, b' ', 2) };
    writer.document(doc)?;
    writer
        .inner
        .into_inner()
        .write_all(b"\n")
        .map_err(|e| AppError::Dfxml(format!("write failed: {e}")))
}

pub fn to_bytes(doc: &DfxmlDocument) -> Result<Vec<u8>, AppError> {
    let mut buf = Vec::new();
    write_document(doc, &mut buf)?;
    Ok(buf)
}

/// Serialize in memory, then write `path` in one step.
pub fn write_path(doc: &DfxmlDocument, path: &Path) -> Result<(), AppError> {
    let bytes = to_bytes(doc)?;
    fs::write(path, bytes)?;
    info!(path = %path.display(), files = doc.file_count(), "dfxml written");
    Ok(())
}
