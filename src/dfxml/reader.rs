//! Pull reader over DFXML.
//!
//! [`DfxmlReader`] turns the XML token stream into [`DfxmlEvent`]s in
//! document order. It is a finite, non-restartable iterator: a fresh reader
//! is needed to traverse a document twice. [`TreeBuilder`] folds the same
//! events into a [`DfxmlDocument`].
//!
//! A volume's `Start` event is held back until its first child object (or
//! its end tag), so that `<ftype_str>` and `<partition_offset>` are already
//! known when it is announced.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, warn};

use super::objects::{
    ChildObject, DfxmlDocument, DfxmlMetadata, DiskImageObject, FileObject, LibraryObject, VolumeObject,
};
use crate::error::AppError;
use crate::graph::vocab::HashMethod;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DfxmlNode {
    DiskImage,
    /// Volume attributes only; its files arrive as separate events.
    Volume(VolumeObject),
    File(FileObject),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DfxmlEvent {
    Start(DfxmlNode),
    End(DfxmlNode),
}

#[derive(Debug)]
enum Token {
    Open { name: String, attrs: Vec<(String, String)> },
    Close(String),
    Text(String),
    Eof,
}

#[derive(Debug)]
enum Frame {
    Root,
    DiskImage,
    Volume { volume: VolumeObject, announced: bool },
}

pub struct DfxmlReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    pending_close: Option<String>,
    frames: Vec<Frame>,
    pending: VecDeque<DfxmlEvent>,
    started: bool,
    finished: bool,
    version: Option<String>,
    metadata: DfxmlMetadata,
}

impl DfxmlReader<BufReader<File>> {
    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let file = File::open(path)
            .map_err(|e| AppError::Dfxml(format!("cannot open {}: {e}", path.display())))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> DfxmlReader<R> {
    pub fn new(input: R) -> Self {
        let mut reader = Reader::from_reader(input);
        reader.config_mut().trim_text(true);
        Self {
            reader,
            buf: Vec::new(),
            pending_close: None,
            frames: Vec::new(),
            pending: VecDeque::new(),
            started: false,
            finished: false,
            version: None,
            metadata: DfxmlMetadata::default(),
        }
    }

    /// Provenance seen so far. Complete once the first object event is out,
    /// since `<metadata>` and `<creator>` precede the objects.
    pub fn metadata(&self) -> &DfxmlMetadata {
        &self.metadata
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Drain the event stream into a document tree.
    pub fn into_document(mut self) -> Result<DfxmlDocument, AppError> {
        let mut builder = TreeBuilder::new();
        for event in self.by_ref() {
            builder.push(event?)?;
        }
        let mut document = builder.finish()?;
        if let Some(version) = self.version.take() {
            document.version = version;
        }
        document.metadata = self.metadata;
        debug!(
            volumes = document.volumes().len(),
            files = document.file_count(),
            "dfxml document read"
        );
        Ok(document)
    }

    // ── tokens ───────────────────────────────────────────────────────────────

    fn next_token(&mut self) -> Result<Token, AppError> {
        if let Some(name) = self.pending_close.take() {
            return Ok(Token::Close(name));
        }
        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(e) => {
                    return Err(AppError::Dfxml(format!(
                        "malformed XML at byte {}: {e}",
                        self.reader.buffer_position()
                    )));
                }
            };
            match event {
                Event::Start(e) => {
                    return Ok(Token::Open { name: local_name(&e), attrs: attributes(&e)? });
                }
                Event::Empty(e) => {
                    let name = local_name(&e);
                    let attrs = attributes(&e)?;
                    self.pending_close = Some(name.clone());
                    return Ok(Token::Open { name, attrs });
                }
                Event::End(e) => {
                    return Ok(Token::Close(String::from_utf8_lossy(e.local_name().as_ref()).into_owned()));
                }
                Event::Text(t) => {
                    let text = t
                        .unescape()
                        .map_err(|e| AppError::Dfxml(format!("bad text content: {e}")))?;
                    if !text.is_empty() {
                        return Ok(Token::Text(text.into_owned()));
                    }
                }
                Event::CData(c) => {
                    return Ok(Token::Text(String::from_utf8_lossy(&c.into_inner()).into_owned()));
                }
                Event::Eof => return Ok(Token::Eof),
                _ => {}
            }
        }
    }

    /// Consume tokens up to and including the close of `name`.
    fn skip_element(&mut self, name: &str) -> Result<(), AppError> {
        let mut depth = 1usize;
        loop {
            match self.next_token()? {
                Token::Open { .. } => depth += 1,
                Token::Close(_) => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Token::Text(_) => {}
                Token::Eof => {
                    return Err(AppError::Dfxml(format!("unexpected end of document inside <{name}>")));
                }
            }
        }
    }

    /// Text content of `name`, ignoring nested markup. Empty text reads as `None`.
    fn read_text(&mut self, name: &str) -> Result<Option<String>, AppError> {
        let mut text = String::new();
        loop {
            match self.next_token()? {
                Token::Text(t) => text.push_str(&t),
                Token::Open { name: inner, .. } => self.skip_element(&inner)?,
                Token::Close(_) => break,
                Token::Eof => {
                    return Err(AppError::Dfxml(format!("unexpected end of document inside <{name}>")));
                }
            }
        }
        let trimmed = text.trim();
        Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
    }

    fn read_u64(&mut self, name: &str) -> Result<Option<u64>, AppError> {
        match self.read_text(name)? {
            Some(text) => text
                .parse::<u64>()
                .map(Some)
                .map_err(|e| AppError::Dfxml(format!("<{name}> is not a non-negative integer: '{text}': {e}"))),
            None => Ok(None),
        }
    }

    /// Signed: some producers write `-1` for an unknown size.
    fn read_i64(&mut self, name: &str) -> Result<Option<i64>, AppError> {
        match self.read_text(name)? {
            Some(text) => text
                .parse::<i64>()
                .map(Some)
                .map_err(|e| AppError::Dfxml(format!("<{name}> is not an integer: '{text}': {e}"))),
            None => Ok(None),
        }
    }

    // ── elements ─────────────────────────────────────────────────────────────

    fn read_metadata(&mut self) -> Result<(), AppError> {
        loop {
            match self.next_token()? {
                Token::Open { name, .. } if name == "type" => {
                    self.metadata.dc_type = self.read_text(&name)?;
                }
                Token::Open { name, .. } => self.skip_element(&name)?,
                Token::Close(name) if name == "metadata" => return Ok(()),
                Token::Close(_) | Token::Text(_) => {}
                Token::Eof => return Err(AppError::Dfxml("unexpected end of document inside <metadata>".into())),
            }
        }
    }

    fn read_creator(&mut self) -> Result<(), AppError> {
        loop {
            match self.next_token()? {
                Token::Open { name, attrs } => match name.as_str() {
                    "program" => self.metadata.program = self.read_text(&name)?,
                    "version" => self.metadata.program_version = self.read_text(&name)?,
                    "command_line" => self.metadata.command_line = self.read_text(&name)?,
                    "build_environment" | "execution_environment" => {}
                    "library" => {
                        let attr = |key: &str| {
                            attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone()).unwrap_or_default()
                        };
                        self.metadata.libraries.push(LibraryObject::new(attr("name"), attr("version")));
                        self.skip_element(&name)?;
                    }
                    _ => self.skip_element(&name)?,
                },
                Token::Close(name) if name == "creator" => return Ok(()),
                Token::Close(_) | Token::Text(_) => {}
                Token::Eof => return Err(AppError::Dfxml("unexpected end of document inside <creator>".into())),
            }
        }
    }

    fn read_fileobject(&mut self) -> Result<FileObject, AppError> {
        let mut file = FileObject::default();
        loop {
            match self.next_token()? {
                Token::Open { name, attrs } => match name.as_str() {
                    "filename" => file.filename = self.read_text(&name)?,
                    "filesize" => file.filesize = self.read_i64(&name)?,
                    "mtime" => file.mtime = self.read_text(&name)?,
                    "ctime" => file.ctime = self.read_text(&name)?,
                    "atime" => file.atime = self.read_text(&name)?,
                    "crtime" => file.crtime = self.read_text(&name)?,
                    "hashdigest" => {
                        let kind = attrs.iter().find(|(k, _)| k == "type").map(|(_, v)| v.as_str());
                        let method = kind.and_then(HashMethod::from_dfxml_type);
                        let value = self.read_text(&name)?;
                        match (method, value) {
                            (Some(method), Some(value)) => file.set_hash(method, value),
                            (None, _) => debug!(kind = ?kind, "hashdigest type not mapped, skipped"),
                            (Some(_), None) => {}
                        }
                    }
                    _ => self.skip_element(&name)?,
                },
                Token::Close(name) if name == "fileobject" => return Ok(file),
                Token::Close(name) => {
                    return Err(AppError::Dfxml(format!("unexpected </{name}> inside <fileobject>")));
                }
                Token::Text(_) => {}
                Token::Eof => return Err(AppError::Dfxml("unexpected end of document inside <fileobject>".into())),
            }
        }
    }

    /// Announce the innermost volume if it is still held back.
    fn announce_volume(&mut self) {
        if let Some(Frame::Volume { volume, announced }) = self.frames.last_mut() {
            if !*announced {
                *announced = true;
                self.pending.push_back(DfxmlEvent::Start(DfxmlNode::Volume(volume.clone())));
            }
        }
    }

    fn in_volume(&self) -> bool {
        matches!(self.frames.last(), Some(Frame::Volume { .. }))
    }

    fn update_volume(&mut self, element: &str, apply: impl FnOnce(&mut VolumeObject)) {
        if let Some(Frame::Volume { volume, announced }) = self.frames.last_mut() {
            if *announced {
                warn!(element, "volume property after its first child; stream consumers saw the volume without it");
            }
            apply(volume);
        }
    }

    fn step(&mut self) -> Result<(), AppError> {
        match self.next_token()? {
            Token::Eof => {
                if !self.started {
                    return Err(AppError::Dfxml("empty document: no <dfxml> root element".into()));
                }
                if !self.frames.is_empty() {
                    return Err(AppError::Dfxml("unexpected end of document".into()));
                }
                self.finished = true;
            }
            Token::Open { name, attrs } if !self.started => {
                if name != "dfxml" {
                    return Err(AppError::Dfxml(format!("root element is <{name}>, expected <dfxml>")));
                }
                self.started = true;
                self.version = attrs.into_iter().find(|(k, _)| k == "version").map(|(_, v)| v);
                self.frames.push(Frame::Root);
            }
            Token::Open { name, .. } if self.frames.is_empty() => {
                return Err(AppError::Dfxml(format!("<{name}> after the end of <dfxml>")));
            }
            Token::Open { name, .. } => match name.as_str() {
                "metadata" => self.read_metadata()?,
                "creator" => self.read_creator()?,
                "diskimageobject" => {
                    self.announce_volume();
                    self.frames.push(Frame::DiskImage);
                    self.pending.push_back(DfxmlEvent::Start(DfxmlNode::DiskImage));
                }
                "volume" => {
                    self.announce_volume();
                    self.frames.push(Frame::Volume { volume: VolumeObject::default(), announced: false });
                }
                "fileobject" => {
                    self.announce_volume();
                    let file = self.read_fileobject()?;
                    self.pending.push_back(DfxmlEvent::Start(DfxmlNode::File(file.clone())));
                    self.pending.push_back(DfxmlEvent::End(DfxmlNode::File(file)));
                }
                "partition_offset" if self.in_volume() => {
                    let offset = self.read_u64(&name)?;
                    self.update_volume(&name, |volume| volume.partition_offset = offset);
                }
                "ftype_str" if self.in_volume() => {
                    let ftype = self.read_text(&name)?;
                    self.update_volume(&name, |volume| volume.ftype_str = ftype);
                }
                _ => self.skip_element(&name)?,
            },
            Token::Close(name) => match (name.as_str(), self.frames.pop()) {
                ("volume", Some(Frame::Volume { volume, announced })) => {
                    if !announced {
                        self.pending.push_back(DfxmlEvent::Start(DfxmlNode::Volume(volume.clone())));
                    }
                    self.pending.push_back(DfxmlEvent::End(DfxmlNode::Volume(volume)));
                }
                ("diskimageobject", Some(Frame::DiskImage)) => {
                    self.pending.push_back(DfxmlEvent::End(DfxmlNode::DiskImage));
                }
                ("dfxml", Some(Frame::Root)) => {}
                (name, frame) => {
                    return Err(AppError::Dfxml(format!("unexpected </{name}> (open: {frame:?})")));
                }
            },
            Token::Text(_) => {}
        }
        Ok(())
    }
}

impl<R: BufRead> Iterator for DfxmlReader<R> {
    type Item = Result<DfxmlEvent, AppError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            if self.finished {
                return None;
            }
            if let Err(e) = self.step() {
                self.finished = true;
                return Some(Err(e));
            }
        }
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attributes(e: &BytesStart<'_>) -> Result<Vec<(String, String)>, AppError> {
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| AppError::Dfxml(format!("bad attribute: {err}")))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| AppError::Dfxml(format!("bad attribute value: {err}")))?
            .into_owned();
        out.push((key, value));
    }
    Ok(out)
}

// ── tree builder ──────────────────────────────────────────────────────────────

enum OpenContainer {
    DiskImage(DiskImageObject),
    Volume(VolumeObject),
}

/// Folds [`DfxmlEvent`]s into a document tree.
pub struct TreeBuilder {
    document: DfxmlDocument,
    stack: Vec<OpenContainer>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self { document: DfxmlDocument::new(), stack: Vec::new() }
    }

    fn attach(&mut self, child: ChildObject) -> Result<(), AppError> {
        match (self.stack.last_mut(), child) {
            (None, child) => self.document.children.push(child),
            (Some(OpenContainer::DiskImage(image)), child) => image.children.push(child),
            (Some(OpenContainer::Volume(volume)), ChildObject::File(file)) => volume.files.push(file),
            (Some(OpenContainer::Volume(_)), _) => {
                return Err(AppError::Dfxml("volumes may only contain files in the object model".into()));
            }
        }
        Ok(())
    }

    pub fn push(&mut self, event: DfxmlEvent) -> Result<(), AppError> {
        match event {
            DfxmlEvent::Start(DfxmlNode::DiskImage) => {
                if matches!(self.stack.last(), Some(OpenContainer::Volume(_))) {
                    return Err(AppError::Dfxml("disk image nested inside a volume".into()));
                }
                self.stack.push(OpenContainer::DiskImage(DiskImageObject::default()));
            }
            DfxmlEvent::Start(DfxmlNode::Volume(volume)) => {
                if self.stack.iter().any(|c| matches!(c, OpenContainer::Volume(_))) {
                    return Err(AppError::Dfxml("nested volumes are not supported".into()));
                }
                self.stack.push(OpenContainer::Volume(volume));
            }
            DfxmlEvent::Start(DfxmlNode::File(_)) => {}
            DfxmlEvent::End(DfxmlNode::File(file)) => self.attach(ChildObject::File(file))?,
            DfxmlEvent::End(DfxmlNode::Volume(closed)) => match self.stack.pop() {
                Some(OpenContainer::Volume(mut volume)) => {
                    volume.ftype_str = closed.ftype_str;
                    volume.partition_offset = closed.partition_offset;
                    self.attach(ChildObject::Volume(volume))?;
                }
                _ => return Err(AppError::Dfxml("volume end without a matching start".into())),
            },
            DfxmlEvent::End(DfxmlNode::DiskImage) => match self.stack.pop() {
                Some(OpenContainer::DiskImage(image)) => self.attach(ChildObject::DiskImage(image))?,
                _ => return Err(AppError::Dfxml("disk image end without a matching start".into())),
            },
        }
        Ok(())
    }

    pub fn finish(self) -> Result<DfxmlDocument, AppError> {
        if !self.stack.is_empty() {
            return Err(AppError::Dfxml(format!("{} container(s) left open", self.stack.len())));
        }
        Ok(self.document)
    }
}

/// Read a whole DFXML file into a tree.
pub fn read_path(path: &Path) -> Result<DfxmlDocument, AppError> {
    DfxmlReader::from_path(path)?.into_document()
}

/// Read DFXML from an in-memory buffer.
pub fn read_bytes(bytes: &[u8]) -> Result<DfxmlDocument, AppError> {
    DfxmlReader::new(bytes).into_document()
}
