//! Round-trip validation: compare an original DFXML tree with its
//! reconstruction from the emitted graph.
//!
//! Volumes are paired by position in depth-first document order, and files
//! by position within each volume pair. Files outside volumes are paired by
//! filename because reconstruction does not keep their order.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::{debug, warn};

use crate::dfxml::{DfxmlDocument, FileFacetField, FileObject, VolumeObject};
use crate::error::AppError;
use crate::graph::vocab::HashMethod;

/// Present on one side only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Annotation {
    New,
    Deleted,
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::New => "new",
            Self::Deleted => "deleted",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeDiff {
    pub index: usize,
    pub changed: BTreeSet<&'static str>,
    pub annotation: Option<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    /// `volume[i]/file[j]` or `document/file[j]`.
    pub location: String,
    pub filename: Option<String>,
    pub changed: BTreeSet<&'static str>,
    pub annotation: Option<Annotation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundTripReport {
    pub expected_volumes: usize,
    pub observed_volumes: usize,
    pub expected_files: usize,
    pub observed_files: usize,
    pub volume_diffs: Vec<VolumeDiff>,
    pub file_diffs: Vec<FileDiff>,
}

impl RoundTripReport {
    /// One line per problem; empty when the round trip is faithful.
    pub fn failures(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.expected_volumes > 0 && self.observed_volumes == 0 {
            out.push(format!("expected {} volume(s), observed none", self.expected_volumes));
        }
        if self.expected_files > 0 && self.observed_files == 0 {
            out.push(format!("expected {} file(s), observed none", self.expected_files));
        }
        for v in &self.volume_diffs {
            out.push(describe(&format!("volume[{}]", v.index), None, &v.changed, v.annotation));
        }
        for f in &self.file_diffs {
            out.push(describe(&f.location, f.filename.as_deref(), &f.changed, f.annotation));
        }
        out
    }

    pub fn is_faithful(&self) -> bool {
        self.failures().is_empty()
    }

    pub fn into_result(self) -> Result<Self, AppError> {
        let failures = self.failures();
        if failures.is_empty() {
            Ok(self)
        } else {
            Err(AppError::Divergence(failures.join("; ")))
        }
    }
}

fn describe(
    location: &str,
    filename: Option<&str>,
    changed: &BTreeSet<&'static str>,
    annotation: Option<Annotation>,
) -> String {
    let mut line = location.to_string();
    if let Some(name) = filename {
        line.push_str(&format!(" ({name})"));
    }
    line.push_str(": ");
    match annotation {
        Some(a) => line.push_str(&a.to_string()),
        None => line.push_str(&changed.iter().copied().collect::<Vec<_>>().join(", ")),
    }
    line
}

impl fmt::Display for RoundTripReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "volumes {}/{}, files {}/{}, {} difference(s)",
            self.observed_volumes,
            self.expected_volumes,
            self.observed_files,
            self.expected_files,
            self.volume_diffs.len() + self.file_diffs.len()
        )
    }
}

// ── comparison ────────────────────────────────────────────────────────────────

pub fn compare(original: &DfxmlDocument, reconstructed: &DfxmlDocument) -> RoundTripReport {
    let before = original.volumes();
    let after = reconstructed.volumes();
    let mut report = RoundTripReport {
        expected_volumes: before.len(),
        observed_volumes: after.len(),
        expected_files: original.file_count(),
        observed_files: reconstructed.file_count(),
        ..Default::default()
    };

    for index in 0..before.len().max(after.len()) {
        match (before.get(index), after.get(index)) {
            (Some(a), Some(b)) => {
                let changed = volume_changes(a, b);
                if !changed.is_empty() {
                    report.volume_diffs.push(VolumeDiff { index, changed, annotation: None });
                }
                compare_volume_files(index, &a.files, &b.files, &mut report);
            }
            (Some(a), None) => {
                report.volume_diffs.push(VolumeDiff { index, changed: BTreeSet::new(), annotation: Some(Annotation::Deleted) });
                compare_volume_files(index, &a.files, &[], &mut report);
            }
            (None, Some(b)) => {
                report.volume_diffs.push(VolumeDiff { index, changed: BTreeSet::new(), annotation: Some(Annotation::New) });
                compare_volume_files(index, &[], &b.files, &mut report);
            }
            (None, None) => {}
        }
    }

    compare_loose_files(&original.loose_files(), &reconstructed.loose_files(), &mut report);

    if report.volume_diffs.is_empty() && report.file_diffs.is_empty() {
        debug!(%report, "round trip faithful");
    } else {
        warn!(%report, "round trip diverged");
    }
    report
}

fn volume_changes(a: &VolumeObject, b: &VolumeObject) -> BTreeSet<&'static str> {
    let mut changed = BTreeSet::new();
    if a.ftype_str != b.ftype_str {
        changed.insert("ftype_str");
    }
    if a.partition_offset != b.partition_offset {
        changed.insert("partition_offset");
    }
    changed
}

fn compare_volume_files(volume: usize, before: &[FileObject], after: &[FileObject], report: &mut RoundTripReport) {
    for index in 0..before.len().max(after.len()) {
        let location = format!("volume[{volume}]/file[{index}]");
        if let Some(diff) = file_diff(location, before.get(index), after.get(index)) {
            report.file_diffs.push(diff);
        }
    }
}

fn compare_loose_files(before: &[&FileObject], after: &[&FileObject], report: &mut RoundTripReport) {
    let group = |files: &[&FileObject]| {
        let mut by_name: BTreeMap<Option<String>, Vec<FileObject>> = BTreeMap::new();
        for f in files {
            by_name.entry(f.filename.clone()).or_default().push((*f).clone());
        }
        by_name
    };
    let before = group(before);
    let mut after = group(after);

    let mut index = 0;
    for (name, originals) in before {
        let matches = after.remove(&name).unwrap_or_default();
        for i in 0..originals.len().max(matches.len()) {
            if let Some(diff) = file_diff(format!("document/file[{index}]"), originals.get(i), matches.get(i)) {
                report.file_diffs.push(diff);
            }
            index += 1;
        }
    }
    for (_, extra) in after {
        for f in extra {
            if let Some(diff) = file_diff(format!("document/file[{index}]"), None, Some(&f)) {
                report.file_diffs.push(diff);
            }
            index += 1;
        }
    }
}

fn file_diff(location: String, before: Option<&FileObject>, after: Option<&FileObject>) -> Option<FileDiff> {
    let (filename, changed, annotation) = match (before, after) {
        (Some(a), Some(b)) => {
            let changed = file_changes(a, b);
            if changed.is_empty() {
                return None;
            }
            (a.filename.clone(), changed, None)
        }
        (Some(a), None) => (a.filename.clone(), BTreeSet::new(), Some(Annotation::Deleted)),
        (None, Some(b)) => (b.filename.clone(), BTreeSet::new(), Some(Annotation::New)),
        (None, None) => return None,
    };
    Some(FileDiff { location, filename, changed, annotation })
}

/// Names of the fields that differ between two files. Values compare as
/// text: `2009-01-01T00:00:00Z` and `2009-01-01T00:00:00+00:00` differ.
pub fn file_changes(a: &FileObject, b: &FileObject) -> BTreeSet<&'static str> {
    let mut changed = BTreeSet::new();
    if a.filename != b.filename {
        changed.insert(FileFacetField::Filename.name());
    }
    if a.filesize != b.filesize {
        changed.insert("filesize");
    }
    for field in [FileFacetField::Mtime, FileFacetField::Ctime, FileFacetField::Atime, FileFacetField::Crtime] {
        if a.facet_field(field) != b.facet_field(field) {
            changed.insert(field.name());
        }
    }
    for method in HashMethod::ALL {
        if a.hash(method) != b.hash(method) {
            changed.insert(method.dfxml_type());
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dfxml::DiskImageObject;

    fn file(name: &str) -> FileObject {
        FileObject {
            filename: Some(name.into()),
            filesize: Some(5),
            mtime: Some("2009-01-01T00:00:00Z".into()),
            md5: Some("abcd".into()),
            ..Default::default()
        }
    }

    fn doc(children: Vec<crate::dfxml::ChildObject>) -> DfxmlDocument {
        let mut d = DfxmlDocument::new();
        d.children = children;
        d
    }

    #[test]
    fn identical_documents_are_faithful() {
        let d = doc(vec![VolumeObject { files: vec![file("a")], ..Default::default() }.into(), file("b").into()]);
        let report = compare(&d, &d.clone());
        assert!(report.is_faithful(), "{:?}", report.failures());
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn equivalent_spellings_are_not_changes() {
        let mut b = file("a");
        b.mtime = Some("2009-01-01T00:00:00.000+00:00".into());
        b.md5 = Some("ABCD".into());
        assert!(file_changes(&file("a"), &b).is_empty());
    }

    #[test]
    fn changed_fields_are_named() {
        let mut b = file("a");
        b.filesize = Some(6);
        b.sha1 = Some("00".into());
        b.mtime = Some("2010-01-01T00:00:00Z".into());
        let changed: Vec<_> = file_changes(&file("a"), &b).into_iter().collect();
        assert_eq!(changed, vec!["filesize", "mtime", "sha1"]);
    }

    #[test]
    fn volume_property_changes_and_missing_volumes() {
        let a = doc(vec![
            VolumeObject { ftype_str: Some("ntfs".into()), partition_offset: Some(0), files: vec![] }.into(),
            VolumeObject::default().into(),
        ]);
        let b = doc(vec![VolumeObject { ftype_str: Some("fat".into()), partition_offset: Some(0), files: vec![] }.into()]);
        let report = compare(&a, &b);
        assert_eq!(report.volume_diffs.len(), 2);
        assert!(report.volume_diffs[0].changed.contains("ftype_str"));
        assert_eq!(report.volume_diffs[1].annotation, Some(Annotation::Deleted));
        let err = report.into_result().unwrap_err();
        assert!(matches!(err, AppError::Divergence(_)));
        assert!(err.to_string().contains("volume[1]: deleted"));
    }

    #[test]
    fn loose_files_pair_by_name_regardless_of_order() {
        let a = doc(vec![file("x").into(), file("y").into()]);
        let b = doc(vec![file("y").into(), file("x").into()]);
        assert!(compare(&a, &b).is_faithful());

        let c = doc(vec![file("y").into(), file("z").into()]);
        let report = compare(&a, &c);
        let annotations: Vec<_> = report.file_diffs.iter().map(|d| (d.filename.clone(), d.annotation)).collect();
        assert!(annotations.contains(&(Some("x".into()), Some(Annotation::Deleted))));
        assert!(annotations.contains(&(Some("z".into()), Some(Annotation::New))));
    }

    #[test]
    fn files_under_disk_images_compare_as_loose() {
        let a = doc(vec![DiskImageObject { children: vec![file("in-image").into()] }.into()]);
        let b = doc(vec![file("in-image").into()]);
        assert!(compare(&a, &b).is_faithful());
    }

    #[test]
    fn nothing_observed_is_a_failure() {
        let a = doc(vec![VolumeObject { files: vec![file("a")], ..Default::default() }.into()]);
        let report = compare(&a, &DfxmlDocument::new());
        let failures = report.failures();
        assert!(failures.iter().any(|f| f.contains("observed none")));
    }

    #[test]
    fn equivalent_spellings_are_changes() {
        let a = file("a");
        let mut b = file("a");
        b.mtime = Some("2009-01-01T00:00:00+00:00".into());
        b.md5 = Some("ABCD".into());
        let changed: Vec<_> = file_changes(&a, &b).into_iter().collect();
        assert_eq!(changed, vec!["md5", "mtime"]);
    }
}
