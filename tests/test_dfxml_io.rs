//! DFXML files on disk: streaming reads, writes, and malformed input.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use case_dfxml::dfxml::{self, DfxmlEvent, DfxmlNode, DfxmlReader, FileObject, TreeBuilder, VolumeObject};
use case_dfxml::error::AppError;
use case_dfxml::reconstruct::transcription_metadata;

fn write_tmp(contents: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().expect("tempdir");
    let path = tmp.path().join("input.xml");
    fs::write(&path, contents).expect("write input");
    (tmp, path)
}

fn generated(volumes: usize, files_per_volume: usize) -> String {
    let mut xml = String::from("<?xml version=\"1.0\"?>\n<dfxml version=\"1.2.0\">\n");
    for v in 0..volumes {
        xml.push_str(&format!(
            "<volume><partition_offset>{}</partition_offset><ftype_str>ext4</ftype_str>\n",
            v * 4096
        ));
        for f in 0..files_per_volume {
            xml.push_str(&format!(
                "<fileobject><filename>v{v}/f{f}</filename><filesize>{f}</filesize>\
                 <hashdigest type=\"SHA256\">{:064x}</hashdigest></fileobject>\n",
                f
            ));
        }
        xml.push_str("</volume>\n");
    }
    xml.push_str("</dfxml>\n");
    xml
}

#[test]
fn streamed_events_balance_and_match_the_tree() {
    let (_tmp, path) = write_tmp(&generated(3, 50));

    let mut starts = 0;
    let mut ends = 0;
    let mut files = 0;
    let mut builder = TreeBuilder::new();
    for event in DfxmlReader::from_path(&path).unwrap() {
        let event = event.unwrap();
        match &event {
            DfxmlEvent::Start(_) => starts += 1,
            DfxmlEvent::End(DfxmlNode::File(_)) => {
                ends += 1;
                files += 1;
            }
            DfxmlEvent::End(_) => ends += 1,
        }
        builder.push(event).unwrap();
    }
    assert_eq!(starts, ends);
    assert_eq!(files, 150);

    let streamed = builder.finish().unwrap();
    assert_eq!(streamed, dfxml::read_path(&path).unwrap());
    assert_eq!(streamed.volumes().len(), 3);
    assert_eq!(streamed.volumes()[2].partition_offset, Some(8192));
}

#[test]
fn uppercase_hash_types_are_recognized() {
    let (_tmp, path) = write_tmp(&generated(1, 2));
    let doc = dfxml::read_path(&path).unwrap();
    let file = &doc.volumes()[0].files[1];
    assert_eq!(file.sha256.as_deref(), Some(format!("{:064x}", 1).as_str()));
    assert!(file.md5.is_none());
}

#[test]
fn written_file_reads_back_equal() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("out.xml");

    let mut doc = dfxml::DfxmlDocument::new();
    doc.metadata = transcription_metadata();
    doc.metadata.command_line = Some("case_to_dfxml in.ttl out.xml".into());
    doc.push(VolumeObject {
        ftype_str: Some("hfs+".into()),
        partition_offset: Some(20480),
        files: vec![FileObject {
            filename: Some("Users/<odd> & \"quoted\".txt".into()),
            filesize: Some(7),
            atime: Some("2012-12-21T00:00:00Z".into()),
            md5: Some("d41d8cd98f00b204e9800998ecf8427e".into()),
            ..Default::default()
        }],
    });
    doc.push(FileObject { filename: Some("loose".into()), ..Default::default() });

    dfxml::write_path(&doc, &path).unwrap();
    assert_eq!(dfxml::read_path(&path).unwrap(), doc);

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("<?xml"));
    assert!(text.contains("&amp;"));
}

#[test]
fn unknown_elements_are_skipped() {
    let (_tmp, path) = write_tmp(
        r#"<dfxml version="1.1.1">
  <source><image_filename>disk.E01</image_filename></source>
  <volume>
    <ftype_str>fat12</ftype_str>
    <block_size>512</block_size>
    <fileobject>
      <filename>A.TXT</filename>
      <inode>3</inode>
      <byte_runs><byte_run file_offset="0" len="5" img_offset="16896"/></byte_runs>
    </fileobject>
  </volume>
  <rusage><utime>0.01</utime></rusage>
</dfxml>"#,
    );
    let doc = dfxml::read_path(&path).unwrap();
    assert_eq!(doc.version, "1.1.1");
    assert_eq!(doc.file_count(), 1);
    assert_eq!(doc.volumes()[0].ftype_str.as_deref(), Some("fat12"));
    assert_eq!(doc.volumes()[0].files[0].filename.as_deref(), Some("A.TXT"));
}

#[test]
fn missing_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    assert!(DfxmlReader::from_path(&tmp.path().join("absent.xml")).is_err());
}

#[test]
fn malformed_documents_are_dfxml_errors() {
    for bad in [
        "<dfxml><volume><fileobject></volume></dfxml>",
        "<dfxml><fileobject><filesize>1.5</filesize></fileobject></dfxml>",
        "<notdfxml/>",
    ] {
        let (_tmp, path) = write_tmp(bad);
        let err = dfxml::read_path(&path).unwrap_err();
        assert!(matches!(err, AppError::Dfxml(_)), "{bad}: {err}");
    }
}
