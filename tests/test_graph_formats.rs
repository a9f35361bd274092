//! Graph files on disk: format selection, each serialization, and
//! hand-written input.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use case_dfxml::config::Config;
use case_dfxml::dfxml;
use case_dfxml::error::AppError;
use case_dfxml::graph::GraphFormat;
use case_dfxml::pipeline::{case_to_dfxml, dfxml_to_case};
use case_dfxml::validate::compare;

// ── helpers ──────────────────────────────────────────────────────────────────

const DFXML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<dfxml xmlns="http://www.forensicswiki.org/wiki/Category:Digital_Forensics_XML" version="1.2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:type>Disk Image</dc:type>
  </metadata>
  <creator>
    <program>fiwalk</program>
    <version>4.4</version>
  </creator>
  <volume offset="0">
    <partition_offset>32256</partition_offset>
    <ftype_str>ntfs</ftype_str>
    <fileobject>
      <filename>Documents/report.doc</filename>
      <filesize>1024</filesize>
      <mtime>2011-06-01T12:00:00Z</mtime>
      <crtime>2011-05-30T08:15:00Z</crtime>
      <hashdigest type="md5">0123456789abcdef0123456789abcdef</hashdigest>
    </fileobject>
    <fileobject>
      <filename>$MFT</filename>
      <filesize>262144</filesize>
    </fileobject>
  </volume>
  <fileobject>
    <filename>carved.jpg</filename>
    <filesize>4096</filesize>
  </fileobject>
</dfxml>
"#;

fn fixture() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().expect("tempdir");
    let input = tmp.path().join("input.xml");
    fs::write(&input, DFXML).expect("write fixture");
    (tmp, input)
}

fn assert_round_trip(input: &Path, graph: &Path, format_name: Option<&str>) {
    let back = graph.with_extension("back.xml");
    dfxml_to_case(&Config::test_default(), input, graph, format_name).unwrap();
    case_to_dfxml(graph, &back, format_name, None).unwrap();
    let report = compare(&dfxml::read_path(input).unwrap(), &dfxml::read_path(&back).unwrap());
    assert!(report.is_faithful(), "{}: {:?}", graph.display(), report.failures());
}

// ── format selection ─────────────────────────────────────────────────────────

#[test]
fn every_format_round_trips_through_disk() {
    let (tmp, input) = fixture();
    for format in GraphFormat::ALL {
        let graph = tmp.path().join(format!("graph.{}", format.extension()));
        assert_round_trip(&input, &graph, None);
    }
}

#[test]
fn explicit_format_overrides_extension() {
    let (tmp, input) = fixture();
    let graph = tmp.path().join("graph.dat");
    assert_round_trip(&input, &graph, Some("turtle"));
    let text = fs::read_to_string(&graph).unwrap();
    assert!(text.contains("@prefix"), "expected Turtle, got:\n{text}");
}

#[test]
fn unknown_extension_fails_without_writing() {
    let (tmp, input) = fixture();
    let graph = tmp.path().join("graph.yaml");
    let err = dfxml_to_case(&Config::test_default(), &input, &graph, None).unwrap_err();
    assert!(matches!(err, AppError::Format(_)), "{err}");
    assert!(!graph.exists());
}

#[test]
fn unknown_format_name_fails_without_writing() {
    let (tmp, input) = fixture();
    let graph = tmp.path().join("graph.ttl");
    let err = dfxml_to_case(&Config::test_default(), &input, &graph, Some("n3")).unwrap_err();
    assert!(matches!(err, AppError::Format(_)), "{err}");
    assert!(!graph.exists());
}

#[test]
fn missing_graph_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out.xml");
    assert!(case_to_dfxml(&tmp.path().join("missing.ttl"), &out, None, None).is_err());
    assert!(!out.exists());
}

// ── serialization shape ──────────────────────────────────────────────────────

#[test]
fn json_ld_output_is_flat_with_full_iris() {
    let (tmp, input) = fixture();
    let graph = tmp.path().join("graph.jsonld");
    dfxml_to_case(&Config::test_default(), &input, &graph, None).unwrap();

    let doc: serde_json::Value = serde_json::from_slice(&fs::read(&graph).unwrap()).unwrap();
    let nodes = doc
        .as_array()
        .or_else(|| doc["@graph"].as_array())
        .expect("top-level node array");
    assert!(nodes.iter().all(|n| n["@id"].is_string()));
    assert!(nodes.iter().any(|n| n["@id"].as_str().unwrap().starts_with("http://example.org/kb/FileSystem-")));

    let rdf_type = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
    let file_system = "https://ontology.unifiedcyberontology.org/uco/observable/FileSystem";
    assert!(nodes.iter().any(|n| {
        n[rdf_type].as_array().is_some_and(|types| types.iter().any(|t| t["@id"] == file_system))
    }));

    let size_key = "https://ontology.unifiedcyberontology.org/uco/observable/sizeInBytes";
    let sizes: Vec<_> = nodes.iter().filter_map(|n| n[size_key].as_array()).flatten().collect();
    assert!(!sizes.is_empty());
    assert!(sizes.iter().all(|s| s["@type"] == "http://www.w3.org/2001/XMLSchema#integer" && s["@value"].is_string()));
}

#[test]
fn custom_kb_prefix_is_used_in_output() {
    let (tmp, input) = fixture();
    let graph = tmp.path().join("graph.ttl");
    let mut config = Config::test_default();
    config.graph.kb_prefix_label = "case".into();
    config.graph.kb_prefix_iri = "http://example.org/case#".into();
    dfxml_to_case(&config, &input, &graph, None).unwrap();

    let text = fs::read_to_string(&graph).unwrap();
    assert!(text.contains("@prefix case: <http://example.org/case#>"), "{text}");
    assert!(!text.contains("http://example.org/kb/"));
}

// ── hand-written input ───────────────────────────────────────────────────────

#[test]
fn hand_written_json_ld_reconstructs() {
    let tmp = TempDir::new().unwrap();
    let graph = tmp.path().join("case.json");
    fs::write(
        &graph,
        r#"{
  "@context": {
    "kb": "http://example.org/kb/",
    "uco-core": "https://ontology.unifiedcyberontology.org/uco/core/",
    "uco-observable": "https://ontology.unifiedcyberontology.org/uco/observable/",
    "xsd": "http://www.w3.org/2001/XMLSchema#"
  },
  "@graph": [
    {
      "@id": "kb:FileSystem-1",
      "@type": "uco-observable:FileSystem",
      "uco-core:hasFacet": {
        "@type": "uco-observable:FileSystemFacet",
        "uco-observable:fileSystemType": "FAT"
      }
    },
    {
      "@id": "kb:File-1",
      "@type": "uco-observable:File",
      "uco-core:hasFacet": [
        {
          "@type": "uco-observable:FileFacet",
          "uco-observable:filePath": "boot.ini",
          "uco-observable:modifiedTime": {"@type": "xsd:dateTime", "@value": "2008-03-01T10:00:00Z"}
        },
        {
          "@type": "uco-observable:ContentDataFacet",
          "uco-observable:sizeInBytes": 211
        }
      ]
    },
    {
      "@id": "kb:Relationship-1",
      "@type": "uco-core:Relationship",
      "uco-core:kindOfRelationship": "Child_Of",
      "uco-core:source": {"@id": "kb:File-1"},
      "uco-core:target": {"@id": "kb:FileSystem-1"}
    }
  ]
}"#,
    )
    .unwrap();

    let out = tmp.path().join("out.xml");
    let reconstruction = case_to_dfxml(&graph, &out, None, Some("case_to_dfxml case.json out.xml".into())).unwrap();
    assert!(reconstruction.ambiguities.is_empty());

    let doc = dfxml::read_path(&out).unwrap();
    let volumes = doc.volumes();
    assert_eq!(volumes.len(), 1);
    assert_eq!(volumes[0].ftype_str.as_deref(), Some("fat"));
    assert_eq!(volumes[0].partition_offset, None);
    let file = &volumes[0].files[0];
    assert_eq!(file.filename.as_deref(), Some("boot.ini"));
    assert_eq!(file.filesize, Some(211));
    assert!(file.mtime.is_some());
    assert_eq!(doc.metadata.command_line.as_deref(), Some("case_to_dfxml case.json out.xml"));
}

#[test]
fn subclass_axioms_widen_discovery() {
    let tmp = TempDir::new().unwrap();
    let graph = tmp.path().join("case.ttl");
    fs::write(
        &graph,
        r#"
@prefix kb: <http://example.org/kb/> .
@prefix ex: <http://example.org/ontology/> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix uco-core: <https://ontology.unifiedcyberontology.org/uco/core/> .
@prefix uco-observable: <https://ontology.unifiedcyberontology.org/uco/observable/> .

ex:NtfsVolume rdfs:subClassOf ex:Volume .
ex:Volume rdfs:subClassOf uco-observable:FileSystem .
ex:Picture rdfs:subClassOf uco-observable:File .

kb:vol a ex:NtfsVolume .
kb:pic a ex:Picture ;
    uco-core:hasFacet [ a uco-observable:FileFacet ; uco-observable:filePath "cat.png" ] .
kb:rel uco-core:kindOfRelationship "Child_Of" ; uco-core:source kb:pic ; uco-core:target kb:vol .
"#,
    )
    .unwrap();

    let out = tmp.path().join("out.xml");
    case_to_dfxml(&graph, &out, None, None).unwrap();
    let doc = dfxml::read_path(&out).unwrap();
    assert_eq!(doc.volumes().len(), 1);
    assert_eq!(doc.volumes()[0].files[0].filename.as_deref(), Some("cat.png"));
}
