//! Graph serialization formats and extension-based guessing.

use std::fmt;
use std::path::Path;

use oxigraph::io::{JsonLdProfileSet, RdfFormat};

use crate::error::AppError;

/// The serializations a graph file may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    JsonLd,
    Turtle,
    RdfXml,
    NTriples,
}

impl GraphFormat {
    pub const ALL: [GraphFormat; 4] =
        [GraphFormat::JsonLd, GraphFormat::Turtle, GraphFormat::RdfXml, GraphFormat::NTriples];

    /// Resolve a user-supplied format name (`--output-format`, `--input-format`).
    pub fn from_name(name: &str) -> Result<Self, AppError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "json-ld" | "jsonld" | "json" | "application/ld+json" => Ok(Self::JsonLd),
            "turtle" | "ttl" | "text/turtle" => Ok(Self::Turtle),
            "xml" | "pretty-xml" | "rdf" | "rdf/xml" | "application/rdf+xml" => Ok(Self::RdfXml),
            "nt" | "nt11" | "ntriples" | "n-triples" | "application/n-triples" => Ok(Self::NTriples),
            other => Err(AppError::Format(format!(
                "unsupported graph format '{other}' (expected one of: json-ld, turtle, xml, nt)"
            ))),
        }
    }

    /// Guess the format from a file extension.
    pub fn guess_from_path(path: &Path) -> Result<Self, AppError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| {
                AppError::Format(format!(
                    "cannot guess graph format of {} (no extension); pass a format explicitly",
                    path.display()
                ))
            })?;
        match ext.as_str() {
            "json" | "jsonld" => Ok(Self::JsonLd),
            "ttl" => Ok(Self::Turtle),
            "rdf" | "xml" | "owl" => Ok(Self::RdfXml),
            "nt" => Ok(Self::NTriples),
            other => Err(AppError::Format(format!(
                "cannot guess graph format from extension '.{other}' of {}",
                path.display()
            ))),
        }
    }

    /// Explicit name if given, otherwise the extension guess.
    pub fn resolve(explicit: Option<&str>, path: &Path) -> Result<Self, AppError> {
        match explicit {
            Some(name) => Self::from_name(name),
            None => Self::guess_from_path(path),
        }
    }

    /// The oxigraph parser/serializer format. JSON-LD uses no profile.
    pub fn rdf_format(self) -> RdfFormat {
        match self {
            Self::JsonLd => RdfFormat::JsonLd { profile: JsonLdProfileSet::empty() },
            Self::Turtle => RdfFormat::Turtle,
            Self::RdfXml => RdfFormat::RdfXml,
            Self::NTriples => RdfFormat::NTriples,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::JsonLd => "json",
            Self::Turtle => "ttl",
            Self::RdfXml => "rdf",
            Self::NTriples => "nt",
        }
    }
}

impl fmt::Display for GraphFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::JsonLd => "json-ld",
            Self::Turtle => "turtle",
            Self::RdfXml => "xml",
            Self::NTriples => "nt",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn guesses_from_extension() {
        assert_eq!(GraphFormat::guess_from_path(&PathBuf::from("out.json")).unwrap(), GraphFormat::JsonLd);
        assert_eq!(GraphFormat::guess_from_path(&PathBuf::from("out.TTL")).unwrap(), GraphFormat::Turtle);
        assert_eq!(GraphFormat::guess_from_path(&PathBuf::from("out.rdf")).unwrap(), GraphFormat::RdfXml);
        assert_eq!(GraphFormat::guess_from_path(&PathBuf::from("out.nt")).unwrap(), GraphFormat::NTriples);
    }

    #[test]
    fn unknown_extension_is_a_format_error() {
        let err = GraphFormat::guess_from_path(&PathBuf::from("out.yaml")).unwrap_err();
        assert!(matches!(err, AppError::Format(_)));
        assert!(GraphFormat::guess_from_path(&PathBuf::from("out")).is_err());
    }

    #[test]
    fn explicit_name_overrides_extension() {
        let f = GraphFormat::resolve(Some("json-ld"), &PathBuf::from("out.ttl")).unwrap();
        assert_eq!(f, GraphFormat::JsonLd);
        assert!(GraphFormat::resolve(Some("trix"), &PathBuf::from("out.ttl")).is_err());
    }

    #[test]
    fn every_format_maps_to_an_oxigraph_format() {
        assert!(matches!(GraphFormat::JsonLd.rdf_format(), RdfFormat::JsonLd { .. }));
        assert_eq!(GraphFormat::Turtle.rdf_format(), RdfFormat::Turtle);
        assert_eq!(GraphFormat::RdfXml.rdf_format(), RdfFormat::RdfXml);
        assert_eq!(GraphFormat::NTriples.rdf_format(), RdfFormat::NTriples);
    }

    #[test]
    fn display_names_parse_back() {
        for f in GraphFormat::ALL {
            assert_eq!(GraphFormat::from_name(&f.to_string()).unwrap(), f);
        }
    }
}
