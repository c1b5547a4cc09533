//! Generation settings stored as RON, and errors from file-based loading.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::generator::Parameters;
use crate::core::parser::ParseError;
use crate::core::random::Stream;
use crate::core::symbol::Symbol;
use crate::core::value::Value;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("template parse error in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ParseError,
    },
}

/// Which documents to load and how to run them.
///
/// ```ron
/// (
///     documents: ["names.gen"],
///     seed: 42,
///     count: 5,
///     parameters: {"title": "Captain"},
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Template documents, merged in order.
    pub documents: Vec<PathBuf>,
    pub seed: u64,
    /// Values generated per request.
    pub count: usize,
    /// Parameters passed to every request, as text.
    pub parameters: BTreeMap<String, String>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            documents: Vec::new(),
            seed: 0,
            count: 1,
            parameters: BTreeMap::new(),
        }
    }
}

impl GenerationSettings {
    /// Load settings from a RON file. Relative document paths are taken
    /// relative to the settings file.
    pub fn load_from_ron(path: &Path) -> Result<GenerationSettings, LoadError> {
        let contents = std::fs::read_to_string(path)?;
        let mut settings = Self::parse_ron(&contents)?;
        if let Some(dir) = path.parent() {
            for document in &mut settings.documents {
                if document.is_relative() {
                    *document = dir.join(&*document);
                }
            }
        }
        Ok(settings)
    }

    /// Parse settings from a RON string.
    pub fn parse_ron(input: &str) -> Result<GenerationSettings, LoadError> {
        Ok(ron::from_str(input)?)
    }

    pub fn parameters(&self) -> Parameters {
        self.parameters
            .iter()
            .map(|(k, v)| (Symbol::new(k), Value::from(v.as_str())))
            .collect()
    }

    pub fn stream(&self) -> Stream {
        Stream::new(self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let settings = GenerationSettings::parse_ron("(seed: 9)").unwrap();
        assert_eq!(settings.seed, 9);
        assert_eq!(settings.count, 1);
        assert!(settings.documents.is_empty());
        assert!(settings.parameters.is_empty());
    }

    #[test]
    fn parameters_become_text_values() {
        let settings =
            GenerationSettings::parse_ron(r#"(parameters: {"title": "Captain"})"#).unwrap();
        let params = settings.parameters();
        assert_eq!(params.get("title"), Some(&Value::from("Captain")));
    }

    #[test]
    fn invalid_ron_is_an_error() {
        assert!(matches!(
            GenerationSettings::parse_ron("(seed: \"nope\")"),
            Err(LoadError::Ron(_))
        ));
    }

    #[test]
    fn ron_round_trip() {
        let mut settings = GenerationSettings {
            seed: 77,
            count: 3,
            ..Default::default()
        };
        settings.documents.push(PathBuf::from("a.gen"));
        settings
            .parameters
            .insert("mood".to_string(), "grim".to_string());

        let serialized = ron::to_string(&settings).unwrap();
        let deserialized = GenerationSettings::parse_ron(&serialized).unwrap();
        assert_eq!(deserialized, settings);
    }

    #[test]
    fn load_resolves_documents_next_to_settings() {
        let path = PathBuf::from("tests/fixtures/settings.ron");
        let settings = GenerationSettings::load_from_ron(&path).unwrap();
        assert_eq!(
            settings.documents,
            vec![
                PathBuf::from("tests/fixtures/names.gen"),
                PathBuf::from("tests/fixtures/greetings.gen"),
            ]
        );
        assert_eq!(settings.seed, 42);
        assert_eq!(settings.count, 5);
    }

    #[test]
    fn missing_file_is_io_error() {
        let path = PathBuf::from("tests/fixtures/does_not_exist.ron");
        assert!(matches!(
            GenerationSettings::load_from_ron(&path),
            Err(LoadError::Io(_))
        ));
    }
}
