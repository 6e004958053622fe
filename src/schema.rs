//! Index schema: settings, analysis definitions and the field mapping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::analysis::registry::{CONTENT, HASHTAG, JA_DEFAULT, VERBATIM};
use crate::config::IndexerConfig;
use crate::error::{IndexerError, Result};

pub const FIELD_ID: &str = "id";
pub const FIELD_ACCOUNT_ID: &str = "account_id";
pub const FIELD_TEXT: &str = "text";
pub const FIELD_TEXT_STEMMED: &str = "text.stemmed";
pub const FIELD_TAGS: &str = "tags";
pub const FIELD_SEARCHABLE_BY: &str = "searchable_by";
pub const FIELD_LANGUAGE: &str = "language";
pub const FIELD_PROPERTIES: &str = "properties";
pub const FIELD_CREATED_AT: &str = "created_at";

/// Engine field types used by the status index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Keyword,
    Long,
    Date,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Keyword => "keyword",
            FieldType::Long => "long",
            FieldType::Date => "date",
        }
    }
}

/// Mapping of a single field, with optional multi-field sub-fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldMapping>,
}

impl FieldMapping {
    pub fn new(field_type: FieldType) -> Self {
        FieldMapping {
            field_type,
            analyzer: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn text(analyzer: &str) -> Self {
        FieldMapping::new(FieldType::Text).with_analyzer(analyzer)
    }

    pub fn with_analyzer(mut self, analyzer: &str) -> Self {
        self.analyzer = Some(analyzer.to_string());
        self
    }

    pub fn with_subfield(mut self, name: &str, mapping: FieldMapping) -> Self {
        self.fields.insert(name.to_string(), mapping);
        self
    }

    /// Short description used in conflict reports, e.g. `text(content)`.
    pub fn describe(&self) -> String {
        match &self.analyzer {
            Some(analyzer) => format!("{}({analyzer})", self.field_type.as_str()),
            None => self.field_type.as_str().to_string(),
        }
    }
}

/// The document mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub date_detection: bool,
    pub properties: BTreeMap<String, FieldMapping>,
}

impl Mapping {
    pub fn empty() -> Self {
        Mapping {
            date_detection: false,
            properties: BTreeMap::new(),
        }
    }

    /// The status document mapping.
    pub fn statuses() -> Self {
        let mut properties = BTreeMap::new();
        properties.insert(FIELD_ID.to_string(), FieldMapping::new(FieldType::Long));
        properties.insert(FIELD_ACCOUNT_ID.to_string(), FieldMapping::new(FieldType::Long));
        properties.insert(
            FIELD_TEXT.to_string(),
            FieldMapping::text(JA_DEFAULT).with_subfield("stemmed", FieldMapping::text(CONTENT)),
        );
        properties.insert(FIELD_TAGS.to_string(), FieldMapping::text(HASHTAG));
        properties.insert(FIELD_SEARCHABLE_BY.to_string(), FieldMapping::new(FieldType::Long));
        properties.insert(FIELD_LANGUAGE.to_string(), FieldMapping::new(FieldType::Keyword));
        properties.insert(FIELD_PROPERTIES.to_string(), FieldMapping::new(FieldType::Keyword));
        properties.insert(FIELD_CREATED_AT.to_string(), FieldMapping::new(FieldType::Date));
        Mapping {
            date_detection: false,
            properties,
        }
    }

    /// Look up a field by dotted path (`text.stemmed`).
    pub fn field(&self, path: &str) -> Option<&FieldMapping> {
        let mut parts = path.split('.');
        let mut current = self.properties.get(parts.next()?)?;
        for part in parts {
            current = current.fields.get(part)?;
        }
        Some(current)
    }

    /// Every field with its dotted path, sub-fields after their parent.
    pub fn flatten(&self) -> Vec<(String, &FieldMapping)> {
        fn walk<'a>(
            prefix: &str,
            fields: &'a BTreeMap<String, FieldMapping>,
            out: &mut Vec<(String, &'a FieldMapping)>,
        ) {
            for (name, mapping) in fields {
                let path = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{prefix}.{name}")
                };
                out.push((path.clone(), mapping));
                walk(&path, &mapping.fields, out);
            }
        }
        let mut out = Vec::new();
        walk("", &self.properties, &mut out);
        out
    }

    pub fn to_json(&self) -> Value {
        json!({
            "date_detection": self.date_detection,
            "properties": self.properties,
        })
    }

    /// Parse the engine's mapping JSON (the object holding `properties`).
    ///
    /// Field types outside [`FieldType`] are rejected as an engine error.
    pub fn from_json(value: &Value) -> Result<Self> {
        let date_detection = value
            .get("date_detection")
            .and_then(Value::as_bool)
            .unwrap_or(true);
        let properties = match value.get("properties") {
            Some(props) => serde_json::from_value(props.clone()).map_err(|e| {
                IndexerError::engine(format!("unsupported mapping in engine: {e}"))
            })?,
            None => BTreeMap::new(),
        };
        Ok(Mapping {
            date_detection,
            properties,
        })
    }

    /// Check that `requested` can be applied on top of `self`.
    ///
    /// Adding fields is allowed. Changing the type or analyzer of an
    /// existing field (or sub-field) is a [`IndexerError::SchemaConflict`].
    pub fn check_compatible(&self, requested: &Mapping) -> Result<()> {
        for (path, wanted) in requested.flatten() {
            if let Some(existing) = self.field(&path)
                && (existing.field_type != wanted.field_type || existing.analyzer != wanted.analyzer)
            {
                return Err(IndexerError::schema_conflict(
                    path,
                    existing.describe(),
                    wanted.describe(),
                ));
            }
        }
        Ok(())
    }

    /// Add the fields of `requested` that are missing here.
    ///
    /// Fails with [`IndexerError::SchemaConflict`] without modifying `self`
    /// when the mappings are incompatible.
    pub fn merge(&mut self, requested: &Mapping) -> Result<()> {
        fn merge_fields(
            live: &mut BTreeMap<String, FieldMapping>,
            requested: &BTreeMap<String, FieldMapping>,
        ) {
            for (name, wanted) in requested {
                match live.get_mut(name) {
                    Some(existing) => merge_fields(&mut existing.fields, &wanted.fields),
                    None => {
                        live.insert(name.clone(), wanted.clone());
                    }
                }
            }
        }

        self.check_compatible(requested)?;
        merge_fields(&mut self.properties, &requested.properties);
        self.date_detection = requested.date_detection;
        Ok(())
    }

    /// Whether every field of `requested` is already present.
    pub fn contains_all(&self, requested: &Mapping) -> bool {
        requested
            .flatten()
            .iter()
            .all(|(path, _)| self.field(path).is_some())
    }
}

/// Settings that can change on a live index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicSettings {
    pub refresh_interval_secs: u64,
    pub number_of_replicas: u32,
}

impl DynamicSettings {
    pub fn to_json(&self) -> Value {
        json!({
            "index": {
                "refresh_interval": format!("{}s", self.refresh_interval_secs),
                "number_of_replicas": self.number_of_replicas,
            }
        })
    }
}

/// Everything needed to create the status index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSchema {
    pub number_of_shards: u32,
    pub dynamic: DynamicSettings,
    pub mapping: Mapping,
}

impl IndexSchema {
    pub fn statuses(config: &IndexerConfig) -> Self {
        IndexSchema {
            number_of_shards: config.number_of_shards(),
            dynamic: DynamicSettings {
                refresh_interval_secs: config.index.refresh_interval_secs,
                number_of_replicas: config.number_of_replicas(),
            },
            mapping: Mapping::statuses(),
        }
    }

    /// Body of the create-index request.
    pub fn to_json(&self) -> Value {
        json!({
            "settings": {
                "index": {
                    "refresh_interval": format!("{}s", self.dynamic.refresh_interval_secs),
                    "number_of_shards": self.number_of_shards,
                    "number_of_replicas": self.dynamic.number_of_replicas,
                },
                "analysis": analysis_settings(),
            },
            "mappings": self.mapping.to_json(),
        })
    }
}

/// Analysis definitions matching [`crate::analysis::AnalyzerRegistry::standard`].
pub fn analysis_settings() -> Value {
    json!({
        "filter": {
            "english_stop": { "type": "stop", "stopwords": "_english_" },
            "english_stemmer": { "type": "stemmer", "language": "english" },
            "english_possessive_stemmer": { "type": "stemmer", "language": "possessive_english" },
            "word_delimiter": { "type": "word_delimiter_graph", "preserve_original": false },
        },
        "tokenizer": {
            "ja_tokenizer": { "type": "kuromoji_tokenizer", "mode": "search" },
        },
        "analyzer": {
            "verbatim": {
                "tokenizer": "uax_url_email",
                "filter": ["lowercase"],
            },
            "content": {
                "tokenizer": "ja_tokenizer",
                "char_filter": ["icu_normalizer", "html_strip", "kuromoji_iteration_mark"],
                "filter": [
                    "kuromoji_stemmer",
                    "kuromoji_number",
                    "kuromoji_baseform",
                    "kuromoji_part_of_speech",
                    "icu_normalizer",
                    "lowercase",
                    "asciifolding",
                    "cjk_width",
                    "elision",
                    "english_possessive_stemmer",
                    "english_stop",
                    "english_stemmer",
                ],
            },
            "ja_default_analyzer": {
                "tokenizer": "kuromoji_tokenizer",
                "type": "custom",
            },
            "hashtag": {
                "tokenizer": "keyword",
                "filter": ["word_delimiter", "lowercase", "asciifolding", "cjk_width"],
            },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statuses_mapping_shape() {
        let mapping = Mapping::statuses();
        assert!(!mapping.date_detection);
        assert_eq!(mapping.field(FIELD_TEXT).unwrap().describe(), "text(ja_default_analyzer)");
        assert_eq!(mapping.field(FIELD_TEXT_STEMMED).unwrap().describe(), "text(content)");
        assert_eq!(mapping.field(FIELD_TAGS).unwrap().analyzer.as_deref(), Some(HASHTAG));
        assert_eq!(mapping.field(FIELD_SEARCHABLE_BY).unwrap().field_type, FieldType::Long);
        assert!(mapping.field("text.missing").is_none());

        let json = mapping.to_json();
        assert_eq!(json["properties"]["text"]["fields"]["stemmed"]["analyzer"], "content");
        assert_eq!(json["properties"]["created_at"]["type"], "date");
        assert!(json["properties"]["language"].get("analyzer").is_none());
    }

    #[test]
    fn test_mapping_json_round_trip() {
        let mapping = Mapping::statuses();
        assert_eq!(Mapping::from_json(&mapping.to_json()).unwrap(), mapping);
    }

    #[test]
    fn test_compatibility() {
        let requested = Mapping::statuses();
        assert!(Mapping::empty().check_compatible(&requested).is_ok());
        assert!(requested.check_compatible(&requested).is_ok());

        let mut live = Mapping::statuses();
        live.properties.insert(FIELD_TAGS.into(), FieldMapping::new(FieldType::Keyword));
        match live.check_compatible(&requested).unwrap_err() {
            IndexerError::SchemaConflict {
                field,
                existing,
                requested,
            } => {
                assert_eq!(field, "tags");
                assert_eq!(existing, "keyword");
                assert_eq!(requested, "text(hashtag)");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_subfield_conflict() {
        let mut live = Mapping::statuses();
        live.properties.insert(
            FIELD_TEXT.into(),
            FieldMapping::text(JA_DEFAULT).with_subfield("stemmed", FieldMapping::text(VERBATIM)),
        );
        let err = live.check_compatible(&Mapping::statuses()).unwrap_err();
        assert!(matches!(err, IndexerError::SchemaConflict { ref field, .. } if field == "text.stemmed"));
    }

    #[test]
    fn test_merge_adds_missing_fields() {
        let mut live = Mapping::empty();
        live.properties.insert(FIELD_ID.into(), FieldMapping::new(FieldType::Long));
        live.properties.insert(FIELD_TEXT.into(), FieldMapping::text(JA_DEFAULT));
        assert!(!live.contains_all(&Mapping::statuses()));

        live.merge(&Mapping::statuses()).unwrap();
        assert!(live.contains_all(&Mapping::statuses()));
        assert_eq!(live.field(FIELD_TEXT_STEMMED).unwrap().describe(), "text(content)");
    }

    #[test]
    fn test_merge_conflict_leaves_mapping_untouched() {
        let mut live = Mapping::empty();
        live.properties.insert(FIELD_CREATED_AT.into(), FieldMapping::new(FieldType::Keyword));
        let before = live.clone();
        assert!(live.merge(&Mapping::statuses()).is_err());
        assert_eq!(live, before);
    }

    #[test]
    fn test_schema_settings() {
        let config = IndexerConfig::builder().prefix("x").build().unwrap();
        let json = IndexSchema::statuses(&config).to_json();
        assert_eq!(json["settings"]["index"]["refresh_interval"], "30s");
        assert_eq!(json["settings"]["index"]["number_of_shards"], 5);
        assert_eq!(json["settings"]["index"]["number_of_replicas"], 0);
        let analyzers = &json["settings"]["analysis"]["analyzer"];
        assert_eq!(analyzers[HASHTAG]["tokenizer"], "keyword");
        for name in [VERBATIM, CONTENT, JA_DEFAULT, HASHTAG] {
            assert!(analyzers.get(name).is_some(), "missing analyzer {name}");
        }
    }

    #[test]
    fn test_japanese_tokenizer_definition() {
        let analysis = analysis_settings();
        let tokenizers = analysis["tokenizer"].as_object().unwrap();
        assert_eq!(tokenizers.len(), 1);
        assert_eq!(tokenizers["ja_tokenizer"]["type"], "kuromoji_tokenizer");
        assert_eq!(tokenizers["ja_tokenizer"]["mode"], "search");
        assert_eq!(analysis["analyzer"][CONTENT]["tokenizer"], "ja_tokenizer");
        assert_eq!(analysis["analyzer"][JA_DEFAULT]["tokenizer"], "kuromoji_tokenizer");
    }
}
