//! Block-key token extraction.
//!
//! A [`KeyExtractor`] turns one record into zero or more tokens. It must be
//! pure: the tokens may depend only on the record itself, so records with
//! identical content always land in the same block.
//!
//! [`RuleExtractor`] is the configurable implementation: per field, an
//! ordered list of regex rules, optionally preceded by a text normalizer.

use crate::config::{ExtractorConfig, MatchMode, NormalizerConfig};
use linkage_core::{FieldRef, LinkageError, Record, Schema};
use regex::{Regex, RegexBuilder};
use thiserror::Error;

/// Errors raised while compiling or running an extractor.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    Schema(#[from] LinkageError),

    #[error("Extraction failed for record {id}: {message}")]
    Failed { id: String, message: String },
}

/// Maps a record to block-key tokens.
pub trait KeyExtractor: Send + Sync {
    /// Extract tokens. An empty vector excludes the record from blocking.
    fn extract(&self, record: &Record) -> Result<Vec<String>, ExtractError>;
}

impl<F> KeyExtractor for F
where
    F: Fn(&Record) -> Result<Vec<String>, ExtractError> + Send + Sync,
{
    fn extract(&self, record: &Record) -> Result<Vec<String>, ExtractError> {
        self(record)
    }
}

/// Compiled text normalizer.
#[derive(Debug)]
pub struct Normalizer {
    lowercase: bool,
    punctuation: Option<Regex>,
    aliases: Vec<(Regex, String)>,
}

impl Normalizer {
    /// Compile a normalizer configuration.
    pub fn compile(config: &NormalizerConfig) -> Result<Self, ExtractError> {
        let punctuation = if config.strip_punctuation {
            Some(compile(r"[^\w\s]", false)?)
        } else {
            None
        };

        let mut aliases = Vec::new();
        for alias in &config.aliases {
            for variant in &alias.variants {
                let pattern = format!(r"\b{}\b", regex::escape(variant));
                aliases.push((compile(&pattern, false)?, alias.canonical.clone()));
            }
        }

        Ok(Self {
            lowercase: config.lowercase,
            punctuation,
            aliases,
        })
    }

    /// Apply lower-casing, punctuation removal, then aliases in order.
    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        let mut out = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };
        if let Some(re) = &self.punctuation {
            out = re.replace_all(&out, "").into_owned();
        }
        for (re, canonical) in &self.aliases {
            out = re
                .replace_all(&out, regex::NoExpand(canonical.as_str()))
                .into_owned();
        }
        out
    }
}

#[derive(Debug)]
struct FieldMatcher {
    name: String,
    field: FieldRef,
    rules: Vec<Regex>,
}

/// Regex rule extractor built from an [`ExtractorConfig`].
#[derive(Debug)]
pub struct RuleExtractor {
    mode: MatchMode,
    normalizer: Option<Normalizer>,
    fields: Vec<FieldMatcher>,
}

impl RuleExtractor {
    /// Compile the configuration against a schema.
    ///
    /// Fails if a configured field is not a column or a pattern does not
    /// compile. This is the only point where field names are checked.
    pub fn compile(config: &ExtractorConfig, schema: &Schema) -> Result<Self, ExtractError> {
        let normalizer = config
            .normalizer
            .as_ref()
            .map(Normalizer::compile)
            .transpose()?;

        let mut fields = Vec::with_capacity(config.fields.len());
        for field_rules in &config.fields {
            let field = schema.field(&field_rules.field)?;
            let rules = field_rules
                .rules
                .iter()
                .map(|r| compile(&r.pattern, r.case_insensitive))
                .collect::<Result<Vec<_>, _>>()?;
            fields.push(FieldMatcher {
                name: field_rules.field.clone(),
                field,
                rules,
            });
        }

        tracing::debug!(
            fields = fields.len(),
            normalized = normalizer.is_some(),
            "compiled rule extractor"
        );

        Ok(Self {
            mode: config.mode,
            normalizer,
            fields,
        })
    }

    /// Names of the fields this extractor reads.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    fn extract_field(&self, matcher: &FieldMatcher, text: &str, keys: &mut Vec<String>) {
        for rule in &matcher.rules {
            let grouped = rule.captures_len() > 1;
            for caps in rule.captures_iter(text) {
                let token = if grouped { caps.get(1) } else { caps.get(0) };
                let Some(token) = token else { continue };
                let token = token.as_str().trim().to_lowercase();
                if token.is_empty() {
                    continue;
                }
                keys.push(token);
                if self.mode == MatchMode::FirstMatch {
                    return;
                }
            }
        }
    }
}

impl KeyExtractor for RuleExtractor {
    fn extract(&self, record: &Record) -> Result<Vec<String>, ExtractError> {
        let mut keys = Vec::new();
        for matcher in &self.fields {
            // Missing values contribute nothing.
            let Some(raw) = record.get(matcher.field) else {
                continue;
            };
            match &self.normalizer {
                Some(n) => self.extract_field(matcher, &n.apply(raw), &mut keys),
                None => self.extract_field(matcher, raw, &mut keys),
            }
        }
        Ok(keys)
    }
}

fn compile(pattern: &str, case_insensitive: bool) -> Result<Regex, ExtractError> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|source| ExtractError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Alias, ExtractorPreset, FieldRules, Rule};
    use linkage_core::RecordId;

    fn schema() -> Schema {
        Schema::new(["id", "name", "brand"]).unwrap()
    }

    fn record(name: Option<&str>, brand: Option<&str>) -> Record {
        Record::new(
            RecordId::Int(1),
            vec![
                Some("1".to_string()),
                name.map(str::to_string),
                brand.map(str::to_string),
            ],
        )
    }

    fn config(rules: Vec<Rule>, mode: MatchMode) -> ExtractorConfig {
        ExtractorConfig {
            mode,
            normalizer: None,
            fields: vec![FieldRules {
                field: "name".to_string(),
                rules,
            }],
        }
    }

    #[test]
    fn test_all_matches_lowercased() {
        let cfg = config(vec![Rule::new(r"\b\w+\b")], MatchMode::AllMatches);
        let ex = RuleExtractor::compile(&cfg, &schema()).unwrap();
        let keys = ex.extract(&record(Some("SanDisk Ultra 64GB"), None)).unwrap();
        assert_eq!(keys, vec!["sandisk", "ultra", "64gb"]);
    }

    #[test]
    fn test_capture_group_is_token() {
        let cfg = config(
            vec![Rule::case_insensitive(r"\b\d+\s?(GB|MB|TB)\b")],
            MatchMode::AllMatches,
        );
        let ex = RuleExtractor::compile(&cfg, &schema()).unwrap();
        let keys = ex.extract(&record(Some("Stick 64 GB and 128MB"), None)).unwrap();
        assert_eq!(keys, vec!["gb", "mb"]);
    }

    #[test]
    fn test_first_match_mode() {
        let cfg = config(vec![Rule::new(r"\w+\s\w+\d+")], MatchMode::FirstMatch);
        let ex = RuleExtractor::compile(&cfg, &schema()).unwrap();
        let keys = ex
            .extract(&record(Some("Lexar Pro 1000x and Sony SF64"), None))
            .unwrap();
        assert_eq!(keys, vec!["pro 1000"]);
    }

    #[test]
    fn test_missing_field_contributes_nothing() {
        let cfg = config(vec![Rule::new(r"\w+")], MatchMode::AllMatches);
        let ex = RuleExtractor::compile(&cfg, &schema()).unwrap();
        assert!(ex.extract(&record(None, Some("sony"))).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_field_is_config_error() {
        let mut cfg = config(vec![Rule::new(r"\w+")], MatchMode::AllMatches);
        cfg.fields[0].field = "title".to_string();
        let err = RuleExtractor::compile(&cfg, &schema()).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::Schema(LinkageError::MissingColumn(c)) if c == "title"
        ));
    }

    #[test]
    fn test_bad_pattern_is_config_error() {
        let cfg = config(vec![Rule::new(r"(unclosed")], MatchMode::AllMatches);
        let err = RuleExtractor::compile(&cfg, &schema()).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidPattern { .. }));
    }

    #[test]
    fn test_normalizer_aliases_and_punctuation() {
        let normalizer = Normalizer::compile(&NormalizerConfig {
            lowercase: true,
            strip_punctuation: true,
            aliases: vec![Alias {
                canonical: "memory".to_string(),
                variants: vec!["mémoire".to_string(), "memoria".to_string()],
            }],
        })
        .unwrap();
        assert_eq!(normalizer.apply("Carte Mémoire, 32GB!"), "carte memory 32gb");
        // Whole words only.
        assert_eq!(normalizer.apply("memorial"), "memorial");
    }

    #[test]
    fn test_catalog_preset_reads_name_and_brand() {
        let cfg = ExtractorPreset::CatalogAliases.config().extractor;
        let ex = RuleExtractor::compile(&cfg, &schema()).unwrap();
        let keys = ex
            .extract(&record(Some("Kingston DataTraveler Black"), Some("Kingston")))
            .unwrap();
        assert!(keys.contains(&"kingston".to_string()));
        assert!(keys.contains(&"datatraveler".to_string()));
        assert!(keys.contains(&"black".to_string()));
        assert_eq!(keys.iter().filter(|k| *k == "kingston").count(), 2);
    }

    #[test]
    fn test_presets_compile() {
        let schema = Schema::new(["id", "title", "name", "brand"]).unwrap();
        for preset in ExtractorPreset::ALL {
            let cfg = preset.config().extractor;
            assert!(
                RuleExtractor::compile(&cfg, &schema).is_ok(),
                "{} failed to compile",
                preset.name()
            );
        }
    }

    #[test]
    fn test_closure_extractor() {
        let ex = |r: &Record| -> Result<Vec<String>, ExtractError> {
            Ok(vec![r.id().to_string()])
        };
        assert_eq!(ex.extract(&record(None, None)).unwrap(), vec!["1"]);
    }
}
