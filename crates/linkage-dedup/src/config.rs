//! Dataset and pipeline configuration.
//!
//! A [`DatasetConfig`] bundles everything a run needs: which column holds
//! the record id, how block keys are extracted, and the scoring/ranking
//! knobs. It can be loaded from JSON or built from one of the named
//! [`ExtractorPreset`]s.

use crate::candidates::DEFAULT_SIZE_CUTOFF;
use crate::similarity::MissingValuePolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Unknown preset '{0}' (expected one of: model-phrase, codes-and-words, title-patterns, catalog-aliases)")]
    UnknownPreset(String),
}

/// How many matches each field contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Every match of every rule becomes a token.
    #[default]
    AllMatches,
    /// Only the first match found (rules tried in order) is kept per field.
    FirstMatch,
}

/// A single token-extraction pattern.
///
/// When the pattern has a capture group, group 1 is the token; otherwise
/// the whole match is. In JSON a rule is either a bare pattern string or a
/// `{ "pattern": ..., "case_insensitive": ... }` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawRule")]
pub struct Rule {
    pub pattern: String,
    pub case_insensitive: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRule {
    Pattern(String),
    Full {
        pattern: String,
        #[serde(default)]
        case_insensitive: bool,
    },
}

impl From<RawRule> for Rule {
    fn from(raw: RawRule) -> Self {
        match raw {
            RawRule::Pattern(pattern) => Self::new(pattern),
            RawRule::Full {
                pattern,
                case_insensitive,
            } => Self {
                pattern,
                case_insensitive,
            },
        }
    }
}

impl Rule {
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            case_insensitive: false,
        }
    }

    #[must_use]
    pub fn case_insensitive(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            case_insensitive: true,
        }
    }
}

/// Rules applied to one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRules {
    pub field: String,
    pub rules: Vec<Rule>,
}

/// Rewrites every whole-word occurrence of a variant to `canonical`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub canonical: String,
    pub variants: Vec<String>,
}

/// Text normalization applied to field values before rules run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    #[serde(default = "default_true")]
    pub lowercase: bool,
    /// Remove every character that is neither a word character nor whitespace.
    #[serde(default)]
    pub strip_punctuation: bool,
    /// Applied in order, variant by variant.
    #[serde(default)]
    pub aliases: Vec<Alias>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            lowercase: true,
            strip_punctuation: false,
            aliases: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Configuration of the rule-based key extractor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractorConfig {
    #[serde(default)]
    pub mode: MatchMode,
    #[serde(default)]
    pub normalizer: Option<NormalizerConfig>,
    pub fields: Vec<FieldRules>,
}

/// Scoring and ranking knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Field whose tokens are compared with Jaccard similarity.
    pub compare_field: String,
    /// Blocks of this size or larger produce no candidates.
    pub size_cutoff: usize,
    /// Pairs scoring strictly below this are dropped.
    pub similarity_threshold: f64,
    /// Score candidates with rayon.
    pub parallel: bool,
    pub missing_values: MissingValuePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            compare_field: "title".to_string(),
            size_cutoff: DEFAULT_SIZE_CUTOFF,
            similarity_threshold: 0.5,
            parallel: false,
            missing_values: MissingValuePolicy::EmptySet,
        }
    }
}

impl PipelineConfig {
    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::Invalid(format!(
                "similarity_threshold must be between 0.0 and 1.0, got {}",
                self.similarity_threshold
            )));
        }
        if self.size_cutoff == 0 {
            return Err(ConfigError::Invalid(
                "size_cutoff must be > 0".to_string(),
            ));
        }
        if self.compare_field.is_empty() {
            return Err(ConfigError::Invalid(
                "compare_field must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything needed to run the pipeline on one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    #[serde(default = "default_id_field")]
    pub id_field: String,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    pub extractor: ExtractorConfig,
}

fn default_id_field() -> String {
    "id".to_string()
}

impl DatasetConfig {
    /// Load and validate a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Build the configuration of a named preset.
    #[must_use]
    pub fn preset(preset: ExtractorPreset) -> Self {
        preset.config()
    }

    /// Check value ranges and that the extractor has something to do.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pipeline.validate()?;
        if self.id_field.is_empty() {
            return Err(ConfigError::Invalid("id_field must not be empty".to_string()));
        }
        if self.extractor.fields.is_empty() {
            return Err(ConfigError::Invalid(
                "extractor must name at least one field".to_string(),
            ));
        }
        for field in &self.extractor.fields {
            if field.rules.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "extractor field '{}' has no rules",
                    field.field
                )));
            }
        }
        Ok(())
    }

    /// Pretty JSON rendering.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Named extractor strategies for the product datasets this tool was
/// built around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorPreset {
    /// First `word word+digits` phrase of the `name` field.
    ModelPhrase,
    /// Dash-separated product codes plus every word of `title`.
    CodesAndWords,
    /// Storage-product token patterns over `title`.
    TitlePatterns,
    /// Alias-normalized brand/model/color tokens over `name` and `brand`.
    CatalogAliases,
}

impl ExtractorPreset {
    pub const ALL: [Self; 4] = [
        Self::ModelPhrase,
        Self::CodesAndWords,
        Self::TitlePatterns,
        Self::CatalogAliases,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::ModelPhrase => "model-phrase",
            Self::CodesAndWords => "codes-and-words",
            Self::TitlePatterns => "title-patterns",
            Self::CatalogAliases => "catalog-aliases",
        }
    }

    #[must_use]
    pub fn config(self) -> DatasetConfig {
        match self {
            Self::ModelPhrase => DatasetConfig {
                id_field: default_id_field(),
                pipeline: PipelineConfig {
                    compare_field: "name".to_string(),
                    ..PipelineConfig::default()
                },
                extractor: ExtractorConfig {
                    mode: MatchMode::FirstMatch,
                    normalizer: None,
                    fields: vec![FieldRules {
                        field: "name".to_string(),
                        rules: vec![Rule::new(r"\w+\s\w+\d+")],
                    }],
                },
            },
            Self::CodesAndWords => DatasetConfig {
                id_field: default_id_field(),
                pipeline: PipelineConfig::default(),
                extractor: ExtractorConfig {
                    mode: MatchMode::AllMatches,
                    normalizer: None,
                    fields: vec![FieldRules {
                        field: "title".to_string(),
                        rules: vec![
                            Rule::case_insensitive(r"\b[A-Z0-9]{2,10}-[A-Z0-9]{2,10}\b"),
                            Rule::case_insensitive(r"\b\w+\b"),
                        ],
                    }],
                },
            },
            Self::TitlePatterns => DatasetConfig {
                id_field: default_id_field(),
                pipeline: PipelineConfig::default(),
                extractor: ExtractorConfig {
                    mode: MatchMode::AllMatches,
                    normalizer: None,
                    fields: vec![FieldRules {
                        field: "title".to_string(),
                        rules: TITLE_PATTERNS
                            .iter()
                            .map(|p| Rule::case_insensitive(*p))
                            .collect(),
                    }],
                },
            },
            Self::CatalogAliases => {
                let mut name_rules = vec![Rule::new(BRAND_PATTERN)];
                name_rules.extend(MODEL_PATTERNS.iter().map(|p| Rule::new(*p)));
                name_rules.push(Rule::new(COLOR_PATTERN));
                DatasetConfig {
                    id_field: default_id_field(),
                    pipeline: PipelineConfig {
                        compare_field: "name".to_string(),
                        similarity_threshold: 0.7,
                        ..PipelineConfig::default()
                    },
                    extractor: ExtractorConfig {
                        mode: MatchMode::AllMatches,
                        normalizer: Some(NormalizerConfig {
                            lowercase: true,
                            strip_punctuation: true,
                            aliases: catalog_aliases(),
                        }),
                        fields: vec![
                            FieldRules {
                                field: "name".to_string(),
                                rules: name_rules,
                            },
                            FieldRules {
                                field: "brand".to_string(),
                                rules: vec![Rule::new(BRAND_PATTERN)],
                            },
                        ],
                    },
                }
            }
        }
    }
}

impl FromStr for ExtractorPreset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| ConfigError::UnknownPreset(s.to_string()))
    }
}

const TITLE_PATTERNS: [&str; 19] = [
    r"\b[A-Z0-9]{2,10}-[A-Z0-9]{2,10}\b",
    r"\b\d+\s?(GB|MB|TB|GHz|MHz)\b",
    r"\b\w+\b",
    r"\b[vV]er\.?\s?[0-9]+(\.[0-9]+)?\b",
    r"\b[A-Z0-9]+[-_][A-Z0-9]+[-_][A-Z0-9]+\b",
    r"\b(?:ID|Code|Part)\s?#?:?\s?[A-Z0-9]+\b",
    r"\b\d+GB\b",
    r"\b\d+MB/s\b",
    r"USB\s?\d+\.\d+",
    r"\bSDXC\b|\bSDHC\b|\bMicroSDHC\b|\bMicroSDXC\b",
    r"\bUHS-I\b|\bUHS-II\b",
    r"\b\d{3,4}x\b",
    r"\bV\d+\b",
    r"Class\s?\d+",
    r"\b\d+MB\b",
    r"\b\d+\s?GB\b",
    r"\bAdapter\b",
    r"\bFlash\b",
    r"Pro|Ultra|Extreme",
];

const BRAND_PATTERN: &str =
    r"\b(intenso|lexar|logilink|pny|samsung|sandisk|kingston|sony|toshiba|transcend)\b";

const MODEL_PATTERNS: [&str; 4] = [
    r"\b([\(]*[\w]+[-]*[\d]+[-]*[\w]+[-]*[\d+]*|[\d]+[\w]|[\w][\d]+)",
    r"\b(datatraveler|extreme[p]?|exceria[p]?|dual[\s]*|evo|xqd|ssd|cruzer[\w+]*|glide|blade|basic|fit|force|basic line|jump\s?drive|hxs|rainbow|speed line|premium line|att4|attach|serie u|r-serie|beast|fury|impact|a400|sd[hx]c|uhs[i12][i1]*|note\s?9|ultra)",
    r"(thn-[a-z][\w]+|ljd[\w+][-][\w]+|ljd[sc][\w]+[-][\w]+|lsdmi[\d]+[\w]+|lsd[0-9]{1,3}[gb]+[\w]+|ljds[0-9]{2}[-][\w]+|usm[0-9]{1,3}[\w]+|sdsq[a-z]+[-][0-9]+[a-z]+[-][\w]+|sdsd[a-z]+[-][0-9]+[\w]+[-]*[\w]*|sdcz[\w]+|mk[\d]+|sr-g1[\w]+)",
    r"\b(c20[mc]|sda[0-9]{1,2}|g1ux|s[72][05]|[unm][23]02|p20|g4|dt101|se9|[asm][0-9]{2})",
];

const COLOR_PATTERN: &str = r"\b(black|white|red|blue|green|yellow|pink|purple|orange|brown|gray|grey|silver|gold|beige|ivory|turquoise|violet|navy|teal|maroon|burgundy|magenta|cyan|lime|olive)\b";

fn alias(canonical: &str, variants: &[&str]) -> Alias {
    Alias {
        canonical: canonical.to_string(),
        variants: variants.iter().map(|v| (*v).to_string()).collect(),
    }
}

fn catalog_aliases() -> Vec<Alias> {
    vec![
        alias("class", &["classe", "clase", "clas ", "klasse", "cl "]),
        alias("uhsi", &["uhs1", "uhs-i", "ultra high-speed"]),
        alias("type-c", &["typec", "type c", "usb-c", "usbc"]),
        alias("extreme", &["extrem"]),
        alias("att4", &["attach"]),
        alias("adapter", &["adapter", "adaptateur", "adaptador", "adattatore"]),
        alias(
            "memory",
            &[
                "memoria", "mémoire", "memória", "memory", "geheugen", "memoría", "menor", "mem",
                "memoire",
            ],
        ),
        alias(
            "flash drive",
            &[
                "usb stick",
                "usb flash drive",
                "pen drive",
                "usb drive",
                "flash drive",
                "flash disk",
                "usb flash",
                "usb-flash",
                "pendrive",
                "memory stick",
            ],
        ),
        alias(
            "hard drive",
            &[
                "harddisk",
                "hard disk",
                "hdd",
                "external drive",
                "external hard drive",
                "hard disk drive",
                "harddrive",
                "disk drive",
            ],
        ),
        alias(
            "ssd",
            &["solid state drive", "ssd drive", "solid-state drive", "ssd disk"],
        ),
        alias(
            "micro sd",
            &["microsd", "micro sd card", "micro sdxc", "micro sd hc", "micro sdhc"],
        ),
        alias(
            "sd card",
            &["sdcard", "sd card", "sd memory card", "sdhc", "sdxc", "secure digital card"],
        ),
        alias(
            "usb",
            &[
                "usb3", "usb2", "usb 3.0", "usb 2.0", "usb 3", "usb 2", "usb-c", "usbc", "type-c",
                "type c",
            ],
        ),
        alias("portable", &["portátil", "portatif", "portatile", "portabel", "tragbar"]),
        alias(
            "wireless",
            &["wireless", "sin cables", "sans fil", "kabellos", "draadloos", "senza fili"],
        ),
        alias(
            "charger",
            &["charging", "ladegerät", "chargeur", "caricatore", "lader", "charg"],
        ),
        alias(
            "camera",
            &[
                "camcorder", "kamera", "cámara", "caméra", "fotocamera", "videocamera", "webcam",
                "cam",
            ],
        ),
        alias(
            "lens",
            &["objective", "objektiv", "lente", "lentille", "objetivo", "linsen", "lins"],
        ),
        alias(
            "screen",
            &["display", "monitor", "scherm", "écran", "pantalla", "bildschirm"],
        ),
        alias(
            "battery",
            &["akku", "batteria", "batería", "batterie", "batterij", "bat"],
        ),
        alias(
            "phone",
            &[
                "smartphone",
                "telefono",
                "téléphone",
                "telefone",
                "handy",
                "mobiltelefon",
                "handtelefon",
                "cell phone",
            ],
        ),
        alias(
            "laptop",
            &[
                "notebook",
                "portátil",
                "ordinateur portable",
                "laptop",
                "tragbarer computer",
            ],
        ),
        alias(
            "tablet",
            &["tab", "slate", "pad", "pills", "tablette", "tableta", "tablet computer"],
        ),
    ]
}
