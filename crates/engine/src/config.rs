//! Run configuration, parsed from TOML.
//!
//! Index and comparator methods are resolved to enum variants during
//! deserialization, so a misspelled method name fails at parse time and
//! the pipeline never does string dispatch per pair.

use reclink_core::LinkError;
use reclink_compare::string::GramCoefficient;
use reclink_compare::PhoneticCode;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// One dataset compared against itself.
    Dedup,
    /// Two datasets compared across.
    Link,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dedup => "dedup",
            Self::Link => "link",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    pub name: String,
    pub mode: Mode,
    #[serde(rename = "index", default)]
    pub indexes: Vec<IndexDef>,
    #[serde(rename = "comparator", default)]
    pub comparators: Vec<ComparatorDef>,
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub assignment: AssignmentConfig,
    #[serde(default)]
    pub parallel: ParallelConfig,
}

// ---------------------------------------------------------------------------
// Indexing

#[derive(Debug, Clone, Deserialize)]
pub struct IndexDef {
    pub name: String,
    /// Fields whose normalized values form the blocking key.
    pub fields: Vec<String>,
    #[serde(flatten)]
    pub method: IndexMethod,
    pub fallback: Option<FallbackConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum IndexMethod {
    Exact,
    Prefix {
        len: usize,
    },
    Phonetic {
        code: PhoneticCode,
        #[serde(default = "default_code_len")]
        max_len: usize,
    },
    /// Sorted q-gram sublist blocking: records land in every bucket formed
    /// by dropping grams down to `ceil(threshold * n)` of the n key grams.
    Qgram {
        q: usize,
        threshold: f64,
    },
    SortedNeighbourhood {
        window: usize,
    },
    Canopy {
        q: usize,
        threshold: f64,
    },
}

/// Cap on block size, with the policy applied when a block exceeds it.
#[derive(Debug, Clone, Deserialize)]
pub struct FallbackConfig {
    pub max_block_size: usize,
    #[serde(flatten)]
    pub policy: FallbackPolicy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Re-block the oversize block on a secondary field.
    Split { discriminator: String },
    /// Keep a deterministic systematic sample of the block's pairs.
    Sample { max_pairs: usize },
}

// ---------------------------------------------------------------------------
// Comparison

#[derive(Debug, Clone, Deserialize)]
pub struct ComparatorDef {
    pub field: String,
    #[serde(flatten)]
    pub method: CompareMethod,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum CompareMethod {
    Exact,
    Truncate {
        len: usize,
    },
    EditDistance,
    Jaro,
    JaroWinkler {
        #[serde(default = "default_max_prefix")]
        max_prefix: usize,
        #[serde(default = "default_prefix_scale")]
        scale: f64,
    },
    Qgram {
        #[serde(default = "default_q")]
        q: usize,
        #[serde(default = "default_coefficient")]
        coefficient: GramCoefficient,
    },
    Lcs,
    Phonetic {
        code: PhoneticCode,
        #[serde(default = "default_code_len")]
        max_len: usize,
        /// Score raw strings by edit similarity when the codes differ.
        #[serde(default)]
        edit_fallback: bool,
    },
    KeyDiff {
        max_diff: usize,
    },
    NumericAbs {
        tolerance: f64,
    },
    NumericPerc {
        max_percent: f64,
    },
    DateComponents,
    DayWindow {
        max_left_before_right: u32,
        max_right_before_left: u32,
    },
    AgeDecay {
        half_life_days: f64,
    },
}

// ---------------------------------------------------------------------------
// Classification

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    ThresholdSum,
    Kmeans,
    Supervised,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    pub strategy: Strategy,
    pub threshold_sum: Option<ThresholdSumConfig>,
    pub kmeans: Option<KMeansConfig>,
    pub supervised: Option<SupervisedConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdSumConfig {
    pub lower: f64,
    pub upper: f64,
    /// Scores at or above this take the full agreement weight.
    #[serde(default = "default_agree_band")]
    pub agree_band: f64,
    /// Scores at or below this take the full disagreement weight.
    #[serde(default)]
    pub disagree_band: f64,
    #[serde(default = "default_weights")]
    pub default_weights: WeightsDef,
    #[serde(rename = "weights", default)]
    pub field_weights: Vec<FieldWeightsDef>,
}

/// Agreement / disagreement / missing weights for one field, typically
/// log2(m/u), log2((1-m)/(1-u)) and 0 from an m-u estimation step.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WeightsDef {
    pub agreement: f64,
    pub disagreement: f64,
    #[serde(default)]
    pub missing: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldWeightsDef {
    pub field: String,
    #[serde(flatten)]
    pub weights: WeightsDef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KMeansConfig {
    #[serde(default = "default_clusters")]
    pub clusters: usize,
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    /// Imputed coordinate for missing scores.
    #[serde(default = "default_missing_point")]
    pub missing_point: f64,
}

/// Pre-fitted linear model, applied only. Fitting happens elsewhere.
#[derive(Debug, Clone, Deserialize)]
pub struct SupervisedConfig {
    pub weights: Vec<f64>,
    #[serde(default)]
    pub bias: f64,
    pub lower: f64,
    pub upper: f64,
    #[serde(default = "default_missing_point")]
    pub missing_point: f64,
}

// ---------------------------------------------------------------------------
// Assignment and parallelism

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AssignmentConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Minimum pair weight for an edge to enter the assignment problem.
    #[serde(default)]
    pub threshold: f64,
    /// Also admit possible matches as edges.
    #[serde(default)]
    pub include_possible: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ParallelConfig {
    /// Worker thread count; 0 lets the pool pick.
    #[serde(default)]
    pub workers: usize,
}

fn default_code_len() -> usize {
    4
}
fn default_max_prefix() -> usize {
    4
}
fn default_prefix_scale() -> f64 {
    0.1
}
fn default_q() -> usize {
    2
}
fn default_coefficient() -> GramCoefficient {
    GramCoefficient::Dice
}
fn default_agree_band() -> f64 {
    1.0
}
fn default_weights() -> WeightsDef {
    WeightsDef {
        agreement: 1.0,
        disagreement: -1.0,
        missing: 0.0,
    }
}
fn default_clusters() -> usize {
    2
}
fn default_iterations() -> usize {
    20
}
fn default_missing_point() -> f64 {
    0.5
}

impl LinkConfig {
    pub fn from_toml(text: &str) -> Result<Self, LinkError> {
        let config: LinkConfig =
            toml::from_str(text).map_err(|e| LinkError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LinkError> {
        if self.name.trim().is_empty() {
            return Err(LinkError::ConfigValidation("name must not be empty".into()));
        }
        if self.indexes.is_empty() {
            return Err(LinkError::ConfigValidation(
                "at least one index is required".into(),
            ));
        }
        if self.comparators.is_empty() {
            return Err(LinkError::ConfigValidation(
                "at least one comparator is required".into(),
            ));
        }
        for index in &self.indexes {
            index.validate()?;
        }
        for comparator in &self.comparators {
            comparator.validate()?;
        }
        self.classifier.validate(&self.comparators)?;
        if self.assignment.enabled {
            if self.mode == Mode::Dedup {
                return Err(LinkError::ConfigValidation(
                    "assignment requires link mode; dedup runs emit classified pairs only".into(),
                ));
            }
            if !self.assignment.threshold.is_finite() {
                return Err(LinkError::ConfigValidation(
                    "assignment.threshold must be finite".into(),
                ));
            }
        }
        Ok(())
    }

    /// Comparator fields in configured order.
    pub fn comparator_fields(&self) -> Vec<&str> {
        self.comparators.iter().map(|c| c.field.as_str()).collect()
    }
}

impl IndexDef {
    fn validate(&self) -> Result<(), LinkError> {
        let at = |msg: String| LinkError::ConfigValidation(format!("index '{}': {msg}", self.name));
        if self.fields.is_empty() {
            return Err(at("fields must not be empty".into()));
        }
        match &self.method {
            IndexMethod::Exact => {}
            IndexMethod::Prefix { len } => {
                if *len == 0 {
                    return Err(at("prefix len must be at least 1".into()));
                }
            }
            IndexMethod::Phonetic { max_len, .. } => {
                if *max_len == 0 {
                    return Err(at("phonetic max_len must be at least 1".into()));
                }
            }
            IndexMethod::Qgram { q, threshold } | IndexMethod::Canopy { q, threshold } => {
                if *q == 0 {
                    return Err(at("q must be at least 1".into()));
                }
                if !(*threshold > 0.0 && *threshold <= 1.0) {
                    return Err(at(format!("threshold {threshold} must be in (0, 1]")));
                }
            }
            IndexMethod::SortedNeighbourhood { window } => {
                if *window < 2 {
                    return Err(at("window must be at least 2".into()));
                }
            }
        }
        if let Some(fallback) = &self.fallback {
            if fallback.max_block_size < 2 {
                return Err(at("fallback max_block_size must be at least 2".into()));
            }
            match &fallback.policy {
                FallbackPolicy::Split { discriminator } => {
                    if discriminator.trim().is_empty() {
                        return Err(at("fallback discriminator must not be empty".into()));
                    }
                }
                FallbackPolicy::Sample { max_pairs } => {
                    if *max_pairs == 0 {
                        return Err(at("fallback max_pairs must be at least 1".into()));
                    }
                }
            }
        }
        Ok(())
    }
}

impl ComparatorDef {
    fn validate(&self) -> Result<(), LinkError> {
        let at =
            |msg: String| LinkError::ConfigValidation(format!("comparator '{}': {msg}", self.field));
        match &self.method {
            CompareMethod::Truncate { len } => {
                if *len == 0 {
                    return Err(at("truncate len must be at least 1".into()));
                }
            }
            CompareMethod::JaroWinkler { max_prefix, scale } => {
                if *scale <= 0.0 || *max_prefix as f64 * *scale > 1.0 {
                    return Err(at(format!(
                        "max_prefix {max_prefix} * scale {scale} must stay within (0, 1]"
                    )));
                }
            }
            CompareMethod::Qgram { q, .. } => {
                if *q == 0 {
                    return Err(at("q must be at least 1".into()));
                }
            }
            CompareMethod::Phonetic { max_len, .. } => {
                if *max_len == 0 {
                    return Err(at("phonetic max_len must be at least 1".into()));
                }
            }
            CompareMethod::KeyDiff { max_diff } => {
                if *max_diff == 0 {
                    return Err(at("max_diff must be at least 1".into()));
                }
            }
            CompareMethod::NumericAbs { tolerance } => {
                if !(*tolerance >= 0.0) {
                    return Err(at(format!("tolerance {tolerance} must be non-negative")));
                }
            }
            CompareMethod::NumericPerc { max_percent } => {
                if !(*max_percent >= 0.0 && *max_percent <= 100.0) {
                    return Err(at(format!("max_percent {max_percent} must be in [0, 100]")));
                }
            }
            CompareMethod::AgeDecay { half_life_days } => {
                if !(*half_life_days > 0.0) {
                    return Err(at(format!("half_life_days {half_life_days} must be positive")));
                }
            }
            CompareMethod::Exact
            | CompareMethod::EditDistance
            | CompareMethod::Jaro
            | CompareMethod::Lcs
            | CompareMethod::DateComponents
            | CompareMethod::DayWindow { .. } => {}
        }
        Ok(())
    }
}

impl ClassifierConfig {
    fn validate(&self, comparators: &[ComparatorDef]) -> Result<(), LinkError> {
        match self.strategy {
            Strategy::ThresholdSum => {
                let Some(ts) = &self.threshold_sum else {
                    return Err(LinkError::ConfigValidation(
                        "strategy threshold_sum needs a [classifier.threshold_sum] section".into(),
                    ));
                };
                ts.validate(comparators)
            }
            Strategy::Kmeans => {
                let Some(km) = &self.kmeans else {
                    return Err(LinkError::ConfigValidation(
                        "strategy kmeans needs a [classifier.kmeans] section".into(),
                    ));
                };
                km.validate()
            }
            Strategy::Supervised => {
                let Some(sv) = &self.supervised else {
                    return Err(LinkError::ConfigValidation(
                        "strategy supervised needs a [classifier.supervised] section".into(),
                    ));
                };
                sv.validate(comparators.len())
            }
        }
    }
}

impl ThresholdSumConfig {
    fn validate(&self, comparators: &[ComparatorDef]) -> Result<(), LinkError> {
        if self.lower >= self.upper {
            return Err(LinkError::ThresholdOrder {
                lower: self.lower,
                upper: self.upper,
            });
        }
        if !(self.disagree_band >= 0.0
            && self.agree_band <= 1.0
            && self.disagree_band < self.agree_band)
        {
            return Err(LinkError::ConfigValidation(format!(
                "bands ({}, {}) must satisfy 0 <= disagree_band < agree_band <= 1",
                self.disagree_band, self.agree_band
            )));
        }
        for fw in std::iter::once(&self.default_weights)
            .chain(self.field_weights.iter().map(|f| &f.weights))
        {
            if fw.agreement <= fw.disagreement {
                return Err(LinkError::ConfigValidation(format!(
                    "agreement weight {} must exceed disagreement weight {}",
                    fw.agreement, fw.disagreement
                )));
            }
        }
        for fw in &self.field_weights {
            if !comparators.iter().any(|c| c.field == fw.field) {
                return Err(LinkError::ConfigValidation(format!(
                    "weights reference field '{}' which has no comparator",
                    fw.field
                )));
            }
        }
        Ok(())
    }
}

impl KMeansConfig {
    fn validate(&self) -> Result<(), LinkError> {
        if !(self.clusters == 2 || self.clusters == 3) {
            return Err(LinkError::ConfigValidation(format!(
                "kmeans clusters must be 2 or 3, got {}",
                self.clusters
            )));
        }
        if self.iterations == 0 {
            return Err(LinkError::ConfigValidation(
                "kmeans iterations must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.missing_point) {
            return Err(LinkError::ConfigValidation(format!(
                "kmeans missing_point {} must be in [0, 1]",
                self.missing_point
            )));
        }
        Ok(())
    }
}

impl SupervisedConfig {
    fn validate(&self, comparator_count: usize) -> Result<(), LinkError> {
        if self.weights.len() != comparator_count {
            return Err(LinkError::VectorLength {
                expected: comparator_count,
                got: self.weights.len(),
            });
        }
        if self.lower >= self.upper {
            return Err(LinkError::ThresholdOrder {
                lower: self.lower,
                upper: self.upper,
            });
        }
        if !(0.0..=1.0).contains(&self.missing_point) {
            return Err(LinkError::ConfigValidation(format!(
                "supervised missing_point {} must be in [0, 1]",
                self.missing_point
            )));
        }
        Ok(())
    }
}
