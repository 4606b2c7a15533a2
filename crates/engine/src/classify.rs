//! Pair classification.
//!
//! Every strategy reduces a comparison vector to a total weight and a
//! three-way decision. Weights live here, not in the comparators: the
//! same similarity scores can be re-classified under different weight
//! estimates without re-comparing.

use reclink_core::LinkError;

use crate::config::{
    ClassifierConfig, ComparatorDef, KMeansConfig, Strategy, SupervisedConfig, ThresholdSumConfig,
    WeightsDef,
};
use crate::model::{ComparisonVector, Decision, Diagnostic};

pub enum Classifier {
    ThresholdSum(ThresholdSum),
    KMeans(KMeans),
    Supervised(Supervised),
}

impl Classifier {
    /// Builds the configured strategy. Comparator fields without explicit
    /// weights fall back to the defaults and are reported once each.
    pub fn from_config(
        config: &ClassifierConfig,
        comparators: &[ComparatorDef],
    ) -> Result<(Self, Vec<Diagnostic>), LinkError> {
        match config.strategy {
            Strategy::ThresholdSum => {
                let ts = config.threshold_sum.as_ref().ok_or_else(|| {
                    LinkError::ConfigValidation("threshold_sum section missing".into())
                })?;
                let (classifier, diagnostics) = ThresholdSum::from_config(ts, comparators);
                Ok((Self::ThresholdSum(classifier), diagnostics))
            }
            Strategy::Kmeans => {
                let km = config
                    .kmeans
                    .as_ref()
                    .ok_or_else(|| LinkError::ConfigValidation("kmeans section missing".into()))?;
                Ok((Self::KMeans(KMeans::from_config(km, comparators.len())), Vec::new()))
            }
            Strategy::Supervised => {
                let sv = config.supervised.as_ref().ok_or_else(|| {
                    LinkError::ConfigValidation("supervised section missing".into())
                })?;
                Ok((Self::Supervised(Supervised::from_config(sv)), Vec::new()))
            }
        }
    }

    /// Classifies a batch. Output order follows input order; the k-means
    /// strategy fits its centroids on the whole batch first.
    pub fn classify_all(
        &self,
        vectors: &[ComparisonVector],
    ) -> Result<Vec<(f64, Decision)>, LinkError> {
        match self {
            Self::ThresholdSum(c) => vectors.iter().map(|v| c.classify(v)).collect(),
            Self::Supervised(c) => vectors.iter().map(|v| c.classify(v)).collect(),
            Self::KMeans(c) => c.classify_all(vectors),
        }
    }
}

fn check_len(expected: usize, vector: &ComparisonVector) -> Result<(), LinkError> {
    if vector.len() != expected {
        return Err(LinkError::VectorLength {
            expected,
            got: vector.len(),
        });
    }
    Ok(())
}

fn decide(weight: f64, lower: f64, upper: f64) -> Decision {
    if weight >= upper {
        Decision::Match
    } else if weight <= lower {
        Decision::NonMatch
    } else {
        Decision::PossibleMatch
    }
}

// ---------------------------------------------------------------------------
// Threshold sum

pub struct ThresholdSum {
    /// Weights per comparator slot, in comparator order.
    weights: Vec<WeightsDef>,
    agree_band: f64,
    disagree_band: f64,
    lower: f64,
    upper: f64,
}

impl ThresholdSum {
    fn from_config(
        config: &ThresholdSumConfig,
        comparators: &[ComparatorDef],
    ) -> (Self, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let weights = comparators
            .iter()
            .map(|c| {
                match config.field_weights.iter().find(|fw| fw.field == c.field) {
                    Some(fw) => fw.weights,
                    None => {
                        diagnostics.push(Diagnostic::config(
                            &c.field,
                            "no weights configured, using defaults",
                        ));
                        config.default_weights
                    }
                }
            })
            .collect();
        (
            Self {
                weights,
                agree_band: config.agree_band,
                disagree_band: config.disagree_band,
                lower: config.lower,
                upper: config.upper,
            },
            diagnostics,
        )
    }

    pub fn classify(&self, vector: &ComparisonVector) -> Result<(f64, Decision), LinkError> {
        check_len(self.weights.len(), vector)?;
        let total: f64 = vector
            .scores
            .iter()
            .zip(&self.weights)
            .map(|(score, w)| self.slot_weight(*score, w))
            .sum();
        Ok((total, decide(total, self.lower, self.upper)))
    }

    /// Full agreement weight at or above the agree band, full disagreement
    /// weight at or below the disagree band, linear in between.
    fn slot_weight(&self, score: Option<f64>, w: &WeightsDef) -> f64 {
        match score {
            None => w.missing,
            Some(s) if s >= self.agree_band => w.agreement,
            Some(s) if s <= self.disagree_band => w.disagreement,
            Some(s) => {
                let t = (s - self.disagree_band) / (self.agree_band - self.disagree_band);
                w.disagreement + t * (w.agreement - w.disagreement)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// K-means clustering

pub struct KMeans {
    clusters: usize,
    iterations: usize,
    missing_point: f64,
    expected_len: usize,
}

impl KMeans {
    fn from_config(config: &KMeansConfig, comparator_count: usize) -> Self {
        Self {
            clusters: config.clusters,
            iterations: config.iterations,
            missing_point: config.missing_point,
            expected_len: comparator_count,
        }
    }

    /// Lloyd iterations seeded from the extreme corners of score space:
    /// all-ones (agreement), all-zeros (disagreement) and, with three
    /// clusters, the midpoint. Seeding and tie-breaks are fixed, so the
    /// outcome is a pure function of the batch.
    fn classify_all(
        &self,
        vectors: &[ComparisonVector],
    ) -> Result<Vec<(f64, Decision)>, LinkError> {
        for vector in vectors {
            check_len(self.expected_len, vector)?;
        }
        if vectors.is_empty() {
            return Ok(Vec::new());
        }

        let dim = self.expected_len;
        let points: Vec<Vec<f64>> = vectors
            .iter()
            .map(|v| {
                v.scores
                    .iter()
                    .map(|s| s.unwrap_or(self.missing_point))
                    .collect()
            })
            .collect();

        let mut centroids: Vec<Vec<f64>> = vec![vec![1.0; dim], vec![0.0; dim]];
        if self.clusters == 3 {
            centroids.push(vec![0.5; dim]);
        }

        let mut labels = vec![0usize; points.len()];
        for _ in 0..self.iterations {
            for (label, point) in labels.iter_mut().zip(&points) {
                *label = nearest(&centroids, point);
            }
            for (c, centroid) in centroids.iter_mut().enumerate() {
                let members: Vec<&Vec<f64>> = points
                    .iter()
                    .zip(&labels)
                    .filter(|(_, &l)| l == c)
                    .map(|(p, _)| p)
                    .collect();
                // An empty cluster keeps its centroid.
                if members.is_empty() {
                    continue;
                }
                for (d, slot) in centroid.iter_mut().enumerate() {
                    *slot = members.iter().map(|p| p[d]).sum::<f64>() / members.len() as f64;
                }
            }
        }

        // The cluster whose centroid ends nearest the all-agreement corner
        // is the match cluster, nearest all-disagreement is non-match, the
        // remaining one (three clusters) is possible.
        let ones = vec![1.0; dim];
        let zeros = vec![0.0; dim];
        let match_cluster = nearest_to(&centroids, &ones, None);
        let non_cluster = nearest_to(&centroids, &zeros, Some(match_cluster));
        let decisions: Vec<Decision> = (0..centroids.len())
            .map(|c| {
                if c == match_cluster {
                    Decision::Match
                } else if c == non_cluster {
                    Decision::NonMatch
                } else {
                    Decision::PossibleMatch
                }
            })
            .collect();

        Ok(points
            .iter()
            .zip(&labels)
            .map(|(point, &label)| {
                let weight = point.iter().sum::<f64>() / dim as f64;
                (weight, decisions[label])
            })
            .collect())
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest(centroids: &[Vec<f64>], point: &[f64]) -> usize {
    nearest_to(centroids, point, None)
}

fn nearest_to(centroids: &[Vec<f64>], point: &[f64], exclude: Option<usize>) -> usize {
    let mut best = usize::MAX;
    let mut best_dist = f64::INFINITY;
    for (c, centroid) in centroids.iter().enumerate() {
        if Some(c) == exclude {
            continue;
        }
        let dist = squared_distance(centroid, point);
        // Strict less-than keeps the lower cluster index on ties.
        if dist < best_dist {
            best = c;
            best_dist = dist;
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Supervised (apply-only)

pub struct Supervised {
    weights: Vec<f64>,
    bias: f64,
    lower: f64,
    upper: f64,
    missing_point: f64,
}

impl Supervised {
    fn from_config(config: &SupervisedConfig) -> Self {
        Self {
            weights: config.weights.clone(),
            bias: config.bias,
            lower: config.lower,
            upper: config.upper,
            missing_point: config.missing_point,
        }
    }

    pub fn classify(&self, vector: &ComparisonVector) -> Result<(f64, Decision), LinkError> {
        check_len(self.weights.len(), vector)?;
        let total: f64 = self.bias
            + vector
                .scores
                .iter()
                .zip(&self.weights)
                .map(|(score, w)| w * score.unwrap_or(self.missing_point))
                .sum::<f64>();
        Ok((total, decide(total, self.lower, self.upper)))
    }
}
