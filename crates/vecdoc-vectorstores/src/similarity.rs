use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vecdoc_core::VecDocError;

/// How two embeddings are compared. Higher scores always mean more similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMethod {
    /// Cosine of the angle between the vectors, in [-1, 1].
    #[default]
    Cosine,
    /// `1 / (1 + L2 distance)`, in (0, 1].
    Euclidean,
    /// Raw dot product, unbounded.
    Dot,
}

impl SimilarityMethod {
    /// Score `a` against `b`.
    ///
    /// Fails when the lengths differ or the result is not finite; the query
    /// engine treats either as a reason to skip the stored document.
    pub fn score(self, a: &[f64], b: &[f64]) -> Result<f64, VecDocError> {
        if a.len() != b.len() {
            return Err(VecDocError::DimensionMismatch {
                expected: a.len(),
                actual: b.len(),
            });
        }

        let score = match self {
            Self::Cosine => cosine_similarity(a, b),
            Self::Euclidean => euclidean_similarity(a, b),
            Self::Dot => dot_product(a, b),
        };

        if score.is_finite() {
            Ok(score)
        } else {
            Err(VecDocError::Validation(format!(
                "{self} similarity produced a non-finite score"
            )))
        }
    }
}

impl fmt::Display for SimilarityMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
            Self::Dot => "dot",
        })
    }
}

impl FromStr for SimilarityMethod {
    type Err = VecDocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "euclidean" => Ok(Self::Euclidean),
            "dot" => Ok(Self::Dot),
            other => Err(VecDocError::InvalidQuery(format!(
                "unknown similarity method '{other}'"
            ))),
        }
    }
}

/// Dot product of two equal-length vectors.
pub fn dot_product(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Cosine similarity; zero when either vector has zero magnitude.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let mag_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let mag_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot_product(a, b) / (mag_a * mag_b)
}

/// Euclidean distance mapped into (0, 1]; identical vectors score 1.
pub fn euclidean_similarity(a: &[f64], b: &[f64]) -> f64 {
    let distance = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt();
    1.0 / (1.0 + distance)
}
