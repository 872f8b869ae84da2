//! Boundary between the encoder and the (opaque) classifier.
//!
//! Whatever the classifier does wrong, including panicking, comes back as one
//! [`PredictionError`]; nothing partial escapes.

use std::panic::{self, AssertUnwindSafe};

use crate::encoding::FeatureVector;
use crate::error::PredictionError;
use crate::model::Classifier;
use crate::schema::{ClassProbabilities, Label};

/// |p0 + p1 - 1| must stay under this.
pub const PROBA_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: Label,
    pub probabilities: ClassProbabilities,
}

impl Prediction {
    #[inline]
    pub fn churn_probability(&self) -> f64 {
        self.probabilities.churn
    }

    /// Probability of the predicted class.
    #[inline]
    pub fn label_probability(&self) -> f64 {
        match self.label {
            Label::Churn => self.probabilities.churn,
            Label::NoChurn => self.probabilities.no_churn,
        }
    }
}

pub fn predict(clf: &dyn Classifier, row: &FeatureVector) -> Result<Prediction, PredictionError> {
    let x = row.as_slice();
    if clf.n_features() != x.len() {
        return Err(PredictionError::ShapeMismatch {
            expected: clf.n_features(),
            got: x.len(),
        });
    }

    let out = panic::catch_unwind(AssertUnwindSafe(|| {
        let label = clf.predict(x)?;
        let proba = clf.predict_proba(x)?;
        Ok::<_, PredictionError>((label, proba))
    }));

    let (label, [p0, p1]) = match out {
        Ok(r) => r?,
        Err(payload) => return Err(PredictionError::Panicked(panic_message(payload.as_ref()))),
    };

    if !p0.is_finite() || !p1.is_finite() {
        return Err(PredictionError::NonFinite);
    }
    let sum = p0 + p1;
    if (sum - 1.0).abs() > PROBA_TOLERANCE || p0 < 0.0 || p1 < 0.0 {
        return Err(PredictionError::InvalidDistribution { sum });
    }

    Ok(Prediction {
        label,
        probabilities: ClassProbabilities {
            no_churn: p0,
            churn: p1,
        },
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
