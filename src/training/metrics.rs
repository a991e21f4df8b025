//! Classification metrics

use crate::error::{DropoutError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Confusion counts for one label treated as positive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Counts {
    tp: usize,
    fp: usize,
    fn_: usize,
}

impl Counts {
    fn for_label(y_true: &Array1<i64>, y_pred: &Array1<i64>, label: i64) -> Self {
        let mut counts = Counts::default();
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (t == label, p == label) {
                (true, true) => counts.tp += 1,
                (false, true) => counts.fp += 1,
                (true, false) => counts.fn_ += 1,
                (false, false) => {}
            }
        }
        counts
    }

    fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    fn fbeta(&self, beta: f64) -> f64 {
        let b2 = beta * beta;
        let denom = (1.0 + b2) * self.tp as f64 + b2 * self.fn_ as f64 + self.fp as f64;
        if denom == 0.0 {
            0.0
        } else {
            (1.0 + b2) * self.tp as f64 / denom
        }
    }
}

/// Zero when the denominator is zero
fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

fn check_lengths(y_true: &Array1<i64>, y_pred: &Array1<i64>) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(DropoutError::ShapeError {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }
    Ok(())
}

/// F-beta score of the positive class (`1`). Undefined ratios score 0.
pub fn fbeta_score(y_true: &Array1<i64>, y_pred: &Array1<i64>, beta: f64) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    if !(beta.is_finite() && beta > 0.0) {
        return Err(DropoutError::InvalidParameter {
            name: "beta".to_string(),
            value: beta.to_string(),
            reason: "must be positive".to_string(),
        });
    }
    Ok(Counts::for_label(y_true, y_pred, 1).fbeta(beta))
}

pub fn accuracy_score(y_true: &Array1<i64>, y_pred: &Array1<i64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let correct = y_true.iter().zip(y_pred.iter()).filter(|(t, p)| t == p).count();
    Ok(ratio(correct, y_true.len()))
}

/// Precision, recall, F1 and support of one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class report with accuracy and macro / weighted averages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    /// Build a report over every label present in either vector, sorted
    pub fn new(y_true: &Array1<i64>, y_pred: &Array1<i64>) -> Result<Self> {
        check_lengths(y_true, y_pred)?;

        let mut labels: Vec<i64> = y_true.iter().chain(y_pred.iter()).copied().collect();
        labels.sort_unstable();
        labels.dedup();

        let classes: Vec<ClassMetrics> = labels
            .iter()
            .map(|&label| {
                let counts = Counts::for_label(y_true, y_pred, label);
                ClassMetrics {
                    label: label.to_string(),
                    precision: counts.precision(),
                    recall: counts.recall(),
                    f1: counts.fbeta(1.0),
                    support: counts.tp + counts.fn_,
                }
            })
            .collect();

        let total: usize = classes.iter().map(|c| c.support).sum();
        let n_classes = classes.len().max(1) as f64;
        let average = |label: &str, weight: &dyn Fn(&ClassMetrics) -> f64| {
            let w_sum: f64 = classes.iter().map(weight).sum();
            let mean = |f: fn(&ClassMetrics) -> f64| {
                if w_sum == 0.0 {
                    0.0
                } else {
                    classes.iter().map(|c| weight(c) * f(c)).sum::<f64>() / w_sum
                }
            };
            ClassMetrics {
                label: label.to_string(),
                precision: mean(|c| c.precision),
                recall: mean(|c| c.recall),
                f1: mean(|c| c.f1),
                support: total,
            }
        };

        let macro_avg = average("macro avg", &|_| 1.0 / n_classes);
        let weighted_avg = average("weighted avg", &|c| c.support as f64);

        Ok(Self {
            accuracy: accuracy_score(y_true, y_pred)?,
            classes,
            macro_avg,
            weighted_avg,
        })
    }

    /// Metrics of one class by label
    pub fn class(&self, label: &str) -> Option<&ClassMetrics> {
        self.classes.iter().find(|c| c.label == label)
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let row = |f: &mut fmt::Formatter<'_>, m: &ClassMetrics| {
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                m.label, m.precision, m.recall, m.f1, m.support
            )
        };

        writeln!(f, "{:>12} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for class in &self.classes {
            row(f, class)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        row(f, &self.macro_avg)?;
        row(f, &self.weighted_avg)
    }
}
