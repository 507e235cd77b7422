//! Reconstruction metrics of a candidate `w` against the true signal `w_true`.
//!
//! A coordinate is a "real non-zero" when `w_true[i] != 0` and "detected" when
//! `w[i] != 0`. Rates whose denominator would be zero are reported as 1.

use nalgebra::DVector;
use serde::Serialize;

/// Signal-to-noise ratio `‖w_true‖ / ‖w_true - w‖`, infinite for an exact match.
pub fn snr(w_true: &DVector<f64>, w: &DVector<f64>) -> f64 {
    let err = (w_true - w).norm();
    if err == 0.0 {
        return f64::INFINITY;
    }
    w_true.norm() / err
}

/// `10·log10(‖a‖² / ‖a - b‖²)`, infinite for an exact match.
pub fn snr_db(a: &DVector<f64>, b: &DVector<f64>) -> f64 {
    let err = (a - b).norm_squared();
    if err == 0.0 {
        return f64::INFINITY;
    }
    10.0 * (a.norm_squared() / err).log10()
}

/// Confusion counts between true and detected supports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Confusion {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    pub fn_: usize,
}

impl Confusion {
    pub fn new(w_true: &DVector<f64>, w: &DVector<f64>) -> Self {
        let mut c = Confusion::default();
        for (&t, &d) in w_true.iter().zip(w.iter()) {
            match (t != 0.0, d != 0.0) {
                (true, true) => c.tp += 1,
                (false, true) => c.fp += 1,
                (false, false) => c.tn += 1,
                (true, false) => c.fn_ += 1,
            }
        }
        c
    }

    /// Number of real non-zeros.
    pub fn positives(&self) -> usize {
        self.tp + self.fn_
    }

    /// Number of real zeros.
    pub fn negatives(&self) -> usize {
        self.fp + self.tn
    }

    pub fn tpr(&self) -> f64 {
        ratio_or_one(self.tp, self.positives())
    }

    pub fn fnr(&self) -> f64 {
        ratio_or_one(self.fn_, self.positives())
    }

    pub fn fpr(&self) -> f64 {
        ratio_or_one(self.fp, self.negatives())
    }

    pub fn tnr(&self) -> f64 {
        ratio_or_one(self.tn, self.negatives())
    }

    pub fn f1(&self) -> f64 {
        ratio_or_one(2 * self.tp, 2 * self.tp + self.fp + self.fn_)
    }
}

fn ratio_or_one(num: usize, den: usize) -> f64 {
    if den == 0 {
        1.0
    } else {
        num as f64 / den as f64
    }
}

/// False positive rate of the support of `w`.
pub fn fpr(w_true: &DVector<f64>, w: &DVector<f64>) -> f64 {
    Confusion::new(w_true, w).fpr()
}

/// False negative rate of the support of `w`.
pub fn fnr(w_true: &DVector<f64>, w: &DVector<f64>) -> f64 {
    Confusion::new(w_true, w).fnr()
}

/// Area under the ROC curve when `|w|` is used to rank coordinates against
/// the true support.
///
/// Computed as the Mann-Whitney statistic; tied scores count one half.
pub fn auc(w_true: &DVector<f64>, w: &DVector<f64>) -> f64 {
    let mut scored: Vec<(f64, bool)> = w
        .iter()
        .zip(w_true.iter())
        .map(|(&s, &t)| (s.abs(), t != 0.0))
        .collect();
    let n_pos = scored.iter().filter(|(_, p)| *p).count();
    let n_neg = scored.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 1.0;
    }

    scored.sort_by(|a, b| a.0.total_cmp(&b.0));

    // Sum of (average) ranks of the positives, ranks starting at 1.
    let mut rank_sum = 0.0;
    let mut i = 0;
    while i < scored.len() {
        let mut j = i;
        while j + 1 < scored.len() && scored[j + 1].0 == scored[i].0 {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        rank_sum += avg_rank * scored[i..=j].iter().filter(|(_, p)| *p).count() as f64;
        i = j + 1;
    }

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    (rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg)
}

/// All support statistics reported by the objective.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SupportStats {
    pub w_snr: f64,
    pub xw_snr: f64,
    pub tpr: f64,
    pub fpr: f64,
    pub tnr: f64,
    pub fnr: f64,
    pub f1s: f64,
    pub auc: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: &[f64]) -> DVector<f64> {
        DVector::from_vec(x.to_vec())
    }

    #[test]
    fn test_snr_exact_is_infinite() {
        let w = v(&[1.0, 0.0, 2.0]);
        assert!(snr(&w, &w).is_infinite());
        assert!(snr_db(&w, &w).is_infinite());
    }

    #[test]
    fn test_snr_db_value() {
        let w_true = v(&[3.0, 4.0]);
        let w = v(&[3.0, 3.5]);
        // ‖w_true‖² = 25, ‖err‖² = 0.25 -> 10 log10(100) = 20
        assert!((snr_db(&w_true, &w) - 20.0).abs() < 1e-12);
        assert!((snr(&w_true, &w) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_confusion_rates() {
        let w_true = v(&[1.0, 1.0, 0.0, 0.0, 0.0]);
        let w = v(&[1.0, 0.0, 2.0, 0.0, 0.0]);
        let c = Confusion::new(&w_true, &w);
        assert_eq!(c, Confusion { tp: 1, fp: 1, tn: 2, fn_: 1 });
        assert_eq!(c.tpr(), 0.5);
        assert_eq!(c.fnr(), 0.5);
        assert!((c.fpr() - 1.0 / 3.0).abs() < 1e-15);
        assert!((c.tnr() - 2.0 / 3.0).abs() < 1e-15);
        assert_eq!(c.f1(), 0.5);
    }

    #[test]
    fn test_rates_with_empty_classes() {
        let zeros = v(&[0.0, 0.0]);
        let w = v(&[1.0, 0.0]);
        assert_eq!(fnr(&zeros, &w), 1.0);
        assert_eq!(fpr(&zeros, &w), 0.5);
        let full = v(&[1.0, 1.0]);
        assert_eq!(fpr(&full, &w), 1.0);
    }

    #[test]
    fn test_auc_perfect_and_reversed() {
        let w_true = v(&[1.0, 0.0, 1.0, 0.0]);
        assert_eq!(auc(&w_true, &v(&[0.9, 0.1, -0.8, 0.0])), 1.0);
        assert_eq!(auc(&w_true, &v(&[0.0, 0.9, 0.1, 0.8])), 0.0);
    }

    #[test]
    fn test_auc_ties_count_half() {
        let w_true = v(&[1.0, 0.0]);
        assert_eq!(auc(&w_true, &v(&[0.0, 0.0])), 0.5);
        assert_eq!(auc(&v(&[0.0, 0.0]), &v(&[1.0, 0.0])), 1.0);
    }
}
