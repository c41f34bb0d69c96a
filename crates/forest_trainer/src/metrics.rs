//! Binary classification metrics for fold evaluation

/// Area under the ROC curve.
///
/// Computed as the Mann-Whitney statistic with average ranks for tied
/// scores. `None` when `y_true` lacks either class.
pub fn roc_auc_score(y_true: &[u8], scores: &[f64]) -> Option<f64> {
    assert_eq!(y_true.len(), scores.len());

    let n_pos = y_true.iter().filter(|&&y| y == 1).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // 1-based ranks, ties share their average rank
    let mut rank_sum_pos = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            if y_true[idx] == 1 {
                rank_sum_pos += avg_rank;
            }
        }
        i = j + 1;
    }

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Some((rank_sum_pos - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Precision and recall when predicting positive for `score > threshold`.
///
/// Either value is 0.0 when its denominator is empty.
pub fn precision_recall_at(y_true: &[u8], scores: &[f64], threshold: f64) -> (f64, f64) {
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut fn_ = 0usize;

    for (&y, &s) in y_true.iter().zip(scores.iter()) {
        match (s > threshold, y == 1) {
            (true, true) => tp += 1,
            (true, false) => fp += 1,
            (false, true) => fn_ += 1,
            (false, false) => {}
        }
    }

    let precision = if tp + fp > 0 { tp as f64 / (tp + fp) as f64 } else { 0.0 };
    let recall = if tp + fn_ > 0 { tp as f64 / (tp + fn_) as f64 } else { 0.0 };
    (precision, recall)
}

/// Lowest swept threshold reaching a precision target
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OperatingPoint {
    /// Sweep step in `0..100`
    pub step: u32,
    pub threshold: f64,
    pub precision: f64,
    pub recall: f64,
}

/// Sweep thresholds 0.00..=0.99 and return the first with `precision >= min_precision`.
pub fn find_operating_point(y_true: &[u8], scores: &[f64], min_precision: f64) -> Option<OperatingPoint> {
    (0..100u32).find_map(|step| {
        let threshold = f64::from(step) / 100.0;
        let (precision, recall) = precision_recall_at(y_true, scores, threshold);
        (precision >= min_precision).then_some(OperatingPoint {
            step,
            threshold,
            precision,
            recall,
        })
    })
}
