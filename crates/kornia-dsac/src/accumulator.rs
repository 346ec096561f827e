/// Added to the counts when averaging so that never-sampled points score zero.
pub const AVERAGE_EPSILON: f64 = 1e-10;

/// Running `(score-sum, count)` of every correspondence across sampled hypotheses.
///
/// A hypothesis credits its aggregate score to the correspondences it was *fitted on*,
/// so a point's average tells how well the hypotheses it took part in explained the
/// whole set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointScoreAccumulator {
    score_sums: Vec<f64>,
    counts: Vec<usize>,
}

impl PointScoreAccumulator {
    /// An empty accumulator over `n` correspondences.
    pub fn new(n: usize) -> Self {
        Self {
            score_sums: vec![0.0; n],
            counts: vec![0; n],
        }
    }

    /// Credit `score` to every index of `sample`.
    ///
    /// Indices must be below [`Self::len`].
    pub fn add(&mut self, sample: &[usize], score: f64) {
        for &i in sample {
            self.score_sums[i] += score;
            self.counts[i] += 1;
        }
    }

    /// Elementwise sum with another accumulator over the same correspondences.
    pub fn merge(&mut self, other: &Self) {
        debug_assert_eq!(self.len(), other.len());
        for (s, o) in self.score_sums.iter_mut().zip(other.score_sums.iter()) {
            *s += o;
        }
        for (c, o) in self.counts.iter_mut().zip(other.counts.iter()) {
            *c += o;
        }
    }

    /// Average score of every correspondence, `sum / (count + eps)`.
    pub fn averages(&self) -> Vec<f64> {
        self.score_sums
            .iter()
            .zip(self.counts.iter())
            .map(|(&s, &c)| s / (c as f64 + AVERAGE_EPSILON))
            .collect()
    }

    /// Accumulated score of every correspondence.
    pub fn score_sums(&self) -> &[f64] {
        &self.score_sums
    }

    /// Number of samples every correspondence took part in.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Number of correspondences tracked.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether no correspondence is tracked.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
