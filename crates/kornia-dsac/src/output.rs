use kornia_epipolar::scoring::SoftInlierScores;
use kornia_epipolar::solver::Hypothesis;

use crate::accumulator::PointScoreAccumulator;

/// A sampled hypothesis and its soft inlier count over the full correspondence set.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredHypothesis {
    /// The fitted model and the sample it was fitted on.
    pub hypothesis: Hypothesis,
    /// Aggregate soft inlier score.
    pub score: f64,
    /// The solver rejected the sample. The matrix is zero and the score is `0`.
    pub degenerate: bool,
}

/// Result of one estimation call.
#[derive(Debug, Clone)]
pub struct DsacOutput {
    /// Highest scoring hypothesis, the first one on ties.
    pub best: Hypothesis,
    /// Score of `best`.
    pub best_score: f64,
    /// Per-point soft inlier weights under `best`.
    pub best_inlier_scores: SoftInlierScores,
    /// Every sampled hypothesis, in sampling order.
    pub hypotheses: Vec<ScoredHypothesis>,
    /// Per-point score sums and sample counts.
    pub accumulator: PointScoreAccumulator,
    /// Per-point average score, see [`PointScoreAccumulator::averages`].
    pub point_scores: Vec<f64>,
}

impl DsacOutput {
    /// Probability of selecting each hypothesis, `softmax(alpha * score)`.
    pub fn hypothesis_distribution(&self, alpha: f64) -> Vec<f64> {
        softmax(self.hypotheses.iter().map(|h| alpha * h.score))
    }

    /// Expected task loss under [`Self::hypothesis_distribution`].
    ///
    /// This is the smooth counterpart of evaluating `loss` on the best hypothesis only.
    pub fn expected_loss<F>(&self, alpha: f64, loss: F) -> f64
    where
        F: FnMut(&ScoredHypothesis) -> f64,
    {
        let losses = self.hypotheses.iter().map(loss).collect::<Vec<_>>();
        self.hypothesis_distribution(alpha)
            .iter()
            .zip(losses.iter())
            .map(|(p, l)| p * l)
            .sum()
    }

    /// Gradient of [`Self::expected_loss`] with respect to every hypothesis score,
    /// `alpha * p_j * (loss_j - E[loss])`.
    pub fn expected_loss_gradients<F>(&self, alpha: f64, loss: F) -> Vec<f64>
    where
        F: FnMut(&ScoredHypothesis) -> f64,
    {
        let losses = self.hypotheses.iter().map(loss).collect::<Vec<_>>();
        let probs = self.hypothesis_distribution(alpha);
        let expected: f64 = probs.iter().zip(losses.iter()).map(|(p, l)| p * l).sum();
        probs
            .iter()
            .zip(losses.iter())
            .map(|(p, l)| alpha * p * (l - expected))
            .collect()
    }

    /// Hard inlier mask of the best hypothesis, `distance < threshold`.
    pub fn best_inliers(&self, threshold: f64) -> Vec<bool> {
        self.best_inlier_scores.inlier_mask(threshold)
    }
}

fn softmax(logits: impl Iterator<Item = f64>) -> Vec<f64> {
    let logits = logits.collect::<Vec<_>>();
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps = logits.iter().map(|l| (l - max).exp()).collect::<Vec<_>>();
    let sum: f64 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}
