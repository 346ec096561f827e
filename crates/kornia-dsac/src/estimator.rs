use std::borrow::Cow;

use glam::{DMat3, DVec2};
use kornia_epipolar::primitives::{calibration_inverse, transform_points};
use kornia_epipolar::scoring::{point_distances, SoftInlierScores};
use kornia_epipolar::solver::{fit_sample, GeometryModel, Hypothesis, SolverOptions};
use rand::prelude::*;
use rayon::prelude::*;

use crate::accumulator::PointScoreAccumulator;
use crate::config::DsacConfig;
use crate::error::DsacError;
use crate::output::{DsacOutput, ScoredHypothesis};

/// Differentiable sample consensus estimator.
///
/// Each call samples [`DsacConfig::hypotheses`] minimal subsets, fits a model to each,
/// scores it by its soft inlier count over all correspondences and credits the score to
/// the sampled points. All per-call state lives in the call, so one estimator can be
/// shared across threads.
///
/// Distances are measured on the points as given: an essential model with a calibration
/// is fitted in calibrated coordinates but scored in pixels.
#[derive(Debug, Clone)]
pub struct Dsac {
    config: DsacConfig,
    calibration_inv: Option<DMat3>,
}

/// Points as scored (pixels) and as fitted (calibrated for essential models).
struct Prepared<'a> {
    x1: &'a [DVec2],
    x2: &'a [DVec2],
    fit_x1: Cow<'a, [DVec2]>,
    fit_x2: Cow<'a, [DVec2]>,
}

impl Dsac {
    /// Create an estimator, validating the configuration.
    pub fn new(config: DsacConfig) -> Result<Self, DsacError> {
        config.validate()?;
        let calibration_inv = match config.calibration_matrix() {
            Some(k) => Some(calibration_inverse(&k)?),
            None => None,
        };
        Ok(Self {
            config,
            calibration_inv,
        })
    }

    /// The configuration of this estimator.
    pub fn config(&self) -> &DsacConfig {
        &self.config
    }

    /// Run the estimator sequentially, drawing samples from `rng`.
    pub fn run<R: Rng + ?Sized>(
        &self,
        x1: &[DVec2],
        x2: &[DVec2],
        rng: &mut R,
    ) -> Result<DsacOutput, DsacError> {
        let prepared = self.prepare(x1, x2)?;
        let samples = self.draw_samples(prepared.x1.len(), rng);
        let scored = samples
            .into_iter()
            .map(|sample| self.evaluate(&prepared, sample))
            .collect::<Vec<_>>();
        let accumulator = accumulate(prepared.x1.len(), &scored);
        self.finalize(&prepared, scored, accumulator)
    }

    /// Run the estimator with hypotheses evaluated on the rayon thread pool.
    ///
    /// Samples are drawn up front from `rng` in the same order as [`Self::run`], so both
    /// sample, fit and select the same hypotheses for the same generator state. Per-point
    /// scores are accumulated over fixed chunks of hypotheses and merged in order, so the
    /// averages match [`Self::run`] up to floating point rounding.
    pub fn run_parallel<R: Rng + ?Sized>(
        &self,
        x1: &[DVec2],
        x2: &[DVec2],
        rng: &mut R,
    ) -> Result<DsacOutput, DsacError> {
        let prepared = self.prepare(x1, x2)?;
        let samples = self.draw_samples(prepared.x1.len(), rng);
        let scored = samples
            .into_par_iter()
            .map(|sample| self.evaluate(&prepared, sample))
            .collect::<Vec<_>>();

        let n = prepared.x1.len();
        let accumulator = scored
            .par_chunks(ACCUMULATOR_CHUNK)
            .map(|chunk| accumulate(n, chunk))
            .collect::<Vec<_>>()
            .into_iter()
            .fold(PointScoreAccumulator::new(n), |mut acc, partial| {
                acc.merge(&partial);
                acc
            });
        self.finalize(&prepared, scored, accumulator)
    }

    /// Run the estimator with a generator seeded from [`DsacConfig::random_seed`].
    pub fn run_seeded(&self, x1: &[DVec2], x2: &[DVec2]) -> Result<DsacOutput, DsacError> {
        let mut rng = match self.config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => {
                let mut tr = rand::rng();
                StdRng::from_rng(&mut tr)
            }
        };
        self.run(x1, x2, &mut rng)
    }

    fn prepare<'a>(&self, x1: &'a [DVec2], x2: &'a [DVec2]) -> Result<Prepared<'a>, DsacError> {
        if x1.len() != x2.len() {
            return Err(DsacError::MismatchedLengths {
                left_name: "points in view 1",
                left_len: x1.len(),
                right_name: "points in view 2",
                right_len: x2.len(),
            });
        }
        if x1.len() < self.config.sample_size {
            return Err(DsacError::InsufficientCorrespondences {
                required: self.config.sample_size,
                actual: x1.len(),
            });
        }

        let (fit_x1, fit_x2) = match (self.config.model, &self.calibration_inv) {
            (GeometryModel::Essential, Some(k_inv)) => (
                Cow::Owned(transform_points(k_inv, x1)?),
                Cow::Owned(transform_points(k_inv, x2)?),
            ),
            _ => (Cow::Borrowed(x1), Cow::Borrowed(x2)),
        };
        Ok(Prepared {
            x1,
            x2,
            fit_x1,
            fit_x2,
        })
    }

    /// Soft inlier scores of a hypothesis, with distances in the units of the input points.
    ///
    /// Calibrated essential matrices are scored through `F = K^-T E K^-1`.
    fn score(&self, prepared: &Prepared<'_>, hypothesis: &Hypothesis) -> SoftInlierScores {
        let (model, matrix) = match (hypothesis.model, &self.calibration_inv) {
            (GeometryModel::Essential, Some(k_inv)) => (
                GeometryModel::Fundamental,
                k_inv.transpose() * hypothesis.matrix * *k_inv,
            ),
            (model, _) => (model, hypothesis.matrix),
        };
        let distances = point_distances(model, &matrix, prepared.x1, prepared.x2);
        SoftInlierScores::from_distances(
            distances,
            self.config.inlier_threshold,
            self.config.inlier_beta,
        )
    }

    fn draw_samples<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<Vec<usize>> {
        (0..self.config.hypotheses)
            .map(|_| rand::seq::index::sample(rng, n, self.config.sample_size).into_vec())
            .collect()
    }

    fn evaluate(&self, prepared: &Prepared<'_>, sample: Vec<usize>) -> ScoredHypothesis {
        // points are already calibrated by `prepare`
        let options = SolverOptions::default();
        let fitted = fit_sample(
            &prepared.fit_x1,
            &prepared.fit_x2,
            &sample,
            self.config.model,
            &options,
        )
        .map(|hypothesis| {
            let score = self.score(prepared, &hypothesis).score;
            (hypothesis, score)
        });

        match fitted {
            Ok((hypothesis, score)) => ScoredHypothesis {
                hypothesis,
                score,
                degenerate: false,
            },
            Err(err) => {
                log::trace!("degenerate sample {sample:?}: {err}");
                ScoredHypothesis {
                    hypothesis: Hypothesis {
                        model: self.config.model,
                        matrix: DMat3::ZERO,
                        sample,
                    },
                    score: 0.0,
                    degenerate: true,
                }
            }
        }
    }

    fn finalize(
        &self,
        prepared: &Prepared<'_>,
        scored: Vec<ScoredHypothesis>,
        accumulator: PointScoreAccumulator,
    ) -> Result<DsacOutput, DsacError> {
        // hypotheses >= 1 after validation; with no positive score the first one is kept
        let mut best = 0;
        let mut best_score = 0.0;
        for (i, h) in scored.iter().enumerate() {
            if h.score > best_score {
                best_score = h.score;
                best = i;
            }
        }

        let degenerate = scored.iter().filter(|h| h.degenerate).count();
        if best_score <= 0.0 {
            log::debug!(
                "no hypothesis with a positive score ({degenerate}/{} degenerate)",
                scored.len()
            );
        }

        let best_hypothesis = scored
            .get(best)
            .map(|h| h.hypothesis.clone())
            .ok_or_else(|| DsacError::InvalidConfig("hypotheses must be at least 1".into()))?;
        let best_inlier_scores = self.score(prepared, &best_hypothesis);

        log::debug!(
            "sampled {} {:?} hypotheses ({degenerate} degenerate), best {best} scores {best_score:.3}",
            scored.len(),
            self.config.model,
        );

        let point_scores = accumulator.averages();
        Ok(DsacOutput {
            best: best_hypothesis,
            best_score,
            best_inlier_scores,
            hypotheses: scored,
            accumulator,
            point_scores,
        })
    }
}

/// Number of hypotheses per partial accumulator in [`Dsac::run_parallel`].
const ACCUMULATOR_CHUNK: usize = 64;

/// Credit every hypothesis score to the points of its sample, in order.
fn accumulate(n: usize, scored: &[ScoredHypothesis]) -> PointScoreAccumulator {
    let mut accumulator = PointScoreAccumulator::new(n);
    for h in scored {
        accumulator.add(&h.hypothesis.sample, h.score);
    }
    accumulator
}

/// Sample five-point homography hypotheses and average their scores per point.
///
/// Convenience entry point over [`Dsac`] with the default seed.
///
/// # Arguments
///
/// * `x1` - Points in image 1.
/// * `x2` - Corresponding points in image 2.
/// * `hypothesis_count` - Number of hypotheses to sample.
/// * `threshold` - Inlier distance threshold, in pixels.
/// * `beta` - Sharpness of the soft inlier cutoff.
pub fn run_differentiable_ransac(
    x1: &[DVec2],
    x2: &[DVec2],
    hypothesis_count: usize,
    threshold: f64,
    beta: f64,
) -> Result<DsacOutput, DsacError> {
    let dsac = Dsac::new(DsacConfig {
        hypotheses: hypothesis_count,
        inlier_threshold: threshold,
        inlier_beta: beta,
        ..DsacConfig::homography()
    })?;
    dsac.run_seeded(x1, x2)
}
