use argh::FromArgs;
use glam::{DMat3, DVec2, DVec3};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use std::path::PathBuf;

use kornia_dsac::{Dsac, DsacConfig};
use kornia_epipolar as epi;

#[derive(FromArgs)]
/// Estimate the relative pose of two synthetic views with differentiable RANSAC
struct Args {
    /// number of correspondences
    #[argh(option, default = "200")]
    num_points: usize,

    /// share of correspondences replaced by random matches
    #[argh(option, default = "0.3")]
    outlier_ratio: f64,

    /// half-width of the uniform pixel noise added to the inliers
    #[argh(option, default = "0.5")]
    noise: f64,

    /// seed of the scene generator
    #[argh(option, default = "0")]
    seed: u64,

    /// path to a JSON estimator configuration
    #[argh(option)]
    config: Option<PathBuf>,

    /// evaluate the hypotheses on the rayon thread pool
    #[argh(switch)]
    parallel: bool,

    /// path to write a JSON report to
    #[argh(option)]
    output: Option<PathBuf>,
}

struct Scene {
    x1: Vec<DVec2>,
    x2: Vec<DVec2>,
    outliers: Vec<bool>,
    rotation: DMat3,
    translation: DVec3,
}

#[derive(Serialize)]
struct Report {
    config: DsacConfig,
    best_score: f64,
    degenerate_hypotheses: usize,
    fundamental: [[f64; 3]; 3],
    essential: [[f64; 3]; 3],
    rotation: [[f64; 3]; 3],
    translation: [f64; 3],
    candidate_counts: [usize; 4],
    rotation_error_deg: f64,
    translation_error_deg: f64,
    inlier_precision: f64,
    inlier_recall: f64,
    point_scores: Vec<f64>,
}

// KITTI odometry intrinsics
const CALIBRATION: [[f64; 3]; 3] = [
    [718.856, 0.0, 607.193],
    [0.0, 718.856, 185.216],
    [0.0, 0.0, 1.0],
];

fn synthesize_scene(args: &Args, k: &DMat3) -> Scene {
    let mut rng = StdRng::seed_from_u64(args.seed);

    // forward motion with a slight turn, as in a driving sequence
    let rotation = DMat3::from_rotation_y(2f64.to_radians());
    let translation = DVec3::new(0.05, -0.02, 1.0);

    let mut scene = Scene {
        x1: Vec::with_capacity(args.num_points),
        x2: Vec::with_capacity(args.num_points),
        outliers: Vec::with_capacity(args.num_points),
        rotation,
        translation,
    };

    let noise = args.noise.abs();
    while scene.x1.len() < args.num_points {
        let x = DVec3::new(
            rng.random_range(-10.0..10.0),
            rng.random_range(-2.0..2.0),
            rng.random_range(5.0..40.0),
        );
        let x_cam2 = rotation * x + translation;
        if x_cam2.z <= 0.0 {
            continue;
        }
        let p1 = *k * x;
        let p2 = *k * x_cam2;

        let is_outlier = rng.random_bool(args.outlier_ratio.clamp(0.0, 1.0));
        let q2 = if is_outlier {
            DVec2::new(rng.random_range(0.0..1241.0), rng.random_range(0.0..376.0))
        } else {
            let jitter = DVec2::new(
                rng.random_range(-noise..=noise),
                rng.random_range(-noise..=noise),
            );
            DVec2::new(p2.x / p2.z, p2.y / p2.z) + jitter
        };

        scene.x1.push(DVec2::new(p1.x / p1.z, p1.y / p1.z));
        scene.x2.push(q2);
        scene.outliers.push(is_outlier);
    }
    scene
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let config = match &args.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => DsacConfig {
            inlier_threshold: 2.0,
            ..DsacConfig::fundamental()
        },
    };

    let k = epi::linalg::mat3_from_rows(&CALIBRATION);
    let scene = synthesize_scene(&args, &k);
    println!(
        "Synthesized {} correspondences ({} outliers)",
        scene.x1.len(),
        scene.outliers.iter().filter(|&&o| o).count()
    );

    let dsac = Dsac::new(config)?;
    let mut rng = match dsac.config().random_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };
    let output = if args.parallel {
        dsac.run_parallel(&scene.x1, &scene.x2, &mut rng)?
    } else {
        dsac.run(&scene.x1, &scene.x2, &mut rng)?
    };
    let degenerate = output.hypotheses.iter().filter(|h| h.degenerate).count();
    println!(
        "Best of {} hypotheses scores {:.2} ({} degenerate)",
        output.hypotheses.len(),
        output.best_score,
        degenerate
    );

    // refit on all points, weighted by their soft inlier weight under the best hypothesis
    let weights = &output.best_inlier_scores.weights;
    let essential = epi::solver::estimate_geometry(
        &scene.x1,
        &scene.x2,
        epi::solver::GeometryModel::Essential,
        &epi::solver::SolverOptions {
            calibration: Some(&k),
            weights: Some(weights.as_slice()),
            normalize: true,
        },
    )?;
    let fundamental = epi::solver::fundamental_from_essential(&essential.matrix, &k, &k)?;

    let threshold = dsac.config().inlier_threshold;
    let distances = epi::scoring::point_distances(
        epi::solver::GeometryModel::Fundamental,
        &fundamental,
        &scene.x1,
        &scene.x2,
    );
    let mask = distances.iter().map(|&d| d < threshold).collect::<Vec<_>>();

    let pose = epi::pose::disambiguate_pose(
        &essential.matrix,
        &scene.x1,
        &scene.x2,
        &k,
        Some(mask.as_slice()),
        epi::pose::DEFAULT_DEPTH_THRESHOLD,
    )?;
    log::info!("valid points per pose candidate: {:?}", pose.candidate_counts);

    let errors = pose.errors(&scene.rotation, &scene.translation);
    println!(
        "Pose candidate #{} with {} valid points",
        pose.candidate_index, pose.valid_count
    );
    println!(
        "Rotation error {:.3} deg, translation error {:.3} deg",
        errors.rotation_deg, errors.translation_deg
    );

    let (true_positives, selected, inliers) = mask.iter().zip(scene.outliers.iter()).fold(
        (0usize, 0usize, 0usize),
        |(tp, sel, inl), (&m, &o)| (tp + (m && !o) as usize, sel + m as usize, inl + !o as usize),
    );
    let precision = true_positives as f64 / selected.max(1) as f64;
    let recall = true_positives as f64 / inliers.max(1) as f64;
    println!("Inlier precision {precision:.3}, recall {recall:.3}");

    if let Some(path) = &args.output {
        let report = Report {
            config: dsac.config().clone(),
            best_score: output.best_score,
            degenerate_hypotheses: degenerate,
            fundamental: epi::linalg::mat3_to_rows(&fundamental),
            essential: epi::linalg::mat3_to_rows(&essential.matrix),
            rotation: epi::linalg::mat3_to_rows(&pose.rotation),
            translation: pose.translation.to_array(),
            candidate_counts: pose.candidate_counts,
            rotation_error_deg: errors.rotation_deg,
            translation_error_deg: errors.translation_deg,
            inlier_precision: precision,
            inlier_recall: recall,
            point_scores: output.point_scores.clone(),
        };
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}
