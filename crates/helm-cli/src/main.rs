//! HELM intra-cluster assignment
//!
//! Reconciles fine frame labels with a HELM merge plan, ranks the resulting
//! clusters by population and writes medoids plus representative frames.
//!
//! ## Usage
//! ```bash
//! helm-assign \
//!   --trajectory sim_traj.npy \
//!   --labels labels_60.csv \
//!   --plan intra-helm.json \
//!   --n-atoms 50 --n-clusters 10 \
//!   --output-dir results/
//! ```
//!
//! Settings can also come from a TOML file (`--config helm.toml`); flags
//! given on the command line take precedence.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use helm_core::{
    assign_labels, ExtractPolicy, FineLabelTable, HelmConfig, HelmError, HelmReport, MergePlan,
    Metric, Trajectory,
};

/// Version from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "helm-assign")]
#[command(version = VERSION)]
#[command(about = "Assign trajectory frames to HELM clusters and extract medoids and representatives")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Trajectory array (.npy, frames x n_atoms*3)
    #[arg(long)]
    trajectory: Option<PathBuf>,

    /// Fine label table (frame_index,label)
    #[arg(long)]
    labels: Option<PathBuf>,

    /// HELM merge plan (JSON keyed by cluster count)
    #[arg(long)]
    plan: Option<PathBuf>,

    /// Atoms per frame
    #[arg(long)]
    n_atoms: Option<usize>,

    /// Keep every N-th trajectory frame
    #[arg(long)]
    sieve: Option<usize>,

    /// Cluster count to read from the merge plan
    #[arg(short = 'k', long)]
    n_clusters: Option<usize>,

    /// Dissimilarity metric: MSD or RMSD
    #[arg(long)]
    metric: Option<Metric>,

    /// Representative selection: top or random
    #[arg(long)]
    extract_type: Option<ExtractPolicy>,

    /// Representatives per cluster, medoid included
    #[arg(short = 'n', long)]
    n_structures: Option<usize>,

    /// Seed for --extract-type random
    #[arg(long)]
    seed: Option<u64>,

    /// Directory for the report files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also write helm_assignment_<K>.json
    #[arg(long)]
    json_summary: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(e) = run(&args) {
        match e.downcast_ref::<HelmError>() {
            Some(helm) => log::error!("{}", helm.user_message()),
            None => log::error!("{:#}", e),
        }
        for cause in e.chain().skip(1) {
            log::error!("  caused by: {}", cause);
        }
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let config = build_config(args)?;
    config.validate()?;
    let settings = config.assignment_settings();

    log::info!("HELM assignment v{}", VERSION);
    log::info!(
        "  n_clusters={} metric={} extract_type={} n_structures={} sieve={}",
        settings.n_clusters,
        settings.metric,
        settings.extract_type,
        settings.n_structures,
        settings.sieve
    );

    let trajectory_path = required(&config.inputs.trajectory, "trajectory")?;
    let labels_path = required(&config.inputs.fine_labels, "labels")?;
    let plan_path = required(&config.inputs.merge_plan, "plan")?;

    let trajectory = Trajectory::load_npy(trajectory_path, settings.n_atoms, settings.sieve)
        .with_context(|| format!("Failed to load trajectory {}", trajectory_path.display()))?;
    let labels = FineLabelTable::load_csv(labels_path, settings.sieve)
        .with_context(|| format!("Failed to load fine labels {}", labels_path.display()))?;
    let plan = MergePlan::load_json(plan_path)
        .with_context(|| format!("Failed to load merge plan {}", plan_path.display()))?;

    let assignment = assign_labels(&trajectory, &labels, &plan, &settings)?;

    let mut report = HelmReport::render(&assignment);
    if config.output.json_summary {
        report = report.with_json(&assignment)?;
    }
    let written = report
        .commit(&config.output.dir)
        .with_context(|| format!("Failed to write reports to {}", config.output.dir.display()))?;

    log::info!(
        "Done: {} clusters, {} frames assigned, {} dropped, {} files written",
        assignment.clusters.len(),
        assignment.total_frames,
        assignment.dropped_frames,
        written.len()
    );
    Ok(())
}

/// Load the TOML file (if any) and apply command-line overrides.
fn build_config(args: &Args) -> Result<HelmConfig> {
    let mut config = match &args.config {
        Some(path) => HelmConfig::from_file(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => HelmConfig::default(),
    };

    if let Some(path) = &args.trajectory {
        config.inputs.trajectory = Some(path.clone());
    }
    if let Some(path) = &args.labels {
        config.inputs.fine_labels = Some(path.clone());
    }
    if let Some(path) = &args.plan {
        config.inputs.merge_plan = Some(path.clone());
    }
    if let Some(n_atoms) = args.n_atoms {
        config.system.n_atoms = n_atoms;
    }
    if let Some(sieve) = args.sieve {
        config.system.sieve = sieve;
    }
    if let Some(n_clusters) = args.n_clusters {
        config.helm.n_clusters = n_clusters;
    }
    if let Some(metric) = args.metric {
        config.helm.metric = metric;
    }
    if let Some(extract_type) = args.extract_type {
        config.helm.extract_type = extract_type;
    }
    if let Some(n_structures) = args.n_structures {
        config.helm.n_structures = n_structures;
    }
    if let Some(seed) = args.seed {
        config.helm.seed = Some(seed);
    }
    if let Some(dir) = &args.output_dir {
        config.output.dir = dir.clone();
    }
    if args.json_summary {
        config.output.json_summary = true;
    }

    Ok(config)
}

fn required<'a>(path: &'a Option<PathBuf>, flag: &str) -> Result<&'a Path> {
    path.as_deref().ok_or_else(|| {
        anyhow::anyhow!(
            "no {0} input given: pass --{0} or set it under [inputs] in the config file",
            flag
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::try_parse_from([
            "helm-assign",
            "--trajectory",
            "t.npy",
            "-k",
            "4",
            "--metric",
            "rmsd",
            "--extract-type",
            "random",
            "-n",
            "3",
            "--seed",
            "9",
        ])
        .unwrap();

        let config = build_config(&args).unwrap();
        assert_eq!(config.inputs.trajectory, Some(PathBuf::from("t.npy")));
        assert_eq!(config.helm.n_clusters, 4);
        assert_eq!(config.helm.metric, Metric::Rmsd);
        assert_eq!(config.helm.extract_type, ExtractPolicy::Random);
        assert_eq!(config.helm.n_structures, 3);
        assert_eq!(config.helm.seed, Some(9));
        assert_eq!(config.system.n_atoms, 50);
    }

    #[test]
    fn test_unknown_metric_flag_rejected() {
        let result = Args::try_parse_from(["helm-assign", "--metric", "JT"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_input_reported() {
        let args = Args::try_parse_from(["helm-assign"]).unwrap();
        let config = build_config(&args).unwrap();
        let err = required(&config.inputs.trajectory, "trajectory").unwrap_err();
        assert!(err.to_string().contains("--trajectory"));
    }
}
