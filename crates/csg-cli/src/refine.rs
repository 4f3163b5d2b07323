//! `refine` subcommand: batch refinement of beam-search predictions.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use clap::Parser;
use csg_metric::Metric;
use csg_refine::{BatchReport, BeamSummary, Refiner, refine_batch_with};
use log::info;

use crate::config::BatchConfig;
use crate::io::{TargetSource, load_grammar, load_targets, read_candidates, write_outputs};

#[derive(Parser, Debug)]
pub struct RefineArgs {
    /// Predicted expressions, one per line, grouped by beam
    expressions: PathBuf,

    /// Directory that receives the refined expressions and the summary
    output_dir: PathBuf,

    /// Target canvases in `grid` text format
    #[arg(long, conflicts_with = "target_programs", required_unless_present = "target_programs")]
    targets: Option<PathBuf>,

    /// Ground-truth programs rendered into targets
    #[arg(long)]
    target_programs: Option<PathBuf>,

    /// JSON batch configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Terminal vocabulary file
    #[arg(long)]
    terminals: Option<PathBuf>,

    #[arg(long)]
    beam_width: Option<usize>,

    #[arg(long)]
    max_iter: Option<usize>,

    /// Token budget per program
    #[arg(long)]
    max_len: Option<usize>,

    #[arg(long)]
    metric: Option<Metric>,

    /// Number of targets to use
    #[arg(long)]
    test_size: Option<usize>,

    /// Grid resolution for targets rendered from programs
    #[arg(long)]
    resolution: Option<usize>,
}

impl RefineArgs {
    fn batch_config(&self) -> Result<BatchConfig> {
        let mut config = BatchConfig::load(self.config.as_deref())?;
        if let Some(path) = &self.terminals {
            config.terminals = Some(path.clone());
        }
        if let Some(beam_width) = self.beam_width {
            config.beam_width = beam_width;
        }
        if let Some(max_len) = self.max_len {
            config.refine.max_len = max_len;
            config.refine.stack_size = max_len / 2 + 1;
        }
        if let Some(max_iter) = self.max_iter {
            config.refine.max_iter = max_iter;
        }
        if let Some(metric) = self.metric {
            config.refine.metric = metric;
        }
        if let Some(test_size) = self.test_size {
            config.test_size = Some(test_size);
        }
        if let Some(resolution) = self.resolution {
            config.resolution = resolution;
        }
        config.validate()?;
        Ok(config)
    }

    fn target_source(&self) -> Result<TargetSource> {
        match (&self.targets, &self.target_programs) {
            (Some(path), None) => Ok(TargetSource::Canvases(path.clone())),
            (None, Some(path)) => Ok(TargetSource::Programs(path.clone())),
            _ => anyhow::bail!("pass exactly one of --targets or --target-programs"),
        }
    }
}

pub fn run(args: &RefineArgs) -> Result<()> {
    let config = args.batch_config()?;
    let report = refine_files(
        &config,
        &args.expressions,
        &args.target_source()?,
        &args.output_dir,
    )?;
    println!(
        "{} scores for max_iter {}: {}",
        config.refine.metric, config.refine.max_iter, report.mean_best
    );
    Ok(())
}

/// Loads inputs, refines every candidate and writes both output files.
pub fn refine_files(
    config: &BatchConfig,
    expressions: &Path,
    targets: &TargetSource,
    output_dir: &Path,
) -> Result<BatchReport> {
    let grammar = load_grammar(config.terminals.as_deref())?;
    let mut targets = load_targets(targets, &grammar, config.resolution)?;
    let mut candidates = read_candidates(expressions)?;

    if let Some(test_size) = config.test_size {
        targets.truncate(test_size);
        candidates.truncate(targets.len() * config.beam_width);
    }
    info!(
        "loaded {} candidates and {} targets",
        candidates.len(),
        targets.len()
    );

    let refiner = Refiner::new(&grammar, config.refine.clone());
    let progress = Mutex::new(RunningMean::default());
    let report = refine_batch_with(
        &refiner,
        &candidates,
        &targets,
        config.beam_width,
        |beam| record_progress(&progress, beam),
    )
    .context("batch refinement failed")?;

    let (expressions_path, results_path) = write_outputs(
        output_dir,
        config.beam_width,
        config.refine.max_iter,
        config.refine.metric,
        report.expressions(),
        report.mean_best,
    )?;
    info!(
        "wrote {} and {} ({} fallbacks)",
        expressions_path.display(),
        results_path.display(),
        report.fallback_count()
    );
    Ok(report)
}

fn record_progress(progress: &Mutex<RunningMean>, beam: &BeamSummary) {
    progress
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .record(beam);
}

#[derive(Debug, Default)]
struct RunningMean {
    completed: usize,
    total: f64,
}

impl RunningMean {
    fn record(&mut self, beam: &BeamSummary) {
        self.completed += 1;
        self.total += beam.best_distance;
        info!(
            "target {}: best {:.4} (candidate {}), running mean {:.4} over {} targets",
            beam.target_index,
            beam.best_distance,
            beam.best_candidate,
            self.total / self.completed as f64,
            self.completed
        );
    }
}
