//! `render` and `distance` subcommands for single programs.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use csg_core::{Canvas, GridShape};
use csg_dsl::{Grammar, Renderer, parse};
use csg_metric::Metric;

use crate::io::{TargetSource, candidate_text, load_grammar, load_targets};

#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Program to draw, e.g. `c(32,32,16)s(24,40,8)+`
    expression: String,

    /// Cells per side
    #[arg(short, long, default_value = "64")]
    resolution: usize,

    /// Terminal vocabulary file
    #[arg(long)]
    terminals: Option<PathBuf>,

    /// Write the canvas here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct DistanceArgs {
    /// Program to score
    expression: String,

    /// Target canvases in `grid` text format
    #[arg(long, conflicts_with = "target_program", required_unless_present = "target_program")]
    targets: Option<PathBuf>,

    /// Target given as a program
    #[arg(long)]
    target_program: Option<String>,

    /// Which canvas of the targets file to compare against
    #[arg(long, default_value = "0")]
    index: usize,

    #[arg(short, long, default_value = "chamfer")]
    metric: Metric,

    /// Cells per side when the target is a program
    #[arg(short, long, default_value = "64")]
    resolution: usize,

    /// Terminal vocabulary file
    #[arg(long)]
    terminals: Option<PathBuf>,
}

pub fn run_render(args: &RenderArgs) -> Result<()> {
    let grammar = load_grammar(args.terminals.as_deref())?;
    let canvas = draw(&args.expression, &grammar, args.resolution)?;
    match &args.output {
        Some(path) => fs::write(path, canvas.to_text())
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => print!("{}", canvas.to_text()),
    }
    Ok(())
}

pub fn run_distance(args: &DistanceArgs) -> Result<()> {
    let grammar = load_grammar(args.terminals.as_deref())?;
    let target = match (&args.targets, &args.target_program) {
        (Some(path), None) => {
            let source = TargetSource::Canvases(path.clone());
            let targets = load_targets(&source, &grammar, args.resolution)?;
            let count = targets.len();
            targets.into_iter().nth(args.index).with_context(|| {
                format!("{} holds {count} canvases, no index {}", path.display(), args.index)
            })?
        }
        (None, Some(program)) => draw(program, &grammar, args.resolution)?,
        _ => anyhow::bail!("pass exactly one of --targets or --target-program"),
    };
    println!("{}", score(&args.expression, &grammar, &target, args.metric)?);
    Ok(())
}

/// Parses and draws a program on a grid matching its rank.
pub fn draw(source: &str, grammar: &Grammar, resolution: usize) -> Result<Canvas> {
    anyhow::ensure!(resolution > 0, "resolution must be at least 1");
    let expression = parse(candidate_text(source), grammar)
        .with_context(|| format!("invalid program '{source}'"))?;
    let shape = GridShape::for_rank(expression.rank().unwrap_or(2), resolution);
    Renderer::new(shape)
        .render(&expression)
        .with_context(|| format!("cannot draw '{source}'"))
}

/// Draws `source` on the target's grid and scores it.
pub fn score(source: &str, grammar: &Grammar, target: &Canvas, metric: Metric) -> Result<f64> {
    let expression = parse(candidate_text(source), grammar)
        .with_context(|| format!("invalid program '{source}'"))?;
    let canvas = Renderer::new(target.shape())
        .render(&expression)
        .with_context(|| format!("cannot draw '{source}'"))?;
    Ok(metric.distance(&canvas, target)?)
}
