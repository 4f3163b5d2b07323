//! CSG refinement CLI
//!
//! Subcommands:
//! - `refine`: refine beam-search predictions against their targets
//! - `render`: draw a program as `grid` text
//! - `distance`: score a program against a target

use anyhow::Result;
use clap::{Parser, Subcommand};

mod config;
mod io;
mod refine;
mod render;

#[derive(Parser, Debug)]
#[command(name = "csg")]
#[command(about = "Refine, render and score CSG programs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Refine predicted programs against target shapes
    Refine(refine::RefineArgs),
    /// Render a program to a canvas
    Render(render::RenderArgs),
    /// Distance between a program and a target
    Distance(render::DistanceArgs),
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Refine(args) => refine::run(args),
        Commands::Render(args) => render::run_render(args),
        Commands::Distance(args) => render::run_distance(args),
    }
}
