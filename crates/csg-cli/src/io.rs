//! File formats of the command-line driver.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csg_core::{Canvas, parse_canvases};
use csg_dsl::{Grammar, parse, render_at};
use csg_metric::Metric;
use serde_json::{Map, Value};

/// Where target canvases come from.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetSource {
    /// A file of canvases in `grid` text format.
    Canvases(PathBuf),
    /// Ground-truth programs, one per line, rendered at the configured resolution.
    Programs(PathBuf),
}

pub fn load_grammar(path: Option<&Path>) -> Result<Grammar> {
    let Some(path) = path else {
        return Ok(Grammar::builtin());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read terminals {}", path.display()))?;
    Grammar::from_terminals_text(&text)
        .with_context(|| format!("Invalid terminals file {}", path.display()))
}

/// Program text of one prediction line: everything before the first stop symbol.
pub fn candidate_text(line: &str) -> &str {
    line.split(csg_dsl::STOP_SYMBOL).next().unwrap_or_default()
}

/// Reads one candidate per line; blank lines are kept so beam positions stay aligned.
pub fn read_candidates(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read expressions {}", path.display()))?;
    Ok(text
        .lines()
        .map(|line| candidate_text(line).to_string())
        .collect())
}

pub fn load_targets(
    source: &TargetSource,
    grammar: &Grammar,
    resolution: usize,
) -> Result<Vec<Canvas>> {
    match source {
        TargetSource::Canvases(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read targets {}", path.display()))?;
            parse_canvases(&text)
                .with_context(|| format!("Invalid canvas file {}", path.display()))
        }
        TargetSource::Programs(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read target programs {}", path.display()))?;
            let mut lines = text.lines().map(candidate_text).collect::<Vec<_>>();
            while lines.last().is_some_and(|line| line.trim().is_empty()) {
                lines.pop();
            }
            let mut targets = Vec::with_capacity(lines.len());
            for (index, source) in lines.into_iter().enumerate() {
                anyhow::ensure!(
                    !source.trim().is_empty(),
                    "{}:{}: blank target program, every line up to the last must hold one",
                    path.display(),
                    index + 1
                );
                let expression = parse(source, grammar).with_context(|| {
                    format!("{}:{}: invalid target program", path.display(), index + 1)
                })?;
                let canvas = render_at(&expression, resolution).with_context(|| {
                    format!("{}:{}: target program does not render", path.display(), index + 1)
                })?;
                targets.push(canvas);
            }
            Ok(targets)
        }
    }
}

pub fn expressions_file_name(beam_width: usize, max_iter: usize) -> String {
    format!("optimized_expressions_beam_{beam_width}_maxiter_{max_iter}.txt")
}

pub fn results_file_name(beam_width: usize, max_iter: usize) -> String {
    format!("results_beam_{beam_width}_max_iter_{max_iter}.json")
}

pub fn results_key(metric: Metric, max_iter: usize) -> String {
    format!("{metric} scores for max_iter {max_iter}")
}

/// Writes refined expressions and the summary score into `dir`.
pub fn write_outputs<'a, I>(
    dir: &Path,
    beam_width: usize,
    max_iter: usize,
    metric: Metric,
    expressions: I,
    mean_best: f64,
) -> Result<(PathBuf, PathBuf)>
where
    I: IntoIterator<Item = &'a str>,
{
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let expressions_path = dir.join(expressions_file_name(beam_width, max_iter));
    let mut body = String::new();
    for expression in expressions {
        body.push_str(expression);
        body.push('\n');
    }
    fs::write(&expressions_path, body)
        .with_context(|| format!("Failed to write {}", expressions_path.display()))?;

    let results_path = dir.join(results_file_name(beam_width, max_iter));
    let mut results = Map::new();
    results.insert(results_key(metric, max_iter), Value::from(mean_best));
    let json = serde_json::to_string_pretty(&Value::Object(results))?;
    fs::write(&results_path, json)
        .with_context(|| format!("Failed to write {}", results_path.display()))?;

    Ok((expressions_path, results_path))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use csg_core::GridShape;
    use csg_dsl::Grammar;
    use csg_metric::Metric;

    use super::{
        TargetSource, candidate_text, load_grammar, load_targets, read_candidates, write_outputs,
    };

    #[test]
    fn candidates_stop_at_first_dollar() {
        assert_eq!(candidate_text("c(8,8,4)s(4,4,2)+$$$"), "c(8,8,4)s(4,4,2)+");
        assert_eq!(candidate_text("$c(1,1,1)"), "");
        assert_eq!(candidate_text("c(1,1,1)"), "c(1,1,1)");

        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("predictions.txt");
        fs::write(&path, "c(8,8,4)$\n\nt(4,4,2)$s(1,1,1)\n").expect("write");
        let candidates = read_candidates(&path).expect("read");
        assert_eq!(candidates, vec!["c(8,8,4)", "", "t(4,4,2)"]);
    }

    #[test]
    fn targets_from_programs_and_canvases() {
        let dir = tempfile::tempdir().expect("temp dir");
        let programs = dir.path().join("targets.txt");
        fs::write(&programs, "c(8,8,4)$\ns(8,8,3)\n\n").expect("write");
        let grammar = Grammar::builtin();

        let rendered =
            load_targets(&TargetSource::Programs(programs), &grammar, 16).expect("targets");
        assert_eq!(rendered.len(), 2);
        assert_eq!(rendered[0].shape(), GridShape::planar(16, 16));
        assert_eq!(rendered[1].count(), 25);

        let canvases = dir.path().join("targets.grid");
        let text = rendered.iter().map(|canvas| canvas.to_text()).collect::<String>();
        fs::write(&canvases, text).expect("write");
        let loaded =
            load_targets(&TargetSource::Canvases(canvases), &grammar, 16).expect("canvases");
        assert_eq!(loaded, rendered);
    }

    #[test]
    fn bad_target_program_names_the_line() {
        let dir = tempfile::tempdir().expect("temp dir");
        let programs = dir.path().join("targets.txt");
        fs::write(&programs, "c(8,8,4)\nc(8,8\n").expect("write");
        let err = load_targets(&TargetSource::Programs(programs), &Grammar::builtin(), 16)
            .expect_err("second line is broken");
        assert!(format!("{err}").contains("targets.txt:2"));
    }

    #[test]
    fn blank_target_lines_keep_positions() {
        let dir = tempfile::tempdir().expect("temp dir");
        let programs = dir.path().join("targets.txt");
        fs::write(&programs, "c(8,8,4)\n\ns(8,8,3)\n").expect("write");
        let err = load_targets(&TargetSource::Programs(programs), &Grammar::builtin(), 16)
            .expect_err("blank line between targets");
        assert!(format!("{err}").contains("targets.txt:2: blank target program"));
    }

    #[test]
    fn terminals_file_restricts_grammar() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("terminals.txt");
        fs::write(&path, "c(8,8,8)\n+\n$\n").expect("write");
        let grammar = load_grammar(Some(&path)).expect("grammar");
        assert!(grammar.primitive("s").is_none());
        assert!(load_grammar(None).expect("builtin").primitive("s").is_some());
    }

    #[test]
    fn writes_expressions_and_summary() {
        let dir = tempfile::tempdir().expect("temp dir");
        let out = dir.path().join("out");
        let (expressions, results) = write_outputs(
            &out,
            2,
            1,
            Metric::Chamfer,
            ["c(8,8,4)", "s(1,1,1)"],
            0.25,
        )
        .expect("write outputs");

        assert!(expressions.ends_with("optimized_expressions_beam_2_maxiter_1.txt"));
        assert_eq!(
            fs::read_to_string(&expressions).expect("read"),
            "c(8,8,4)\ns(1,1,1)\n"
        );
        assert!(results.ends_with("results_beam_2_max_iter_1.json"));
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&results).expect("read")).expect("json");
        assert_eq!(json["chamfer scores for max_iter 1"], 0.25);
    }
}
