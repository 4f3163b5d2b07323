use csg_core::Canvas;
use csg_metric::MetricError;
use log::{debug, info};
use rayon::prelude::*;

use crate::search::{RefineOutcome, Refiner};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BatchError {
    #[error("beam width must be at least 1")]
    ZeroBeamWidth,
    #[error("batch has no targets")]
    NoTargets,
    #[error(
        "{candidates} candidates cannot be split into {targets} beams of {beam_width}"
    )]
    CountMismatch {
        candidates: usize,
        targets: usize,
        beam_width: usize,
    },
    #[error(transparent)]
    Metric(#[from] MetricError),
}

/// Splits candidates into contiguous beams, one per target.
pub fn group_beams<T>(
    candidates: &[T],
    targets: usize,
    beam_width: usize,
) -> Result<Vec<&[T]>, BatchError> {
    if beam_width == 0 {
        return Err(BatchError::ZeroBeamWidth);
    }
    if targets == 0 {
        return Err(BatchError::NoTargets);
    }
    if candidates.len() != targets * beam_width {
        return Err(BatchError::CountMismatch {
            candidates: candidates.len(),
            targets,
            beam_width,
        });
    }
    Ok(candidates.chunks(beam_width).collect())
}

/// Summary of one finished beam.
#[derive(Debug, Clone, PartialEq)]
pub struct BeamSummary {
    pub target_index: usize,
    pub best_distance: f64,
    pub best_candidate: usize,
    pub fallbacks: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    /// One outcome per candidate, in input order.
    pub outcomes: Vec<RefineOutcome>,
    pub beams: Vec<BeamSummary>,
    /// Mean over targets of the best distance within each beam.
    pub mean_best: f64,
}

impl BatchReport {
    pub fn expressions(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().map(|outcome| outcome.expression.as_str())
    }

    pub fn best_distances(&self) -> Vec<f64> {
        self.beams.iter().map(|beam| beam.best_distance).collect()
    }

    pub fn fallback_count(&self) -> usize {
        self.beams.iter().map(|beam| beam.fallbacks).sum()
    }
}

/// Refines every candidate against the target of its beam.
pub fn refine_batch(
    refiner: &Refiner<'_>,
    candidates: &[String],
    targets: &[Canvas],
    beam_width: usize,
) -> Result<BatchReport, BatchError> {
    refine_batch_with(refiner, candidates, targets, beam_width, |_| {})
}

/// Like [`refine_batch`], calling `on_beam` as each beam finishes.
///
/// Beams run in parallel, so `on_beam` may see them out of order; the report
/// is always in input order.
pub fn refine_batch_with<F>(
    refiner: &Refiner<'_>,
    candidates: &[String],
    targets: &[Canvas],
    beam_width: usize,
    on_beam: F,
) -> Result<BatchReport, BatchError>
where
    F: Fn(&BeamSummary) + Sync,
{
    let beams = group_beams(candidates, targets.len(), beam_width)?;
    info!(
        "refining {} candidates against {} targets (beam width {beam_width})",
        candidates.len(),
        targets.len()
    );

    let results = beams
        .into_par_iter()
        .zip(targets.par_iter())
        .enumerate()
        .map(|(target_index, (beam, target))| {
            let outcomes = beam
                .par_iter()
                .enumerate()
                .map(|(offset, source)| {
                    let outcome = refiner.optimize(source, target)?;
                    debug!(
                        "candidate {}: {:.4} after {} rounds",
                        target_index * beam_width + offset,
                        outcome.distance,
                        outcome.rounds
                    );
                    Ok(outcome)
                })
                .collect::<Result<Vec<_>, MetricError>>()?;
            let summary = summarize(target_index, &outcomes);
            on_beam(&summary);
            Ok((outcomes, summary))
        })
        .collect::<Result<Vec<_>, BatchError>>()?;

    let mut outcomes = Vec::with_capacity(candidates.len());
    let mut summaries = Vec::with_capacity(targets.len());
    for (beam_outcomes, summary) in results {
        outcomes.extend(beam_outcomes);
        summaries.push(summary);
    }
    let mean_best =
        summaries.iter().map(|beam| beam.best_distance).sum::<f64>() / summaries.len() as f64;

    Ok(BatchReport {
        outcomes,
        beams: summaries,
        mean_best,
    })
}

fn summarize(target_index: usize, outcomes: &[RefineOutcome]) -> BeamSummary {
    let mut best_candidate = 0;
    let mut best_distance = f64::INFINITY;
    for (index, outcome) in outcomes.iter().enumerate() {
        if outcome.distance < best_distance {
            best_distance = outcome.distance;
            best_candidate = index;
        }
    }
    BeamSummary {
        target_index,
        best_distance,
        best_candidate,
        fallbacks: outcomes.iter().filter(|outcome| outcome.is_fallback()).count(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use csg_core::{Canvas, GridShape};
    use csg_dsl::{Grammar, parse, render};
    use csg_metric::Metric;

    use crate::config::RefineConfig;
    use crate::search::Refiner;

    use super::{BatchError, group_beams, refine_batch, refine_batch_with};

    fn target(source: &str) -> Canvas {
        let expression = parse(source, &Grammar::builtin()).expect("target parses");
        render(&expression, GridShape::planar(32, 32)).expect("target renders")
    }

    #[test]
    fn groups_are_contiguous() {
        let items = [1, 2, 3, 4, 5, 6];
        let groups = group_beams(&items, 2, 3).expect("six items fill two beams");
        assert_eq!(groups, vec![&[1, 2, 3][..], &[4, 5, 6][..]]);
        assert_eq!(
            group_beams(&items, 2, 4),
            Err(BatchError::CountMismatch {
                candidates: 6,
                targets: 2,
                beam_width: 4
            })
        );
        assert_eq!(group_beams(&items, 6, 0), Err(BatchError::ZeroBeamWidth));
        assert_eq!(group_beams::<i32>(&[], 0, 1), Err(BatchError::NoTargets));
    }

    #[test]
    fn beam_with_one_valid_candidate_scores_that_candidate() {
        let grammar = Grammar::builtin();
        let refiner = Refiner::new(&grammar, RefineConfig::default());
        let targets = vec![target("c(16,16,6)")];
        let mut candidates = vec!["c(1,2".to_string(); 9];
        candidates.insert(4, "c(16,16,6)".to_string());

        let report = refine_batch(&refiner, &candidates, &targets, 10).expect("batch");
        assert_eq!(report.outcomes.len(), 10);
        assert_eq!(report.beams[0].best_candidate, 4);
        assert_eq!(report.beams[0].best_distance, 0.0);
        assert_eq!(report.fallback_count(), 9);
        assert_eq!(report.mean_best, 0.0);
        assert_eq!(report.expressions().nth(4), Some("c(16,16,6)"));
        assert_eq!(report.expressions().next(), Some("c(1,2"));
    }

    #[test]
    fn mean_is_taken_over_beam_minima() {
        let grammar = Grammar::builtin();
        let config = RefineConfig {
            metric: Metric::Iou,
            max_iter: 0,
            ..RefineConfig::default()
        };
        let refiner = Refiner::new(&grammar, config);
        let targets = vec![target("s(16,16,6)"), target("c(8,8,4)")];
        let candidates = [
            "s(16,16,6)",
            "c(30,30,1)",
            "c(20,20,2)",
            "s(2,2,1)",
        ]
        .map(String::from);

        let seen = Mutex::new(Vec::new());
        let report = refine_batch_with(&refiner, &candidates, &targets, 2, |beam| {
            seen.lock().expect("lock").push(beam.target_index);
        })
        .expect("batch");

        let best = report.best_distances();
        assert_eq!(best[0], 0.0);
        assert_eq!(best[1], 1.0);
        assert_eq!(report.mean_best, 0.5);
        let mut seen = seen.into_inner().expect("lock");
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1]);
    }

    #[test]
    fn rejects_count_mismatch() {
        let grammar = Grammar::builtin();
        let refiner = Refiner::new(&grammar, RefineConfig::default());
        let targets = vec![target("c(16,16,6)")];
        let candidates = vec!["c(16,16,6)".to_string(); 3];
        let err = refine_batch(&refiner, &candidates, &targets, 2).expect_err("3 != 1 * 2");
        assert!(err.to_string().contains("3 candidates"));
    }
}
