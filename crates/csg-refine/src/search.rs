use csg_core::Canvas;
use csg_dsl::{Expression, Grammar, ParseError, Renderer, StackError, parse_with_budget};
use csg_metric::{Metric, MetricError};
use log::{debug, trace, warn};

use crate::config::RefineConfig;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RefinementError {
    #[error("candidate does not parse: {0}")]
    Parse(#[from] ParseError),
    #[error("candidate does not render: {0}")]
    Render(#[from] StackError),
    #[error(transparent)]
    Metric(#[from] MetricError),
}

/// How a candidate left the search.
#[derive(Debug, Clone, PartialEq)]
pub enum RefineStatus {
    /// Parsed and rendered; the expression is the best one found.
    Refined,
    /// Could not be parsed or drawn; returned unchanged with the worst score.
    Fallback(RefinementError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefineOutcome {
    pub expression: String,
    pub distance: f64,
    pub initial_distance: f64,
    pub rounds: usize,
    pub status: RefineStatus,
}

impl RefineOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self.status, RefineStatus::Fallback(_))
    }

    pub fn improvement(&self) -> f64 {
        self.initial_distance - self.distance
    }
}

/// Greedy coordinate search over the numeric leaves of one program.
///
/// Each round tries every leaf at every step size in both directions and
/// keeps the single best proposal if it strictly beats the current score.
/// The search ends at a perfect match, at a local optimum, or after
/// `max_iter` rounds.
#[derive(Debug, Clone)]
pub struct Refiner<'g> {
    grammar: &'g Grammar,
    config: RefineConfig,
}

impl<'g> Refiner<'g> {
    pub fn new(grammar: &'g Grammar, config: RefineConfig) -> Self {
        Self { grammar, config }
    }

    pub fn config(&self) -> &RefineConfig {
        &self.config
    }

    pub fn grammar(&self) -> &Grammar {
        self.grammar
    }

    /// Refines `source` toward `target`.
    ///
    /// Candidates that fail to parse or render come back unchanged with
    /// [`Metric::worst_distance`]; only metric failures are returned as errors.
    pub fn optimize(&self, source: &str, target: &Canvas) -> Result<RefineOutcome, MetricError> {
        match self.try_optimize(source, target) {
            Ok(outcome) => Ok(outcome),
            Err(RefinementError::Metric(err)) => Err(err),
            Err(err) => {
                let worst = self.config.metric.worst_distance(target.shape());
                warn!("keeping candidate '{}' unchanged: {err}", source.trim());
                Ok(RefineOutcome {
                    expression: source.to_string(),
                    distance: worst,
                    initial_distance: worst,
                    rounds: 0,
                    status: RefineStatus::Fallback(err),
                })
            }
        }
    }

    /// Like [`Refiner::optimize`] but surfaces every failure.
    pub fn try_optimize(
        &self,
        source: &str,
        target: &Canvas,
    ) -> Result<RefineOutcome, RefinementError> {
        let expression = parse_with_budget(source, self.grammar, self.config.max_len)?;
        let mut renderer = Renderer::new(target.shape()).with_stack_bound(self.config.stack_size);

        let initial_distance = self.score(&mut renderer, &expression, target)?;
        let mut best = expression;
        let mut best_distance = initial_distance;
        let mut rounds = 0;

        while rounds < self.config.max_iter && best_distance > 0.0 {
            rounds += 1;
            match self.best_proposal(&mut renderer, &best, target)? {
                Some((candidate, distance)) if distance < best_distance => {
                    debug!(
                        "round {rounds}: {best_distance:.4} -> {distance:.4} with {}",
                        candidate
                    );
                    best = candidate;
                    best_distance = distance;
                }
                _ => {
                    debug!("round {rounds}: no proposal beats {best_distance:.4}");
                    break;
                }
            }
        }

        Ok(RefineOutcome {
            expression: best.to_canonical(),
            distance: best_distance,
            initial_distance,
            rounds,
            status: RefineStatus::Refined,
        })
    }

    fn score(
        &self,
        renderer: &mut Renderer,
        expression: &Expression,
        target: &Canvas,
    ) -> Result<f64, RefinementError> {
        let canvas = renderer.render(expression)?;
        if canvas.is_blank() {
            trace!("{expression} draws nothing");
        }
        Ok(self.config.metric.distance(&canvas, target)?)
    }

    /// Lowest-scoring proposal of one round; ties keep the earliest.
    fn best_proposal(
        &self,
        renderer: &mut Renderer,
        current: &Expression,
        target: &Canvas,
    ) -> Result<Option<(Expression, f64)>, RefinementError> {
        let mut best: Option<(Expression, f64)> = None;
        for proposal in proposals(current, &self.config.step_schedule) {
            let distance = self.score(renderer, &proposal, target)?;
            if best.as_ref().is_none_or(|(_, d)| distance < *d) {
                best = Some((proposal, distance));
            }
        }
        Ok(best)
    }
}

/// Every single-leaf perturbation of `expression`, in leaf order, then step
/// order, `+step` before `-step`.
///
/// A size edit that ends below zero is skipped unless it moves an already
/// negative size toward zero. Position edits are never skipped.
pub fn proposals(expression: &Expression, steps: &[f64]) -> Vec<Expression> {
    let mut out = Vec::new();
    for slot in expression.parameter_slots() {
        let Some(value) = expression.param(slot) else {
            continue;
        };
        let is_size = expression.tokens()[slot.token]
            .as_primitive()
            .is_some_and(|primitive| primitive.kind().is_size_slot(slot.param));
        for &step in steps {
            for delta in [step, -step] {
                let next = value + delta;
                if is_size && next < 0.0 && next < value {
                    continue;
                }
                if let Some(candidate) = expression.with_param(slot, next) {
                    out.push(candidate);
                }
            }
        }
    }
    out
}

/// One-shot refinement with the default step schedule; returns the refined
/// text and its distance.
pub fn optimize_expression(
    expression: &str,
    target: &Canvas,
    metric: Metric,
    stack_size: usize,
    steps: usize,
    max_iter: usize,
    grammar: &Grammar,
) -> Result<(String, f64), MetricError> {
    let config = RefineConfig {
        metric,
        stack_size,
        max_len: steps,
        max_iter,
        ..RefineConfig::default()
    };
    let outcome = Refiner::new(grammar, config).optimize(expression, target)?;
    Ok((outcome.expression, outcome.distance))
}

#[cfg(test)]
mod tests {
    use csg_core::{Canvas, GridShape};
    use csg_dsl::{Grammar, ParseError, parse, render};
    use csg_metric::Metric;

    use crate::config::RefineConfig;

    use super::{RefineStatus, Refiner, RefinementError, optimize_expression, proposals};

    fn target(source: &str, resolution: usize) -> Canvas {
        let expression = parse(source, &Grammar::builtin()).expect("target parses");
        render(&expression, GridShape::planar(resolution, resolution)).expect("target renders")
    }

    fn config(metric: Metric, max_iter: usize) -> RefineConfig {
        RefineConfig {
            metric,
            max_iter,
            ..RefineConfig::default()
        }
    }

    #[test]
    fn exact_match_needs_no_rounds() {
        let grammar = Grammar::builtin();
        let target = target("c(8,8,4)c(20,20,4)+", 32);
        let refiner = Refiner::new(&grammar, config(Metric::Chamfer, 5));
        let outcome = refiner
            .optimize("c(8,8,4) c(20,20,4) + $", &target)
            .expect("metric");
        assert_eq!(outcome.expression, "c(8,8,4)c(20,20,4)+");
        assert_eq!(outcome.distance, 0.0);
        assert_eq!(outcome.rounds, 0);
        assert_eq!(outcome.status, RefineStatus::Refined);
    }

    #[test]
    fn shifted_circle_moves_onto_target() {
        let grammar = Grammar::builtin();
        let target = target("c(16,16,6)", 32);
        for metric in [Metric::Chamfer, Metric::Iou] {
            let refiner = Refiner::new(&grammar, config(metric, 1));
            let outcome = refiner.optimize("c(12,16,6)", &target).expect("metric");
            assert!(outcome.initial_distance > 0.0, "{metric}");
            assert_eq!(outcome.expression, "c(16,16,6)", "{metric}");
            assert_eq!(outcome.distance, 0.0, "{metric}");
            assert_eq!(outcome.rounds, 1);
        }
    }

    #[test]
    fn distance_never_increases_and_topology_is_kept() {
        let grammar = Grammar::builtin();
        let target = target("s(12,12,6)c(22,20,5)+t(16,16,4)-", 32);
        let refiner = Refiner::new(&grammar, config(Metric::Chamfer, 4));
        for source in [
            "s(10,14,5)c(20,20,7)+t(16,16,4)-",
            "c(4,4,2)s(25,25,3)*",
            "t(16,16,12)",
        ] {
            let outcome = refiner.optimize(source, &target).expect("metric");
            assert!(outcome.distance <= outcome.initial_distance, "{source}");
            assert!(outcome.rounds <= 4);
            let before = parse(source, &grammar).expect("source parses");
            let after = parse(&outcome.expression, &grammar).expect("result parses");
            assert!(after.same_topology(&before), "{source}");
        }
    }

    #[test]
    fn zero_rounds_returns_canonical_input() {
        let grammar = Grammar::builtin();
        let target = target("c(16,16,6)", 32);
        let refiner = Refiner::new(&grammar, config(Metric::Iou, 0));
        let outcome = refiner.optimize(" c(12, 16, 6) $", &target).expect("metric");
        assert_eq!(outcome.expression, "c(12,16,6)");
        assert_eq!(outcome.rounds, 0);
        assert_eq!(outcome.distance, outcome.initial_distance);
    }

    #[test]
    fn malformed_candidates_fall_back() {
        let grammar = Grammar::builtin();
        let target = target("c(16,16,6)", 32);
        let refiner = Refiner::new(&grammar, config(Metric::Chamfer, 3));
        let worst = Metric::Chamfer.worst_distance(target.shape());

        for source in ["c(1,2", "+", "c(1,1,1)c(2,2,2)", "sp(4,4,4,2)"] {
            let outcome = refiner.optimize(source, &target).expect("metric");
            assert!(outcome.is_fallback(), "{source}");
            assert_eq!(outcome.expression, source);
            assert_eq!(outcome.distance, worst);
            assert_eq!(outcome.improvement(), 0.0);
        }

        let long = "c(1,1,1)c(2,2,2)+c(3,3,3)+c(4,4,4)+c(5,5,5)+c(6,6,6)+c(7,7,7)+c(8,8,8)+";
        let err = refiner.try_optimize(long, &target).expect_err("too long");
        assert_eq!(
            err,
            RefinementError::Parse(ParseError::TooLong {
                tokens: 15,
                budget: 13
            })
        );
    }

    #[test]
    fn stack_bound_rejects_deep_programs() {
        let grammar = Grammar::builtin();
        let target = target("c(16,16,6)", 32);
        let refiner = Refiner::new(
            &grammar,
            RefineConfig {
                stack_size: 2,
                ..RefineConfig::default()
            },
        );
        let err = refiner
            .try_optimize("c(2,2,1)c(4,4,1)c(6,6,1)++", &target)
            .expect_err("depth 3");
        assert!(matches!(err, RefinementError::Render(_)));
    }

    #[test]
    fn proposals_skip_negative_sizes() {
        let grammar = Grammar::builtin();
        let expression = parse("c(8,8,1)", &grammar).expect("parses");
        let all = proposals(&expression, &[8.0, 4.0, 2.0, 1.0]);
        assert_eq!(all.len(), 3 * 8 - 3);
        assert_eq!(all[0].to_canonical(), "c(16,8,1)");
        assert_eq!(all[1].to_canonical(), "c(0,8,1)");
        assert_eq!(all.last().map(|e| e.to_canonical()).as_deref(), Some("c(8,8,0)"));
    }

    #[test]
    fn negative_sizes_can_move_and_grow() {
        let grammar = Grammar::builtin();
        let expression = parse("c(16,16,-20)", &grammar).expect("parses");
        let all = proposals(&expression, &[8.0, 4.0, 2.0, 1.0])
            .iter()
            .map(|e| e.to_canonical())
            .collect::<Vec<_>>();
        assert_eq!(all.len(), 8 + 8 + 4);
        assert_eq!(all[0], "c(24,16,-20)");
        assert!(all.contains(&"c(16,16,-12)".to_string()));
        assert!(!all.contains(&"c(16,16,-28)".to_string()));

        let target = target("c(16,16,6)", 32);
        let refiner = Refiner::new(&grammar, config(Metric::Chamfer, 3));
        let outcome = refiner.optimize("c(16,16,-4)", &target).expect("metric");
        assert_eq!(outcome.status, RefineStatus::Refined);
        assert_eq!(outcome.expression, "c(16,16,6)");
        assert_eq!(outcome.distance, 0.0);
    }

    #[test]
    fn round_cap_stops_an_improving_search() {
        let grammar = Grammar::builtin();
        let target = target("c(16,16,6)", 32);
        let capped = Refiner::new(&grammar, config(Metric::Chamfer, 1))
            .optimize("c(10,16,6)", &target)
            .expect("metric");
        assert_eq!(capped.rounds, 1);
        assert!(capped.distance > 0.0);
        assert!(capped.distance < capped.initial_distance);

        let uncapped = Refiner::new(&grammar, config(Metric::Chamfer, 5))
            .optimize("c(10,16,6)", &target)
            .expect("metric");
        assert!(uncapped.rounds > 1);
        assert!(uncapped.distance < capped.distance);
    }

    #[test]
    fn free_function_matches_refiner() {
        let grammar = Grammar::builtin();
        let target = target("c(16,16,6)", 32);
        let (text, distance) =
            optimize_expression("c(12,16,6)", &target, Metric::Chamfer, 7, 13, 1, &grammar)
                .expect("metric");
        assert_eq!(text, "c(16,16,6)");
        assert_eq!(distance, 0.0);
    }
}
