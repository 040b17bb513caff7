//! Cycle detection and dangling-input discovery for the rule graph.

use std::collections::HashMap;

use camino::Utf8PathBuf;

use super::{RuleGraph, RuleId};

/// Tracks the visitation state of a node during cycle detection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum VisitState {
    Visiting,
    Visited,
}

pub(crate) struct CycleDetectionReport {
    pub(crate) cycle: Option<Vec<Utf8PathBuf>>,
    /// `(rule output, input)` pairs whose input no rule produces.
    pub(crate) missing_dependencies: Vec<(Utf8PathBuf, Utf8PathBuf)>,
}

pub(crate) fn analyse(graph: &RuleGraph) -> CycleDetectionReport {
    let mut detector = CycleDetector::new(graph);
    let mut cycle = None;
    for (id, _) in graph.rules() {
        if detector.is_visited(id) {
            continue;
        }
        if let Some(found) = detector.visit(id) {
            cycle = Some(found);
            break;
        }
    }
    CycleDetectionReport {
        cycle,
        missing_dependencies: detector.missing_dependencies,
    }
}

struct CycleDetector<'a> {
    graph: &'a RuleGraph,
    stack: Vec<RuleId>,
    states: HashMap<RuleId, VisitState>,
    missing_dependencies: Vec<(Utf8PathBuf, Utf8PathBuf)>,
}

impl<'a> CycleDetector<'a> {
    fn new(graph: &'a RuleGraph) -> Self {
        Self {
            graph,
            stack: Vec::new(),
            states: HashMap::new(),
            missing_dependencies: Vec::new(),
        }
    }

    fn is_visited(&self, node: RuleId) -> bool {
        matches!(self.states.get(&node), Some(VisitState::Visited))
    }

    fn primary_output(&self, node: RuleId) -> Utf8PathBuf {
        self.graph
            .rule(node)
            .and_then(|rule| rule.outputs.first())
            .cloned()
            .unwrap_or_default()
    }

    fn visit(&mut self, node: RuleId) -> Option<Vec<Utf8PathBuf>> {
        match self.states.get(&node) {
            Some(VisitState::Visited) => return None,
            Some(VisitState::Visiting) => {
                let idx = self
                    .stack
                    .iter()
                    .position(|n| *n == node)
                    .unwrap_or_else(|| {
                        debug_assert!(false, "visiting node must be on the stack");
                        0
                    });
                let mut cycle: Vec<Utf8PathBuf> = self
                    .stack
                    .iter()
                    .skip(idx)
                    .map(|id| self.primary_output(*id))
                    .collect();
                cycle.push(self.primary_output(node));
                return Some(canonicalize_cycle(cycle));
            }
            None => {
                self.states.insert(node, VisitState::Visiting);
            }
        }

        self.stack.push(node);

        let graph = self.graph;
        if let Some(rule) = graph.rule(node) {
            for input in &rule.inputs {
                let Some(dep) = graph.resolve_dependents(input) else {
                    self.missing_dependencies
                        .push((self.primary_output(node), input.clone()));
                    continue;
                };
                if let Some(cycle) = self.visit(dep) {
                    return Some(cycle);
                }
            }
        }

        self.stack.pop();
        self.states.insert(node, VisitState::Visited);
        None
    }
}

fn canonicalize_cycle(mut cycle: Vec<Utf8PathBuf>) -> Vec<Utf8PathBuf> {
    if cycle.len() < 2 {
        return cycle;
    }
    let len = cycle.len() - 1;
    let start = cycle
        .iter()
        .take(len)
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map_or(0, |(idx, _)| idx);
    let (prefix, suffix) = cycle.split_at_mut(len);
    prefix.rotate_left(start);
    if let (Some(first), Some(slot)) = (prefix.first().cloned(), suffix.first_mut()) {
        slot.clone_from(&first);
    }
    cycle
}
