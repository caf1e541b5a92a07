//! Execution order: priority closure first, then the rest, both
//! topologically sorted.

use rustc_hash::FxHashSet;

use super::runner::ScheduleError;
use super::step::{LoadingStep, StepId};

/// Compute the final execution order.
///
/// The transitive-dependency closure of every priority-flagged step is
/// sorted and placed first; the remaining steps follow in their own
/// topological order. A dependency cycle fails fast.
pub fn compute_order(steps: &[LoadingStep]) -> Result<Vec<StepId>, ScheduleError> {
    let priority = priority_closure(steps);

    let priority_ids: Vec<StepId> = (0..steps.len())
        .map(StepId)
        .filter(|id| priority.contains(id))
        .collect();
    let all_ids: Vec<StepId> = (0..steps.len()).map(StepId).collect();

    let sorted_priority = topo_sort(steps, &priority_ids)?;
    let sorted_all = topo_sort(steps, &all_ids)?;

    let mut order = sorted_priority;
    order.extend(sorted_all.into_iter().filter(|id| !priority.contains(id)));
    Ok(order)
}

/// Every priority step plus everything it transitively depends on.
pub(super) fn priority_closure(steps: &[LoadingStep]) -> FxHashSet<StepId> {
    let mut closure = FxHashSet::default();
    let mut stack: Vec<StepId> = (0..steps.len())
        .map(StepId)
        .filter(|id| steps[id.0].has_priority)
        .collect();
    while let Some(id) = stack.pop() {
        if closure.insert(id) {
            stack.extend(steps[id.0].dependencies.iter().copied());
        }
    }
    closure
}

/// Kahn's algorithm over a subset of steps; dependencies outside the subset
/// are ignored. Deterministic: ready steps release in index order.
fn topo_sort(steps: &[LoadingStep], subset: &[StepId]) -> Result<Vec<StepId>, ScheduleError> {
    let members: FxHashSet<StepId> = subset.iter().copied().collect();
    let mut in_degree: Vec<usize> = vec![0; steps.len()];
    for &id in subset {
        in_degree[id.0] = steps[id.0]
            .dependencies
            .iter()
            .filter(|dep| members.contains(dep))
            .count();
    }

    let mut ready: Vec<StepId> = subset
        .iter()
        .copied()
        .filter(|id| in_degree[id.0] == 0)
        .collect();
    ready.sort_by_key(|id| std::cmp::Reverse(id.0));

    let mut order = Vec::with_capacity(subset.len());
    while let Some(id) = ready.pop() {
        order.push(id);
        for &other in subset {
            let released = steps[other.0]
                .dependencies
                .iter()
                .filter(|dep| **dep == id)
                .count();
            if released > 0 && members.contains(&other) {
                in_degree[other.0] -= released;
                if in_degree[other.0] == 0 {
                    // Keep index order among newly released steps.
                    let pos = ready
                        .binary_search_by_key(&std::cmp::Reverse(other.0), |r| {
                            std::cmp::Reverse(r.0)
                        })
                        .unwrap_or_else(|p| p);
                    ready.insert(pos, other);
                }
            }
        }
    }

    if order.len() != subset.len() {
        return Err(ScheduleError::Cycle);
    }
    Ok(order)
}
