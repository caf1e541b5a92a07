//! The batch loop: dispatch ready steps into lanes, await the first
//! completion, repeat.
//!
//! Heavy steps run on a dedicated worker lane and never overlap each other;
//! light steps each get their own scoped thread. While any priority step is
//! pending the ready batch is exactly that one step. On the first hard
//! failure a shared cancellation token aborts all in-flight and
//! not-yet-started work. No ready batch while work remains is a deadlock
//! and fails fast with the residual count.

use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use super::order::{compute_order, priority_closure};
use super::step::{LoadingStep, StepContext, StepId, StepOutcome};

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("dependency cycle among loading steps")]
    Cycle,

    #[error("scheduling deadlock: {remaining} steps can never become ready")]
    Deadlock { remaining: usize },

    #[error("step '{step}' failed: {reason}")]
    StepFailed { step: String, reason: String },
}

/// Aggregate result of a successful run.
#[derive(Debug)]
pub struct RunSummary {
    /// Steps that completed successfully.
    pub succeeded: usize,
    /// Total wall time of the run.
    pub elapsed: Duration,
}

pub struct Scheduler {
    /// Unload-then-retry attempts granted to a recoverable step failure.
    retry_limit: usize,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self { retry_limit: 3 }
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retry_limit(mut self, retry_limit: usize) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    /// Execute all steps. On return every step's `succeeded_last` and
    /// `duration` reflect this run.
    pub fn run(
        &self,
        steps: &mut [LoadingStep],
        ctx: &StepContext,
    ) -> Result<RunSummary, ScheduleError> {
        let order = compute_order(steps)?;
        let priority = priority_closure(steps);
        let started = Instant::now();

        // Shared progress counter, read by UI tooling mid-run.
        let succeeded = Arc::new(Mutex::new(0usize));
        let mut results: Vec<Option<(bool, Duration)>> = (0..steps.len()).map(|_| None).collect();

        let run_result = std::thread::scope(|scope| {
            let (results_tx, results_rx) = mpsc::channel::<(StepId, StepOutcome, Duration)>();
            let (heavy_tx, heavy_rx) = mpsc::channel::<StepId>();

            // Dedicated heavy lane: one worker, so heavy steps are mutually
            // exclusive by construction.
            let steps_ref: &[LoadingStep] = steps;
            let heavy_results = results_tx.clone();
            let retry_limit = self.retry_limit;
            scope.spawn(move || {
                while let Ok(id) = heavy_rx.recv() {
                    let outcome = execute_with_retry(&steps_ref[id.0], ctx, retry_limit);
                    if heavy_results.send(outcome_message(id, outcome)).is_err() {
                        break;
                    }
                }
            });

            let mut pending: Vec<StepId> = order.clone();
            let mut in_flight: FxHashSet<StepId> = FxHashSet::default();
            let mut heavy_in_flight = false;
            let mut completed = vec![false; steps.len()];

            loop {
                if pending.is_empty() && in_flight.is_empty() {
                    break;
                }

                let batch = if ctx.cancel.is_cancelled() {
                    Vec::new()
                } else {
                    select_batch(steps_ref, &pending, &in_flight, &completed, &priority, heavy_in_flight)
                };

                if batch.is_empty() && in_flight.is_empty() {
                    if ctx.cancel.is_cancelled() {
                        return Err(ScheduleError::StepFailed {
                            step: "<cancelled>".into(),
                            reason: "run cancelled".into(),
                        });
                    }
                    // Work remains but nothing can ever become ready.
                    return Err(ScheduleError::Deadlock {
                        remaining: pending.len(),
                    });
                }

                for id in batch {
                    pending.retain(|p| *p != id);
                    in_flight.insert(id);
                    let step = &steps_ref[id.0];
                    tracing::debug!("dispatching step '{}' (heavy={})", step.name, step.is_heavy);
                    if step.is_heavy {
                        heavy_in_flight = true;
                        heavy_tx.send(id).expect("heavy lane alive for the whole run");
                    } else {
                        let light_results = results_tx.clone();
                        scope.spawn(move || {
                            let outcome = execute_with_retry(&steps_ref[id.0], ctx, retry_limit);
                            let _ = light_results.send(outcome_message(id, outcome));
                        });
                    }
                }

                // Await the first completion of the in-flight set.
                let (id, outcome, duration) =
                    results_rx.recv().expect("a sender exists while work is in flight");
                in_flight.remove(&id);
                if steps_ref[id.0].is_heavy {
                    heavy_in_flight = false;
                }

                match outcome {
                    StepOutcome::Success => {
                        *succeeded.lock() += 1;
                        completed[id.0] = true;
                        results[id.0] = Some((true, duration));
                        tracing::debug!(
                            "step '{}' succeeded in {duration:?}",
                            steps_ref[id.0].name
                        );
                    }
                    StepOutcome::Reload => unreachable!("retries resolve inside the worker"),
                    StepOutcome::Fatal(reason) => {
                        results[id.0] = Some((false, duration));
                        ctx.cancel.cancel();
                        // Drain in-flight work before surfacing the failure.
                        while !in_flight.is_empty() {
                            let (other, _, _) =
                                results_rx.recv().expect("in-flight steps still report");
                            in_flight.remove(&other);
                        }
                        return Err(ScheduleError::StepFailed {
                            step: steps_ref[id.0].name.clone(),
                            reason,
                        });
                    }
                }
            }
            Ok(())
        });

        for (id, slot) in results.into_iter().enumerate() {
            if let Some((ok, duration)) = slot {
                steps[id].succeeded_last = ok;
                steps[id].duration = ok.then_some(duration);
            }
        }
        run_result?;

        let succeeded = *succeeded.lock();
        let elapsed = started.elapsed();
        tracing::debug!("run complete: {succeeded} steps in {elapsed:?}");
        Ok(RunSummary { succeeded, elapsed })
    }
}

fn outcome_message(id: StepId, (outcome, duration): (StepOutcome, Duration)) -> (StepId, StepOutcome, Duration) {
    (id, outcome, duration)
}

/// Run one step, resolving recoverable failures with unload-then-retry in a
/// bounded loop.
fn execute_with_retry(
    step: &LoadingStep,
    ctx: &StepContext,
    retry_limit: usize,
) -> (StepOutcome, Duration) {
    let started = Instant::now();
    if ctx.cancel.is_cancelled() {
        return (StepOutcome::Fatal("run cancelled".into()), started.elapsed());
    }
    for attempt in 0..=retry_limit {
        match step.execute(ctx) {
            StepOutcome::Success => return (StepOutcome::Success, started.elapsed()),
            StepOutcome::Reload => {
                if attempt == retry_limit {
                    return (
                        StepOutcome::Fatal(format!(
                            "still requesting reload after {retry_limit} retries"
                        )),
                        started.elapsed(),
                    );
                }
                tracing::warn!(
                    "step '{}' requested reload (attempt {}), unloading its types",
                    step.name,
                    attempt + 1
                );
                ctx.registry.lock().unload_types(&step.parsed_types);
            }
            StepOutcome::Fatal(reason) => {
                return (StepOutcome::Fatal(reason), started.elapsed());
            }
        }
        if ctx.cancel.is_cancelled() {
            return (StepOutcome::Fatal("run cancelled".into()), started.elapsed());
        }
    }
    unreachable!("loop returns on every branch")
}

/// Pick the next ready batch.
///
/// While any priority step is pending the batch is exactly the first ready
/// priority step (serialized). Otherwise scan the remaining steps from the
/// end backward, greedily collecting every ready light step; one heavy step
/// may join, and once it does collection stops.
fn select_batch(
    steps: &[LoadingStep],
    pending: &[StepId],
    in_flight: &FxHashSet<StepId>,
    completed: &[bool],
    priority: &FxHashSet<StepId>,
    heavy_in_flight: bool,
) -> Vec<StepId> {
    let ready = |id: StepId| {
        steps[id.0]
            .dependencies
            .iter()
            .all(|dep| completed[dep.0])
    };

    if pending.iter().any(|id| priority.contains(id)) || in_flight.iter().any(|id| priority.contains(id)) {
        if !in_flight.is_empty() {
            return Vec::new();
        }
        return pending
            .iter()
            .find(|id| priority.contains(id) && ready(**id))
            .map(|id| vec![*id])
            .unwrap_or_default();
    }

    let mut batch = Vec::new();
    for &id in pending.iter().rev() {
        if !ready(id) {
            continue;
        }
        if steps[id.0].is_heavy {
            if heavy_in_flight {
                continue;
            }
            batch.push(id);
            break;
        }
        batch.push(id);
    }
    batch
}
