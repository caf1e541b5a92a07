//! Scheduler Tests - Dependency-Ordered Parallel Loading
//!
//! Runtime behavior of the loading scheduler: dependency ordering, priority
//! closures, heavy-lane exclusivity, unload-then-retry, and fatal aborts.

mod helpers;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use modforge::diagnostics::DiagnosticSink;
use modforge::model::{DomainObject, Registry, Value};
use modforge::schedule::{
    LoadingStep, ScheduleError, Scheduler, StepContext, StepId, StepOutcome,
};
use modforge::Span;

/// Records the completion order of steps across worker threads.
#[derive(Clone, Default)]
struct Trace(Arc<Mutex<Vec<String>>>);

impl Trace {
    fn mark(&self, name: &str) {
        self.0.lock().push(name.to_string());
    }

    fn names(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    fn position(&self, name: &str) -> usize {
        self.names()
            .iter()
            .position(|n| n == name)
            .unwrap_or_else(|| panic!("step '{name}' never completed"))
    }
}

fn context() -> StepContext {
    let (set, _) = helpers::equipment_schemas();
    StepContext::new(Registry::new(set), DiagnosticSink::new())
}

fn tracked(name: &str, trace: &Trace) -> LoadingStep {
    let trace = trace.clone();
    let step_name = name.to_string();
    LoadingStep::new(name, move |_| {
        trace.mark(&step_name);
        StepOutcome::Success
    })
}

#[test]
fn test_dependencies_complete_before_dependents() {
    let trace = Trace::default();
    let mut steps = vec![
        tracked("countries", &trace),
        tracked("units", &trace).depends_on([StepId(0)]),
        tracked("divisions", &trace).depends_on([StepId(1)]),
        tracked("terrain", &trace),
    ];

    let summary = Scheduler::new().run(&mut steps, &context()).unwrap();
    assert_eq!(summary.succeeded, 4);
    assert!(trace.position("countries") < trace.position("units"));
    assert!(trace.position("units") < trace.position("divisions"));
    for step in &steps {
        assert!(step.succeeded_last);
        assert!(step.duration.is_some());
    }
}

#[test]
fn test_priority_closure_runs_before_everything_else() {
    // divisions is priority; its closure (countries, units, divisions) must
    // all finish before the unrelated steps start.
    let trace = Trace::default();
    let mut steps = vec![
        tracked("countries", &trace),
        tracked("units", &trace).depends_on([StepId(0)]),
        tracked("divisions", &trace).depends_on([StepId(1)]).priority(),
        tracked("terrain", &trace),
        tracked("weather", &trace),
    ];

    Scheduler::new().run(&mut steps, &context()).unwrap();
    let closure_done = trace.position("divisions");
    assert!(trace.position("countries") < closure_done);
    assert!(trace.position("units") < closure_done);
    assert!(closure_done < trace.position("terrain"));
    assert!(closure_done < trace.position("weather"));
}

#[test]
fn test_heavy_steps_never_overlap() {
    let concurrent = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let heavy = |name: &str| {
        let concurrent = Arc::clone(&concurrent);
        let peak = Arc::clone(&peak);
        LoadingStep::new(name, move |_| {
            let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(10));
            concurrent.fetch_sub(1, Ordering::SeqCst);
            StepOutcome::Success
        })
        .heavy()
    };

    let mut steps = vec![heavy("map"), heavy("history"), heavy("graphics")];
    let summary = Scheduler::new().run(&mut steps, &context()).unwrap();
    assert_eq!(summary.succeeded, 3);
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[test]
fn test_light_steps_run_concurrently_with_a_heavy_one() {
    let trace = Trace::default();
    let mut steps = vec![
        {
            let trace = trace.clone();
            LoadingStep::new("heavy", move |_| {
                std::thread::sleep(std::time::Duration::from_millis(20));
                trace.mark("heavy");
                StepOutcome::Success
            })
            .heavy()
        },
        tracked("light_a", &trace),
        tracked("light_b", &trace),
    ];

    let summary = Scheduler::new().run(&mut steps, &context()).unwrap();
    assert_eq!(summary.succeeded, 3);
    // Both light steps finish while the heavy step sleeps.
    assert_eq!(trace.names().last().map(String::as_str), Some("heavy"));
}

#[test]
fn test_reload_unloads_types_and_retries() {
    let ctx = context();
    let (set, type_id) = helpers::equipment_schemas();
    let _ = set;
    let attempts = Arc::new(AtomicUsize::new(0));

    let attempts_in_step = Arc::clone(&attempts);
    let mut steps = vec![
        LoadingStep::new("equipment", move |ctx: &StepContext| {
            let attempt = attempts_in_step.fetch_add(1, Ordering::SeqCst);
            let mut registry = ctx.registry.lock();
            registry.insert(DomainObject::new(
                "sword",
                type_id,
                None,
                Span::new(0, 0, 0, 0),
            ));
            if attempt == 0 {
                // First pass noticed stale data and asks for a clean slate.
                StepOutcome::Reload
            } else {
                StepOutcome::Success
            }
        })
        .parses([type_id]),
    ];

    let summary = Scheduler::new().run(&mut steps, &ctx).unwrap();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    // The retry re-inserted exactly one object; the first pass was unloaded.
    let registry = ctx.registry.lock();
    assert_eq!(registry.of_type(type_id).len(), 1);
    let id = registry.find(type_id, "sword").unwrap();
    assert_eq!(registry.get(id).unwrap().get("damage"), None::<&Value>);
}

#[test]
fn test_reload_forever_exhausts_retry_limit() {
    let mut steps = vec![LoadingStep::new("flaky", |_| StepOutcome::Reload)];
    let err = Scheduler::new()
        .with_retry_limit(2)
        .run(&mut steps, &context())
        .unwrap_err();
    match err {
        ScheduleError::StepFailed { step, reason } => {
            assert_eq!(step, "flaky");
            assert!(reason.contains("2"));
        }
        other => panic!("expected StepFailed, got {other:?}"),
    }
    assert!(!steps[0].succeeded_last);
}

#[test]
fn test_fatal_step_cancels_the_run() {
    let trace = Trace::default();
    let mut steps = vec![
        {
            let trace = trace.clone();
            LoadingStep::new("broken", move |_| {
                trace.mark("broken");
                StepOutcome::Fatal("corrupt database".into())
            })
        },
        tracked("after", &trace).depends_on([StepId(0)]),
    ];

    let ctx = context();
    let err = Scheduler::new().run(&mut steps, &ctx).unwrap_err();
    assert!(matches!(err, ScheduleError::StepFailed { .. }));
    assert!(ctx.cancel.is_cancelled());
    // The dependent never ran.
    assert!(!trace.names().contains(&"after".to_string()));
}

#[test]
fn test_cycle_is_rejected_before_any_step_runs() {
    let trace = Trace::default();
    let mut steps = vec![
        tracked("a", &trace).depends_on([StepId(1)]),
        tracked("b", &trace).depends_on([StepId(0)]),
    ];
    let err = Scheduler::new().run(&mut steps, &context()).unwrap_err();
    assert!(matches!(err, ScheduleError::Cycle));
    assert!(trace.names().is_empty());
}
