//! Loading steps — the schedulable parse units.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::diagnostics::DiagnosticSink;
use crate::model::{Registry, TypeId};

/// Index of a step in the scheduler's step list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepId(pub usize);

/// How one execution of a step ended.
///
/// The scheduler branches on the tag: `Reload` triggers unload-then-retry
/// of that single step in a bounded loop, `Fatal` aborts the whole run via
/// cooperative cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Success,
    /// Recoverable: unload this step's types and run it again.
    Reload,
    /// Critical: abort the run and surface the reason.
    Fatal(String),
}

/// Shared state handed to every step execution.
#[derive(Clone)]
pub struct StepContext {
    /// The global registry; every write goes through this lock.
    pub registry: Arc<Mutex<Registry>>,
    pub sink: DiagnosticSink,
    /// Cooperative cancellation, observed at step boundaries.
    pub cancel: CancellationToken,
}

impl StepContext {
    pub fn new(registry: Registry, sink: DiagnosticSink) -> Self {
        Self {
            registry: Arc::new(Mutex::new(registry)),
            sink,
            cancel: CancellationToken::new(),
        }
    }
}

/// One schedulable parse unit.
pub struct LoadingStep {
    pub name: String,
    /// Steps that must report success before this one may start.
    pub dependencies: Vec<StepId>,
    /// CPU-bound steps run on the dedicated heavy lane, mutually exclusive
    /// within a wave.
    pub is_heavy: bool,
    /// Priority steps (plus their transitive dependencies) complete before
    /// any non-priority step starts.
    pub has_priority: bool,
    /// Object types this step populates; unloaded before a retry.
    pub parsed_types: Vec<TypeId>,
    /// Whether the most recent execution succeeded.
    pub succeeded_last: bool,
    /// Duration of the most recent successful execution.
    pub duration: Option<Duration>,
    run: Box<dyn Fn(&StepContext) -> StepOutcome + Send + Sync>,
}

impl LoadingStep {
    pub fn new(
        name: impl Into<String>,
        run: impl Fn(&StepContext) -> StepOutcome + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            is_heavy: false,
            has_priority: false,
            parsed_types: Vec::new(),
            succeeded_last: false,
            duration: None,
            run: Box::new(run),
        }
    }

    pub fn depends_on(mut self, steps: impl IntoIterator<Item = StepId>) -> Self {
        self.dependencies.extend(steps);
        self
    }

    pub fn heavy(mut self) -> Self {
        self.is_heavy = true;
        self
    }

    pub fn priority(mut self) -> Self {
        self.has_priority = true;
        self
    }

    pub fn parses(mut self, types: impl IntoIterator<Item = TypeId>) -> Self {
        self.parsed_types.extend(types);
        self
    }

    pub fn execute(&self, ctx: &StepContext) -> StepOutcome {
        (self.run)(ctx)
    }
}
