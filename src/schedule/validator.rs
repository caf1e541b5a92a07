//! Post-load validators.
//!
//! Validators run after the last step completes, sequentially and
//! read-only. A failing validator reports a diagnostic and never blocks the
//! ones after it.

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::model::Registry;

/// A read-only consistency check over the fully loaded registry.
pub struct Validator {
    pub name: String,
    check: Box<dyn Fn(&Registry, &DiagnosticSink) -> Result<(), String> + Send + Sync>,
}

impl Validator {
    pub fn new(
        name: impl Into<String>,
        check: impl Fn(&Registry, &DiagnosticSink) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            check: Box::new(check),
        }
    }

    pub fn run(&self, registry: &Registry, sink: &DiagnosticSink) -> Result<(), String> {
        (self.check)(registry, sink)
    }
}

/// Run every validator in order. Returns whether all of them passed.
pub fn run_validators(
    validators: &[Validator],
    registry: &Registry,
    sink: &DiagnosticSink,
) -> bool {
    let mut all_passed = true;
    for validator in validators {
        if let Err(reason) = validator.run(registry, sink) {
            tracing::warn!("validator '{}' failed: {reason}", validator.name);
            sink.push(
                Diagnostic::error("<validation>", 0, 0, "validator '{}' failed: {}")
                    .with_arg(&validator.name)
                    .with_arg(reason),
            );
            all_passed = false;
        }
    }
    all_passed
}
