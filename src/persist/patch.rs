//! Span splicing: build a new file buffer from copy/insert operations.
//!
//! Edits are expressed as a functional op list over the original text
//! rather than in-place buffer mutation, so multiple interacting edits
//! cannot drift each other's indexes. Because edits never reorder content,
//! later spans stay valid against the original text throughout the pass.

use crate::base::Span;

/// One step of a patch pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOp<'a> {
    /// Copy an untouched slice of the original text verbatim.
    Copy(&'a str),
    /// Substitute freshly formatted text for one target span.
    Insert(String),
}

/// A target span with its replacement text and a caller handle.
pub type PatchTarget = (Span, String, usize);

/// Result of a patch pass.
#[derive(Debug)]
pub struct PatchOutcome {
    /// The complete new file content.
    pub content: String,
    /// `(handle, new span)` for every applied target, nested targets
    /// excluded.
    pub new_spans: Vec<(usize, Span)>,
}

#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("object spans {0:?} and {1:?} partially overlap")]
    Overlap(Span, Span),

    #[error("span {0:?} exceeds file length {1}")]
    OutOfBounds(Span, usize),
}

/// Apply all targets to `original`, substituting each target's replacement
/// at its exact span and copying every other byte verbatim.
///
/// Targets fully nested inside another target's span are dropped first: the
/// outer rewrite subsumes them. Partial overlap is an invariant violation
/// and fails the whole pass.
pub fn apply_patches(original: &str, targets: Vec<PatchTarget>) -> Result<PatchOutcome, PatchError> {
    let mut targets = targets;
    targets.sort_by_key(|(span, _, _)| span.offset);

    for (span, _, _) in &targets {
        if span.end() > original.len() {
            return Err(PatchError::OutOfBounds(*span, original.len()));
        }
    }
    // Overlap scan against the widest span seen so far, not just the
    // neighbor: a nested span sorted between two overlapping ones must not
    // mask the conflict. Any span starting before the running maximum end
    // is either fully nested in the span that produced it or an overlap.
    let mut widest: Option<Span> = None;
    for (span, _, _) in &targets {
        if let Some(max) = widest {
            if span.offset < max.end() && *span != max && !max.fully_contains(span) {
                return Err(PatchError::Overlap(max, *span));
            }
        }
        if widest.is_none_or(|max| span.end() > max.end()) {
            widest = Some(*span);
        }
    }

    // Drop targets subsumed by an enclosing rewrite.
    let outer: Vec<PatchTarget> = targets
        .iter()
        .enumerate()
        .filter(|(i, (span, _, _))| {
            !targets
                .iter()
                .enumerate()
                .any(|(j, (other, _, _))| *i != j && other.fully_contains(span))
        })
        .map(|(_, t)| t.clone())
        .collect();

    let ops = build_ops(original, &outer);
    Ok(apply_ops(ops, &outer))
}

fn build_ops<'a>(original: &'a str, targets: &[PatchTarget]) -> Vec<PatchOp<'a>> {
    let mut ops = Vec::with_capacity(targets.len() * 2 + 1);
    let mut cursor = 0usize;
    for (span, replacement, _) in targets {
        if cursor < span.offset {
            ops.push(PatchOp::Copy(&original[cursor..span.offset]));
        }
        ops.push(PatchOp::Insert(replacement.clone()));
        cursor = span.end();
    }
    if cursor < original.len() {
        ops.push(PatchOp::Copy(&original[cursor..]));
    }
    ops
}

fn apply_ops(ops: Vec<PatchOp<'_>>, targets: &[PatchTarget]) -> PatchOutcome {
    let mut content = String::with_capacity(ops.iter().map(op_len).sum());
    let mut new_spans = Vec::with_capacity(targets.len());
    let mut target_iter = targets.iter();
    let mut line = 0usize;
    let mut column = 0usize;

    for op in &ops {
        match op {
            PatchOp::Copy(slice) => {
                content.push_str(slice);
                advance(slice, &mut line, &mut column);
            }
            PatchOp::Insert(text) => {
                let (_, _, handle) = target_iter
                    .next()
                    .expect("one insert op per surviving target");
                new_spans.push((*handle, Span::new(content.len(), text.len(), line, column)));
                content.push_str(text);
                advance(text, &mut line, &mut column);
            }
        }
    }
    tracing::trace!("patched {} spans, {} bytes", new_spans.len(), content.len());
    PatchOutcome { content, new_spans }
}

fn op_len(op: &PatchOp<'_>) -> usize {
    match op {
        PatchOp::Copy(s) => s.len(),
        PatchOp::Insert(s) => s.len(),
    }
}

fn advance(text: &str, line: &mut usize, column: &mut usize) {
    for b in text.bytes() {
        if b == b'\n' {
            *line += 1;
            *column = 0;
        } else {
            *column += 1;
        }
    }
}
