//! Reserved words of the script language.
//!
//! Override markers are the only reserved identifiers: a top-level key whose
//! first word is one of these is an override header, not an ordinary object
//! key. The overwhelming majority of keys are lowercase identifiers, so
//! callers guard with [`may_be_marker`] before the set lookup.

pub const INJECT: &str = "INJECT";
pub const TRY_INJECT: &str = "TRY_INJECT";
pub const INJECT_OR_CREATE: &str = "INJECT_OR_CREATE";
pub const REPLACE: &str = "REPLACE";
pub const TRY_REPLACE: &str = "TRY_REPLACE";
pub const REPLACE_OR_CREATE: &str = "REPLACE_OR_CREATE";

/// Cheap first-character guard: every marker starts with an upper-case
/// ASCII letter, almost no ordinary key does.
pub fn may_be_marker(word: &str) -> bool {
    word.as_bytes()
        .first()
        .is_some_and(|b| b.is_ascii_uppercase())
}

/// Full set membership test, only reached after [`may_be_marker`] passes.
pub fn is_marker(word: &str) -> bool {
    matches!(
        word,
        INJECT | TRY_INJECT | INJECT_OR_CREATE | REPLACE | TRY_REPLACE | REPLACE_OR_CREATE
    )
}
