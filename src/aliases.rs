//! Short names for verbose third-party types.

/// Diesel's query error, used to tell "no rows" apart from real failures.
pub type DieselError = diesel::result::Error;
