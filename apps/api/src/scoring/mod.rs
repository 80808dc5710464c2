// Deterministic scoring: keyword matching, the five weighted components,
// and rule-based suggestion generation. Everything here is pure over the
// record and job spec so identical inputs always produce identical output.

pub mod engine;
pub mod matcher;
pub mod suggestions;
