// Document structuring pipeline: raw lines → sections → entries → record.
// Each stage is pure over its inputs; no stage ever fails on malformed text.

pub mod builder;
pub mod dates;
pub mod normalizer;
pub mod segmenter;
