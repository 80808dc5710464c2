// Request-level orchestration: the analyzer runs the full pipeline for one
// resume/job pair, the enhancer applies accepted suggestions back onto a
// record, and handlers.rs exposes both over HTTP.

pub mod analyzer;
pub mod enhance;
pub mod handlers;
