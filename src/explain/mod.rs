//! Explanation Recorder.
//!
//! Rulings carry their provenance; the recorder collects it into an
//! append-only trace per action without touching engine behaviour.

pub mod citation;
pub mod recorder;

pub use citation::Citation;
pub use recorder::{ExplanationLog, ExplanationRecorder, Provenance, Trace, TraceEntry};
