//! Directory scanning and the per-file pipeline.

mod pipeline;
mod probe;
mod scan_loop;
mod walker;

pub use pipeline::{FileOutcome, FilePipeline, FileStage};
pub use probe::{DurationProbe, FfprobeProbe};
pub use scan_loop::{ScanLoop, ScanSummary};
pub use walker::{enumerate, select_root};
