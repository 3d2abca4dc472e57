//! Scanly Core - media library scanner.
//!
//! Watches a source directory for video files, works out what each file is
//! from its name, confirms the title against a local index and a remote
//! catalog, and links the file into a movies or shows library. Anything that
//! cannot be matched is recorded in a sidecar for manual review.
//!
//! # Example
//!
//! ```rust,ignore
//! use scanly_core::{CancellationToken, ScanConfig, ScanlyBuilder};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> scanly_core::Result<()> {
//!     let config = ScanConfig::from_env()?;
//!     let mut scan = ScanlyBuilder::new(config).build(CancellationToken::new()).await?;
//!
//!     let summary = scan.run_pass().await?;
//!     println!("Linked {} files", summary.linked());
//!
//!     Ok(())
//! }
//! ```

pub mod analyzer;
pub mod cancel;
pub mod config;
pub mod enrich;
pub mod error;
pub mod link;
pub mod matching;
pub mod models;
pub mod planner;
pub mod providers;
pub mod scan;
pub mod state;

mod builder;

// Re-export commonly used types
pub use analyzer::{analyze, FilenameAnalysis};
pub use builder::ScanlyBuilder;
pub use cancel::CancellationToken;
pub use config::{HintConfig, ScanConfig};
pub use enrich::{CapabilityBreaker, FilenameHint, HintEnricher, HintProvider};
pub use error::{Result, ScanlyError};
pub use link::{LinkKind, LinkManager, LinkOutcome};
pub use matching::{CandidateResolver, Resolution};
pub use models::{DestinationPlan, MediaCandidate, MediaType, MetadataMatch, TitleKind};
pub use planner::DestinationPlanner;
pub use providers::{RemoteCatalog, TitleCatalog, TitleIndex, TmdbClient};
pub use scan::{FileOutcome, FilePipeline, ScanLoop, ScanSummary};
pub use state::StateStore;
