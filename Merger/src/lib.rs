//! Concatenation of MP4 files without re-encoding.
//!
//! Compressed samples are copied verbatim from each input into one progressive output file.
//! Presentation timestamps are offset per file so playback stays continuous across the joins.
//! The first input fixes the output shape: at most one video and one audio track.

pub mod catalog;
pub mod config;
pub mod continuity;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod service;
pub mod source;
pub mod types;

pub use config::{ConfigError, MergeConfig};
pub use error::MergeError;
pub use orchestrator::{MergeOrchestrator, MergeResult, MergeState};
pub use progress::{ProgressCallback, ProgressEvent, PROGRESS_EVENT};
pub use service::{merge_videos, MergeHandle, MergeRequest, MergeResponse, MergeService};
