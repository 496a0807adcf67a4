//! Send engine for the drover campaign sender
//!
//! This crate provides everything one campaign run needs:
//! - Durable, crash-resumable per-recipient delivery state
//! - Bounded exponential-backoff retry around the remote send call
//! - Rate limiting: per-email delay, batching, daily cap, error cooldown
//! - Message building from per-campaign templates
//! - The transport seam to the remote mail API (HTTP adapter and mocks)

mod config;
mod context;
mod error;
mod journal;
mod message;
mod pacer;
mod preflight;
mod recipients;
mod reporting;
mod retry;
mod runner;
mod state;
pub mod template;
pub mod transport;

pub use config::{ApiConfig, CampaignConfig};
pub use context::RunContext;
pub use error::EngineError;
pub use journal::{SentLog, SentThreadIndex, ThreadEntry};
pub use message::{MessageBuilder, OutgoingMessage};
pub use pacer::{Pacer, PacingPolicy, Verdict};
pub use preflight::{PreflightReport, preflight};
pub use recipients::{RecipientRow, load_recipients};
pub use reporting::{StatsRow, build_stats, write_stats};
pub use retry::{BackoffPolicy, JITTER_RATIO, send_with_retry};
pub use runner::{CampaignRunner, RunSummary};
pub use state::{RecipientState, RecipientStatus, SendStateStore};
