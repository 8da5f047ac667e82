//! Domain model
//!
//! Entities and value types shared across the ingestion pipeline, the
//! analytics engine, and the read API.

pub mod analytics;
pub mod errors;
pub mod fund;
pub mod nav;
pub mod newtypes;
pub mod pipeline;
pub mod sync;

pub use analytics::{AnalyticsRow, Window};
pub use errors::DomainError;
pub use fund::Fund;
pub use nav::NavPoint;
pub use newtypes::SchemeCode;
pub use pipeline::{PipelinePhase, PipelineState, PipelineStatus};
pub use sync::{SyncState, SyncStatus, SyncType};
