//! Fundsight API - HTTP control plane and read surface
//!
//! A small hand-routed hyper server:
//!
//! | Method | Path | Behavior |
//! |---|---|---|
//! | POST | `/sync/trigger?mode=full\|incremental` | 202 accepted / 409 running / 400 bad mode |
//! | GET | `/sync/status` | pipeline row + sync-state histogram + limiter peek |
//! | GET | `/funds?category=&amc=` | fund list with case-insensitive filters |
//! | GET | `/funds/:code` | fund + latest NAV, 404 when absent |
//! | GET | `/funds/:code/analytics?window=` | analytics row, percentages ×100 at 1 decimal |
//! | GET | `/funds/rank?category=&window=&sort_by=&limit=` | ranking |
//! | GET | `/health` | liveness + limiter peek |
//! | GET | `/metrics` | Prometheus text exposition |
//!
//! Every request gets a UUID request ID, carried on the tracing span and
//! echoed in the `x-request-id` response header.

pub mod handlers;
pub mod metrics;
pub mod router;
pub mod server;
pub mod state;

pub use metrics::MetricsRegistry;
pub use server::ApiServer;
pub use state::AppState;
