pub mod app;
pub mod cache;
pub mod config;
pub mod error;
pub mod locks;
pub mod services;
pub mod startup;
pub mod upstream;
pub mod util;

pub use app::{AppConfig, AppState};
pub use cache::{CacheStats, EfficiencyCache};
pub use config::{RangeParams, WatchdogConfig};
pub use error::{ApiError, AppError, Result};
pub use locks::ProjectLocks;
pub use services::AppServices;
pub use startup::{AppPaths, ensure_app_data_dir};
pub use upstream::{HttpUpstream, Provider, Upstream, UpstreamError, UpstreamRequest, UpstreamResponse};
pub use util::time::{normalize_rfc3339_to_utc, range_from_label, resolve_range};
