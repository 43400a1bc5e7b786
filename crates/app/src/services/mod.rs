mod efficiency;
mod guard;
mod pricing;
mod projects;
mod proxy;

use std::sync::Arc;

use crate::app::AppConfig;
use crate::cache::EfficiencyCache;
use crate::error::Result;
use crate::locks::ProjectLocks;
use crate::upstream::Upstream;
use watchdog_db::Db;

pub use efficiency::EfficiencyService;
pub use guard::{Assessment, Cooldown, GuardRequest, GuardService, Verdict};
pub use pricing::{ModelPriceEntry, PricingList, PricingService};
pub use projects::{FeedbackInput, ProjectsService, PurgeSummary, Warning, WarningDetails};
pub use proxy::{
    DEFAULT_PROJECT_ID, ProxyRequest, ProxyResponse, ProxyService, extract_usage,
    normalize_project_id, parse_messages,
};

type SharedConfig = Arc<AppConfig>;

/// Service registry for app-level operations.
#[derive(Clone)]
pub struct AppServices {
    pub guard: GuardService,
    pub proxy: ProxyService,
    pub projects: ProjectsService,
    pub efficiency: EfficiencyService,
    pub pricing: PricingService,
}

impl AppServices {
    pub fn new(config: &AppConfig, upstream: Arc<dyn Upstream>) -> Self {
        let shared = Arc::new(config.clone());
        let cache = EfficiencyCache::default();
        let locks = ProjectLocks::new();
        let guard = GuardService::new(shared.clone(), locks.clone());
        Self {
            proxy: ProxyService::new(guard.clone(), upstream),
            guard,
            projects: ProjectsService::new(shared.clone(), cache.clone(), locks),
            efficiency: EfficiencyService::new(shared.clone(), cache),
            pricing: PricingService::new(shared),
        }
    }
}

fn open_db(config: &SharedConfig) -> Result<Db> {
    Ok(Db::open(&config.db_path)?)
}
