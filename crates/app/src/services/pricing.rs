use serde::Serialize;

use crate::services::SharedConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelPriceEntry {
    pub model: String,
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricingList {
    pub default_model: String,
    pub exchange_rate_usd_to_cny: f64,
    pub models: Vec<ModelPriceEntry>,
}

#[derive(Clone)]
pub struct PricingService {
    config: SharedConfig,
}

impl PricingService {
    pub(super) fn new(config: SharedConfig) -> Self {
        Self { config }
    }

    /// The effective pricing table, sorted by model name.
    pub fn list(&self) -> PricingList {
        let pricing = &self.config.settings.pricing;
        let models = pricing
            .models
            .iter()
            .map(|(model, price)| ModelPriceEntry {
                model: model.clone(),
                input_per_1k: price.input_per_1k,
                output_per_1k: price.output_per_1k,
            })
            .collect();
        PricingList {
            default_model: pricing.default_model.clone(),
            exchange_rate_usd_to_cny: pricing.exchange_rate_usd_to_cny,
            models,
        }
    }
}
