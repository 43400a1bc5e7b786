use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use watchdog_core::{
    AnalyzerConfig, EquivalentPrices, FingerprintMethod, ModelPrice, PricingTable,
    RateLimitPolicy,
};

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RangeParams {
    pub range: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Everything read from `config.toml`. Missing sections and keys fall back to
/// their defaults, so an empty file is a valid configuration.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WatchdogConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub pricing: PricingConfig,
    pub analyzer: AnalyzerConfig,
    pub privacy: PrivacyConfig,
    pub advisor: AdvisorConfig,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub openai_base_url: String,
    pub anthropic_base_url: String,
    pub openrouter_base_url: String,
    pub custom_base_url: Option<String>,
    pub timeout_secs: u64,
    pub anthropic_version: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            openai_base_url: "https://api.openai.com".to_string(),
            anthropic_base_url: "https://api.anthropic.com".to_string(),
            openrouter_base_url: "https://openrouter.ai/api".to_string(),
            custom_base_url: None,
            timeout_secs: 120,
            anthropic_version: "2023-06-01".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PricingConfig {
    pub exchange_rate_usd_to_cny: f64,
    pub coffee_price_cny: f64,
    pub snack_price_cny: f64,
    pub meal_price_cny: f64,
    pub hotpot_price_cny: f64,
    pub default_model: String,
    pub models: BTreeMap<String, ModelPrice>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        let prices = EquivalentPrices::default();
        let table = PricingTable::default();
        Self {
            exchange_rate_usd_to_cny: prices.exchange_rate_usd_to_cny,
            coffee_price_cny: prices.coffee_price_cny,
            snack_price_cny: prices.snack_price_cny,
            meal_price_cny: prices.meal_price_cny,
            hotpot_price_cny: prices.hotpot_price_cny,
            default_model: table.default_model,
            models: table.models,
        }
    }
}

impl PricingConfig {
    pub fn table(&self) -> PricingTable {
        PricingTable {
            default_model: self.default_model.clone(),
            models: self.models.clone(),
        }
    }

    pub fn equivalent_prices(&self) -> EquivalentPrices {
        EquivalentPrices {
            exchange_rate_usd_to_cny: self.exchange_rate_usd_to_cny,
            coffee_price_cny: self.coffee_price_cny,
            snack_price_cny: self.snack_price_cny,
            meal_price_cny: self.meal_price_cny,
            hotpot_price_cny: self.hotpot_price_cny,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PrivacyConfig {
    /// Store the raw last user message instead of a fingerprint.
    pub store_request_content: bool,
    pub similarity_method: FingerprintMethod,
}

impl PrivacyConfig {
    pub fn fingerprint_method(&self) -> FingerprintMethod {
        if self.store_request_content {
            FingerprintMethod::Raw
        } else {
            self.similarity_method
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AdvisorConfig {
    pub enable_rate_limit: bool,
    pub max_cost_per_hour_usd: f64,
    pub cooldown_minutes: u32,
    pub warning_ratio: f64,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        let policy = RateLimitPolicy::default();
        Self {
            enable_rate_limit: policy.enabled,
            max_cost_per_hour_usd: policy.max_cost_per_hour_usd,
            cooldown_minutes: policy.cooldown_minutes,
            warning_ratio: policy.warning_ratio,
        }
    }
}

impl AdvisorConfig {
    pub fn rate_limit_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy {
            enabled: self.enable_rate_limit,
            max_cost_per_hour_usd: self.max_cost_per_hour_usd,
            cooldown_minutes: self.cooldown_minutes,
            warning_ratio: self.warning_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: WatchdogConfig = serde_json::from_str("{}").expect("parse");
        assert_eq!(config, WatchdogConfig::default());
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.privacy.fingerprint_method(), FingerprintMethod::Simhash);
        assert!(config.advisor.rate_limit_policy().enabled);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: WatchdogConfig = serde_json::from_str(
            r#"{
                "advisor": { "max_cost_per_hour_usd": 2.5 },
                "privacy": { "store_request_content": true },
                "pricing": { "models": { "local-model": { "input_per_1k": 0.0, "output_per_1k": 0.0 } } }
            }"#,
        )
        .expect("parse");
        let policy = config.advisor.rate_limit_policy();
        assert_eq!(policy.max_cost_per_hour_usd, 2.5);
        assert_eq!(policy.cooldown_minutes, 20);
        assert_eq!(config.privacy.fingerprint_method(), FingerprintMethod::Raw);
        let table = config.pricing.table();
        assert!(table.is_known("local-model"));
        assert_eq!(table.default_model, "gpt-4o");
        assert_eq!(config.pricing.equivalent_prices().coffee_price_cny, 15.0);
    }
}
