use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{model_matches_pattern, round_to};

pub const DEFAULT_PRICED_MODEL: &str = "gpt-4o";

/// Used when neither the model nor the configured default has a price.
const FALLBACK_PRICE: ModelPrice = ModelPrice {
    input_per_1k: 0.0025,
    output_per_1k: 0.010,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPrice {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

/// USD prices per 1K tokens keyed by model name or wildcard pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingTable {
    pub default_model: String,
    pub models: BTreeMap<String, ModelPrice>,
}

impl Default for PricingTable {
    fn default() -> Self {
        let models = [
            ("gpt-4o", 0.0025, 0.010),
            ("claude-3-5-sonnet-20241022", 0.003, 0.015),
            ("deepseek-chat", 0.00014, 0.00028),
        ]
        .into_iter()
        .map(|(model, input_per_1k, output_per_1k)| {
            (
                model.to_string(),
                ModelPrice {
                    input_per_1k,
                    output_per_1k,
                },
            )
        })
        .collect();
        Self {
            default_model: DEFAULT_PRICED_MODEL.to_string(),
            models,
        }
    }
}

impl PricingTable {
    /// Exact name first, then the most specific wildcard pattern, then the
    /// default model. Never fails.
    pub fn price_for(&self, model: &str) -> ModelPrice {
        if let Some(price) = self.models.get(model) {
            return *price;
        }
        let pattern_match = self
            .models
            .iter()
            .filter(|(pattern, _)| pattern.contains('*') && model_matches_pattern(model, pattern))
            .max_by_key(|(pattern, _)| pattern.len())
            .map(|(_, price)| *price);
        if let Some(price) = pattern_match {
            return price;
        }
        self.models
            .get(&self.default_model)
            .copied()
            .unwrap_or(FALLBACK_PRICE)
    }

    pub fn is_known(&self, model: &str) -> bool {
        self.models.contains_key(model)
            || self
                .models
                .keys()
                .any(|pattern| pattern.contains('*') && model_matches_pattern(model, pattern))
    }

    /// Cost in USD rounded to six decimals.
    pub fn cost_usd(&self, model: &str, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        let price = self.price_for(model);
        let input = prompt_tokens as f64 / 1000.0 * price.input_per_1k.max(0.0);
        let output = completion_tokens as f64 / 1000.0 * price.output_per_1k.max(0.0);
        round_to(input + output, 6).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_tokens_cost_nothing() {
        let table = PricingTable::default();
        assert_eq!(table.cost_usd("gpt-4o", 0, 0), 0.0);
        assert_eq!(table.cost_usd("unknown-model", 0, 0), 0.0);
    }

    #[test]
    fn cost_uses_per_thousand_rates() {
        let table = PricingTable::default();
        let cost = table.cost_usd("gpt-4o", 1000, 500);
        assert!((cost - 0.0075).abs() < 1e-12);
        let cheap = table.cost_usd("deepseek-chat", 10_000, 10_000);
        assert!((cheap - 0.0042).abs() < 1e-12);
    }

    #[test]
    fn cost_rounds_to_six_decimals() {
        let table = PricingTable::default();
        assert_eq!(table.cost_usd("deepseek-chat", 1, 1), 0.0);
        assert_eq!(table.cost_usd("deepseek-chat", 7, 0), 0.000001);
    }

    #[test]
    fn cost_is_monotonic_in_both_token_counts() {
        let table = PricingTable::default();
        let mut previous = 0.0;
        for tokens in [0u64, 1, 10, 100, 1_000, 10_000, 100_000] {
            let by_prompt = table.cost_usd("claude-3-5-sonnet-20241022", tokens, 50);
            let by_completion = table.cost_usd("claude-3-5-sonnet-20241022", 50, tokens);
            assert!(by_prompt >= previous || tokens == 0);
            assert!(by_completion >= table.cost_usd("claude-3-5-sonnet-20241022", 50, 0));
            previous = by_prompt;
        }
    }

    #[test]
    fn unknown_models_fall_back_to_default() {
        let table = PricingTable::default();
        assert!(!table.is_known("mystery"));
        assert_eq!(table.price_for("mystery"), table.price_for("gpt-4o"));

        let empty = PricingTable {
            default_model: "missing".to_string(),
            models: BTreeMap::new(),
        };
        assert_eq!(empty.price_for("mystery"), FALLBACK_PRICE);
    }

    #[test]
    fn wildcard_patterns_prefer_the_longest_match() {
        let mut table = PricingTable::default();
        table.models.insert(
            "gpt-*".to_string(),
            ModelPrice {
                input_per_1k: 1.0,
                output_per_1k: 1.0,
            },
        );
        table.models.insert(
            "gpt-4o-mini*".to_string(),
            ModelPrice {
                input_per_1k: 0.00015,
                output_per_1k: 0.0006,
            },
        );
        assert_eq!(table.price_for("gpt-4o-mini-2024-07-18").input_per_1k, 0.00015);
        assert_eq!(table.price_for("gpt-3.5-turbo").input_per_1k, 1.0);
        assert!(table.is_known("gpt-3.5-turbo"));
    }
}
