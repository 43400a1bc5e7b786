//! Turns an advisor level and the money spent into a short human message.
//!
//! Templates are picked at random from a pool per level; callers pass the
//! random source so tests can seed it. Placeholders use `{name}` syntax and a
//! template that cannot be filled falls back to a plain cost line.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::round_to;

const LEVEL_1_TEMPLATES: &[&str] = &[
    "Nicely done, this spend looks well planned",
    "Efficient use of {model}, {coffee} cups of coffee well spent",
    "Clean prompt, it hit the target on the first try",
    "Budget-conscious and productive, keep it up",
];

const LEVEL_2_TEMPLATES: &[&str] = &[
    "This error again? Maybe try a different angle. That's {snacks} snacks so far",
    "{repeat_count} similar requests detected ({similarity}% similar). Time to check the docs?",
    "This direction may not be working, it has cost ¥{cost_cny} already",
    "Asking the same question {repeat_count} times confuses the model too",
    "Sort out the approach before the next request. Spent so far: {coffee} cups of coffee",
    "Stuck? Switching from {model} to a cheaper model might help",
];

const LEVEL_3_TEMPLATES: &[&str] = &[
    "{repeat_count} similar requests in a row, ${cost_usd} spent ({hotpot} hotpot dinners)",
    "Stop for a moment. This bug has eaten {meal} meals' worth of budget",
    "These {time_spent} minutes cost ${cost_usd}. A short walk might help more",
    "Frustrated prompting detected. Take three deep breaths before continuing",
    "Your wallet is crying: {coffee} cups of coffee burned with nothing to show",
];

const LEVEL_4_TEMPLATES: &[&str] = &[
    "Cooldown engaged: hourly spend reached ¥{cost_cny} ({hotpot} hotpot dinners)",
    "Cooldown engaged: you just burned {meal} meals' worth of budget, take a break",
    "Cooldown engaged: ${cost_usd} this hour and no progress. Time to rest",
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("unknown placeholder {{{0}}}")]
    UnknownPlaceholder(String),
    #[error("unbalanced braces in template")]
    Unbalanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquivalentPrices {
    pub exchange_rate_usd_to_cny: f64,
    pub coffee_price_cny: f64,
    pub snack_price_cny: f64,
    pub meal_price_cny: f64,
    pub hotpot_price_cny: f64,
}

impl Default for EquivalentPrices {
    fn default() -> Self {
        Self {
            exchange_rate_usd_to_cny: 7.3,
            coffee_price_cny: 15.0,
            snack_price_cny: 8.0,
            meal_price_cny: 50.0,
            hotpot_price_cny: 120.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equivalents {
    pub coffee_cups: f64,
    pub snack_sets: f64,
    pub meals: f64,
    pub hotpot_meals: f64,
    pub meal_equivalent: String,
}

impl EquivalentPrices {
    pub fn to_cny(&self, cost_usd: f64) -> f64 {
        cost_usd * self.exchange_rate_usd_to_cny
    }

    pub fn equivalents(&self, cost_cny: f64) -> Equivalents {
        let meal_equivalent = if cost_cny > self.hotpot_price_cny {
            "a hotpot dinner"
        } else if cost_cny > self.meal_price_cny {
            "a full meal"
        } else if cost_cny > self.snack_price_cny {
            "a takeout lunch"
        } else {
            "a cup of coffee"
        };
        Equivalents {
            coffee_cups: ratio(cost_cny, self.coffee_price_cny),
            snack_sets: ratio(cost_cny, self.snack_price_cny),
            meals: ratio(cost_cny, self.meal_price_cny),
            hotpot_meals: ratio(cost_cny, self.hotpot_price_cny),
            meal_equivalent: meal_equivalent.to_string(),
        }
    }
}

fn ratio(cost_cny: f64, price: f64) -> f64 {
    if price <= 0.0 {
        return 0.0;
    }
    round_to(cost_cny / price, 1)
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdviceContext<'a> {
    pub level: u8,
    pub cost_usd: f64,
    pub model: &'a str,
    pub repeat_count: u32,
    pub similarity: f64,
    pub time_spent_minutes: u64,
}

#[derive(Debug, Clone)]
pub struct Advisor {
    prices: EquivalentPrices,
    templates: [Vec<String>; 4],
}

impl Advisor {
    pub fn new(prices: EquivalentPrices) -> Self {
        let owned = |pool: &[&str]| -> Vec<String> {
            pool.iter().map(|item| item.to_string()).collect()
        };
        Self {
            prices,
            templates: [
                owned(LEVEL_1_TEMPLATES),
                owned(LEVEL_2_TEMPLATES),
                owned(LEVEL_3_TEMPLATES),
                owned(LEVEL_4_TEMPLATES),
            ],
        }
    }

    /// Replaces the pool for `level` (1-4). Empty pools fall back to the cost line.
    pub fn with_templates(mut self, level: u8, templates: Vec<String>) -> Self {
        if let Some(slot) = pool_index(level) {
            self.templates[slot] = templates;
        }
        self
    }

    pub fn prices(&self) -> &EquivalentPrices {
        &self.prices
    }

    /// Level 0 is silent. Formatting problems never reach the caller.
    pub fn message<R: Rng + ?Sized>(&self, ctx: &AdviceContext<'_>, rng: &mut R) -> String {
        let Some(slot) = pool_index(ctx.level) else {
            return String::new();
        };
        let cost_cny = self.prices.to_cny(ctx.cost_usd);
        let Some(template) = self.templates[slot].choose(rng) else {
            return fallback_message(ctx.cost_usd, cost_cny);
        };
        let equivalents = self.prices.equivalents(cost_cny);
        let values = [
            ("cost_usd", format!("{:.2}", ctx.cost_usd)),
            ("cost_cny", format!("{:.2}", cost_cny)),
            ("coffee", equivalents.coffee_cups.to_string()),
            ("snacks", equivalents.snack_sets.to_string()),
            ("meal", equivalents.meals.to_string()),
            ("meal_equivalent", equivalents.meal_equivalent.clone()),
            ("hotpot", equivalents.hotpot_meals.to_string()),
            ("model", ctx.model.to_string()),
            ("repeat_count", ctx.repeat_count.to_string()),
            ("similarity", round_to(ctx.similarity * 100.0, 1).to_string()),
            ("time_spent", ctx.time_spent_minutes.to_string()),
        ];
        render_template(template, &values)
            .unwrap_or_else(|_| fallback_message(ctx.cost_usd, cost_cny))
    }
}

fn pool_index(level: u8) -> Option<usize> {
    match level {
        0 => None,
        1..=3 => Some(level as usize - 1),
        _ => Some(3),
    }
}

pub fn fallback_message(cost_usd: f64, cost_cny: f64) -> String {
    format!("cost: ${:.2} (¥{:.2})", cost_usd, cost_cny)
}

pub fn render_template(template: &str, values: &[(&str, String)]) -> Result<String, FormatError> {
    let mut rendered = String::with_capacity(template.len());
    let mut chars = template.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') | None => return Err(FormatError::Unbalanced),
                        Some(other) => name.push(other),
                    }
                }
                let value = values
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| value)
                    .ok_or(FormatError::UnknownPlaceholder(name))?;
                rendered.push_str(value);
            }
            '}' => return Err(FormatError::Unbalanced),
            other => rendered.push(other),
        }
    }
    Ok(rendered)
}
