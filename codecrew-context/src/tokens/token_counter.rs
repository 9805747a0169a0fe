/// Token estimates and request-cost accounting for the supported
/// models.
pub struct TokenCounter;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelCost {
    /// Dollars per 1000 input tokens.
    pub input: f64,
    /// Dollars per 1000 output tokens.
    pub output: f64,
}

const MODEL_COSTS: [(&str, ModelCost); 6] = [
    ("claude-3-opus-20240229", ModelCost { input: 0.015, output: 0.075 }),
    ("claude-3-sonnet-20240224", ModelCost { input: 0.003, output: 0.015 }),
    ("claude-3-haiku-20240307", ModelCost { input: 0.0003, output: 0.0015 }),
    ("gpt-4-turbo-preview", ModelCost { input: 0.01, output: 0.03 }),
    ("gpt-4", ModelCost { input: 0.03, output: 0.06 }),
    ("gpt-3.5-turbo", ModelCost { input: 0.0005, output: 0.0015 }),
];

/// Applied when the exact model id is not in the table.
const FAMILY_COSTS: [(&str, ModelCost); 4] = [
    ("claude-3-opus", ModelCost { input: 0.015, output: 0.075 }),
    ("claude-3-haiku", ModelCost { input: 0.0003, output: 0.0015 }),
    ("claude", ModelCost { input: 0.003, output: 0.015 }),
    ("gpt-4", ModelCost { input: 0.01, output: 0.03 }),
];

impl TokenCounter {
    /// Rough estimate: one token per four characters.
    pub fn estimate_tokens(text: &str) -> u32 {
        (text.chars().count() / 4) as u32
    }

    /// Exact model id first, then model family, then the cheapest GPT
    /// tier as a floor.
    pub fn model_costs(model: &str) -> ModelCost {
        for (id, cost) in MODEL_COSTS {
            if id == model {
                return cost;
            }
        }
        for (prefix, cost) in FAMILY_COSTS {
            if model.starts_with(prefix) {
                return cost;
            }
        }
        ModelCost { input: 0.0005, output: 0.0015 }
    }

    pub fn estimate_cost(model: &str, input_tokens: u32, output_tokens: u32) -> f64 {
        let costs = Self::model_costs(model);
        (f64::from(input_tokens) / 1000.0) * costs.input
            + (f64::from(output_tokens) / 1000.0) * costs.output
    }

    /// Sub-cent costs are shown in cents, everything else in dollars.
    pub fn format_cost(cost: f64) -> String {
        if cost < 0.01 {
            format!("{:.2}¢", cost * 100.0)
        } else {
            format!("${cost:.4}")
        }
    }
}
