//! Token and pricing accounting over decoded paths.
//!
//! The decoder hands this module plain text only (via
//! [`Content::plain_text`]); counting itself is a caller-pluggable
//! [`TokenCounter`], with a character-estimate default for callers that do
//! not bring a real BPE tokenizer.

use crate::models::content::Content;
use crate::models::message::{Message, Role};

/// Counts tokens in one piece of extracted text.
pub trait TokenCounter {
    fn count(&self, text: &str) -> usize;
}

/// Rough estimate: four characters per token, rounded up.
#[derive(Debug, Clone, Copy)]
pub struct CharEstimateCounter {
    pub chars_per_token: usize,
}

impl Default for CharEstimateCounter {
    fn default() -> Self {
        Self { chars_per_token: 4 }
    }
}

impl TokenCounter for CharEstimateCounter {
    fn count(&self, text: &str) -> usize {
        let chars = text.chars().count();
        let divisor = self.chars_per_token.max(1);
        chars.div_ceil(divisor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Usage {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

impl Usage {
    pub fn accumulate(&mut self, other: Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// The text a token counter sees for one message.
#[must_use]
pub fn message_text(message: &Message) -> String {
    Content::plain_text(message.content())
}

/// Token usage of one root-to-leaf path.
///
/// Walks the path in order keeping a running net-token total: user and
/// tool turns charge the running total as input (each turn resends the
/// context so far), other roles charge their own count as output.
#[must_use]
pub fn path_usage(path: &[&Message], counter: &dyn TokenCounter) -> Usage {
    let mut input_tokens = 0usize;
    let mut output_tokens = 0usize;
    let mut running_net = 0usize;
    for message in path {
        let tokens = counter.count(&message_text(message));
        running_net += tokens;
        match message.role() {
            Role::User | Role::Tool => input_tokens += running_net,
            Role::Assistant | Role::System => output_tokens += tokens,
        }
    }
    Usage {
        input_tokens,
        output_tokens,
        total_tokens: input_tokens + output_tokens,
    }
}

/// Models the accounting layer knows list prices for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingModel {
    Gpt4,
    Gpt35Turbo,
}

impl PricingModel {
    pub const TAGS: &'static [&'static str] = &["gpt-4", "gpt-3.5-turbo"];

    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "gpt-4" => Some(Self::Gpt4),
            "gpt-3.5-turbo" => Some(Self::Gpt35Turbo),
            _ => None,
        }
    }

    /// USD per 1k tokens, (input, output).
    #[must_use]
    pub const fn rates(self) -> (f64, f64) {
        match self {
            Self::Gpt4 => (0.03, 0.06),
            Self::Gpt35Turbo => (0.0005, 0.0015),
        }
    }

    /// API-equivalent price of one usage total.
    #[must_use]
    pub fn cost(self, usage: Usage) -> f64 {
        let (input_rate, output_rate) = self.rates();
        usage.input_tokens as f64 / 1000.0 * input_rate
            + usage.output_tokens as f64 / 1000.0 * output_rate
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::decode::FieldPath;
    use crate::models::message::Message;

    use super::*;

    /// Counter with one token per whitespace-separated word, so the
    /// accumulation arithmetic is easy to verify by hand.
    struct WordCounter;

    impl TokenCounter for WordCounter {
        fn count(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }
    }

    fn user_message(id: &str, text: &str) -> Message {
        Message::decode(
            json!({
                "id": id,
                "role": "user",
                "parent": "r",
                "children": [],
                "create_time": 1.0,
                "status": "finished_successfully",
                "weight": 1.0,
                "recipient": "all",
                "content": {"content_type": "text", "parts": [text]},
                "metadata": {"timestamp_": "absolute"}
            }),
            FieldPath::root("message"),
        )
        .expect("user fixture decodes")
    }

    fn assistant_message(id: &str, text: &str) -> Message {
        Message::decode(
            json!({
                "id": id,
                "role": "assistant",
                "parent": "m",
                "children": [],
                "create_time": 2.0,
                "status": "finished_successfully",
                "end_turn": true,
                "weight": 1.0,
                "recipient": "all",
                "content": {"content_type": "text", "parts": [text]},
                "metadata": {"timestamp_": "absolute"}
            }),
            FieldPath::root("message"),
        )
        .expect("assistant fixture decodes")
    }

    #[test]
    fn path_usage_reproduces_the_running_total_accumulation() {
        let user1 = user_message("m1", "one two three");
        let reply = assistant_message("a1", "four five");
        let user2 = user_message("m2", "six");
        let path = vec![&user1, &reply, &user2];

        let usage = path_usage(&path, &WordCounter);
        // m1: running 3, input += 3. a1: running 5, output += 2.
        // m2: running 6, input += 6. Totals: input 9, output 2.
        assert_eq!(usage.input_tokens, 9);
        assert_eq!(usage.output_tokens, 2);
        assert_eq!(usage.total_tokens, 11);
    }

    #[test]
    fn empty_path_costs_nothing() {
        let usage = path_usage(&[], &WordCounter);
        assert_eq!(usage, Usage::default());
    }

    #[test]
    fn char_estimate_rounds_up() {
        let counter = CharEstimateCounter::default();
        assert_eq!(counter.count(""), 0);
        assert_eq!(counter.count("abcd"), 1);
        assert_eq!(counter.count("abcde"), 2);
    }

    #[test]
    fn pricing_matches_the_published_rates() {
        let usage = Usage {
            input_tokens: 1000,
            output_tokens: 2000,
            total_tokens: 3000,
        };
        let cost = PricingModel::Gpt4.cost(usage);
        assert!((cost - (0.03 + 2.0 * 0.06)).abs() < 1e-9);
        assert!(PricingModel::parse("gpt-9").is_none());
    }
}
