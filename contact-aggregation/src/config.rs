// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Engine Configuration
//!
//! Thresholds for match decisions and timings for the pass scheduler. Both
//! structs deserialize from JSON with every field optional; durations are
//! given in milliseconds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AggregationError, AggregationResult};
use crate::name::distance::DEFAULT_MAX_LENGTH;
use crate::name::lookup::DEFAULT_MAX_TOKENS;

/// Match thresholds and name processing limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Score at which a name match alone merges two raw contacts.
    pub primary_threshold: i32,

    /// Score at which phone/email/nickname evidence qualifies a candidate
    /// for the secondary name comparison.
    pub secondary_threshold: i32,

    /// Minimum score of a join suggestion.
    pub suggest_threshold: i32,

    /// Similarity above which approximate name matches score.
    pub approximate_threshold: f32,

    /// Bytes of a normalized name compared by the distance metric.
    pub max_name_length: usize,

    /// Tokens of a name that are permuted for lookup variants.
    pub max_name_tokens: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            primary_threshold: 70,
            secondary_threshold: 50,
            suggest_threshold: 50,
            approximate_threshold: 0.7,
            max_name_length: DEFAULT_MAX_LENGTH,
            max_name_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl AggregationConfig {
    pub fn with_primary_threshold(mut self, threshold: i32) -> Self {
        self.primary_threshold = threshold;
        self
    }

    pub fn with_secondary_threshold(mut self, threshold: i32) -> Self {
        self.secondary_threshold = threshold;
        self
    }

    pub fn with_suggest_threshold(mut self, threshold: i32) -> Self {
        self.suggest_threshold = threshold;
        self
    }

    pub fn with_max_name_tokens(mut self, tokens: usize) -> Self {
        self.max_name_tokens = tokens;
        self
    }

    /// Parses a JSON document, filling absent fields with defaults.
    pub fn from_json(json: &str) -> AggregationResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| AggregationError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AggregationResult<()> {
        if !(0.0..1.0).contains(&self.approximate_threshold) {
            return Err(AggregationError::Configuration(format!(
                "approximate_threshold must be in [0, 1), got {}",
                self.approximate_threshold
            )));
        }
        if self.max_name_tokens == 0 || self.max_name_length == 0 {
            return Err(AggregationError::Configuration(
                "name limits must be positive".to_string(),
            ));
        }
        // Variants grow factorially with the token count
        if self.max_name_tokens > DEFAULT_MAX_TOKENS {
            return Err(AggregationError::Configuration(format!(
                "max_name_tokens must be at most {}, got {}",
                DEFAULT_MAX_TOKENS, self.max_name_tokens
            )));
        }
        Ok(())
    }
}

/// Timings of the debounced pass scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// A request arriving this soon after the last pass ended is delayed.
    #[serde(rename = "debounce_window_ms", with = "millis")]
    pub debounce_window: Duration,

    /// Delay applied to debounced requests, re-armed by each new request.
    #[serde(rename = "delay_ms", with = "millis")]
    pub delay: Duration,

    /// Longest a request may be postponed by later requests.
    #[serde(rename = "max_delay_ms", with = "millis")]
    pub max_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce_window: Duration::from_millis(500),
            delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
        }
    }
}

impl SchedulerConfig {
    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Parses a JSON document, filling absent fields with defaults.
    pub fn from_json(json: &str) -> AggregationResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| AggregationError::Configuration(e.to_string()))?;
        if config.max_delay < config.delay {
            return Err(AggregationError::Configuration(
                "max_delay_ms must not be shorter than delay_ms".to_string(),
            ));
        }
        Ok(config)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = AggregationConfig::from_json(r#"{"primary_threshold": 80}"#).unwrap();
        assert_eq!(config.primary_threshold, 80);
        assert_eq!(config.secondary_threshold, 50);
    }

    #[test]
    fn test_scheduler_json_in_millis() {
        let config = SchedulerConfig::from_json(r#"{"delay_ms": 250}"#).unwrap();
        assert_eq!(config.delay, Duration::from_millis(250));
        assert_eq!(config.max_delay, Duration::from_secs(10));
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        assert!(AggregationConfig::from_json(r#"{"approximate_threshold": 1.5}"#).is_err());
        assert!(SchedulerConfig::from_json(r#"{"delay_ms": 20000}"#).is_err());
        assert!(AggregationConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_token_cap_is_bounded() {
        assert!(AggregationConfig::default().with_max_name_tokens(3).validate().is_ok());
        assert!(AggregationConfig::default()
            .with_max_name_tokens(DEFAULT_MAX_TOKENS + 1)
            .validate()
            .is_err());
        assert!(AggregationConfig::from_json(r#"{"max_name_tokens": 10}"#).is_err());
    }
}
