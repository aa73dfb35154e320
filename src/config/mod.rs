//! Scenario configuration with YAML schema and validation.
//!
//! A scenario names one model and its parameters:
//!
//! ```yaml
//! schema_version: "1.0"
//! seed: 42
//! model:
//!   type: queue
//!   mean_interarrival: 1.0
//!   mean_service: 0.5
//!   num_delays_required: 1000
//! ```
//!
//! Loading goes through three gates: serde (shape, unknown fields),
//! `validator` (field ranges), then semantic checks across fields.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use validator::Validate;

use crate::engine::SimRng;
use crate::error::{SimError, SimResult};
use crate::models::{inventory, queue, InventoryParams, QueueParams, ScenarioReport};

/// Schema versions this build understands.
const SUPPORTED_SCHEMA_VERSIONS: &[&str] = &["1.0"];

/// Top-level scenario file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Schema version for forward compatibility.
    #[validate(length(min = 1))]
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// Free-form scenario name.
    #[serde(default)]
    pub name: Option<String>,

    /// Master seed. Entropy-seeded when absent.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Model to run.
    pub model: ModelConfig,
}

fn default_schema_version() -> String {
    "1.0".to_string()
}

/// Model selection, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelConfig {
    /// Single-server queue.
    Queue(QueueParams),
    /// (s, S) inventory policy sweep.
    Inventory(InventoryParams),
}

impl ModelConfig {
    /// Short model name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Queue(_) => "queue",
            Self::Inventory(_) => "inventory",
        }
    }
}

impl ScenarioConfig {
    /// Wrap a model in a scenario with the current schema version.
    #[must_use]
    pub fn new(model: ModelConfig) -> Self {
        Self {
            schema_version: default_schema_version(),
            name: None,
            seed: None,
            model,
        }
    }

    /// Set the master seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Load a scenario from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - YAML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a scenario from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns error if parsing or validation fails.
    pub fn from_yaml(yaml: &str) -> SimResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        config.validate_semantic()?;
        Ok(config)
    }

    /// Serialize back to YAML.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_yaml(&self) -> SimResult<String> {
        serde_yaml::to_string(self).map_err(|e| SimError::serialization(e.to_string()))
    }

    fn validate_semantic(&self) -> SimResult<()> {
        if !SUPPORTED_SCHEMA_VERSIONS.contains(&self.schema_version.as_str()) {
            return Err(SimError::config(format!(
                "unsupported schema version '{}', expected one of {SUPPORTED_SCHEMA_VERSIONS:?}",
                self.schema_version
            )));
        }

        match &self.model {
            ModelConfig::Queue(params) => params.check(),
            ModelConfig::Inventory(params) => params.check(),
        }
    }

    /// Master generator for a run. `seed_override` wins over the file seed.
    #[must_use]
    pub fn rng(&self, seed_override: Option<u64>) -> SimRng {
        match seed_override.or(self.seed) {
            Some(seed) => SimRng::new(seed),
            None => SimRng::from_entropy(),
        }
    }

    /// Run the configured model.
    ///
    /// # Errors
    ///
    /// Returns error if the run aborts.
    pub fn run(&self, seed_override: Option<u64>) -> SimResult<ScenarioReport> {
        let mut rng = self.rng(seed_override);
        debug!(
            model = self.model.kind(),
            seed = rng.master_seed(),
            "running scenario"
        );

        match &self.model {
            ModelConfig::Queue(params) => queue::simulate(params, rng).map(ScenarioReport::Queue),
            ModelConfig::Inventory(params) => {
                inventory::run_policies(params, &mut rng).map(ScenarioReport::Inventory)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    const QUEUE_YAML: &str = r"
schema_version: '1.0'
seed: 42
model:
  type: queue
  mean_interarrival: 1.0
  mean_service: 0.5
  num_delays_required: 1000
";

    const INVENTORY_YAML: &str = r"
seed: 7
model:
  type: inventory
  initial_inv_level: 60
  num_months: 120
  mean_interdemand: 0.1
  setup_cost: 32.0
  incremental_cost: 3.0
  holding_cost: 1.0
  shortage_cost: 5.0
  minlag: 0.5
  maxlag: 1.0
  demand_distribution: [0.167, 0.5, 0.833, 1.0]
  policies:
    - { small_s: 20, big_s: 40 }
    - { small_s: 40, big_s: 80 }
";

    #[test]
    fn test_parse_queue_scenario() {
        let config = ScenarioConfig::from_yaml(QUEUE_YAML).unwrap();

        assert_eq!(config.seed, Some(42));
        assert_eq!(config.model.kind(), "queue");
        match &config.model {
            ModelConfig::Queue(params) => {
                assert_eq!(params.num_delays_required, 1000);
                assert_eq!(params.queue_limit, 100);
            }
            ModelConfig::Inventory(_) => panic!("expected queue"),
        }
    }

    #[test]
    fn test_parse_inventory_scenario() {
        let config = ScenarioConfig::from_yaml(INVENTORY_YAML).unwrap();

        assert_eq!(config.schema_version, "1.0");
        match &config.model {
            ModelConfig::Inventory(params) => {
                assert_eq!(params.policies.len(), 2);
                assert_eq!(params.demand_distribution.len(), 4);
            }
            ModelConfig::Queue(_) => panic!("expected inventory"),
        }
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = QUEUE_YAML.replace("num_delays_required", "num_delays");
        let err = ScenarioConfig::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, SimError::YamlParse(_)));
    }

    #[test]
    fn test_unknown_model_type_rejected() {
        let yaml = QUEUE_YAML.replace("type: queue", "type: network");
        assert!(ScenarioConfig::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_field_range_rejected() {
        let yaml = QUEUE_YAML.replace("mean_service: 0.5", "mean_service: -0.5");
        let err = ScenarioConfig::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, SimError::Validation(_)));
    }

    #[test]
    fn test_bad_distribution_rejected() {
        let yaml = INVENTORY_YAML.replace("[0.167, 0.5, 0.833, 1.0]", "[0.5, 0.4, 1.0]");
        assert!(ScenarioConfig::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_cross_field_rule_rejected() {
        let yaml = INVENTORY_YAML.replace("minlag: 0.5", "minlag: 1.5");
        let err = ScenarioConfig::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, SimError::InvalidParameter { .. }));
    }

    #[test]
    fn test_unbounded_order_level_rejected() {
        let yaml = INVENTORY_YAML
            .replace("initial_inv_level: 60", "initial_inv_level: -1")
            .replace(
                "{ small_s: 40, big_s: 80 }",
                "{ small_s: 0, big_s: 9223372036854775807 }",
            );
        let err = ScenarioConfig::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, SimError::InvalidParameter { ref name, .. } if name == "big_s"));
    }

    #[test]
    fn test_unsupported_schema_version() {
        let yaml = QUEUE_YAML.replace("'1.0'", "'9.9'");
        let err = ScenarioConfig::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, SimError::Config { .. }));
    }

    #[test]
    fn test_seed_override_wins() {
        let config = ScenarioConfig::from_yaml(QUEUE_YAML).unwrap();
        assert_eq!(config.rng(None).master_seed(), 42);
        assert_eq!(config.rng(Some(99)).master_seed(), 99);
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = ScenarioConfig::from_yaml(INVENTORY_YAML).unwrap();
        let yaml = config.to_yaml().unwrap();
        let reparsed = ScenarioConfig::from_yaml(&yaml).unwrap();
        assert_eq!(config, reparsed);
    }

    #[test]
    fn test_run_queue_scenario() {
        let config = ScenarioConfig::from_yaml(QUEUE_YAML).unwrap();
        let report = config.run(None).unwrap();

        match report {
            ScenarioReport::Queue(r) => assert_eq!(r.customers_delayed, 1000),
            ScenarioReport::Inventory(_) => panic!("expected queue report"),
        }
    }

    #[test]
    fn test_builder_style_construction() {
        let config =
            ScenarioConfig::new(ModelConfig::Queue(QueueParams::new(1.0, 0.5, 50))).with_seed(3);
        assert_eq!(config.seed, Some(3));
        assert!(config.run(None).is_ok());
    }
}
