//! Configuration system for OpenRisk.
//! YAML documents, loaded once per run and immutable afterwards.

pub mod loader;
pub mod metrics_config;
pub mod model_config;
pub mod signals_config;
pub mod sources_config;
pub mod store_location;

pub use loader::{load_document, parse_document};
pub use metrics_config::{EfficiencyConfig, MetricsConfig};
pub use model_config::{LabelConfig, ModelConfig};
pub use signals_config::{
    CompareOp, Comparison, CompositeCombinator, CompositeCondition, ConditionNode,
    ConfidencePolicy, ConfidenceTier, ConsistencyPolicy, Explain, FeatureComparison, MinCoverage,
    Requirements, SignalDefinition, SignalsConfig, SignalsDocument,
};
pub use sources_config::{RepoSource, SourcesConfig};
pub use store_location::{resolve_store_path, DEFAULT_SQLITE_PATH, STORE_ENV};
