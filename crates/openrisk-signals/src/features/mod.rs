//! Feature Store Accessor: reference resolution and the in-memory snapshot.

pub mod loader;
pub mod reference;
pub mod store;

pub use loader::load_feature_store;
pub use reference::{FeatureRef, MetricCatalog};
pub use store::{FeatureStore, TrendPeriod};
