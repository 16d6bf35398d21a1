//! Store identifiers.

/// Row id of a repository in the `repos` table.
pub type RepoId = i64;

/// Row id of a metric in the `metrics` table.
pub type MetricId = i64;
