//! Version-stepped schema and data migration.
//!
//! A run copies the live database into a staging workspace, migrates the
//! copy one version at a time through the registered [`StepDriver`]s,
//! verifies row counts after every step, normalizes the result against the
//! bundled defaults and finally swaps it in for the live file.

pub mod driver;
pub mod normalize;
pub mod orchestrator;
pub mod preflight;
pub mod seed;
pub mod steps;
pub mod verify;
pub mod workspace;

pub use driver::{CarryOver, CountPolicy, StepContext, StepDriver, StepFuture};
pub use normalize::PostMigrationNormalizer;
pub use orchestrator::{MigrationOutcome, Migrator};
pub use steps::{DriverFactory, DriverRegistry};
pub use verify::{IntegrityCheck, IntegrityEntry, IntegrityReport, verify_step};
pub use workspace::StagingWorkspace;
