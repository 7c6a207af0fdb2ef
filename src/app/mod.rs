pub mod dispatch;
pub mod startup;
pub mod status;

pub use dispatch::dispatch;
pub use startup::{StartupAction, prepare_database};
