//! Registered step drivers, keyed by the version a step produces.

mod update_41;
mod update_44;
mod update_45;

use super::driver::{CarryOver, StepContext, StepDriver};
use std::collections::BTreeMap;

pub use update_41::MultiTenant;
pub use update_44::SubmissionStatuses;
pub use update_45::UserEmail;

pub type DriverFactory = Box<dyn Fn(StepContext) -> Box<dyn StepDriver> + Send + Sync>;

#[derive(Default)]
pub struct DriverRegistry {
    factories: BTreeMap<u32, DriverFactory>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drivers for every step of the bundled catalog.
    pub fn builtin() -> Self {
        Self::new()
            .carry_over(39)
            .carry_over(40)
            .with(41, |ctx| Box::new(MultiTenant::new(ctx)))
            .carry_over(42)
            .carry_over(43)
            .with(44, |ctx| Box::new(SubmissionStatuses::new(ctx)))
            .with(45, |ctx| Box::new(UserEmail::new(ctx)))
    }

    /// Register `factory` for the step producing `target_version`, replacing
    /// any earlier registration.
    pub fn with<F>(mut self, target_version: u32, factory: F) -> Self
    where
        F: Fn(StepContext) -> Box<dyn StepDriver> + Send + Sync + 'static,
    {
        self.factories.insert(target_version, Box::new(factory));
        self
    }

    pub fn carry_over(self, target_version: u32) -> Self {
        self.with(target_version, |ctx| Box::new(CarryOver::new(ctx)))
    }

    pub fn contains(&self, target_version: u32) -> bool {
        self.factories.contains_key(&target_version)
    }

    pub fn versions(&self) -> impl Iterator<Item = u32> + '_ {
        self.factories.keys().copied()
    }

    pub fn instantiate(&self, target_version: u32, ctx: StepContext) -> Option<Box<dyn StepDriver>> {
        self.factories
            .get(&target_version)
            .map(|factory| factory(ctx))
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("versions", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
