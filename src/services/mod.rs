pub mod collector;
pub mod scheduler;

pub use collector::{CollectionRun, MarketCollector};
pub use scheduler::{Derivation, GroupScheduler, TargetReport};
