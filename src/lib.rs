// 公开导出的模块，供外部使用
pub mod analysis;
pub mod config;
pub mod errors;
pub mod fetch;
pub mod models;
pub mod normalizer;
pub mod registry;
pub mod report;
pub mod services;
pub mod sources;

#[doc(hidden)]
pub mod util;

// 重新导出常用类型，方便使用
pub use config::{Backoff, Config, ProviderPriority};
pub use errors::{RadarError, Result};
pub use fetch::{FallbackChain, RetryPolicy};
pub use models::{CanonicalRecord, FetchOutcome, GroupResult, StatusLogEntry, Target};
pub use registry::{StaticRegistry, TargetRegistry};
pub use report::{Report, ReportValue};
pub use services::{CollectionRun, GroupScheduler, MarketCollector};
pub use sources::SourceAdapter;
