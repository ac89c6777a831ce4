//! 获取层：重试策略与多数据源回退链

pub mod chain;
pub mod retry;

pub use chain::{ChainStep, FallbackChain};
pub use retry::RetryPolicy;
