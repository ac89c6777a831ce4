use crate::config::{Config, ProviderPriority};
use crate::fetch::retry::RetryPolicy;
use crate::models::record::sort_ascending;
use crate::models::{Capability, FailureKind, FetchOutcome, ProviderId, Target};
use crate::normalizer::{pick_table, SortOrder, TableNormalizer};
use crate::sources::SourceAdapter;
use crate::util;
use chrono_tz::Tz;
use log::{info, warn};
use std::sync::Arc;

/// 按优先级依次尝试各数据源，直到拿到非空数据
pub struct FallbackChain {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    priority: ProviderPriority,
    retry: RetryPolicy,
    lookback_days: u32,
    normalizer: TableNormalizer,
    timezone: Tz,
}

/// One planned hop: an adapter and the symbol it is asked for.
pub struct ChainStep {
    pub adapter: Arc<dyn SourceAdapter>,
    pub symbol: String,
}

impl FallbackChain {
    pub fn new(config: &Config) -> Self {
        Self {
            adapters: Vec::new(),
            priority: config.priority.clone(),
            retry: RetryPolicy::from_config(config),
            lookback_days: config.lookback_days,
            normalizer: TableNormalizer::new(config.freshness_days, config.stale_fallback_rows),
            timezone: config.timezone,
        }
    }

    pub fn with_adapter(mut self, adapter: Arc<dyn SourceAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    pub fn adapters(&self) -> &[Arc<dyn SourceAdapter>] {
        &self.adapters
    }

    /// Adapters to try for `target`, in order.
    ///
    /// Providers named by the instrument type's priority list come first, in
    /// that order; any other registered provider follows, ranked by capability.
    /// Adapters whose provider has no symbol on the target are left out.
    pub fn plan(&self, target: &Target) -> Vec<ChainStep> {
        let explicit = self.priority.order_for(target.instrument_type).unwrap_or(&[]);
        let rank = |provider: ProviderId, capability: Capability| match explicit.iter().position(|p| *p == provider) {
            Some(pos) => (0, pos),
            None => (1, ProviderPriority::capability_rank(capability)),
        };

        let mut ordered: Vec<&Arc<dyn SourceAdapter>> = self.adapters.iter().collect();
        ordered.sort_by_key(|a| rank(a.provider(), a.capability()));

        ordered
            .into_iter()
            .filter_map(|adapter| {
                let symbol = target.symbol_for(adapter.provider())?;
                Some(ChainStep {
                    adapter: Arc::clone(adapter),
                    symbol: symbol.to_string(),
                })
            })
            .collect()
    }

    /// Fetch `target` through the planned adapters, each wrapped by the retry policy.
    pub async fn fetch(&self, target: &Target) -> FetchOutcome {
        let steps = self.plan(target);
        if steps.is_empty() {
            warn!("{} 没有可用的数据源", target.name);
            return FetchOutcome::failure(FailureKind::AllSourcesExhausted, "no configured source");
        }

        let mut errors = Vec::with_capacity(steps.len());
        for step in &steps {
            let provider = step.adapter.provider();
            let label = format!("{} [{}:{}]", target.name, provider, step.symbol);
            let outcome = self
                .retry
                .run(&label, || self.attempt(step.adapter.as_ref(), &step.symbol, target))
                .await;

            match outcome {
                FetchOutcome::Success { mut records, degraded } => {
                    info!("{} 从 {} 获取成功", target.name, provider);
                    sort_ascending(&mut records);
                    return FetchOutcome::Success { records, degraded };
                }
                FetchOutcome::Empty => errors.push(format!("{}: empty result", provider)),
                FetchOutcome::Failure(failure) => errors.push(format!("{}: {}", provider, failure)),
            }
            warn!("{} 的数据源 {} 失败，尝试下一个", target.name, provider);
        }

        FetchOutcome::failure(FailureKind::AllSourcesExhausted, errors.join("; "))
    }

    async fn attempt(&self, adapter: &dyn SourceAdapter, symbol: &str, target: &Target) -> FetchOutcome {
        match adapter.capability() {
            Capability::FetchPriceHistory => adapter.fetch_price_history(symbol, self.lookback_days).await,
            Capability::FetchSeries => adapter.fetch_series(symbol, self.lookback_days).await,
            Capability::FetchTable => {
                let tables = match adapter.fetch_table(symbol, target.table_hint.as_deref()).await {
                    Ok(tables) => tables,
                    Err(e) => return e.into(),
                };
                if tables.is_empty() {
                    return FetchOutcome::Empty;
                }
                let table = match pick_table(&tables, target.table_hint.as_deref()) {
                    Some(table) => table,
                    None => {
                        return FetchOutcome::failure(
                            FailureKind::Parse,
                            format!("no usable table among {} found at {}", tables.len(), symbol),
                        )
                    }
                };
                let today = util::today_in(self.timezone);
                match self.normalizer.normalize(table, today, SortOrder::Ascending) {
                    Ok(normalized) => {
                        if let Some(note) = &normalized.degraded {
                            warn!("{}: {}", target.name, note);
                        }
                        normalized.into_outcome()
                    }
                    Err(e) => e.into(),
                }
            }
        }
    }
}
