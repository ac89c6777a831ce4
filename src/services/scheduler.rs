use crate::analysis::TechnicalAnalyzer;
use crate::config::Config;
use crate::fetch::FallbackChain;
use crate::models::{
    CanonicalRecord, FetchOutcome, GroupResult, SeriesSummary, StatusLogEntry, TaggedRecord, Target,
};
use crate::util;
use log::{error, info, warn};
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// 每个标的需要计算的衍生指标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation {
    /// Moving averages plus MACD/KDJ/RSI signals.
    Technical,
    /// Only the latest value; used for macro series and scraped tables.
    LatestOnly,
}

/// 单个标的的处理结果
#[derive(Debug, Clone)]
pub struct TargetReport {
    pub log: StatusLogEntry,
    pub klines: Vec<TaggedRecord>,
    pub summary: Option<SeriesSummary>,
}

impl TargetReport {
    fn failed(name: &str, error: impl Into<String>) -> Self {
        Self {
            log: StatusLogEntry::failed(name, error),
            klines: Vec::new(),
            summary: None,
        }
    }
}

/// 并发分组调度器
///
/// The worker pool is shared by every group run through the same scheduler,
/// so concurrent groups together never exceed `max_workers` in-flight fetches.
pub struct GroupScheduler {
    chain: Arc<FallbackChain>,
    analyzer: Arc<TechnicalAnalyzer>,
    workers: Arc<Semaphore>,
    report_days: usize,
}

impl GroupScheduler {
    pub fn new(chain: Arc<FallbackChain>, config: &Config) -> Self {
        Self {
            chain,
            analyzer: Arc::new(TechnicalAnalyzer::new(&config.ma_windows, config.min_history)),
            workers: Arc::new(Semaphore::new(config.max_workers.max(1))),
            report_days: config.report_days,
        }
    }

    pub async fn run_group(&self, group_name: &str, targets: Vec<Target>) -> GroupResult {
        self.run_group_with(group_name, targets, Derivation::Technical).await
    }

    pub async fn run_group_with(&self, group_name: &str, targets: Vec<Target>, derivation: Derivation) -> GroupResult {
        info!("开始处理分组 {} ({} 个标的)", group_name, targets.len());
        let mut tasks = JoinSet::new();

        for target in targets {
            let chain = Arc::clone(&self.chain);
            let analyzer = Arc::clone(&self.analyzer);
            let workers = Arc::clone(&self.workers);
            let report_days = self.report_days;

            tasks.spawn(async move {
                let name = target.name.clone();
                let _permit = match workers.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return TargetReport::failed(&name, format!("worker pool closed: {}", e)),
                };

                // inner task so a panicking adapter only takes down its own target
                let handle = tokio::spawn(async move {
                    process_target(&chain, &analyzer, report_days, derivation, &target).await
                });
                match handle.await {
                    Ok(report) => report,
                    Err(e) if e.is_panic() => {
                        let message = panic_message(e.into_panic());
                        error!("{} 处理时发生 panic: {}", name, message);
                        TargetReport::failed(&name, format!("panicked: {}", message))
                    }
                    Err(e) => TargetReport::failed(&name, format!("task aborted: {}", e)),
                }
            });
        }

        let mut result = GroupResult::new(group_name);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => {
                    result.logs.push(report.log);
                    result.klines.extend(report.klines);
                    result.summaries.extend(report.summary);
                }
                Err(e) => error!("分组 {} 的任务异常: {}", group_name, e),
            }
        }

        result.klines.sort_by(|a, b| a.name.cmp(&b.name).then(b.record.date.cmp(&a.record.date)));
        result.summaries.sort_by(|a, b| a.name.cmp(&b.name));
        result.logs.sort_by(|a, b| a.target_name.cmp(&b.target_name));

        let passed = result.logs.iter().filter(|l| l.succeeded).count();
        info!("分组 {} 完成: {}/{} 成功", group_name, passed, result.logs.len());
        result
    }
}

async fn process_target(
    chain: &FallbackChain,
    analyzer: &TechnicalAnalyzer,
    report_days: usize,
    derivation: Derivation,
    target: &Target,
) -> TargetReport {
    let name = target.name.as_str();
    let (records, degraded) = match chain.fetch(target).await {
        FetchOutcome::Success { records, degraded } => (records, degraded),
        FetchOutcome::Empty => {
            warn!("{} 没有数据", name);
            return TargetReport::failed(name, "empty result");
        }
        FetchOutcome::Failure(failure) => {
            warn!("{} 获取失败: {}", name, failure);
            return TargetReport::failed(name, failure.message);
        }
    };

    let summarized = match derivation {
        Derivation::Technical => analyzer.summarize(name, &records),
        Derivation::LatestOnly => latest_only(name, &records).map(|s| (s, None)),
    };
    let (summary, analysis_note) = match summarized {
        Some(summarized) => summarized,
        None => return TargetReport::failed(name, "no usable records"),
    };

    let notes: Vec<String> = degraded.into_iter().chain(analysis_note).collect();
    let note = if notes.is_empty() { None } else { Some(notes.join("; ")) };
    if let Some(note) = &note {
        warn!("{} 降级: {}", name, note);
    }

    let mut newest_first: Vec<CanonicalRecord> = records.into_iter().rev().collect();
    util::limit_records(&mut newest_first, report_days, name);
    let klines = newest_first.into_iter().map(|r| TaggedRecord::new(name, r)).collect();

    TargetReport {
        log: StatusLogEntry::passed(name).with_degraded(note),
        klines,
        summary: Some(summary),
    }
}

fn latest_only(name: &str, records: &[CanonicalRecord]) -> Option<SeriesSummary> {
    let latest = records.iter().rev().find(|r| r.is_usable())?;
    Some(SeriesSummary {
        name: name.to_string(),
        latest_close: latest.primary()?,
        date: latest.date,
        moving_averages: BTreeMap::new(),
        signals: None,
    })
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
