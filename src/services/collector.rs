use crate::config::Config;
use crate::fetch::FallbackChain;
use crate::models::{GroupResult, RunSummary, StatusLogEntry};
use crate::registry::{GroupKind, GroupSpec, TargetRegistry};
use crate::report::{record_value, Report, ReportMap, ReportValue};
use crate::services::scheduler::{Derivation, GroupScheduler};
use crate::util;
use log::{error, info};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;

pub const DEFAULT_DESCRIPTION: &str = "MarketRadar 每日市场报告";

/// 一次完整采集的产出
#[derive(Debug, Clone)]
pub struct CollectionRun {
    pub report: ReportValue,
    pub logs: Vec<StatusLogEntry>,
    pub summary: RunSummary,
}

/// 采集所有注册分组并汇总为报告
pub struct MarketCollector {
    registry: Arc<dyn TargetRegistry>,
    scheduler: Arc<GroupScheduler>,
    config: Arc<Config>,
    description: String,
}

impl MarketCollector {
    pub fn new(registry: Arc<dyn TargetRegistry>, chain: Arc<FallbackChain>, config: Arc<Config>) -> Self {
        Self {
            registry,
            scheduler: Arc::new(GroupScheduler::new(chain, &config)),
            config,
            description: DEFAULT_DESCRIPTION.to_string(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub async fn collect_all(&self) -> CollectionRun {
        let groups = self.registry.groups();
        info!("开始采集 {} 个分组", groups.len());

        let mut tasks = JoinSet::new();
        for spec in groups {
            let targets = self.registry.list(&spec.name);
            let scheduler = Arc::clone(&self.scheduler);
            let derivation = match spec.kind {
                GroupKind::Priced(_) => Derivation::Technical,
                GroupKind::Latest { .. } | GroupKind::Table { .. } => Derivation::LatestOnly,
            };
            tasks.spawn(async move {
                let result = scheduler.run_group_with(&spec.name, targets, derivation).await;
                (spec, result)
            });
        }

        let mut report = Report::new(self.config.precision);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((spec, result)) => merge_group(&mut report, &spec, &result),
                Err(e) => error!("分组任务异常: {}", e),
            }
        }

        let finished = report.finish(self.meta());
        info!(
            "采集完成: 共 {} 个标的, 成功 {}, 失败 {}",
            finished.summary.total, finished.summary.passed, finished.summary.failed
        );
        CollectionRun {
            report: finished.tree,
            logs: finished.logs,
            summary: finished.summary,
        }
    }

    fn meta(&self) -> ReportMap {
        let mut meta = ReportMap::new();
        meta.insert("generated_at".to_string(), util::timestamp_in(self.config.timezone).into());
        meta.insert("description".to_string(), self.description.as_str().into());
        meta.insert("report_days".to_string(), self.config.report_days.into());
        meta
    }
}

fn merge_group(report: &mut Report, spec: &GroupSpec, result: &GroupResult) {
    match &spec.kind {
        GroupKind::Priced(category) => report.merge_group(result, *category),
        GroupKind::Latest { section } => {
            let values: ReportMap = result
                .summaries
                .iter()
                .map(|s| (s.name.clone(), s.latest_close.into()))
                .collect();
            report.merge_tree(section_tree(section, values));
            report.merge_logs(&result.logs);
        }
        GroupKind::Table { section } => {
            let mut rows: BTreeMap<String, Vec<ReportValue>> = BTreeMap::new();
            for record in &result.klines {
                rows.entry(record.name.clone()).or_default().push(record_value(record));
            }
            let values: ReportMap = rows.into_iter().map(|(name, list)| (name, ReportValue::List(list))).collect();
            report.merge_tree(section_tree(section, values));
            report.merge_logs(&result.logs);
        }
    }
}

fn section_tree(section: &str, values: ReportMap) -> ReportMap {
    let mut tree = ReportMap::new();
    tree.insert(section.to_string(), ReportValue::Map(values));
    tree
}
