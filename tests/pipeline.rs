use async_trait::async_trait;
use chrono::{Duration as DateDuration, NaiveDate, Utc};
use market_radar::config::{Backoff, Config};
use market_radar::errors::Result;
use market_radar::fetch::FallbackChain;
use market_radar::models::{
    CanonicalRecord, Capability, FailureKind, FetchOutcome, InstrumentType, ProviderId, Target,
};
use market_radar::normalizer::RawTable;
use market_radar::registry::{GroupKind, StaticRegistry};
use market_radar::report::{MaCategory, Report, ReportMap, ReportValue};
use market_radar::services::{Derivation, GroupScheduler, MarketCollector};
use market_radar::sources::SourceAdapter;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
enum Reply {
    Records(Vec<CanonicalRecord>),
    Empty,
    Terminal,
    Panic,
}

/// Scripted adapter: answers per symbol after `transient_failures` failed calls.
struct MockSource {
    provider: ProviderId,
    capability: Capability,
    calls: AtomicUsize,
    transient_failures: usize,
    replies: HashMap<String, Reply>,
    table: Option<RawTable>,
}

impl MockSource {
    fn new(provider: ProviderId, capability: Capability) -> Self {
        Self {
            provider,
            capability,
            calls: AtomicUsize::new(0),
            transient_failures: 0,
            replies: HashMap::new(),
            table: None,
        }
    }

    fn reply(mut self, symbol: &str, reply: Reply) -> Self {
        self.replies.insert(symbol.to_string(), reply);
        self
    }

    fn failing_first(mut self, times: usize) -> Self {
        self.transient_failures = times;
        self
    }

    fn with_table(mut self, table: RawTable) -> Self {
        self.table = Some(table);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer(&self, symbol: &str) -> FetchOutcome {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.transient_failures {
            return FetchOutcome::transient(format!("connection reset ({})", call + 1));
        }
        match self.replies.get(symbol).cloned().unwrap_or(Reply::Empty) {
            Reply::Records(records) => FetchOutcome::success(records),
            Reply::Empty => FetchOutcome::Empty,
            Reply::Terminal => FetchOutcome::terminal(format!("unsupported symbol {}", symbol)),
            Reply::Panic => panic!("adapter exploded on {}", symbol),
        }
    }
}

#[async_trait]
impl SourceAdapter for MockSource {
    fn provider(&self) -> ProviderId {
        self.provider
    }

    fn capability(&self) -> Capability {
        self.capability
    }

    async fn fetch_price_history(&self, symbol: &str, _lookback_days: u32) -> FetchOutcome {
        self.answer(symbol)
    }

    async fn fetch_series(&self, series_id: &str, _lookback_days: u32) -> FetchOutcome {
        self.answer(series_id)
    }

    async fn fetch_table(&self, _url: &str, _table_hint: Option<&str>) -> Result<Vec<RawTable>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.table.clone().into_iter().collect())
    }
}

fn test_config() -> Config {
    Config::new().with_retry(3, Duration::from_millis(1), Backoff::Fixed)
}

/// `days` daily bars ending today, ascending.
fn history(days: i64) -> Vec<CanonicalRecord> {
    let today = Utc::now().date_naive();
    (0..days)
        .map(|i| {
            let date = today - DateDuration::days(days - 1 - i);
            let close = 100.0 + (i as f64 * 0.7).sin() * 5.0 + 0.004;
            CanonicalRecord::bar(date, close - 0.5, close + 1.0, close - 1.0, close, 1_000.0)
        })
        .collect()
}

fn stock(name: &str, symbol: &str) -> Target {
    Target::new(name, InstrumentType::StockUs).with_symbol(ProviderId::Yahoo, symbol)
}

#[tokio::test]
async fn falls_back_to_lower_priority_source_on_empty() {
    let yahoo = Arc::new(MockSource::new(ProviderId::Yahoo, Capability::FetchPriceHistory));
    let akshare = Arc::new(
        MockSource::new(ProviderId::Akshare, Capability::FetchPriceHistory).reply("HSI", Reply::Records(history(40))),
    );
    let config = test_config();
    let chain = Arc::new(
        FallbackChain::new(&config)
            .with_adapter(yahoo.clone())
            .with_adapter(akshare.clone()),
    );

    let target = Target::new("恒生指数", InstrumentType::IndexUs)
        .with_symbol(ProviderId::Yahoo, "^HSI")
        .with_symbol(ProviderId::Akshare, "HSI");

    let outcome = chain.fetch(&target).await;
    assert_eq!(outcome.records().map(|r| r.len()), Some(40));
    assert_eq!(outcome.records().unwrap(), history(40).as_slice());
    assert_eq!(yahoo.calls(), 3);
    assert_eq!(akshare.calls(), 1);

    let scheduler = GroupScheduler::new(chain, &config);
    let group = scheduler.run_group("指数", vec![target]).await;
    assert_eq!(group.logs.len(), 1);
    assert!(group.logs[0].succeeded);
    assert_eq!(group.logs[0].error, None);
}

#[tokio::test]
async fn newest_first_history_is_reordered_before_analysis() {
    let mut newest_first = history(40);
    newest_first.reverse();
    let akshare = Arc::new(
        MockSource::new(ProviderId::Akshare, Capability::FetchPriceHistory)
            .reply("HSTECH", Reply::Records(newest_first)),
    );
    let config = test_config();
    let chain = Arc::new(FallbackChain::new(&config).with_adapter(akshare));
    let target = Target::new("恒生科技指数", InstrumentType::IndexHk).with_symbol(ProviderId::Akshare, "HSTECH");

    let outcome = chain.fetch(&target).await;
    assert_eq!(outcome.records().unwrap(), history(40).as_slice());

    let expected = history(40);
    let newest = expected.last().unwrap();
    let scheduler = GroupScheduler::new(chain, &config);
    let group = scheduler.run_group("指数", vec![target]).await;

    let summary = &group.summaries[0];
    assert_eq!(summary.date, newest.date);
    assert_eq!(Some(summary.latest_close), newest.close);
    assert!(summary.signals.is_some());

    assert_eq!(group.klines.len(), config.report_days);
    assert_eq!(group.klines[0].record.date, newest.date);
    let oldest_kept = expected[expected.len() - config.report_days].date;
    assert_eq!(group.klines.last().map(|k| k.record.date), Some(oldest_kept));
}

#[tokio::test]
async fn transient_failures_below_budget_are_retried() {
    let yahoo = Arc::new(
        MockSource::new(ProviderId::Yahoo, Capability::FetchPriceHistory)
            .failing_first(2)
            .reply("AAPL", Reply::Records(history(5))),
    );
    let chain = FallbackChain::new(&test_config()).with_adapter(yahoo.clone());

    let outcome = chain.fetch(&stock("苹果(AAPL)", "AAPL")).await;
    assert!(outcome.is_success());
    assert_eq!(yahoo.calls(), 3);
}

#[tokio::test]
async fn exhausted_retries_end_the_chain() {
    let yahoo = Arc::new(
        MockSource::new(ProviderId::Yahoo, Capability::FetchPriceHistory)
            .failing_first(10)
            .reply("AAPL", Reply::Records(history(5))),
    );
    let chain = FallbackChain::new(&test_config()).with_adapter(yahoo.clone());

    match chain.fetch(&stock("苹果(AAPL)", "AAPL")).await {
        FetchOutcome::Failure(failure) => {
            assert_eq!(failure.kind, FailureKind::AllSourcesExhausted);
            assert_eq!(failure.message, "yahoo: max retries exceeded: connection reset (3)");
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(yahoo.calls(), 3);
}

#[tokio::test]
async fn aggregated_failure_names_every_provider() {
    let yahoo = Arc::new(MockSource::new(ProviderId::Yahoo, Capability::FetchPriceHistory).reply("GC=F", Reply::Terminal));
    let akshare = Arc::new(MockSource::new(ProviderId::Akshare, Capability::FetchPriceHistory));
    let chain = FallbackChain::new(&test_config())
        .with_adapter(yahoo.clone())
        .with_adapter(akshare.clone());

    let gold = Target::new("黄金(COMEX)", InstrumentType::FutureForeign)
        .with_symbol(ProviderId::Yahoo, "GC=F")
        .with_symbol(ProviderId::Akshare, "GC");

    match chain.fetch(&gold).await {
        FetchOutcome::Failure(failure) => {
            let parts: Vec<&str> = failure.message.split("; ").collect();
            assert_eq!(parts.len(), 2);
            assert!(parts[0].starts_with("yahoo: "));
            assert!(parts[1].starts_with("akshare: max retries exceeded"));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    // terminal errors are not retried
    assert_eq!(yahoo.calls(), 1);
    assert_eq!(akshare.calls(), 3);
}

#[tokio::test]
async fn a_panicking_target_does_not_affect_its_siblings() {
    let yahoo = Arc::new(
        MockSource::new(ProviderId::Yahoo, Capability::FetchPriceHistory)
            .reply("T1", Reply::Records(history(40)))
            .reply("T2", Reply::Panic)
            .reply("T3", Reply::Records(history(40))),
    );
    let config = test_config();
    let chain = Arc::new(FallbackChain::new(&config).with_adapter(yahoo));
    let scheduler = GroupScheduler::new(chain, &config);

    let group = scheduler
        .run_group("美股", vec![stock("一", "T1"), stock("二", "T2"), stock("三", "T3")])
        .await;

    let summarized: Vec<&str> = group.summaries.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(summarized, vec!["一", "三"]);
    assert!(group.summaries.iter().all(|s| s.signals.is_some()));
    assert_eq!(group.klines.len(), 2 * config.report_days);
    assert!(group.klines.iter().all(|k| k.name != "二"));

    assert_eq!(group.logs.len(), 3);
    let failed: Vec<_> = group.logs.iter().filter(|l| !l.succeeded).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].target_name, "二");
    assert!(failed[0].error.as_deref().unwrap_or_default().contains("panicked"));
}

#[tokio::test]
async fn short_history_is_degraded_not_failed() {
    let yahoo = Arc::new(MockSource::new(ProviderId::Yahoo, Capability::FetchPriceHistory).reply("NEW", Reply::Records(history(10))));
    let config = test_config();
    let scheduler = GroupScheduler::new(Arc::new(FallbackChain::new(&config).with_adapter(yahoo)), &config);

    let group = scheduler.run_group("新股", vec![stock("新股", "NEW")]).await;
    let log = &group.logs[0];
    assert!(log.succeeded);
    assert!(log.degraded.as_deref().unwrap_or_default().contains("insufficient data"));
    assert_eq!(group.summaries[0].signals, None);
    assert!(group.summaries[0].moving_averages[&5].is_some());
    assert_eq!(group.summaries[0].moving_averages[&20], None);
}

#[tokio::test]
async fn stale_table_keeps_newest_rows() {
    let today = Utc::now().date_naive();
    let rows: Vec<Vec<(String, String)>> = (0..8)
        .map(|i| {
            let date: NaiveDate = today - DateDuration::days(400 + i * 30);
            vec![
                ("Release Date".to_string(), format!("{} (Mar)", date.format("%b %d, %Y"))),
                ("Actual".to_string(), format!("{}%", i)),
            ]
        })
        .collect();
    let investing = Arc::new(
        MockSource::new(ProviderId::Investing, Capability::FetchTable).with_table(RawTable::from_records(rows)),
    );
    let config = test_config();
    let chain = Arc::new(FallbackChain::new(&config).with_adapter(investing));

    let target = Target::new("韩国出口", InstrumentType::ScrapedTable)
        .with_symbol(ProviderId::Investing, "https://example.test/korea-exports");

    match chain.fetch(&target).await {
        FetchOutcome::Success { records, degraded } => {
            assert_eq!(records.len(), 5);
            assert!(records.windows(2).all(|w| w[0].date < w[1].date));
            assert_eq!(records.last().and_then(|r| r.value), Some(0.0));
            assert!(degraded.is_some());
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    let scheduler = GroupScheduler::new(chain, &config);
    let group = scheduler
        .run_group_with("海外经济", vec![target], Derivation::LatestOnly)
        .await;
    assert!(group.logs[0].succeeded);
    assert!(group.logs[0].degraded.as_deref().unwrap_or_default().contains("stale source"));
}

#[tokio::test]
async fn merging_a_group_twice_matches_merging_once() {
    let yahoo = Arc::new(
        MockSource::new(ProviderId::Yahoo, Capability::FetchPriceHistory)
            .reply("AAPL", Reply::Records(history(40)))
            .reply("MSFT", Reply::Records(history(35))),
    );
    let config = test_config();
    let scheduler = GroupScheduler::new(Arc::new(FallbackChain::new(&config).with_adapter(yahoo)), &config);
    let group = scheduler
        .run_group("美股七巨头", vec![stock("苹果", "AAPL"), stock("微软", "MSFT")])
        .await;

    let mut once = Report::new(2);
    once.merge_group(&group, MaCategory::General);
    let mut twice = Report::new(2);
    twice.merge_group(&group, MaCategory::General);
    twice.merge_group(&group, MaCategory::General);

    let a = once.finish(ReportMap::new());
    let b = twice.finish(ReportMap::new());
    assert_eq!(a.tree, b.tree);
    assert_eq!(a.logs, b.logs);
}

#[tokio::test]
async fn non_finite_values_are_nulled_and_floats_rounded() {
    let mut report = Report::new(2);
    let mut usa = ReportMap::new();
    usa.insert("T10YIE".to_string(), f64::NAN.into());
    usa.insert("WALCL".to_string(), f64::INFINITY.into());
    usa.insert("year_10".to_string(), 4.256_7.into());
    let mut partial = ReportMap::new();
    partial.insert("usa".to_string(), usa.into());
    report.merge_tree(partial);

    let tree = report.finish(ReportMap::new()).tree;
    assert_eq!(tree.get_path("usa.T10YIE"), Some(&ReportValue::Null));
    assert_eq!(tree.get_path("usa.WALCL"), Some(&ReportValue::Null));
    assert_eq!(tree.get_path("usa.year_10"), Some(&ReportValue::Float(4.26)));
}

#[tokio::test]
async fn collector_assembles_full_report() {
    let today = Utc::now().date_naive();
    let yahoo = Arc::new(
        MockSource::new(ProviderId::Yahoo, Capability::FetchPriceHistory)
            .reply("^GSPC", Reply::Records(history(60)))
            .reply("GC=F", Reply::Records(history(60))),
    );
    let fred = Arc::new(MockSource::new(ProviderId::Fred, Capability::FetchSeries).reply(
        "DGS10",
        Reply::Records(vec![
            CanonicalRecord::point(today - DateDuration::days(1), 4.1),
            CanonicalRecord::point(today, 4.256),
        ]),
    ));
    let config = Arc::new(test_config());
    let chain = Arc::new(
        FallbackChain::new(&config)
            .with_adapter(yahoo)
            .with_adapter(fred),
    );

    let registry = StaticRegistry::new()
        .with_group(
            "指数",
            GroupKind::Priced(MaCategory::General),
            vec![Target::new("标普500", InstrumentType::IndexUs).with_symbol(ProviderId::Yahoo, "^GSPC")],
        )
        .with_group(
            "大宗商品",
            GroupKind::Priced(MaCategory::Commodities),
            vec![
                Target::new("黄金(COMEX)", InstrumentType::FutureForeign).with_symbol(ProviderId::Yahoo, "GC=F"),
                Target::new("上海金", InstrumentType::FutureDomestic).with_symbol(ProviderId::Akshare, "au0"),
            ],
        )
        .with_group(
            "美国宏观",
            GroupKind::Latest { section: "usa".into() },
            vec![Target::new("year_10", InstrumentType::EconomicSeries).with_symbol(ProviderId::Fred, "DGS10")],
        );

    let run = MarketCollector::new(Arc::new(registry), chain, config)
        .collect_all()
        .await;
    let tree = &run.report;

    let klines = tree.get_path("data.指数").and_then(ReportValue::as_list).unwrap();
    assert_eq!(klines.len(), 30);
    assert_eq!(tree.get_path("ma_data.general").and_then(ReportValue::as_list).unwrap().len(), 1);
    assert_eq!(tree.get_path("ma_data.commodities").and_then(ReportValue::as_list).unwrap().len(), 1);
    assert_eq!(tree.get_path("usa.year_10"), Some(&ReportValue::Float(4.26)));
    assert!(tree.get_path("meta.generated_at").is_some());
    assert_eq!(tree.get_path("meta.failed"), Some(&ReportValue::Int(1)));

    assert_eq!(run.summary.total, 4);
    assert_eq!(run.summary.passed, 3);
    let failed = run.logs.iter().find(|l| !l.succeeded).unwrap();
    assert_eq!(failed.target_name, "上海金");
    assert_eq!(failed.to_string(), "[FAIL] 上海金 | no configured source");
}
