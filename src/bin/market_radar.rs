use market_radar::config::{Backoff, Config};
use market_radar::fetch::FallbackChain;
use market_radar::registry::{StaticRegistry, TargetRegistry};
use market_radar::services::MarketCollector;
use market_radar::sources::{FredSource, HtmlTableSource, SpreadsheetSource, YahooChartSource};

use anyhow::Context;
use clap::{App, Arg, ArgMatches, SubCommand};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

fn parse_arg<T: std::str::FromStr>(matches: &ArgMatches, name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match matches.value_of(name) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid --{} '{}': {}", name, raw, e)),
        None => Ok(default),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let app = App::new("MarketRadar")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Daily market radar: multi-source collection, normalization and technical signals")
        .subcommand(
            SubCommand::with_name("collect")
                .about("Collect every registered group and write the report")
                .arg(
                    Arg::with_name("report-days")
                        .long("report-days")
                        .value_name("DAYS")
                        .help("Number of most recent klines kept per target")
                        .takes_value(true)
                        .default_value("30"),
                )
                .arg(
                    Arg::with_name("workers")
                        .short('w')
                        .long("workers")
                        .value_name("WORKERS")
                        .help("Maximum concurrent fetches")
                        .takes_value(true)
                        .default_value("5"),
                )
                .arg(
                    Arg::with_name("retries")
                        .short('r')
                        .long("retries")
                        .value_name("ATTEMPTS")
                        .help("Attempts per source before falling back")
                        .takes_value(true)
                        .default_value("3"),
                )
                .arg(
                    Arg::with_name("retry-delay")
                        .long("retry-delay")
                        .value_name("MILLIS")
                        .help("Delay between attempts; grows linearly with --linear-backoff")
                        .takes_value(true)
                        .default_value("1000"),
                )
                .arg(
                    Arg::with_name("linear-backoff")
                        .long("linear-backoff")
                        .help("Multiply the retry delay by the attempt number")
                        .takes_value(false),
                )
                .arg(
                    Arg::with_name("output")
                        .short('o')
                        .long("output")
                        .value_name("FILE")
                        .help("Report JSON output path")
                        .takes_value(true)
                        .default_value("market_radar.json"),
                )
                .arg(
                    Arg::with_name("status-log")
                        .long("status-log")
                        .value_name("FILE")
                        .help("Also write the status log to this file")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("fred-key")
                        .long("fred-key")
                        .value_name("KEY")
                        .help("FRED API key (defaults to $FRED_API_KEY)")
                        .takes_value(true),
                ),
        )
        .subcommand(SubCommand::with_name("targets").about("List the registered groups and targets"));

    let matches = app.get_matches();
    let registry = StaticRegistry::market_radar();

    if let Some(matches) = matches.subcommand_matches("collect") {
        let backoff = if matches.is_present("linear-backoff") {
            Backoff::Linear
        } else {
            Backoff::Fixed
        };
        let config = Config::new()
            .with_report_days(parse_arg(matches, "report-days", 30)?)
            .with_max_workers(parse_arg(matches, "workers", 5)?)
            .with_retry(
                parse_arg(matches, "retries", 3)?,
                Duration::from_millis(parse_arg(matches, "retry-delay", 1000)?),
                backoff,
            );

        let mut chain = FallbackChain::new(&config)
            .with_adapter(Arc::new(YahooChartSource::new()?))
            .with_adapter(Arc::new(SpreadsheetSource::new()?))
            .with_adapter(Arc::new(HtmlTableSource::new()?));

        let fred_key = matches
            .value_of("fred-key")
            .map(str::to_string)
            .or_else(|| std::env::var("FRED_API_KEY").ok());
        match fred_key {
            Some(key) if !key.trim().is_empty() => {
                chain = chain.with_adapter(Arc::new(FredSource::new(key.trim())?));
            }
            _ => warn!("未配置 FRED API key，宏观序列只能使用备用数据源"),
        }

        let config = Arc::new(config);
        let collector = MarketCollector::new(Arc::new(registry), Arc::new(chain), Arc::clone(&config));
        let run = collector.collect_all().await;

        let output = matches.value_of("output").unwrap_or("market_radar.json");
        let json = serde_json::to_string_pretty(&run.report)?;
        std::fs::write(output, json).with_context(|| format!("failed to write report to {}", output))?;
        info!("报告已写入 {}", output);

        let lines: Vec<String> = run.logs.iter().map(ToString::to_string).collect();
        for line in &lines {
            println!("{}", line);
        }
        if let Some(path) = matches.value_of("status-log") {
            std::fs::write(path, lines.join("\n") + "\n")
                .with_context(|| format!("failed to write status log to {}", path))?;
        }
        println!(
            "total: {}, passed: {}, failed: {}",
            run.summary.total, run.summary.passed, run.summary.failed
        );
    } else if matches.subcommand_matches("targets").is_some() {
        for group in registry.groups() {
            println!("{} ({:?})", group.name, group.kind);
            for target in registry.list(&group.name) {
                let symbols: Vec<String> = target
                    .provider_symbols
                    .iter()
                    .map(|(provider, symbol)| format!("{}={}", provider, symbol))
                    .collect();
                println!("  {} [{:?}] {}", target.name, target.instrument_type, symbols.join(", "));
            }
        }
    } else {
        println!("No command specified. Use --help for usage information.");
    }

    Ok(())
}
