use crate::errors::{RadarError, Result};
use crate::models::{Capability, ProviderId};
use crate::normalizer::RawTable;
use crate::sources::base::{build_client, check_status, RateLimiter, SourceAdapter};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

/// 抓取静态页面中的 `<table>`，例如 Investing.com 的经济日历与历史数据页
pub struct HtmlTableSource {
    client: Client,
    limiter: RateLimiter,
    provider: ProviderId,
}

impl HtmlTableSource {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            limiter: RateLimiter::new(Duration::from_secs(2)),
            provider: ProviderId::Investing,
        })
    }

    /// Serve the tables under another provider id.
    pub fn for_provider(mut self, provider: ProviderId) -> Self {
        self.provider = provider;
        self
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| RadarError::ParseError(format!("bad selector {}: {}", css, e)))
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Every table in the document; the element id, if any, becomes the table name.
pub fn parse_tables(html: &str) -> Result<Vec<RawTable>> {
    let document = Html::parse_document(html);
    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let header_sel = selector("th")?;
    let cell_sel = selector("td")?;

    let mut tables = Vec::new();
    for table in document.select(&table_sel) {
        let mut headers: Vec<String> = Vec::new();
        let mut rows: Vec<Vec<String>> = Vec::new();

        for row in table.select(&row_sel) {
            let ths: Vec<String> = row.select(&header_sel).map(cell_text).collect();
            if headers.is_empty() && !ths.is_empty() {
                headers = ths;
                continue;
            }
            let cells: Vec<String> = row.select(&cell_sel).map(cell_text).collect();
            if !cells.is_empty() {
                rows.push(cells);
            }
        }

        // header-less tables use their first row
        if headers.is_empty() && !rows.is_empty() {
            headers = rows.remove(0);
        }
        if headers.is_empty() {
            continue;
        }

        let mut raw = RawTable::new(headers, rows);
        if let Some(id) = table.value().attr("id") {
            raw = raw.with_name(id);
        }
        tables.push(raw);
    }
    debug!("页面中解析出 {} 个表格", tables.len());
    Ok(tables)
}

#[async_trait]
impl SourceAdapter for HtmlTableSource {
    fn provider(&self) -> ProviderId {
        self.provider
    }

    fn capability(&self) -> Capability {
        Capability::FetchTable
    }

    async fn fetch_table(&self, url: &str, table_hint: Option<&str>) -> Result<Vec<RawTable>> {
        info!("抓取页面表格 {} (表: {})", url, table_hint.unwrap_or("自动"));
        self.limiter.wait().await;

        let response = self.client.get(url).send().await?;
        if let Some(err) = check_status(response.status(), url) {
            return Err(err);
        }
        let body = response.text().await?;
        parse_tables(&body)
    }
}
