use crate::errors::Result;
use crate::models::{Capability, ProviderId};
use crate::normalizer::RawTable;
use crate::sources::base::{build_client, check_status, RateLimiter, SourceAdapter};
use async_trait::async_trait;
use log::info;
use reqwest::Client;
use std::time::Duration;

/// 下载 xlsx/xls/ods 报表文件，按工作表拆成原始表格
pub struct SpreadsheetSource {
    client: Client,
    limiter: RateLimiter,
}

impl SpreadsheetSource {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            limiter: RateLimiter::new(Duration::from_millis(500)),
        })
    }
}

#[async_trait]
impl SourceAdapter for SpreadsheetSource {
    fn provider(&self) -> ProviderId {
        ProviderId::Spreadsheet
    }

    fn capability(&self) -> Capability {
        Capability::FetchTable
    }

    async fn fetch_table(&self, url: &str, table_hint: Option<&str>) -> Result<Vec<RawTable>> {
        info!("下载报表 {} (工作表: {})", url, table_hint.unwrap_or("自动"));
        self.limiter.wait().await;

        let response = self.client.get(url).send().await?;
        if let Some(err) = check_status(response.status(), url) {
            return Err(err);
        }
        let bytes = response.bytes().await?;
        RawTable::from_workbook_bytes(&bytes)
    }
}
