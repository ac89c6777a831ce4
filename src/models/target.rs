use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// 数据提供方标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ProviderId {
    Yahoo,
    Akshare,
    Fred,
    Investing,
    Spreadsheet,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Yahoo => "yahoo",
            ProviderId::Akshare => "akshare",
            ProviderId::Fred => "fred",
            ProviderId::Investing => "investing",
            ProviderId::Spreadsheet => "spreadsheet",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 标的类型，决定数据源优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InstrumentType {
    IndexUs,
    IndexHk,
    /// A-share indices
    IndexCn,
    StockUs,
    StockHk,
    FutureForeign,
    FutureDomestic,
    EconomicSeries,
    Currency,
    ScrapedTable,
}

/// What an adapter can fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    FetchPriceHistory,
    FetchSeries,
    FetchTable,
}

/// 一个被跟踪的标的或指标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub instrument_type: InstrumentType,
    /// Providers without an entry are treated as absent for this target.
    pub provider_symbols: BTreeMap<ProviderId, String>,
    /// Sheet or table name passed to table adapters.
    pub table_hint: Option<String>,
}

impl Target {
    pub fn new(name: &str, instrument_type: InstrumentType) -> Self {
        Self {
            name: name.to_string(),
            instrument_type,
            provider_symbols: BTreeMap::new(),
            table_hint: None,
        }
    }

    pub fn with_symbol(mut self, provider: ProviderId, symbol: &str) -> Self {
        self.provider_symbols.insert(provider, symbol.to_string());
        self
    }

    pub fn with_table_hint(mut self, hint: &str) -> Self {
        self.table_hint = Some(hint.to_string());
        self
    }

    pub fn symbol_for(&self, provider: ProviderId) -> Option<&str> {
        self.provider_symbols
            .get(&provider)
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}
