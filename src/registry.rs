//! 标的注册表
//!
//! A registry lists named groups of targets and says where each group's
//! results land in the report.

use crate::models::{InstrumentType, ProviderId, Target};
use crate::report::MaCategory;

/// 分组结果写入报告的位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKind {
    /// Klines under `data.<group>`, summaries under `ma_data.<category>`.
    Priced(MaCategory),
    /// Latest value of each target under `<section>.<target>`.
    Latest { section: String },
    /// Normalized rows of each target under `<section>.<target>`.
    Table { section: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSpec {
    pub name: String,
    pub kind: GroupKind,
}

pub trait TargetRegistry: Send + Sync {
    fn groups(&self) -> Vec<GroupSpec>;

    /// Targets of `group`; empty for unknown groups.
    fn list(&self, group: &str) -> Vec<Target>;
}

/// 内存中的静态注册表
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    groups: Vec<(GroupSpec, Vec<Target>)>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(mut self, name: &str, kind: GroupKind, targets: Vec<Target>) -> Self {
        let spec = GroupSpec {
            name: name.to_string(),
            kind,
        };
        self.groups.retain(|(g, _)| g.name != name);
        self.groups.push((spec, targets));
        self
    }

    /// 默认的市场雷达标的
    pub fn market_radar() -> Self {
        use InstrumentType::*;

        let dual = |name: &str, kind: InstrumentType, yahoo: &str, akshare: &str| {
            Target::new(name, kind)
                .with_symbol(ProviderId::Yahoo, yahoo)
                .with_symbol(ProviderId::Akshare, akshare)
        };
        let yahoo = |name: &str, kind: InstrumentType, symbol: &str| {
            Target::new(name, kind).with_symbol(ProviderId::Yahoo, symbol)
        };
        let fred = |name: &str, series: &str| Target::new(name, EconomicSeries).with_symbol(ProviderId::Fred, series);
        let investing = |name: &str, url: &str, table: &str| {
            Target::new(name, ScrapedTable)
                .with_symbol(ProviderId::Investing, url)
                .with_table_hint(table)
        };

        let indices = vec![
            dual("纳斯达克", IndexUs, "^NDX", ".NDX"),
            dual("标普500", IndexUs, "^GSPC", ".INX"),
            dual("恒生科技", IndexHk, "^HSTECH", "HSTECH"),
            dual("恒生指数", IndexHk, "^HSI", "HSI"),
            dual("VNM(ETF)", StockUs, "VNM", "VNM"),
            dual("XBI(ETF)", StockUs, "XBI", "XBI"),
        ];

        let commodities = vec![
            dual("黄金(COMEX)", FutureForeign, "GC=F", "GC"),
            dual("白银(COMEX)", FutureForeign, "SI=F", "SI"),
            dual("铜(COMEX)", FutureForeign, "HG=F", "HG"),
            Target::new("上海金", FutureDomestic).with_symbol(ProviderId::Akshare, "au0"),
            dual("原油(WTI)", FutureForeign, "CL=F", "CL"),
            dual("铀(URA)", StockUs, "URA", "URA"),
        ];

        let mag7 = vec![
            yahoo("苹果(AAPL)", StockUs, "AAPL"),
            yahoo("微软(MSFT)", StockUs, "MSFT"),
            yahoo("谷歌(GOOGL)", StockUs, "GOOGL"),
            yahoo("亚马逊(AMZN)", StockUs, "AMZN"),
            yahoo("英伟达(NVDA)", StockUs, "NVDA"),
            yahoo("Meta(META)", StockUs, "META"),
            yahoo("特斯拉(TSLA)", StockUs, "TSLA"),
        ];

        let banks = vec![
            yahoo("摩根大通(JPM)", StockUs, "JPM"),
            yahoo("美银(BAC)", StockUs, "BAC"),
            yahoo("花旗(C)", StockUs, "C"),
            yahoo("富国银行(WFC)", StockUs, "WFC"),
            yahoo("高盛(GS)", StockUs, "GS"),
            yahoo("摩根士丹利(MS)", StockUs, "MS"),
        ];

        let hstech_top = vec![
            dual("美团-W", StockHk, "3690.HK", "03690"),
            dual("腾讯控股", StockHk, "0700.HK", "00700"),
            dual("小米集团-W", StockHk, "1810.HK", "01810"),
            dual("阿里巴巴-SW", StockHk, "9988.HK", "09988"),
        ];

        let usa_macro = vec![
            fred("10-Year Breakeven Inflation Rate", "T10YIE"),
            fred("5-Year Breakeven Inflation Rate", "T5YIE"),
            fred("ICE BofA US High Yield Index Option-Adjusted Spread", "BAMLH0A0HYM2"),
            fred("Treasury General Account (TGA)", "WTREGEN"),
            fred("Overnight Reverse Repurchase Agreements (ON RRP)", "RRPONTSYD"),
            fred("10-Year Treasury Inflation-Indexed Security, Constant Maturity", "DFII10"),
            fred("M2 Money Stock", "M2SL"),
            fred("M1 Money Stock", "M1SL"),
            fred("Total Assets (Fed Balance Sheet)", "WALCL"),
            fred("year_2", "DGS2"),
            fred("year_10", "DGS10").with_symbol(ProviderId::Yahoo, "^TNX"),
            fred("year_30", "DGS30").with_symbol(ProviderId::Yahoo, "^TYX"),
        ];

        let fx = vec![
            yahoo("美元指数", Currency, "DX-Y.NYB"),
            yahoo("美元/人民币", Currency, "CNY=X"),
            yahoo("美元/日元", Currency, "JPY=X"),
        ];

        let ashare = vec![
            dual("上证指数", IndexCn, "000001.SS", "sh000001"),
            dual("深证成指", IndexCn, "399001.SZ", "sz399001"),
            dual("创业板指", IndexCn, "399006.SZ", "sz399006"),
        ];

        // 沪深港通南向当日成交净买额，单位亿元
        let southbound = vec![Target::new("南向资金", EconomicSeries).with_symbol(ProviderId::Akshare, "南向资金")];

        let japan = vec![investing(
            "日本10年期国债",
            "https://cn.investing.com/rates-bonds/japan-10-year-bond-yield-historical-data",
            "curr_table",
        )];

        let scraped = vec![
            investing(
                "韩国出口",
                "https://www.investing.com/economic-calendar/south-korean-export-growth-1316",
                "eventHistoryTable1316",
            ),
            investing(
                "越南FDI",
                "https://www.investing.com/economic-calendar/vietnamese-foreign-direct-investment-(usd)-1857",
                "eventHistoryTable1857",
            ),
        ];

        Self::new()
            .with_group("指数", GroupKind::Priced(MaCategory::General), indices)
            .with_group("大宗商品", GroupKind::Priced(MaCategory::Commodities), commodities)
            .with_group("美股七巨头", GroupKind::Priced(MaCategory::General), mag7)
            .with_group("美国银行股", GroupKind::Priced(MaCategory::General), banks)
            .with_group("恒生科技成分股", GroupKind::Priced(MaCategory::General), hstech_top)
            .with_group("美国宏观", GroupKind::Latest { section: "usa".into() }, usa_macro)
            .with_group("汇率", GroupKind::Latest { section: "market_fx".into() }, fx)
            .with_group("A股指数", GroupKind::Latest { section: "china".into() }, ashare)
            .with_group("南向资金", GroupKind::Table { section: "china".into() }, southbound)
            .with_group("日本国债", GroupKind::Table { section: "japan".into() }, japan)
            .with_group("海外经济", GroupKind::Table { section: "market_fx".into() }, scraped)
    }
}

impl TargetRegistry for StaticRegistry {
    fn groups(&self) -> Vec<GroupSpec> {
        self.groups.iter().map(|(spec, _)| spec.clone()).collect()
    }

    fn list(&self, group: &str) -> Vec<Target> {
        self.groups
            .iter()
            .find(|(spec, _)| spec.name == group)
            .map(|(_, targets)| targets.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_radar_groups() {
        let registry = StaticRegistry::market_radar();
        let names: Vec<String> = registry.groups().into_iter().map(|g| g.name).collect();
        assert_eq!(&names[..4], &["指数", "大宗商品", "美股七巨头", "美国银行股"]);
        assert_eq!(registry.list("美股七巨头").len(), 7);
        assert!(registry.list("不存在").is_empty());
    }

    #[test]
    fn shanghai_gold_has_no_yahoo_symbol() {
        let registry = StaticRegistry::market_radar();
        let gold = registry
            .list("大宗商品")
            .into_iter()
            .find(|t| t.name == "上海金")
            .unwrap();
        assert!(gold.symbol_for(ProviderId::Yahoo).is_none());
        assert_eq!(gold.symbol_for(ProviderId::Akshare), Some("au0"));
    }

    #[test]
    fn hang_seng_tech_constituents_are_hk_stocks() {
        let registry = StaticRegistry::market_radar();
        let spec = registry.groups().into_iter().find(|g| g.name == "恒生科技成分股").unwrap();
        assert_eq!(spec.kind, GroupKind::Priced(MaCategory::General));

        let stocks = registry.list("恒生科技成分股");
        assert_eq!(stocks.len(), 4);
        assert!(stocks.iter().all(|t| t.instrument_type == InstrumentType::StockHk));
        let tencent = stocks.iter().find(|t| t.name == "腾讯控股").unwrap();
        assert_eq!(tencent.symbol_for(ProviderId::Yahoo), Some("0700.HK"));
        assert_eq!(tencent.symbol_for(ProviderId::Akshare), Some("00700"));
    }

    #[test]
    fn southbound_flow_lands_in_china_section() {
        let registry = StaticRegistry::market_radar();
        let spec = registry.groups().into_iter().find(|g| g.name == "南向资金").unwrap();
        assert_eq!(spec.kind, GroupKind::Table { section: "china".into() });

        let flow = registry.list("南向资金");
        assert_eq!(flow.len(), 1);
        assert_eq!(flow[0].symbol_for(ProviderId::Akshare), Some("南向资金"));
        assert!(flow[0].symbol_for(ProviderId::Yahoo).is_none());
    }

    #[test]
    fn treasury_yields_fall_back_to_yahoo() {
        let usa = StaticRegistry::market_radar().list("美国宏观");
        let ten = usa.iter().find(|t| t.name == "year_10").unwrap();
        assert_eq!(ten.symbol_for(ProviderId::Fred), Some("DGS10"));
        assert_eq!(ten.symbol_for(ProviderId::Yahoo), Some("^TNX"));
    }
}
