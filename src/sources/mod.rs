pub mod base;
pub mod fred;
pub mod html;
pub mod spreadsheet;
pub mod yahoo;

pub use base::{RateLimiter, SourceAdapter};
pub use fred::FredSource;
pub use html::HtmlTableSource;
pub use spreadsheet::SpreadsheetSource;
pub use yahoo::YahooChartSource;
