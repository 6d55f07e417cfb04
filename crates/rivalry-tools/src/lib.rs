pub mod error;
pub mod financial;
pub mod format;
pub mod retry;
pub mod search;
pub mod tavily;
pub mod tool;
pub mod yahoo;

pub use error::ToolError;
pub use financial::financial_toolset;
pub use retry::RetryPolicy;
pub use search::competitor_toolset;
pub use tavily::{SearchSource, TavilyClient};
pub use tool::{Tool, ToolSet};
pub use yahoo::{QuoteSource, RevenueHistory, YahooFinanceClient};
