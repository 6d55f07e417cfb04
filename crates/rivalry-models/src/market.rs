use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Key metrics for one listed company, as read from the quote source.
///
/// Ratios (`revenue_growth`, `gross_margin`, `operating_margin`) are fractions,
/// so `0.25` means 25%.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FinancialSnapshot {
    pub ticker: String,
    pub company_name: String,
    pub market_cap: Option<Decimal>,
    pub revenue_ttm: Option<Decimal>,
    pub revenue_growth: Option<Decimal>,
    pub gross_margin: Option<Decimal>,
    pub operating_margin: Option<Decimal>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub currency: Option<String>,
}

/// Revenue for one fiscal year.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RevenuePoint {
    pub year: i32,
    pub revenue: Decimal,
}

/// One web search result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub content: String,
    pub url: String,
}
