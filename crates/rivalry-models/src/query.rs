use serde::{Deserialize, Serialize};

/// Companies and tickers extracted from a free-text research query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ParsedQuery {
    pub companies: Vec<String>,
    /// Distinct ticker symbols to research, in first-seen order.
    pub tickers: Vec<String>,
    /// Ticker of each entry in `companies`, same length and order.
    #[serde(default)]
    pub company_tickers: Vec<Option<String>>,
    /// Short description of the research focus, if the model gave one.
    #[serde(default)]
    pub focus: Option<String>,
    /// True when the configured default companies were used instead.
    #[serde(default)]
    pub used_fallback: bool,
}

impl ParsedQuery {
    /// Comma-joined company list, as used in sub-agent task text.
    pub fn company_list(&self) -> String {
        self.companies.join(", ")
    }

    /// Ticker resolved for the company at `index`, if any.
    pub fn ticker_of(&self, index: usize) -> Option<&str> {
        self.company_tickers.get(index)?.as_deref()
    }
}
