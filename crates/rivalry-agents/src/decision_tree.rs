//! "Behind the Scenes" rendering of a run's tool-call log.

use rivalry_models::{RunMetadata, SubAgentKind, ToolCallRecord};
use serde_json::Value;

const MAX_ARG_CHARS: usize = 40;

/// Display name for a tool; unknown snake_case names are title-cased.
pub fn friendly_tool_name(tool: &str) -> String {
    let known = match tool {
        "get_company_financials" => Some("Company Financials"),
        "get_historical_revenue" => Some("Historical Revenue"),
        "get_company_comparison" => Some("Company Comparison"),
        "search_company_info" => Some("Company Info Search"),
        "search_competitive_analysis" => Some("Competitive Analysis Search"),
        "search_product_info" => Some("Product Info Search"),
        "search_market_trends" => Some("Market Trends Search"),
        _ => None,
    };
    if let Some(name) = known {
        return name.to_string();
    }
    tool.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn arg_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(arg_value).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

/// `k=v` pairs on one line, in the order the model sent them; long values are
/// cut to 37 chars plus `...`.
pub fn short_args(args: &Value) -> String {
    let Value::Object(map) = args else {
        return String::new();
    };
    map.iter()
        .map(|(key, value)| {
            let value = arg_value(value);
            let value = if value.chars().count() > MAX_ARG_CHARS {
                let cut: String = value.chars().take(MAX_ARG_CHARS - 3).collect();
                format!("{cut}...")
            } else {
                value
            };
            format!("{key}={value}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn count_label(n: usize) -> String {
    if n == 1 {
        "1 tool call".to_string()
    } else {
        format!("{n} tool calls")
    }
}

fn or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

fn branch_icon(kind: SubAgentKind) -> &'static str {
    match kind {
        SubAgentKind::Financial => "📊",
        SubAgentKind::Competitor => "🔍",
    }
}

/// Text tree of the run, fenced so it renders verbatim in markdown.
pub fn build_decision_tree_markdown(metadata: &RunMetadata) -> String {
    let mut lines = vec![
        "```text".to_string(),
        "❓ User Query".to_string(),
        format!(
            "└── 🧭 Parse: {} (tickers: {})",
            or_none(&metadata.companies),
            or_none(&metadata.tickers)
        ),
    ];

    let branches = [
        (SubAgentKind::Financial, &metadata.financial_tool_calls),
        (SubAgentKind::Competitor, &metadata.competitor_tool_calls),
    ];
    for (kind, calls) in branches {
        lines.push(format!(
            "    ├── {} {} ({})",
            branch_icon(kind),
            kind.nickname(),
            count_label(calls.len())
        ));
        for (i, call) in calls.iter().enumerate() {
            let connector = if i + 1 == calls.len() { "└──" } else { "├──" };
            lines.push(format!("    │   {connector} {}", call_label(call)));
        }
    }
    lines.push("    └── 📝 Verdict: Final Report".to_string());
    lines.push("```".to_string());
    lines.join("\n")
}

fn call_label(call: &ToolCallRecord) -> String {
    let args = short_args(&call.args);
    if args.is_empty() {
        friendly_tool_name(&call.tool)
    } else {
        format!("{} ({args})", friendly_tool_name(&call.tool))
    }
}

fn escape_dot(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// The same tree as Graphviz DOT.
pub fn build_decision_tree_dot(metadata: &RunMetadata) -> String {
    let mut lines = vec![
        "digraph decision_tree {".to_string(),
        "  rankdir=TB;".to_string(),
        "  bgcolor=\"transparent\";".to_string(),
        "  node [fontname=\"Helvetica\" fontsize=11 style=filled];".to_string(),
        "  edge [fontname=\"Helvetica\" fontsize=9 color=\"#888888\"];".to_string(),
        "  query [label=\"User Query\" shape=diamond fillcolor=\"#FFD54F\" fontcolor=\"#333333\"];"
            .to_string(),
        format!(
            "  parse [label=\"Parse\\n{}\\nTickers: {}\" shape=box fillcolor=\"#E3F2FD\" fontcolor=\"#1565C0\"];",
            escape_dot(&metadata.companies.join(", ")),
            escape_dot(&metadata.tickers.join(", "))
        ),
        "  query -> parse [label=\"analyze\"];".to_string(),
    ];

    let branches = [
        (SubAgentKind::Financial, "financial", "fin_tc", "#E8F5E9", "#2E7D32", "#C8E6C9", "#1B5E20", &metadata.financial_tool_calls),
        (SubAgentKind::Competitor, "competitor", "comp_tc", "#FFF3E0", "#E65100", "#FFE0B2", "#BF360C", &metadata.competitor_tool_calls),
    ];
    for (kind, node, prefix, fill, font, leaf_fill, leaf_font, calls) in branches {
        lines.push(format!(
            "  {node} [label=\"{} {}\\n{}\" shape=box fillcolor=\"{fill}\" fontcolor=\"{font}\"];",
            branch_icon(kind),
            kind.nickname(),
            count_label(calls.len())
        ));
        lines.push(format!("  parse -> {node} [label=\"parallel\"];"));
        for (i, call) in calls.iter().enumerate() {
            lines.push(format!(
                "  {prefix}_{i} [label=\"{}\\n{}\" shape=ellipse fillcolor=\"{leaf_fill}\" fontcolor=\"{leaf_font}\"];",
                escape_dot(&call.tool),
                escape_dot(&short_args(&call.args))
            ));
            lines.push(format!("  {node} -> {prefix}_{i};"));
        }
    }

    lines.push(
        "  verdict [label=\"📝 Verdict\\nFinal Report\" shape=box fillcolor=\"#F3E5F5\" fontcolor=\"#6A1B9A\"];"
            .to_string(),
    );
    lines.push("  financial -> verdict [label=\"results\"];".to_string());
    lines.push("  competitor -> verdict [label=\"results\"];".to_string());
    lines.push("}".to_string());
    lines.join("\n")
}
