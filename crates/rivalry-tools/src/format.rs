use rust_decimal::{Decimal, RoundingStrategy};

const BILLION: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);
const MILLION: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

fn round(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Dollar amount with a B/M suffix: `$45.00B`, `$120.00M`, `$5,000`.
pub fn format_large_number(value: Option<Decimal>) -> String {
    let Some(value) = value else {
        return "N/A".to_string();
    };
    if value >= BILLION {
        format!("${:.2}B", round(value / BILLION, 2))
    } else if value >= MILLION {
        format!("${:.2}M", round(value / MILLION, 2))
    } else {
        format!("${}", group_thousands(round(value, 0)))
    }
}

/// Fraction as a percentage with one decimal: `0.25` becomes `25.0%`.
pub fn format_percentage(value: Option<Decimal>) -> String {
    match value {
        Some(v) => format!("{:.1}%", round(v * Decimal::ONE_HUNDRED, 1)),
        None => "N/A".to_string(),
    }
}

fn group_thousands(value: Decimal) -> String {
    let digits = value.abs().trunc().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value.is_sign_negative() && !value.is_zero() {
        format!("-{grouped}")
    } else {
        grouped
    }
}
