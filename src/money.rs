use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Formats an amount the way the storefront displays Vietnamese đồng:
/// integer part grouped by dots, followed by the currency sign
/// (e.g. `230.000 ₫`). Fractional đồng do not exist, so the amount is
/// rounded to whole units first.
pub fn format_vnd(amount: Decimal) -> String {
    let rounded = amount.round();
    let negative = rounded.is_sign_negative();
    let whole = rounded.abs().to_i128().unwrap_or(0);

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-{grouped} ₫")
    } else {
        format!("{grouped} ₫")
    }
}
