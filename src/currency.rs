//! Kenyan Shilling display helpers. Prices are whole shillings end to end,
//! so there is never a decimal part to render.

/// "KES 18,150" style formatting with thousands separators.
pub fn format_kes(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 5);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if amount < 0 {
        format!("KES -{grouped}")
    } else {
        format!("KES {grouped}")
    }
}
