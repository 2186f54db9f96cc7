use primitive_types::U256;

/// Render a base-unit token amount as a decimal string with `decimals`
/// fractional digits, trailing zeros trimmed and thousands grouped.
///
/// `format_token_amount(U256::from(1_500_000_000_000_000_000u128), 18)` is `"1.5"`.
pub fn format_token_amount(value: U256, decimals: u8) -> String {
    let scale = U256::from(10u8).checked_pow(U256::from(decimals));
    let (whole, fraction) = match scale {
        Some(scale) => (value / scale, value % scale),
        // 10^decimals beyond 256 bits: everything is fractional
        None => (U256::zero(), value),
    };

    let mut rendered = group_thousands(&whole.to_string());
    if !fraction.is_zero() {
        let digits = fraction.to_string();
        let padding = (decimals as usize).saturating_sub(digits.len());
        rendered.push('.');
        rendered.push_str(&"0".repeat(padding));
        rendered.push_str(digits.trim_end_matches('0'));
    }
    rendered
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
