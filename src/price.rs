use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[error("could not parse a price from {raw:?}")]
pub struct ParseError {
    pub raw: String,
}

/// Reduces display text such as `"12 990,50 ₽"` to a number.
///
/// Anything that is not a digit, comma or period is dropped and commas become
/// periods. When several periods remain, every one except the last is taken
/// as a thousands separator, so both `"1.234,56"` and `"1,234.56"` read as
/// `1234.56`.
pub fn parse_price(raw: &str) -> Result<f64, ParseError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    let normalized = match cleaned.rsplit_once('.') {
        Some((head, tail)) if head.contains('.') => format!("{}.{}", head.replace('.', ""), tail),
        _ => cleaned,
    };

    normalized
        .parse::<f64>()
        .ok()
        .filter(|price| price.is_finite())
        .ok_or_else(|| ParseError {
            raw: raw.to_string(),
        })
}
