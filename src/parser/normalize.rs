use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no number in {0:?}")]
pub struct FormatError(pub String);

/// Every maximal run of ASCII digits in `text`, in order.
pub fn digit_tokens(text: &str) -> Vec<&str> {
    DIGITS_RE.find_iter(text).map(|m| m.as_str()).collect()
}

/// Concatenates all digit runs into one integer: "1 234 567" -> 1234567.
/// Signs and every other non-digit character are dropped.
pub fn extract_int(text: &str) -> Result<i64, FormatError> {
    let joined: String = digit_tokens(text).concat();
    if joined.is_empty() {
        return Err(FormatError(text.to_string()));
    }
    joined.parse().map_err(|_| FormatError(text.to_string()))
}

/// Decimal-comma number: "12,5" -> 12.5. Grouping whitespace is ignored.
pub fn parse_decimal_comma(text: &str) -> Result<f64, FormatError> {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return Err(FormatError(text.to_string()));
    }
    cleaned.parse().map_err(|_| FormatError(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grouped_digits_join_into_one_number() {
        assert_eq!(extract_int("1 234 567"), Ok(1234567));
        assert_eq!(extract_int("1\u{a0}234\u{a0}567 чел."), Ok(1234567));
    }

    #[test]
    fn no_digits_is_a_format_error() {
        assert!(extract_int("деревня").is_err());
        assert!(extract_int("").is_err());
    }

    #[test]
    fn minus_sign_is_discarded() {
        assert_eq!(extract_int("-42"), Ok(42));
    }

    #[test]
    fn overflowing_digits_are_a_format_error() {
        assert!(extract_int("99999999999999999999999").is_err());
    }

    #[test]
    fn decimal_comma() {
        assert_eq!(parse_decimal_comma("12,5"), Ok(12.5));
        assert_eq!(parse_decimal_comma("0,00"), Ok(0.0));
        assert_eq!(parse_decimal_comma(" 1 024,75 "), Ok(1024.75));
        assert!(parse_decimal_comma("н/д").is_err());
    }

    #[test]
    fn tokens_keep_order() {
        assert_eq!(digit_tokens("Телефонный код: 495, 499"), vec!["495", "499"]);
    }
}
