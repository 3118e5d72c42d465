use crate::domain::model::{Claim, Claimant};
use crate::utils::error::ExtractionFailure;
use regex::Regex;
use rust_decimal::Decimal;
use std::ops::Range;
use std::str::FromStr;
use std::sync::LazyLock;

// $45、$ 1,250.00、$12.5
static AMOUNT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\s?((?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d{1,2})?)")
        .expect("amount pattern is a valid regex")
});

const SEPARATORS: &[char] = &['-', '–', '—', ':', ',', ';'];

/// 從自由文字中解析出金額與描述，組成 `Claim`
///
/// The first `$` amount wins; the description is what remains once that
/// substring is cut out. Nothing here talks to the payment service.
pub fn extract(raw_text: &str, claimant: Claimant) -> Result<Claim, ExtractionFailure> {
    let (amount, span) = find_amount(raw_text)?;
    let description = strip_span(raw_text, span);

    if description.is_empty() {
        return Err(ExtractionFailure::EmptyDescription);
    }

    tracing::debug!("Extracted amount {} and description '{}'", amount, description);
    Claim::new(amount, description, claimant)
}

fn find_amount(text: &str) -> Result<(Decimal, Range<usize>), ExtractionFailure> {
    let caps = AMOUNT_PATTERN
        .captures(text)
        .ok_or(ExtractionFailure::MissingAmount)?;

    // group 0 一定存在
    let whole = caps.get(0).ok_or(ExtractionFailure::MissingAmount)?;
    let digits = caps
        .get(1)
        .map(|m| m.as_str().replace(',', ""))
        .ok_or(ExtractionFailure::MissingAmount)?;

    // regex 沒有 lookahead：金額後面緊接數字代表格式不對，不能截斷
    if continues_number(&text[whole.end()..]) {
        let rest = text[whole.end()..]
            .split_whitespace()
            .next()
            .unwrap_or_default();
        return Err(ExtractionFailure::InvalidAmount(format!(
            "{}{}",
            whole.as_str(),
            rest
        )));
    }

    let amount = Decimal::from_str(&digits)
        .map_err(|e| ExtractionFailure::InvalidAmount(format!("{}: {}", whole.as_str(), e)))?;

    Ok((amount, whole.range()))
}

fn continues_number(rest: &str) -> bool {
    let mut chars = rest.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('.') | Some(',') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    }
}

fn strip_span(text: &str, span: Range<usize>) -> String {
    let remaining = format!("{} {}", &text[..span.start], &text[span.end..]);
    remaining
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c.is_whitespace() || SEPARATORS.contains(&c))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn alice() -> Claimant {
        Claimant::new("a@x.com", "Alice")
    }

    #[test]
    fn test_extract_trailing_amount() {
        let claim = extract("Lunch with client - $45", alice()).unwrap();
        assert_eq!(claim.amount(), dec!(45));
        assert_eq!(claim.description(), "Lunch with client");
        assert_eq!(claim.claimant_email(), "a@x.com");
        assert_eq!(claim.claimant_name(), "Alice");
    }

    #[test]
    fn test_extract_leading_amount_with_cents() {
        let claim = extract("$12.50 taxi to the airport", alice()).unwrap();
        assert_eq!(claim.amount(), dec!(12.50));
        assert_eq!(claim.description(), "taxi to the airport");
    }

    #[test]
    fn test_extract_amount_in_the_middle() {
        let claim = extract("Hotel stay in NYC - $200 for two nights", alice()).unwrap();
        assert_eq!(claim.amount(), dec!(200));
        assert_eq!(claim.description(), "Hotel stay in NYC - for two nights");
        assert!(!claim.description().contains("$200"));
    }

    #[test]
    fn test_extract_thousands_separator_and_space_after_symbol() {
        let claim = extract("Conference ticket $ 1,250.00", alice()).unwrap();
        assert_eq!(claim.amount(), dec!(1250.00));
        assert_eq!(claim.description(), "Conference ticket");
    }

    #[test]
    fn test_first_amount_wins() {
        let claim = extract("Dinner $30 plus tip $5", alice()).unwrap();
        assert_eq!(claim.amount(), dec!(30));
        assert_eq!(claim.description(), "Dinner plus tip $5");
    }

    #[test]
    fn test_missing_amount() {
        assert_eq!(
            extract("Lunch with client", alice()),
            Err(ExtractionFailure::MissingAmount)
        );
        assert_eq!(
            extract("Lunch with client 45", alice()),
            Err(ExtractionFailure::MissingAmount)
        );
    }

    #[test]
    fn test_over_precise_or_misgrouped_amount_is_invalid() {
        assert_eq!(
            extract("Taxi $12.345", alice()),
            Err(ExtractionFailure::InvalidAmount("$12.345".to_string()))
        );
        assert_eq!(
            extract("Hotel $1,2345 total", alice()),
            Err(ExtractionFailure::InvalidAmount("$1,2345".to_string()))
        );
        assert!(matches!(
            extract("Parking $7.5.0", alice()),
            Err(ExtractionFailure::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_punctuation_after_amount_is_allowed() {
        let claim = extract("Paid $45. Lunch with client", alice()).unwrap();
        assert_eq!(claim.amount(), dec!(45));

        let claim = extract("Lunch $45, with client", alice()).unwrap();
        assert_eq!(claim.amount(), dec!(45));
    }

    #[test]
    fn test_empty_description() {
        assert_eq!(extract("$45", alice()), Err(ExtractionFailure::EmptyDescription));
        assert_eq!(extract("  - $45 ", alice()), Err(ExtractionFailure::EmptyDescription));
    }

    #[test]
    fn test_zero_amount_rejected() {
        assert_eq!(
            extract("Free coffee $0", alice()),
            Err(ExtractionFailure::NonPositiveAmount)
        );
    }

    #[test]
    fn test_invalid_claimant_is_reported() {
        let result = extract("Lunch $10", Claimant::new("", "Alice"));
        assert!(matches!(result, Err(ExtractionFailure::InvalidClaimant { .. })));
    }
}
