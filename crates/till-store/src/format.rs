//! # Currency Formatter
//!
//! Culture-aware money rendering for receipts and tool output. The kernel
//! never touches user-facing text; every formatted amount flows through
//! here.
//!
//! ## Scope
//! Table-driven: per-currency decimal places and symbols, per-culture
//! separator conventions, with an invariant fallback for anything unlisted.
//! Rounding to the currency's display scale happens HERE and only here -
//! presentation rounding, never kernel arithmetic.

use rust_decimal::{Decimal, RoundingStrategy};

use till_core::CurrencyFormatter;

/// Separator and placement conventions for one culture family.
#[derive(Debug, Clone, Copy)]
struct CultureStyle {
    decimal_separator: char,
    group_separator: char,
    /// Symbol after the amount (`12,34 €`) instead of before (`$12.34`).
    symbol_suffix: bool,
}

const INVARIANT: CultureStyle = CultureStyle {
    decimal_separator: '.',
    group_separator: ',',
    symbol_suffix: false,
};

const CONTINENTAL: CultureStyle = CultureStyle {
    decimal_separator: ',',
    group_separator: '.',
    symbol_suffix: true,
};

fn style_for(culture: &str) -> CultureStyle {
    let language = culture
        .split(['-', '_'])
        .next()
        .unwrap_or("")
        .to_lowercase();
    match language.as_str() {
        "de" | "fr" | "es" | "it" | "nl" | "pt" | "pl" | "tr" | "ru" | "id" | "vi" => CONTINENTAL,
        _ => INVARIANT,
    }
}

/// The reference formatter shipped with the store layer.
#[derive(Debug, Clone, Default)]
pub struct CultureFormatter;

impl CultureFormatter {
    pub fn new() -> Self {
        CultureFormatter
    }
}

impl CurrencyFormatter for CultureFormatter {
    fn format_currency(&self, amount: Decimal, currency: &str, culture: &str) -> String {
        let places = self.get_decimal_places(currency);
        let symbol = self.get_currency_symbol(currency);
        let style = style_for(culture);

        let rounded = amount.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven);
        let negative = rounded < Decimal::ZERO;
        let digits = format!("{:.*}", places as usize, rounded.abs());

        let (integer_part, fraction_part) = match digits.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (digits.as_str(), None),
        };

        // Group integer digits in threes from the right.
        let mut grouped = String::new();
        let chars: Vec<char> = integer_part.chars().collect();
        for (index, c) in chars.iter().enumerate() {
            if index > 0 && (chars.len() - index) % 3 == 0 {
                grouped.push(style.group_separator);
            }
            grouped.push(*c);
        }

        let mut number = grouped;
        if let Some(fraction) = fraction_part {
            number.push(style.decimal_separator);
            number.push_str(fraction);
        }

        let sign = if negative { "-" } else { "" };
        if style.symbol_suffix {
            format!("{}{} {}", sign, number, symbol)
        } else {
            format!("{}{}{}", sign, symbol, number)
        }
    }

    fn get_currency_symbol(&self, currency: &str) -> String {
        match currency.trim().to_uppercase().as_str() {
            "USD" | "CAD" | "AUD" | "NZD" | "SGD" | "HKD" | "MXN" => "$",
            "EUR" => "€",
            "GBP" => "£",
            "JPY" | "CNY" => "¥",
            "KRW" => "₩",
            "INR" => "₹",
            "PKR" => "Rs",
            "VND" => "₫",
            "TRY" => "₺",
            "RUB" => "₽",
            other => return other.to_string(),
        }
        .to_string()
    }

    fn get_decimal_places(&self, currency: &str) -> u32 {
        match currency.trim().to_uppercase().as_str() {
            "JPY" | "KRW" | "VND" | "CLP" | "ISK" => 0,
            "BHD" | "KWD" | "OMR" | "TND" | "JOD" => 3,
            _ => 2,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_invariant_usd() {
        let f = CultureFormatter::new();
        assert_eq!(f.format_currency(dec!(1234.5), "USD", "en-US"), "$1,234.50");
        assert_eq!(f.format_currency(dec!(0), "USD", "en-US"), "$0.00");
        assert_eq!(f.format_currency(dec!(-5.5), "USD", "en-US"), "-$5.50");
    }

    #[test]
    fn test_continental_eur() {
        let f = CultureFormatter::new();
        assert_eq!(
            f.format_currency(dec!(1234.5), "EUR", "de-DE"),
            "1.234,50 €"
        );
        assert_eq!(f.format_currency(dec!(7), "EUR", "fr-FR"), "7,00 €");
    }

    #[test]
    fn test_zero_and_three_place_currencies() {
        let f = CultureFormatter::new();
        assert_eq!(f.get_decimal_places("JPY"), 0);
        assert_eq!(f.get_decimal_places("BHD"), 3);
        assert_eq!(f.get_decimal_places("USD"), 2);

        assert_eq!(f.format_currency(dec!(1500), "JPY", "ja-JP"), "¥1,500");
        assert_eq!(f.format_currency(dec!(1.2345), "BHD", "en-US"), "BHD1.234");
    }

    #[test]
    fn test_unknown_currency_falls_back_to_code() {
        let f = CultureFormatter::new();
        assert_eq!(f.get_currency_symbol("XTS"), "XTS");
        assert_eq!(f.format_currency(dec!(9.9), "XTS", "en-US"), "XTS9.90");
    }
}
