use chrono::NaiveDate;

use crate::enums::OptionType;
use crate::error::{DataError, EngineResult};

/// Formats a strict 21-character OCC option symbol:
/// `{ROOT<=6, space-padded}{YYMMDD}{C|P}{STRIKE*1000 as 8 digits}`
/// (spec.md §6).
pub fn format_occ_symbol(root: &str, expiry: NaiveDate, option_type: OptionType, strike: f64) -> EngineResult<String> {
    if root.is_empty() || root.len() > 6 {
        return Err(DataError::InvalidOccSymbol(format!("root '{root}' must be 1-6 characters")).into());
    }
    if strike < 0.0 {
        return Err(DataError::InvalidOccSymbol(format!("negative strike {strike}")).into());
    }

    let padded_root = format!("{root:<6}");
    let date_part = expiry.format("%y%m%d").to_string();
    let type_char = option_type.occ_code();
    let strike_thousandths = (strike * 1000.0).round() as i64;
    if strike_thousandths > 99_999_999 {
        return Err(DataError::InvalidOccSymbol(format!("strike {strike} overflows the 8-digit field")).into());
    }
    let strike_part = format!("{strike_thousandths:08}");

    let symbol = format!("{padded_root}{date_part}{type_char}{strike_part}");
    debug_assert_eq!(symbol.len(), 21);
    Ok(symbol)
}

/// Parses a strict 21-character OCC symbol back into its components.
pub fn parse_occ_symbol(symbol: &str) -> EngineResult<(String, NaiveDate, OptionType, f64)> {
    if symbol.len() != 21 {
        return Err(DataError::InvalidOccSymbol(symbol.to_string()).into());
    }

    let root = symbol[0..6].trim_end().to_string();
    let date_part = &symbol[6..12];
    let type_char = symbol.as_bytes()[12] as char;
    let strike_part = &symbol[13..21];

    let expiry = NaiveDate::parse_from_str(date_part, "%y%m%d")
        .map_err(|_| DataError::InvalidOccSymbol(symbol.to_string()))?;
    let option_type = match type_char {
        'C' => OptionType::Call,
        'P' => OptionType::Put,
        _ => return Err(DataError::InvalidOccSymbol(symbol.to_string()).into()),
    };
    let strike_thousandths: i64 = strike_part
        .parse()
        .map_err(|_| DataError::InvalidOccSymbol(symbol.to_string()))?;
    let strike = strike_thousandths as f64 / 1000.0;

    Ok((root, expiry, option_type, strike))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_to_exactly_21_characters() {
        let d = NaiveDate::from_ymd_opt(2026, 1, 16).unwrap();
        let symbol = format_occ_symbol("SPY", d, OptionType::Call, 680.0).unwrap();
        assert_eq!(symbol.len(), 21);
        assert_eq!(symbol, "SPY   260116C00680000");
    }

    #[test]
    fn round_trips_through_parse() {
        let d = NaiveDate::from_ymd_opt(2026, 1, 16).unwrap();
        let symbol = format_occ_symbol("SPY", d, OptionType::Put, 665.5).unwrap();
        let (root, expiry, option_type, strike) = parse_occ_symbol(&symbol).unwrap();
        assert_eq!(root, "SPY");
        assert_eq!(expiry, d);
        assert_eq!(option_type, OptionType::Put);
        assert_eq!(strike, 665.5);
    }

    #[test]
    fn rejects_root_over_six_characters() {
        let d = NaiveDate::from_ymd_opt(2026, 1, 16).unwrap();
        assert!(format_occ_symbol("TOOLONGROOT", d, OptionType::Call, 100.0).is_err());
    }

    #[test]
    fn rejects_wrong_length_on_parse() {
        assert!(parse_occ_symbol("SHORT").is_err());
    }
}
