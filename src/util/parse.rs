/* This file is part of fundfi (https://codeberg.org/fundfi/fundfi)
 *
 * Copyright (C) 2024-2026 The fundfi developers
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use crate::{Error, Result};

/// Decode a decimal amount string into a base-unit integer with
/// `decimal_places` digits of precision. With `strict` set, excess
/// fractional digits are an error, otherwise they are truncated.
pub fn decode_base10(amount: &str, decimal_places: usize, strict: bool) -> Result<u64> {
    let mut parts: Vec<String> = amount.split('.').map(|s| s.to_string()).collect();

    // parts[0] is the integer part, parts[1] the fractional part
    match parts.len() {
        1 => parts.push(String::new()),
        2 => {}
        _ => return Err(Error::ParseFailed("Invalid decimal amount")),
    }

    if parts[0].is_empty() && parts[1].is_empty() {
        return Err(Error::ParseFailed("Invalid decimal amount"))
    }

    // Check we don't lose precision
    if strict && parts[1].len() > decimal_places {
        return Err(Error::ParseFailed("Too many decimal places"))
    }

    parts[1].truncate(decimal_places);
    while parts[1].len() < decimal_places {
        parts[1].push('0');
    }

    let joined = parts.concat();
    if !joined.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::ParseFailed("Invalid decimal amount"))
    }

    Ok(joined.parse::<u64>()?)
}

/// Encode a base-unit integer into a decimal amount string with
/// `decimal_places` digits of precision. Trailing zeros are trimmed.
pub fn encode_base10(amount: u64, decimal_places: usize) -> String {
    let mut amount = format!("{:0>width$}", amount, width = decimal_places + 1);
    amount.insert(amount.len() - decimal_places, '.');
    amount.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base10() {
        // Excess fractional digits truncate in non-strict mode
        assert_eq!(123, decode_base10("12.33", 1, false).unwrap());
        assert_eq!(1233000, decode_base10("12.33", 5, false).unwrap());
        assert_eq!(1200000, decode_base10("12", 5, false).unwrap());
        assert_eq!(50000000, decode_base10("0.5", 8, true).unwrap());
        assert_eq!(0, decode_base10("0", 8, true).unwrap());

        assert!(decode_base10("12.33", 1, true).is_err());
        assert!(decode_base10("", 5, false).is_err());
        assert!(decode_base10(".", 5, false).is_err());
        assert!(decode_base10("1.2.3", 5, false).is_err());
        assert!(decode_base10("-1.5", 5, false).is_err());
        assert!(decode_base10("foo", 5, false).is_err());
    }

    #[test]
    fn test_encode_base10() {
        assert_eq!("23.4", &encode_base10(234, 1));
        assert_eq!("23.4", &encode_base10(2340, 2));
        assert_eq!("23", &encode_base10(23000, 3));
        assert_eq!("0.45", &encode_base10(45, 2));
        assert_eq!("0", &encode_base10(0, 4));
        assert_eq!("13", &encode_base10(13, 0));
    }

    #[test]
    fn test_base10_roundtrip() {
        // Display values survive a trip through the base units and back.
        for display in ["3", "0.3", "10.25", "0.00000001", "184467"] {
            let units = decode_base10(display, 8, true).unwrap();
            assert_eq!(display, &encode_base10(units, 8));
        }
    }
}
