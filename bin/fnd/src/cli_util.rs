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

use fundfi::util::parse::decode_base10;

use crate::{
    error::{GatewayError, GatewayResult},
    projects::FUND_BASE10_DECIMALS,
};

/// Parse a user-provided decimal FUND amount into base units.
pub fn parse_funding_amount(amount: &str) -> GatewayResult<u64> {
    let Ok(amount) = decode_base10(amount, FUND_BASE10_DECIMALS, true) else {
        return Err(GatewayError::Client(
            "Invalid amount. Use a decimal value such as 13.37".to_string(),
        ))
    };

    if amount == 0 {
        return Err(GatewayError::Client("Amount must be greater than zero".to_string()))
    }

    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_funding_amount() {
        assert_eq!(parse_funding_amount("13.37").unwrap(), 1337000000);
        assert_eq!(parse_funding_amount("0.00000001").unwrap(), 1);

        assert!(parse_funding_amount("0").is_err());
        assert!(parse_funding_amount("0.000000001").is_err());
        assert!(parse_funding_amount("abc").is_err());
        assert!(parse_funding_amount("-5").is_err());
    }
}
