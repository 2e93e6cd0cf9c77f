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

use std::fmt;

use fundfi::Error;

/// Result type used in the wallet database module
pub type WalletDbResult<T> = std::result::Result<T, WalletDbError>;

/// Custom wallet database errors available for fnd.
/// Please sort them sensefully.
#[derive(Debug)]
pub enum WalletDbError {
    // Connection related errors
    ConnectionFailed = -32100,

    // Configuration related errors
    PragmaUpdateError = -32110,

    // Query execution related errors
    FailedToAquireLock = -32120,
    QueryPreparationFailed = -32121,
    QueryExecutionFailed = -32122,
    ParseColumnValueError = -32123,
    RowNotFound = -32124,

    // Generic error
    GenericError = -32130,
}

impl fmt::Display for WalletDbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::ConnectionFailed => "Wallet database connection failed",
            Self::PragmaUpdateError => "Wallet database pragma update failed",
            Self::FailedToAquireLock => "Wallet database lock acquisition failed",
            Self::QueryPreparationFailed => "Wallet database query preparation failed",
            Self::QueryExecutionFailed => "Wallet database query execution failed",
            Self::ParseColumnValueError => "Wallet database column value parsing failed",
            Self::RowNotFound => "Wallet database row not found",
            Self::GenericError => "Wallet database generic error",
        };

        write!(f, "{msg}")
    }
}

/// Result type used for fundfid gateway operations
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

// fundfid server error codes for contract-level rejections.
pub const ERR_ALREADY_REGISTERED: i32 = -32051;
pub const ERR_NOT_REGISTERED: i32 = -32052;
pub const ERR_PROJECT_NOT_FOUND: i32 = -32060;
pub const ERR_PROJECT_INACTIVE: i32 = -32061;
pub const ERR_SELF_INVESTMENT: i32 = -32062;
pub const ERR_INSUFFICIENT_FUNDS: i32 = -32063;
pub const ERR_INVALID_SIGNATURE: i32 = -32070;

/// Tagged gateway failures. Transport failures and JSON-RPC server
/// error codes are decoded into these variants exactly once, at the
/// gateway boundary, so call sites match on variants instead of
/// pattern-matching error message strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The account already has an on-chain user record
    AlreadyRegistered,
    /// The account has no on-chain user record
    NotRegistered,
    /// No project exists at the given index
    ProjectNotFound,
    /// The project has reached its funding target
    ProjectInactive,
    /// A founder tried to invest in their own project
    SelfInvestment,
    /// The investing account cannot cover the sent value
    InsufficientFunds,
    /// The node rejected the call envelope signature
    InvalidSignature,
    /// The node does not know the requested method
    MethodNotFound,
    /// The contract rejected the call for an unrecognized reason
    Reverted(String),
    /// The fundfid endpoint could not be reached
    Unreachable,
    /// Client-side failure before the call went out
    Client(String),
}

impl GatewayError {
    /// Decode a JSON-RPC server error into its tagged variant.
    pub fn from_code(code: i32, message: &str) -> Self {
        match code {
            ERR_ALREADY_REGISTERED => Self::AlreadyRegistered,
            ERR_NOT_REGISTERED => Self::NotRegistered,
            ERR_PROJECT_NOT_FOUND => Self::ProjectNotFound,
            ERR_PROJECT_INACTIVE => Self::ProjectInactive,
            ERR_SELF_INVESTMENT => Self::SelfInvestment,
            ERR_INSUFFICIENT_FUNDS => Self::InsufficientFunds,
            ERR_INVALID_SIGNATURE => Self::InvalidSignature,
            fundfi::rpc::jsonrpc::METHOD_NOT_FOUND => Self::MethodNotFound,
            _ => Self::Reverted(message.to_string()),
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRegistered => write!(f, "This account is already registered"),
            Self::NotRegistered => write!(f, "This account is not registered"),
            Self::ProjectNotFound => write!(f, "No project exists with this ID"),
            Self::ProjectInactive => write!(f, "This project has already been funded"),
            Self::SelfInvestment => write!(f, "Founders cannot invest in their own project"),
            Self::InsufficientFunds => write!(f, "Insufficient funds for this investment"),
            Self::InvalidSignature => write!(f, "The node rejected the call signature"),
            Self::MethodNotFound => write!(f, "The node does not support this method"),
            Self::Reverted(reason) => write!(f, "The contract rejected the call: {reason}"),
            Self::Unreachable => write!(f, "Could not reach the fundfid endpoint"),
            Self::Client(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<Error> for GatewayError {
    fn from(e: Error) -> Self {
        match e {
            Error::JsonRpcError((code, message)) => Self::from_code(code, &message),
            Error::ConnectFailed |
            Error::NetworkOperationFailed |
            Error::RpcReadTimeout |
            Error::ChannelStopped |
            Error::RpcClientStopped => Self::Unreachable,
            other => Self::Client(other.to_string()),
        }
    }
}

impl From<WalletDbError> for GatewayError {
    fn from(e: WalletDbError) -> Self {
        Self::Client(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_code_decoding() {
        assert_eq!(
            GatewayError::from_code(ERR_ALREADY_REGISTERED, "already registered"),
            GatewayError::AlreadyRegistered
        );
        assert_eq!(
            GatewayError::from_code(ERR_INSUFFICIENT_FUNDS, "insufficient funds"),
            GatewayError::InsufficientFunds
        );
        assert_eq!(GatewayError::from_code(-32601, "method not found"), GatewayError::MethodNotFound);
        assert_eq!(
            GatewayError::from_code(-32000, "funding target exceeded"),
            GatewayError::Reverted("funding target exceeded".to_string())
        );
    }

    #[test]
    fn test_transport_errors_decode_as_unreachable() {
        assert_eq!(GatewayError::from(Error::ConnectFailed), GatewayError::Unreachable);
        assert_eq!(GatewayError::from(Error::RpcReadTimeout), GatewayError::Unreachable);
        assert_eq!(
            GatewayError::from(Error::JsonRpcError((ERR_SELF_INVESTMENT, "self".to_string()))),
            GatewayError::SelfInvestment
        );
    }
}
