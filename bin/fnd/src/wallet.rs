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

use ed25519_compact::{KeyPair, Noise, SecretKey};
use rusqlite::types::Value;

use fundfi::{Error, Result};

use crate::{
    convert_named_params,
    error::{WalletDbError, WalletDbResult},
    Fnd,
};

// Wallet SQL table constant names. These have to represent the `wallet.sql`
// SQL schema.
pub const WALLET_KEYPAIRS_TABLE: &str = "keypairs";
pub const WALLET_KEYPAIRS_COL_ID: &str = "id";
pub const WALLET_KEYPAIRS_COL_IS_DEFAULT: &str = "is_default";
pub const WALLET_KEYPAIRS_COL_PUBLIC_KEY: &str = "public_key";
pub const WALLET_KEYPAIRS_COL_SECRET_KEY: &str = "secret_key";

impl Fnd {
    /// Initialize wallet with tables for `Fnd`.
    pub fn initialize_wallet(&self) -> WalletDbResult<()> {
        self.wallet.exec_batch_sql(include_str!("../wallet.sql"))
    }

    /// Generate a new account keypair in the wallet and return its address.
    /// The first generated keypair becomes the active (default) account.
    pub fn keygen(&self) -> Result<String> {
        let keypair = KeyPair::generate();
        let address = bs58::encode(keypair.pk.as_ref()).into_string();

        let is_default = match self.addresses() {
            Ok(addresses) => addresses.is_empty() as i64,
            Err(e) => {
                return Err(Error::DatabaseError(format!(
                    "[keygen] Wallet accounts retrieval failed: {e}"
                )))
            }
        };

        let query = format!(
            "INSERT INTO {} ({}, {}, {}) VALUES (?1, ?2, ?3);",
            WALLET_KEYPAIRS_TABLE,
            WALLET_KEYPAIRS_COL_IS_DEFAULT,
            WALLET_KEYPAIRS_COL_PUBLIC_KEY,
            WALLET_KEYPAIRS_COL_SECRET_KEY,
        );
        if let Err(e) = self
            .wallet
            .exec_sql(&query, rusqlite::params![is_default, address, keypair.sk.as_ref()])
        {
            return Err(Error::DatabaseError(format!("[keygen] Keypair insert failed: {e}")))
        }

        Ok(address)
    }

    /// Fetch all wallet accounts in insertion order, with their default
    /// flag. This ordered list is what a session sees as the available
    /// accounts; the default entry is the active account.
    pub fn addresses(&self) -> WalletDbResult<Vec<(i64, String, bool)>> {
        let query = format!(
            "SELECT {}, {}, {} FROM {} ORDER BY {};",
            WALLET_KEYPAIRS_COL_ID,
            WALLET_KEYPAIRS_COL_PUBLIC_KEY,
            WALLET_KEYPAIRS_COL_IS_DEFAULT,
            WALLET_KEYPAIRS_TABLE,
            WALLET_KEYPAIRS_COL_ID,
        );
        let rows = self.wallet.query_custom(&query, &[])?;

        let mut ret = Vec::with_capacity(rows.len());
        for row in rows {
            let Value::Integer(id) = row[0] else {
                return Err(WalletDbError::ParseColumnValueError)
            };
            let Value::Text(ref address) = row[1] else {
                return Err(WalletDbError::ParseColumnValueError)
            };
            let Value::Integer(is_default) = row[2] else {
                return Err(WalletDbError::ParseColumnValueError)
            };
            ret.push((id, address.clone(), is_default != 0));
        }

        Ok(ret)
    }

    /// The active account address.
    pub fn default_address(&self) -> WalletDbResult<String> {
        let row = self.wallet.query_single(
            WALLET_KEYPAIRS_TABLE,
            &[WALLET_KEYPAIRS_COL_PUBLIC_KEY],
            convert_named_params! {(WALLET_KEYPAIRS_COL_IS_DEFAULT, 1)},
        )?;

        let Value::Text(ref address) = row[0] else {
            return Err(WalletDbError::ParseColumnValueError)
        };

        Ok(address.clone())
    }

    /// Set the active account by its wallet ID.
    pub fn set_default_address(&self, id: usize) -> WalletDbResult<()> {
        // Verify the requested ID exists
        self.wallet.query_single(
            WALLET_KEYPAIRS_TABLE,
            &[WALLET_KEYPAIRS_COL_ID],
            convert_named_params! {(WALLET_KEYPAIRS_COL_ID, id as i64)},
        )?;

        let query = format!(
            "UPDATE {} SET {} = ({} = ?1);",
            WALLET_KEYPAIRS_TABLE, WALLET_KEYPAIRS_COL_IS_DEFAULT, WALLET_KEYPAIRS_COL_ID,
        );
        self.wallet.exec_sql(&query, rusqlite::params![id as i64])
    }

    /// Export all secret keys from the wallet, base58-encoded.
    pub fn secrets(&self) -> WalletDbResult<Vec<String>> {
        let query = format!(
            "SELECT {} FROM {} ORDER BY {};",
            WALLET_KEYPAIRS_COL_SECRET_KEY, WALLET_KEYPAIRS_TABLE, WALLET_KEYPAIRS_COL_ID,
        );
        let rows = self.wallet.query_custom(&query, &[])?;

        let mut ret = Vec::with_capacity(rows.len());
        for row in rows {
            let Value::Blob(ref secret) = row[0] else {
                return Err(WalletDbError::ParseColumnValueError)
            };
            ret.push(bs58::encode(secret).into_string());
        }

        Ok(ret)
    }

    /// Sign a call digest with the active account's key. Returns the
    /// account address and the base58-encoded signature, binding the
    /// signed call to the active account.
    pub fn sign_call(&self, message: &[u8]) -> Result<(String, String)> {
        let row = match self.wallet.query_single(
            WALLET_KEYPAIRS_TABLE,
            &[WALLET_KEYPAIRS_COL_PUBLIC_KEY, WALLET_KEYPAIRS_COL_SECRET_KEY],
            convert_named_params! {(WALLET_KEYPAIRS_COL_IS_DEFAULT, 1)},
        ) {
            Ok(r) => r,
            Err(e) => {
                return Err(Error::DatabaseError(format!(
                    "[sign_call] Active account retrieval failed: {e}"
                )))
            }
        };

        let Value::Text(ref address) = row[0] else {
            return Err(Error::ParseFailed("[sign_call] Address parsing failed"))
        };
        let Value::Blob(ref secret) = row[1] else {
            return Err(Error::ParseFailed("[sign_call] Secret key parsing failed"))
        };

        let Ok(secret) = SecretKey::from_slice(secret) else {
            return Err(Error::DecodeError("[sign_call] Malformed secret key"))
        };

        let signature = secret.sign(message, Some(Noise::generate()));
        Ok((address.clone(), bs58::encode(signature.as_ref()).into_string()))
    }
}

#[cfg(test)]
mod tests {
    use ed25519_compact::{PublicKey, Signature};

    use crate::tests::mem_fnd;

    #[test]
    fn test_keygen_and_default_account() {
        let fnd = mem_fnd();

        let first = fnd.keygen().unwrap();
        let second = fnd.keygen().unwrap();
        assert_ne!(first, second);

        // The first generated account is the active one
        let addresses = fnd.addresses().unwrap();
        assert_eq!(addresses.len(), 2);
        assert!(addresses[0].2);
        assert!(!addresses[1].2);
        assert_eq!(fnd.default_address().unwrap(), first);

        // Switch the active account
        fnd.set_default_address(addresses[1].0 as usize).unwrap();
        assert_eq!(fnd.default_address().unwrap(), second);

        // Unknown ID is refused
        assert!(fnd.set_default_address(99).is_err());
    }

    #[test]
    fn test_sign_call() {
        let fnd = mem_fnd();
        let address = fnd.keygen().unwrap();

        let message = b"projects.create:{}:1234";
        let (account, signature) = fnd.sign_call(message).unwrap();
        assert_eq!(account, address);

        // The signature verifies against the account's public key
        let pk_bytes = bs58::decode(&account).into_vec().unwrap();
        let pk = PublicKey::from_slice(&pk_bytes).unwrap();
        let sig_bytes = bs58::decode(&signature).into_vec().unwrap();
        let sig = Signature::from_slice(&sig_bytes).unwrap();
        assert!(pk.verify(message, &sig).is_ok());
    }
}
