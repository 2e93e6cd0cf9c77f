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

use prettytable::{format, row, Table};
use rusqlite::types::Value;
use tracing::error;

use fundfi::util::parse::encode_base10;

use crate::{
    convert_named_params,
    error::{GatewayResult, WalletDbError, WalletDbResult},
    projects::FUND_BASE10_DECIMALS,
    Fnd,
};

// Wallet SQL table constant names. These have to represent the `wallet.sql`
// SQL schema.
pub const WALLET_TXS_HISTORY_TABLE: &str = "transactions_history";
pub const WALLET_TXS_HISTORY_COL_TX_ID: &str = "transaction_id";
pub const WALLET_TXS_HISTORY_COL_METHOD: &str = "method";
pub const WALLET_TXS_HISTORY_COL_PROJECT_ID: &str = "project_id";
pub const WALLET_TXS_HISTORY_COL_AMOUNT: &str = "amount";
pub const WALLET_TXS_HISTORY_COL_STATUS: &str = "status";

/// A row of the local transaction activity log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRecord {
    pub txid: String,
    pub method: String,
    pub project_id: Option<u64>,
    pub amount: Option<u64>,
    pub status: String,
}

impl Fnd {
    /// Insert an activity record for a just-broadcasted transaction.
    pub fn insert_activity_record(
        &self,
        txid: &str,
        method: &str,
        project_id: Option<u64>,
        amount: Option<u64>,
    ) -> WalletDbResult<()> {
        let query = format!(
            "INSERT INTO {} ({}, {}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4, ?5);",
            WALLET_TXS_HISTORY_TABLE,
            WALLET_TXS_HISTORY_COL_TX_ID,
            WALLET_TXS_HISTORY_COL_METHOD,
            WALLET_TXS_HISTORY_COL_PROJECT_ID,
            WALLET_TXS_HISTORY_COL_AMOUNT,
            WALLET_TXS_HISTORY_COL_STATUS,
        );
        self.wallet.exec_sql(
            &query,
            rusqlite::params![
                txid,
                method,
                project_id.map(|id| id as i64),
                amount.map(|a| a as i64),
                "Broadcasted",
            ],
        )
    }

    /// Update the status of an activity record.
    pub fn update_activity_status(&self, txid: &str, status: &str) -> WalletDbResult<()> {
        let query = format!(
            "UPDATE {} SET {} = ?1 WHERE {} = ?2;",
            WALLET_TXS_HISTORY_TABLE, WALLET_TXS_HISTORY_COL_STATUS, WALLET_TXS_HISTORY_COL_TX_ID,
        );
        self.wallet.exec_sql(&query, rusqlite::params![status, txid])
    }

    /// Fetch activity records, optionally restricted to a given method.
    pub fn get_activity(&self, method: Option<&str>) -> WalletDbResult<Vec<ActivityRecord>> {
        let rows = match method {
            Some(method) => self.wallet.query_multiple(
                WALLET_TXS_HISTORY_TABLE,
                &[],
                convert_named_params! {(WALLET_TXS_HISTORY_COL_METHOD, method)},
            )?,
            None => self.wallet.query_multiple(WALLET_TXS_HISTORY_TABLE, &[], &[])?,
        };

        let mut ret = Vec::with_capacity(rows.len());
        for row in rows {
            let Value::Text(ref txid) = row[0] else {
                return Err(WalletDbError::ParseColumnValueError)
            };
            let Value::Text(ref method) = row[1] else {
                return Err(WalletDbError::ParseColumnValueError)
            };
            let project_id = match row[2] {
                Value::Integer(id) => Some(id as u64),
                Value::Null => None,
                _ => return Err(WalletDbError::ParseColumnValueError),
            };
            let amount = match row[3] {
                Value::Integer(amount) => Some(amount as u64),
                Value::Null => None,
                _ => return Err(WalletDbError::ParseColumnValueError),
            };
            let Value::Text(ref status) = row[4] else {
                return Err(WalletDbError::ParseColumnValueError)
            };

            ret.push(ActivityRecord {
                txid: txid.clone(),
                method: method.clone(),
                project_id,
                amount,
                status: status.clone(),
            });
        }

        Ok(ret)
    }

    /// Await the receipt of a broadcasted transaction and keep its
    /// activity record in step with the outcome.
    pub async fn confirm_and_record(&self, txid: &str) -> GatewayResult<()> {
        match self.wait_tx_confirmation(txid).await {
            Ok(()) => {
                if let Err(e) = self.update_activity_status(txid, "Finalized") {
                    error!(target: "fnd::txs_history", "Updating activity record failed: {e}");
                }
                println!("Transaction {txid} confirmed");
                Ok(())
            }

            Err(e) => {
                if let Err(db) = self.update_activity_status(txid, "Rejected") {
                    error!(target: "fnd::txs_history", "Updating activity record failed: {db}");
                }
                Err(e)
            }
        }
    }

    /// Render the full activity log, the notifications surface of the
    /// client.
    pub fn print_activity(&self) -> WalletDbResult<()> {
        let records = self.get_activity(None)?;
        let table = activity_table(&records);

        if table.is_empty() {
            println!("No transaction activity");
        } else {
            println!("{table}");
        }

        Ok(())
    }

    /// Render the investments made from this wallet.
    pub fn print_investments(&self) -> WalletDbResult<()> {
        let records = self.get_activity(Some("projects.invest"))?;
        let table = activity_table(&records);

        if table.is_empty() {
            println!("No investments found");
        } else {
            println!("{table}");
        }

        Ok(())
    }
}

/// Render activity records as a table.
fn activity_table(records: &[ActivityRecord]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.set_titles(row!["Transaction ID", "Method", "Project", "Amount", "Status"]);

    for record in records {
        let project = match record.project_id {
            Some(id) => id.to_string(),
            None => "-".to_string(),
        };
        let amount = match record.amount {
            Some(amount) => encode_base10(amount, FUND_BASE10_DECIMALS),
            None => "-".to_string(),
        };
        table.add_row(row![record.txid, record.method, project, amount, record.status]);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::mem_fnd;

    #[test]
    fn test_activity_records() {
        let fnd = mem_fnd();

        fnd.insert_activity_record("tx1", "users.register", None, None).unwrap();
        fnd.insert_activity_record("tx2", "projects.invest", Some(0), Some(150000000)).unwrap();

        let all = fnd.get_activity(None).unwrap();
        assert_eq!(all.len(), 2);

        let investments = fnd.get_activity(Some("projects.invest")).unwrap();
        assert_eq!(investments.len(), 1);
        assert_eq!(investments[0].txid, "tx2");
        assert_eq!(investments[0].project_id, Some(0));
        assert_eq!(investments[0].amount, Some(150000000));
        assert_eq!(investments[0].status, "Broadcasted");

        fnd.update_activity_status("tx2", "Finalized").unwrap();
        let investments = fnd.get_activity(Some("projects.invest")).unwrap();
        assert_eq!(investments[0].status, "Finalized");
    }
}
