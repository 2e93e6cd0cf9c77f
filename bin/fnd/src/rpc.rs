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

use std::{collections::HashMap, time::{Duration, Instant}};

use futures::future::try_join_all;
use rand::{rngs::OsRng, Rng};
use smol::Timer;
use tinyjson::JsonValue;
use tracing::debug;
use url::Url;

use fundfi::{
    rpc::{
        client::RpcClient,
        jsonrpc::JsonRequest,
        util::{json_map, json_str},
    },
    Error, Result,
};

use crate::{
    error::{GatewayError, GatewayResult},
    projects::Project,
    session::UserInfo,
    Fnd,
};

/// Interval between `tx.status` polls while awaiting a receipt.
const CONFIRM_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Maximum in-flight requests while enumerating projects per-index.
const PROJECT_FETCH_CONCURRENCY: usize = 8;

impl Fnd {
    /// Auxiliary function to ping the configured fundfid daemon for liveness.
    pub async fn ping(&self) -> Result<()> {
        println!("Executing ping request to fundfid...");
        let latency = Instant::now();
        let rep = self.fundfid_daemon_request("ping", &JsonValue::Array(vec![])).await?;
        let latency = latency.elapsed();
        println!("Got reply: {rep:?}");
        println!("Latency: {latency:?}");
        Ok(())
    }

    /// Auxiliary function to execute a request towards the configured
    /// fundfid daemon JSON-RPC endpoint.
    pub async fn fundfid_daemon_request(
        &self,
        method: &str,
        params: &JsonValue,
    ) -> Result<JsonValue> {
        let Some(ref rpc_client) = self.rpc_client else { return Err(Error::RpcClientStopped) };
        let req = JsonRequest::new(method, params.clone());
        rpc_client.request(req).await
    }

    /// Same as above, with transport failures and JSON-RPC server codes
    /// decoded into tagged [`GatewayError`] variants. This is the single
    /// place where gateway errors are decoded.
    async fn gateway_request(&self, method: &str, params: &JsonValue) -> GatewayResult<JsonValue> {
        Ok(self.fundfid_daemon_request(method, params).await?)
    }

    /// Read the on-chain user record for the given account. `None`
    /// means the account is not registered.
    pub async fn get_user_info(&self, account: &str) -> GatewayResult<Option<UserInfo>> {
        let params = JsonValue::Array(vec![json_str(account)]);
        let rep = self.gateway_request("users.get_info", &params).await?;
        UserInfo::from_value(&rep).map_err(|e| GatewayError::Client(e.to_string()))
    }

    /// Read the number of projects known to the funding contract.
    pub async fn get_project_count(&self) -> GatewayResult<u64> {
        let rep = self.gateway_request("projects.count", &JsonValue::Array(vec![])).await?;
        let Some(count) = rep.get::<f64>() else {
            return Err(GatewayError::Client("Unexpected project count reply".to_string()))
        };
        Ok(*count as u64)
    }

    /// Read a single project by its index.
    pub async fn get_project(&self, index: u64) -> GatewayResult<Project> {
        let params = JsonValue::Array(vec![JsonValue::Number(index as f64)]);
        let rep = self.gateway_request("projects.get", &params).await?;
        Project::from_value(&rep).map_err(|e| GatewayError::Client(e.to_string()))
    }

    /// Enumerate all projects on the funding contract. The batched
    /// `projects.get_range` capability is tried first; nodes that do not
    /// offer it are enumerated per-index with bounded concurrency.
    pub async fn get_projects(&self) -> GatewayResult<Vec<Project>> {
        let count = self.get_project_count().await?;
        debug!(target: "fnd::rpc", "Fetching {count} projects");
        if count == 0 {
            return Ok(vec![])
        }

        let params = JsonValue::Array(vec![
            JsonValue::Number(0_f64),
            JsonValue::Number(count as f64),
        ]);
        let projects = match self.gateway_request("projects.get_range", &params).await {
            Ok(rep) => {
                let Some(values) = rep.get::<Vec<JsonValue>>() else {
                    return Err(GatewayError::Client("Unexpected project range reply".to_string()))
                };
                let mut projects = Vec::with_capacity(values.len());
                for value in values {
                    projects.push(
                        Project::from_value(value)
                            .map_err(|e| GatewayError::Client(e.to_string()))?,
                    );
                }
                projects
            }

            // The node predates the batched capability
            Err(GatewayError::MethodNotFound) => {
                debug!(target: "fnd::rpc", "projects.get_range unsupported, fetching per-index");
                self.get_projects_by_index(count).await?
            }

            Err(e) => return Err(e),
        };

        if projects.len() as u64 != count {
            return Err(GatewayError::Client(format!(
                "Project list length {} does not match project count {count}",
                projects.len()
            )))
        }

        Ok(projects)
    }

    /// Per-index enumeration fallback. Each in-flight request rides its
    /// own short-lived connection, `PROJECT_FETCH_CONCURRENCY` at a time.
    async fn get_projects_by_index(&self, count: u64) -> GatewayResult<Vec<Project>> {
        let Some(ref endpoint) = self.endpoint else { return Err(GatewayError::Unreachable) };

        let indexes: Vec<u64> = (0..count).collect();
        let mut projects = Vec::with_capacity(count as usize);
        for chunk in indexes.chunks(PROJECT_FETCH_CONCURRENCY) {
            let futs = chunk.iter().map(|&index| self.fetch_project_oneshot(endpoint, index));
            projects.extend(try_join_all(futs).await?);
        }

        Ok(projects)
    }

    /// Fetch a single project over a fresh oneshot connection.
    async fn fetch_project_oneshot(&self, endpoint: &Url, index: u64) -> GatewayResult<Project> {
        let Ok(rpc_client) = RpcClient::new(endpoint.clone(), self.ex.clone()).await else {
            return Err(GatewayError::Unreachable)
        };

        let req = JsonRequest::new(
            "projects.get",
            JsonValue::Array(vec![JsonValue::Number(index as f64)]),
        );
        let rep = rpc_client.oneshot_request(req).await?;
        Project::from_value(&rep).map_err(|e| GatewayError::Client(e.to_string()))
    }

    /// Build, sign and submit a contract call, returning the pending
    /// transaction ID. The call envelope binds the payload to the active
    /// account with a nonce and an ed25519 signature over the digest of
    /// `method:payload:nonce`.
    pub async fn submit_call(&self, method: &str, payload: JsonValue) -> GatewayResult<String> {
        let payload_str = match payload.stringify() {
            Ok(s) => s,
            Err(e) => return Err(GatewayError::Client(format!("Malformed call payload: {e}"))),
        };
        let nonce: u32 = OsRng.gen();

        let digest = blake3::hash(format!("{method}:{payload_str}:{nonce}").as_bytes());
        let (account, signature) = self
            .sign_call(digest.as_bytes())
            .map_err(|e| GatewayError::Client(e.to_string()))?;

        let envelope = json_map([
            ("payload", payload),
            ("account", json_str(&account)),
            ("nonce", JsonValue::Number(nonce as f64)),
            ("signature", json_str(&signature)),
        ]);

        println!("Broadcasting transaction...");
        let rep = self.gateway_request(method, &JsonValue::Array(vec![envelope])).await?;
        let Some(txid) = rep.get::<String>() else {
            return Err(GatewayError::Client("Unexpected broadcast reply".to_string()))
        };

        Ok(txid.clone())
    }

    /// Await the receipt of a submitted transaction by polling
    /// `tx.status`. A rejected transaction surfaces its revert reason.
    /// The wait itself is unbounded; only individual status requests
    /// time out.
    pub async fn wait_tx_confirmation(&self, txid: &str) -> GatewayResult<()> {
        println!("Waiting for transaction confirmation...");

        loop {
            let params = JsonValue::Array(vec![json_str(txid)]);
            let rep = self.gateway_request("tx.status", &params).await?;

            let Some(map) = rep.get::<HashMap<String, JsonValue>>() else {
                return Err(GatewayError::Client("Unexpected tx status reply".to_string()))
            };
            let Some(JsonValue::String(status)) = map.get("status") else {
                return Err(GatewayError::Client("Unexpected tx status reply".to_string()))
            };

            match status.as_str() {
                "finalized" => return Ok(()),

                "rejected" => {
                    let reason = match map.get("reason") {
                        Some(JsonValue::String(r)) => r.clone(),
                        _ => "unknown".to_string(),
                    };
                    return Err(GatewayError::Reverted(reason))
                }

                "pending" | "unknown" => {
                    debug!(target: "fnd::rpc", "Transaction {txid} still {status}");
                    Timer::after(CONFIRM_POLL_INTERVAL).await;
                }

                x => {
                    return Err(GatewayError::Client(format!("Unexpected transaction status: {x}")))
                }
            }
        }
    }

    /// Auxiliary function to stop the current JSON-RPC client, if it
    /// is initialized.
    pub async fn stop_rpc_client(&self) -> Result<()> {
        if let Some(ref rpc_client) = self.rpc_client {
            rpc_client.stop().await;
        };
        Ok(())
    }
}
