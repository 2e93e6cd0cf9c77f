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

//! JSON-RPC client-side implementation.
use std::{sync::Arc, time::Duration};

use futures::{select, FutureExt};
use smol::{
    channel,
    io::{split, AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
    Executor, Timer,
};
use tinyjson::JsonValue;
use tracing::{debug, error};
use url::Url;

use super::jsonrpc::{JsonRequest, JsonResult};
use crate::{error::RpcError, Error, Result};

/// If the node takes longer than this to answer a single request,
/// the request fails. Receipt waiting is handled by callers on top
/// of individual requests, so this never bounds a confirmation wait.
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON-RPC client implementation using asynchronous channels.
pub struct RpcClient {
    req_send: channel::Sender<JsonRequest>,
    rep_recv: channel::Receiver<JsonResult>,
    stop_send: channel::Sender<()>,
    endpoint: Url,
}

impl RpcClient {
    /// Instantiate a new JSON-RPC client that connects to the given endpoint.
    /// The request/reply loop is detached onto the given executor. Only
    /// `tcp://` endpoints are supported.
    pub async fn new(endpoint: Url, ex: Arc<Executor<'static>>) -> Result<Self> {
        if endpoint.scheme() != "tcp" {
            return Err(Error::UnsupportedTransport(endpoint.scheme().to_string()))
        }

        let Some(host) = endpoint.host_str() else {
            return Err(Error::UrlParse(format!("Missing host in {endpoint}")))
        };
        let Some(port) = endpoint.port() else {
            return Err(Error::UrlParse(format!("Missing port in {endpoint}")))
        };

        let stream = match TcpStream::connect((host, port)).await {
            Ok(stream) => stream,
            Err(e) => {
                error!(target: "rpc::client", "JSON-RPC client connection to {endpoint} failed: {e}");
                return Err(Error::ConnectFailed)
            }
        };
        debug!(target: "rpc::client", "Connected to {endpoint}");

        let (req_send, req_recv) = channel::unbounded();
        let (rep_send, rep_recv) = channel::unbounded();
        let (stop_send, stop_recv) = channel::unbounded();

        ex.spawn(Self::reqrep_loop(stream, rep_send, req_recv, stop_recv)).detach();

        Ok(Self { req_send, rep_recv, stop_send, endpoint })
    }

    /// Stop the request/reply loop and drop the connection.
    pub async fn stop(&self) {
        let _ = self.stop_send.send(()).await;
    }

    /// Send a given JSON-RPC request over the instantiated client and
    /// await the reply. A `JsonError` reply is mapped to
    /// [`Error::JsonRpcError`] carrying the server code and message, so
    /// callers decode server errors in exactly one place.
    pub async fn request(&self, req: JsonRequest) -> Result<JsonValue> {
        let req_id = req.id;
        debug!(target: "rpc::client", "--> {}", req.stringify()?);

        // If the connection is closed, the loop is gone and both
        // channels report it.
        if self.req_send.send(req).await.is_err() {
            error!(target: "rpc::client", "JSON-RPC client unable to send to {} (connection closed)", self.endpoint);
            return Err(Error::NetworkOperationFailed)
        }

        let Ok(reply) = self.rep_recv.recv().await else {
            error!(target: "rpc::client", "JSON-RPC client unable to recv from {} (connection closed)", self.endpoint);
            return Err(Error::NetworkOperationFailed)
        };

        match reply {
            JsonResult::Response(rep) => {
                debug!(target: "rpc::client", "<-- {}", rep.stringify()?);
                if rep.id != req_id {
                    return Err(RpcError::IdMismatch.into())
                }
                Ok(rep.result)
            }

            JsonResult::Error(e) => {
                debug!(target: "rpc::client", "<-- {}", e.stringify()?);
                Err(Error::JsonRpcError((e.error.code, e.error.message)))
            }

            JsonResult::Notification(n) => {
                debug!(target: "rpc::client", "<-- {}", n.stringify()?);
                Err(Error::UnexpectedJsonRpc("Got a notification as a reply".to_string()))
            }
        }
    }

    /// Oneshot send a given JSON-RPC request over the instantiated client
    /// and stop the loop on reply.
    pub async fn oneshot_request(&self, req: JsonRequest) -> Result<JsonValue> {
        let rep = self.request(req).await?;
        self.stop().await;
        Ok(rep)
    }

    /// Internal function that loops on the connection stream and
    /// multiplexes requests and replies. Requests and replies are
    /// newline-delimited JSON objects.
    async fn reqrep_loop(
        stream: TcpStream,
        rep_send: channel::Sender<JsonResult>,
        req_recv: channel::Receiver<JsonRequest>,
        stop_recv: channel::Receiver<()>,
    ) -> Result<()> {
        let (reader, mut writer) = split(stream);
        let mut reader = BufReader::new(reader);

        loop {
            select! {
                req = req_recv.recv().fuse() => {
                    let mut line = req?.stringify()?;
                    line.push('\n');
                    writer.write_all(line.as_bytes()).await?;

                    let mut buf = String::new();
                    let n = select! {
                        r = reader.read_line(&mut buf).fuse() => r?,
                        _ = Timer::after(READ_TIMEOUT).fuse() => {
                            error!(target: "rpc::client", "JSON-RPC read timed out");
                            return Err(Error::RpcReadTimeout)
                        }
                    };

                    if n == 0 {
                        error!(target: "rpc::client", "JSON-RPC connection closed by peer");
                        return Err(RpcError::ConnectionClosed.into())
                    }

                    let val: JsonValue = buf.parse()?;
                    rep_send.send(JsonResult::try_from_value(&val)?).await?;
                }

                _ = stop_recv.recv().fuse() => break,
            }
        }

        Ok(())
    }
}
