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

use std::{fs, process::exit, sync::Arc};

use prettytable::{format, row, Table};
use smol::Executor;
use structopt_toml::{serde::Deserialize, structopt::StructOpt, StructOptToml};
use tracing::warn;
use url::Url;

use fundfi::{
    rpc::client::RpcClient,
    util::{
        file::spawn_config,
        path::{expand_path, get_config_path},
    },
    Result,
};

/// Error codes
mod error;

/// CLI utility functions
mod cli_util;

/// fundfid JSON-RPC related methods
mod rpc;

/// Session controller
mod session;
use session::{Role, Session};

/// Project listing and investment flows
mod projects;

/// Wallet functionality related to transaction activity
mod txs_history;

/// Wallet key management
mod wallet;

/// Wallet database operations handler
mod walletdb;
use walletdb::{WalletDb, WalletPtr};

const CONFIG_FILE: &str = "fnd_config.toml";
const CONFIG_FILE_CONTENTS: &str = include_str!("../fnd_config.toml");

#[derive(Clone, Debug, Deserialize, StructOpt, StructOptToml)]
#[serde(default)]
#[structopt(name = "fnd", about = "Command-line client for fundfid")]
struct Args {
    #[structopt(short, long)]
    /// Configuration file to use
    config: Option<String>,

    #[structopt(long, default_value = "~/.local/share/fundfi/fnd/wallet.db")]
    /// Path to wallet database
    wallet_path: String,

    #[structopt(long, default_value = "changeme")]
    /// Password for the wallet database
    wallet_pass: String,

    #[structopt(short, long, default_value = "tcp://127.0.0.1:8370")]
    /// fundfid JSON-RPC endpoint
    endpoint: Url,

    #[structopt(subcommand)]
    /// Sub command to execute
    command: Subcmd,

    #[structopt(short, parse(from_occurrences))]
    /// Increase verbosity (-vvv supported)
    verbose: u8,
}

#[derive(Clone, Debug, Deserialize, StructOpt)]
enum Subcmd {
    /// Send a ping request to the fundfid RPC endpoint
    Ping,

    /// Wallet operations
    Wallet {
        #[structopt(long)]
        /// Initialize wallet database
        initialize: bool,

        #[structopt(long)]
        /// Generate a new account keypair in the wallet
        keygen: bool,

        #[structopt(long)]
        /// Get the active account address
        address: bool,

        #[structopt(long)]
        /// Print all account addresses in the wallet
        addresses: bool,

        #[structopt(long)]
        /// Set the active account by its wallet ID
        default_address: Option<usize>,

        #[structopt(long)]
        /// Print all the secret keys from the wallet
        secrets: bool,
    },

    /// Show the current session state and dashboard routing
    Session,

    /// Register the active account with the funding contract
    Register {
        /// Display name to register
        name: String,

        /// Role to register as ("founder" or "investor")
        role: String,

        #[structopt(long, default_value = "")]
        /// Telegram contact handle
        telegram: String,
    },

    /// Project operations
    Project {
        #[structopt(subcommand)]
        command: ProjectSubcmd,
    },

    /// Invest in an active project
    Invest {
        /// Project ID to invest in
        project_id: u64,

        /// Decimal FUND amount to invest
        amount: String,
    },

    /// Show investments made from this wallet
    Investments,

    /// Show the local transaction activity log
    Activity,
}

#[derive(Clone, Debug, Deserialize, StructOpt)]
enum ProjectSubcmd {
    /// Create a new project (founders only)
    Create {
        /// Project name
        name: String,

        /// Project description
        description: String,

        /// Required funding as a decimal FUND amount
        funding: String,
    },

    /// List all projects on the funding contract
    List,

    /// List projects founded by the active account
    Mine,
}

/// CLI-util structure
pub struct Fnd {
    /// Wallet database operations handler
    pub wallet: WalletPtr,
    /// JSON-RPC client to execute requests to fundfid daemon
    pub rpc_client: Option<RpcClient>,
    /// Configured fundfid JSON-RPC endpoint
    pub endpoint: Option<Url>,
    /// Executor to detach client connections onto
    pub ex: Arc<Executor<'static>>,
}

impl Fnd {
    async fn new(
        wallet_path: String,
        wallet_pass: String,
        endpoint: Option<Url>,
        ex: Arc<Executor<'static>>,
    ) -> Result<Self> {
        if wallet_pass == "changeme" {
            warn!(target: "fnd", "Using the default wallet password");
        }

        // Initialize wallet
        let wallet_path = expand_path(&wallet_path)?;
        if !wallet_path.exists() {
            if let Some(parent) = wallet_path.parent() {
                fs::create_dir_all(parent)?;
            }
        }
        let wallet = match WalletDb::new(Some(wallet_path), Some(&wallet_pass)) {
            Ok(w) => w,
            Err(e) => {
                eprintln!("Error initializing wallet: {e}");
                exit(2);
            }
        };

        // Initialize rpc client
        let rpc_client = match endpoint.clone() {
            Some(endpoint) => Some(RpcClient::new(endpoint, ex.clone()).await?),
            None => None,
        };

        Ok(Self { wallet, rpc_client, endpoint, ex })
    }
}

fn main() -> Result<()> {
    // First pass so an explicit --config wins, then spawn the default
    // configuration on first run and parse again over its contents.
    let args = match Args::from_args_with_toml("") {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error parsing arguments: {e}");
            exit(1);
        }
    };
    let cfg_path = get_config_path(args.config.clone(), CONFIG_FILE)?;
    spawn_config(&cfg_path, CONFIG_FILE_CONTENTS)?;
    let args = match Args::from_args_with_toml(&fs::read_to_string(cfg_path)?) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error parsing configuration file: {e}");
            exit(1);
        }
    };

    let log_level = match args.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    let ex = Arc::new(Executor::new());
    let ex_ = ex.clone();
    smol::block_on(ex.run(realmain(args, ex_)))
}

async fn realmain(args: Args, ex: Arc<Executor<'static>>) -> Result<()> {
    match args.command {
        Subcmd::Ping => {
            let fnd =
                Fnd::new(args.wallet_path, args.wallet_pass, Some(args.endpoint), ex).await?;
            fnd.ping().await?;
            fnd.stop_rpc_client().await
        }

        Subcmd::Wallet { initialize, keygen, address, addresses, default_address, secrets } => {
            if !initialize &&
                !keygen &&
                !address &&
                !addresses &&
                default_address.is_none() &&
                !secrets
            {
                eprintln!("Error: You must use at least one flag for this subcommand");
                eprintln!("Run with \"wallet -h\" to see the subcommand usage.");
                exit(2);
            }

            let fnd = Fnd::new(args.wallet_path, args.wallet_pass, None, ex).await?;

            if initialize {
                if let Err(e) = fnd.initialize_wallet() {
                    eprintln!("Error initializing wallet: {e}");
                    exit(2);
                }
                println!("Wallet initialized successfully.");
                return Ok(())
            }

            if keygen {
                match fnd.keygen() {
                    Ok(address) => println!("New account address: {address}"),
                    Err(e) => {
                        eprintln!("Failed to generate keypair: {e}");
                        exit(2);
                    }
                }
                return Ok(())
            }

            if address {
                match fnd.default_address() {
                    Ok(address) => println!("{address}"),
                    Err(e) => {
                        eprintln!("Failed to fetch the active account: {e}");
                        exit(2);
                    }
                }
                return Ok(())
            }

            if addresses {
                let accounts = match fnd.addresses() {
                    Ok(a) => a,
                    Err(e) => {
                        eprintln!("Failed to fetch wallet accounts: {e}");
                        exit(2);
                    }
                };

                let mut table = Table::new();
                table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
                table.set_titles(row!["ID", "Address", "Active"]);
                for (id, account, is_default) in accounts {
                    table.add_row(row![id, account, if is_default { "yes" } else { "-" }]);
                }

                if table.is_empty() {
                    println!("No accounts found in the wallet");
                } else {
                    println!("{table}");
                }
                return Ok(())
            }

            if let Some(id) = default_address {
                if let Err(e) = fnd.set_default_address(id) {
                    eprintln!("Failed to set the active account: {e}");
                    exit(2);
                }
                println!("Active account updated.");
                return Ok(())
            }

            if secrets {
                let secrets = match fnd.secrets() {
                    Ok(s) => s,
                    Err(e) => {
                        eprintln!("Failed to fetch secret keys: {e}");
                        exit(2);
                    }
                };
                for secret in secrets {
                    println!("{secret}");
                }
                return Ok(())
            }

            Ok(())
        }

        Subcmd::Session => {
            let fnd =
                Fnd::new(args.wallet_path, args.wallet_pass, Some(args.endpoint), ex).await?;
            if let Err(e) = fnd.show_session().await {
                eprintln!("Error: {e}");
                exit(2);
            }
            fnd.stop_rpc_client().await
        }

        Subcmd::Register { name, role, telegram } => {
            let role: Role = match role.parse() {
                Ok(role) => role,
                Err(e) => {
                    eprintln!("Error: {e}");
                    exit(2);
                }
            };

            let fnd =
                Fnd::new(args.wallet_path, args.wallet_pass, Some(args.endpoint), ex).await?;
            match fnd.register(&name, role, &telegram).await {
                Ok(Session::Registered { user, .. }) => {
                    println!("Welcome, {} ({})", user.name, user.role);
                }
                Ok(_) => {
                    eprintln!("Registration confirmed but the account is still unregistered");
                    exit(2);
                }
                Err(e) => {
                    eprintln!("Registration failed: {e}");
                    exit(2);
                }
            }
            fnd.stop_rpc_client().await
        }

        Subcmd::Project { command } => {
            let fnd =
                Fnd::new(args.wallet_path, args.wallet_pass, Some(args.endpoint), ex).await?;

            let result = match command {
                ProjectSubcmd::Create { name, description, funding } => {
                    fnd.create_project(&name, &description, &funding).await
                }
                ProjectSubcmd::List => fnd.print_projects(false).await,
                ProjectSubcmd::Mine => fnd.print_projects(true).await,
            };

            if let Err(e) = result {
                eprintln!("Error: {e}");
                exit(2);
            }
            fnd.stop_rpc_client().await
        }

        Subcmd::Invest { project_id, amount } => {
            let fnd =
                Fnd::new(args.wallet_path, args.wallet_pass, Some(args.endpoint), ex).await?;
            if let Err(e) = fnd.invest(project_id, &amount).await {
                eprintln!("Investment failed: {e}");
                exit(2);
            }
            fnd.stop_rpc_client().await
        }

        Subcmd::Investments => {
            let fnd = Fnd::new(args.wallet_path, args.wallet_pass, None, ex).await?;
            if let Err(e) = fnd.print_investments() {
                eprintln!("Error: {e}");
                exit(2);
            }
            Ok(())
        }

        Subcmd::Activity => {
            let fnd = Fnd::new(args.wallet_path, args.wallet_pass, None, ex).await?;
            if let Err(e) = fnd.print_activity() {
                eprintln!("Error: {e}");
                exit(2);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
pub mod tests {
    use std::sync::Arc;

    use smol::Executor;

    use crate::{walletdb::WalletDb, Fnd};

    /// In-memory client with no RPC connection, for wallet-level tests.
    pub fn mem_fnd() -> Fnd {
        let wallet = WalletDb::new(None, None).unwrap();
        let fnd = Fnd { wallet, rpc_client: None, endpoint: None, ex: Arc::new(Executor::new()) };
        fnd.initialize_wallet().unwrap();
        fnd
    }
}
