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

use std::{collections::HashMap, fmt, str::FromStr};

use tinyjson::JsonValue;
use tracing::debug;

use fundfi::{
    rpc::util::{json_map, json_str},
    Error, Result,
};

use crate::{
    error::{GatewayError, GatewayResult},
    Fnd,
};

/// User roles recognized by the funding contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Founder,
    Investor,
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "founder" => Ok(Self::Founder),
            "investor" => Ok(Self::Investor),
            _ => Err(Error::ParseFailed("Unknown role, expected \"founder\" or \"investor\"")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Founder => write!(f, "founder"),
            Self::Investor => write!(f, "investor"),
        }
    }
}

/// On-chain user record of a registered account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub name: String,
    pub role: Role,
    pub telegram: String,
}

impl UserInfo {
    /// Parse a `users.get_info` reply. A reply with `exists: false`
    /// means the account has no record, yielding `None`.
    pub fn from_value(value: &JsonValue) -> Result<Option<Self>> {
        let Some(map) = value.get::<HashMap<String, JsonValue>>() else {
            return Err(Error::ParseFailed("User info is not an object"))
        };

        let Some(JsonValue::Boolean(exists)) = map.get("exists") else {
            return Err(Error::ParseFailed("User info lacks an \"exists\" field"))
        };
        if !exists {
            return Ok(None)
        }

        let Some(JsonValue::String(name)) = map.get("name") else {
            return Err(Error::ParseFailed("User info lacks a \"name\" field"))
        };
        let Some(JsonValue::String(role)) = map.get("role") else {
            return Err(Error::ParseFailed("User info lacks a \"role\" field"))
        };
        let telegram = match map.get("telegram") {
            Some(JsonValue::String(tg)) => tg.clone(),
            _ => String::new(),
        };

        Ok(Some(Self { name: name.clone(), role: role.parse()?, telegram }))
    }
}

/// Session context derived from the wallet and the on-chain user record.
/// A session is constructed once per connection and only changes through
/// the explicit transitions below. There is no transition back to
/// `Disconnected`; process exit is the reset path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    /// No wallet account is bound
    Disconnected,
    /// An account is bound but its registration status is unknown
    Unresolved { account: String },
    /// The bound account has no on-chain user record
    NeedsRegistration { account: String },
    /// The bound account is registered; `user.role` gates the views
    Registered { account: String, user: UserInfo },
}

impl Session {
    /// Bind a wallet account. Once bound, the account is immutable for
    /// the session's lifetime; connecting an already-connected session
    /// is a no-op.
    pub fn connect(self, account: String) -> Self {
        match self {
            Self::Disconnected => Self::Unresolved { account },
            other => other,
        }
    }

    /// Route on the result of the user-info read. `None` means the
    /// account has no on-chain record and must register first.
    pub fn resolve(self, user: Option<UserInfo>) -> Self {
        let account = match self {
            Self::Unresolved { account } |
            Self::NeedsRegistration { account } |
            Self::Registered { account, .. } => account,
            Self::Disconnected => return Self::Disconnected,
        };

        match user {
            Some(user) => Self::Registered { account, user },
            None => Self::NeedsRegistration { account },
        }
    }

    /// The bound account, if any.
    pub fn account(&self) -> Option<&str> {
        match self {
            Self::Disconnected => None,
            Self::Unresolved { account } |
            Self::NeedsRegistration { account } |
            Self::Registered { account, .. } => Some(account),
        }
    }

    /// The registered role, if the session reached the dashboard.
    pub fn role(&self) -> Option<Role> {
        match self {
            Self::Registered { user, .. } => Some(user.role),
            _ => None,
        }
    }
}

impl Fnd {
    /// Establish a session: bind the active wallet account and resolve
    /// its registration status against the funding contract.
    pub async fn connect(&self) -> GatewayResult<Session> {
        let account = match self.default_address() {
            Ok(a) => a,
            Err(_) => {
                return Err(GatewayError::Client(
                    "No wallet account found. Run \"fnd wallet --initialize\" and \"fnd wallet --keygen\" first"
                        .to_string(),
                ))
            }
        };

        let session = Session::Disconnected.connect(account.clone());
        debug!(target: "fnd::session", "Bound active account {account}");

        let user = self.get_user_info(&account).await?;
        Ok(session.resolve(user))
    }

    /// Register the active account with the funding contract, await the
    /// receipt, and return the re-resolved session.
    pub async fn register(&self, name: &str, role: Role, telegram: &str) -> GatewayResult<Session> {
        let session = self.connect().await?;

        // Re-check right before submission. Another wallet copy may have
        // registered this account since the last resolve; the window
        // between this check and the transaction landing is not guarded.
        if let Session::Registered { .. } = session {
            return Err(GatewayError::AlreadyRegistered)
        }

        let payload = json_map([
            ("name", json_str(name)),
            ("role", json_str(&role.to_string())),
            ("telegram", json_str(telegram)),
        ]);

        let txid = self.submit_call("users.register", payload).await?;
        println!("Registration transaction submitted: {txid}");

        if let Err(e) = self.insert_activity_record(&txid, "users.register", None, None) {
            return Err(GatewayError::Client(format!(
                "[register] Inserting activity record failed: {e}"
            )))
        }
        self.confirm_and_record(&txid).await?;

        // Re-resolve the session from chain state
        self.connect().await
    }

    /// Print the session state and where it routes, the way the
    /// dashboard would gate its views.
    pub async fn show_session(&self) -> GatewayResult<()> {
        let session = self.connect().await?;

        match session {
            Session::Disconnected | Session::Unresolved { .. } => unreachable!(),
            Session::NeedsRegistration { account } => {
                println!("Account: {account}");
                println!("Status: not registered");
                println!("Run \"fnd register <name> <role>\" to access the dashboard");
            }
            Session::Registered { account, user } => {
                println!("Account: {account}");
                println!("Status: registered");
                println!("Name: {}", user.name);
                println!("Role: {}", user.role);
                if !user.telegram.is_empty() {
                    println!("Telegram: {}", user.telegram);
                }
                match user.role {
                    Role::Founder => println!("Dashboard: project creation and project list"),
                    Role::Investor => println!("Dashboard: project list and investments"),
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> UserInfo {
        UserInfo { name: "alice".to_string(), role, telegram: "@alice".to_string() }
    }

    #[test]
    fn test_unregistered_routes_to_registration() {
        let session = Session::Disconnected.connect("FndAddr".to_string());
        assert_eq!(session, Session::Unresolved { account: "FndAddr".to_string() });

        // exists=false must route to registration, never to the dashboard
        let session = session.resolve(None);
        assert_eq!(session, Session::NeedsRegistration { account: "FndAddr".to_string() });
        assert_eq!(session.role(), None);
    }

    #[test]
    fn test_registered_routes_to_dashboard() {
        let session =
            Session::Disconnected.connect("FndAddr".to_string()).resolve(Some(user(Role::Founder)));

        let Session::Registered { ref account, ref user } = session else {
            panic!("expected registered session")
        };
        assert_eq!(account, "FndAddr");
        assert_eq!(user.name, "alice");
        assert_eq!(session.role(), Some(Role::Founder));
    }

    #[test]
    fn test_registration_completes_session() {
        // A successful registration re-resolves into the dashboard state
        let session = Session::Disconnected.connect("FndAddr".to_string()).resolve(None);
        let session = session.resolve(Some(user(Role::Investor)));
        assert_eq!(session.role(), Some(Role::Investor));
        assert_eq!(session.account(), Some("FndAddr"));
    }

    #[test]
    fn test_account_is_immutable_once_bound() {
        let session = Session::Disconnected.connect("first".to_string());
        let session = session.connect("second".to_string());
        assert_eq!(session.account(), Some("first"));
    }

    #[test]
    fn test_disconnected_never_resolves() {
        assert_eq!(Session::Disconnected.resolve(None), Session::Disconnected);
        assert_eq!(
            Session::Disconnected.resolve(Some(user(Role::Founder))),
            Session::Disconnected
        );
    }

    #[test]
    fn test_user_info_wire_parsing() {
        let reply: JsonValue =
            r#"{"name": "alice", "role": "founder", "telegram": "@alice", "exists": true}"#
                .parse()
                .unwrap();
        let info = UserInfo::from_value(&reply).unwrap().unwrap();
        assert_eq!(info.name, "alice");
        assert_eq!(info.role, Role::Founder);
        assert_eq!(info.telegram, "@alice");

        // exists=false means unregistered, regardless of other fields
        let reply: JsonValue =
            r#"{"name": "", "role": "", "telegram": "", "exists": false}"#.parse().unwrap();
        assert!(UserInfo::from_value(&reply).unwrap().is_none());

        let reply: JsonValue = r#"{"name": "bob"}"#.parse().unwrap();
        assert!(UserInfo::from_value(&reply).is_err());
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("founder".parse::<Role>().unwrap(), Role::Founder);
        assert_eq!("Investor".parse::<Role>().unwrap(), Role::Investor);
        assert!("admin".parse::<Role>().is_err());
        assert_eq!(Role::Founder.to_string(), "founder");
    }
}
