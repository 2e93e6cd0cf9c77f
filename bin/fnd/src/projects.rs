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

use std::collections::HashMap;

use prettytable::{format, row, Table};
use tinyjson::JsonValue;

use fundfi::{
    rpc::util::{json_map, json_str},
    util::parse::encode_base10,
    Error, Result,
};

use crate::{
    cli_util::parse_funding_amount,
    error::{GatewayError, GatewayResult},
    session::Role,
    Fnd,
};

/// Decimal precision of FUND amounts on the wire.
pub const FUND_BASE10_DECIMALS: usize = 8;

/// Ticker shown next to rendered amounts.
pub const FUND_TICKER: &str = "FUND";

/// A project record read from the funding contract. Funding amounts are
/// base units; they are converted to decimal strings only for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub required_funding: u64,
    pub current_funding: u64,
    pub founder: String,
    pub is_active: bool,
}

impl Project {
    /// Parse a project from its wire object. Funding amounts travel as
    /// base-unit integer strings so they survive the JSON number type.
    pub fn from_value(value: &JsonValue) -> Result<Self> {
        let Some(map) = value.get::<HashMap<String, JsonValue>>() else {
            return Err(Error::ParseFailed("Project is not an object"))
        };

        let Some(JsonValue::Number(id)) = map.get("id") else {
            return Err(Error::ParseFailed("Project lacks an \"id\" field"))
        };
        let Some(JsonValue::String(name)) = map.get("name") else {
            return Err(Error::ParseFailed("Project lacks a \"name\" field"))
        };
        let Some(JsonValue::String(description)) = map.get("description") else {
            return Err(Error::ParseFailed("Project lacks a \"description\" field"))
        };
        let Some(JsonValue::String(required_funding)) = map.get("required_funding") else {
            return Err(Error::ParseFailed("Project lacks a \"required_funding\" field"))
        };
        let Some(JsonValue::String(current_funding)) = map.get("current_funding") else {
            return Err(Error::ParseFailed("Project lacks a \"current_funding\" field"))
        };
        let Some(JsonValue::String(founder)) = map.get("founder") else {
            return Err(Error::ParseFailed("Project lacks a \"founder\" field"))
        };
        let Some(JsonValue::Boolean(is_active)) = map.get("is_active") else {
            return Err(Error::ParseFailed("Project lacks an \"is_active\" field"))
        };

        Ok(Self {
            id: *id as u64,
            name: name.clone(),
            description: description.clone(),
            required_funding: required_funding.parse()?,
            current_funding: current_funding.parse()?,
            founder: founder.clone(),
            is_active: *is_active,
        })
    }

    /// Status column value: a project is "Active" until its funding
    /// target is reached, which the contract signals by clearing the
    /// active flag.
    pub fn status_str(&self) -> &'static str {
        if self.is_active {
            "Active"
        } else {
            "Funded"
        }
    }

    /// Whether the given viewer is offered the invest control: only
    /// active projects, and never the viewer's own.
    pub fn can_invest(&self, viewer: &str) -> bool {
        self.is_active && self.founder != viewer
    }
}

/// Render a project list the way the dashboard shows it.
pub fn projects_table(projects: &[Project], viewer: &str) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.set_titles(row![
        "ID",
        "Name",
        "Description",
        "Required",
        "Current",
        "Status",
        "Founder",
        "Invest?"
    ]);

    for project in projects {
        table.add_row(row![
            project.id,
            project.name,
            project.description,
            format!("{} {}", encode_base10(project.required_funding, FUND_BASE10_DECIMALS), FUND_TICKER),
            format!("{} {}", encode_base10(project.current_funding, FUND_BASE10_DECIMALS), FUND_TICKER),
            project.status_str(),
            project.founder,
            if project.can_invest(viewer) { "yes" } else { "-" },
        ]);
    }

    table
}

impl Fnd {
    /// Fetch and render the project list. With `mine_only`, restrict it
    /// to projects founded by the active account.
    pub async fn print_projects(&self, mine_only: bool) -> GatewayResult<()> {
        let viewer = self.default_address().unwrap_or_default();

        let mut projects = self.get_projects().await?;
        if mine_only {
            projects.retain(|p| p.founder == viewer);
        }

        if projects.is_empty() {
            println!("No projects available.");
            return Ok(())
        }

        println!("{}", projects_table(&projects, &viewer));
        Ok(())
    }

    /// Create a new project on the funding contract. Founder-only; the
    /// submission blocks until the receipt is confirmed.
    pub async fn create_project(
        &self,
        name: &str,
        description: &str,
        funding: &str,
    ) -> GatewayResult<()> {
        let session = self.connect().await?;
        if session.role() != Some(Role::Founder) {
            return Err(GatewayError::Client(
                "Only registered founders can create projects".to_string(),
            ))
        }

        let required_funding = parse_funding_amount(funding)?;

        let payload = json_map([
            ("name", json_str(name)),
            ("description", json_str(description)),
            ("required_funding", json_str(&required_funding.to_string())),
        ]);

        let txid = self.submit_call("projects.create", payload).await?;
        println!("Project creation transaction submitted: {txid}");

        if let Err(e) =
            self.insert_activity_record(&txid, "projects.create", None, Some(required_funding))
        {
            return Err(GatewayError::Client(format!(
                "[create_project] Inserting activity record failed: {e}"
            )))
        }
        self.confirm_and_record(&txid).await?;

        println!("Project \"{name}\" created successfully");
        Ok(())
    }

    /// Invest in an active project. The founder guard runs before any
    /// network submission; the contract enforces the same rule
    /// authoritatively. On confirmation the full project list is
    /// reloaded and rendered.
    pub async fn invest(&self, project_id: u64, amount: &str) -> GatewayResult<()> {
        let session = self.connect().await?;
        if session.role().is_none() {
            return Err(GatewayError::NotRegistered)
        }
        // Account is present for any resolved session
        let account = session.account().unwrap_or_default().to_string();

        let project = self.get_project(project_id).await?;
        if project.founder == account {
            return Err(GatewayError::SelfInvestment)
        }
        if !project.is_active {
            return Err(GatewayError::ProjectInactive)
        }

        let value = parse_funding_amount(amount)?;

        let payload = json_map([
            ("project_id", JsonValue::Number(project_id as f64)),
            ("value", json_str(&value.to_string())),
        ]);

        let txid = self.submit_call("projects.invest", payload).await?;
        println!("Investment transaction submitted: {txid}");

        if let Err(e) =
            self.insert_activity_record(&txid, "projects.invest", Some(project_id), Some(value))
        {
            return Err(GatewayError::Client(format!(
                "[invest] Inserting activity record failed: {e}"
            )))
        }
        self.confirm_and_record(&txid).await?;

        println!(
            "Invested {} {FUND_TICKER} in project \"{}\"",
            encode_base10(value, FUND_BASE10_DECIMALS),
            project.name
        );

        // Re-read the full list so the rendered state reflects the chain
        self.print_projects(false).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_projects() -> Vec<Project> {
        vec![
            Project {
                id: 0,
                name: "A".to_string(),
                description: "first".to_string(),
                required_funding: 10_0000_0000,
                current_funding: 3_0000_0000,
                founder: "0xAA".to_string(),
                is_active: true,
            },
            Project {
                id: 1,
                name: "B".to_string(),
                description: "second".to_string(),
                required_funding: 5_0000_0000,
                current_funding: 5_0000_0000,
                founder: "0xBB".to_string(),
                is_active: false,
            },
        ]
    }

    #[test]
    fn test_project_wire_parsing() {
        let reply: JsonValue = r#"{
            "id": 3,
            "name": "Solar farm",
            "description": "Panels on the roof",
            "required_funding": "1000000000",
            "current_funding": "250000000",
            "founder": "FndAddr",
            "is_active": true
        }"#
        .parse()
        .unwrap();

        let project = Project::from_value(&reply).unwrap();
        assert_eq!(project.id, 3);
        assert_eq!(project.required_funding, 1000000000);
        assert_eq!(project.current_funding, 250000000);
        assert!(project.is_active);

        let garbage: JsonValue = r#"{"id": 3, "name": "x"}"#.parse().unwrap();
        assert!(Project::from_value(&garbage).is_err());
    }

    #[test]
    fn test_status_and_invest_guard() {
        let projects = sample_projects();

        assert_eq!(projects[0].status_str(), "Active");
        assert_eq!(projects[1].status_str(), "Funded");

        // Founders never get the invest control on their own project
        assert!(!projects[0].can_invest("0xAA"));
        assert!(projects[0].can_invest("0xCC"));

        // Funded projects take no further investments from anyone
        assert!(!projects[1].can_invest("0xCC"));
        assert!(!projects[1].can_invest("0xBB"));
    }

    #[test]
    fn test_projects_table_rendering() {
        let projects = sample_projects();
        let table = projects_table(&projects, "0xCC");

        // One rendered row per listed project
        assert_eq!(table.len(), projects.len());

        let rendered = table.to_string();
        assert!(rendered.contains("Active"));
        assert!(rendered.contains("Funded"));
        // Base units render as decimal display values
        assert!(rendered.contains("10 FUND"));
        assert!(rendered.contains("3 FUND"));
        assert!(rendered.contains("5 FUND"));

        // The invest marker shows up only for project A
        let table = projects_table(&projects, "0xAA");
        let rendered = table.to_string();
        assert!(!rendered.contains("yes"));
    }
}
