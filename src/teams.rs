use std::path::Path;

use anyhow::{Context as _, Result as AnyhowResult};
use colored::Colorize;

use crate::gh_api::GhClient;
use crate::tabular;

pub async fn run(org: &str, token: String, output: &Path) -> AnyhowResult<()> {
    let gh = GhClient::new(token)?;

    println!("Fetching teams from '{}'...", org);
    let teams = gh
        .org_teams(org)
        .await
        .with_context(|| format!("Failed to list teams for organization {}", org))?;

    if teams.is_empty() {
        println!("No teams found.");
        return Ok(());
    }

    for team in &teams {
        println!("- {} (Slug: {})", team.name, team.slug.blue());
    }

    let rows: Vec<Vec<String>> = teams
        .iter()
        .map(|team| {
            vec![
                team.name.clone(),
                team.slug.clone(),
                team.description.clone().unwrap_or_else(|| "N/A".to_string()),
            ]
        })
        .collect();
    tabular::write_records(output, &["Team Name", "Slug", "Description"], &rows)?;

    println!("Saved {} teams to {}", rows.len(), output.display());
    Ok(())
}
