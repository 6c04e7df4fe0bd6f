//! Branch protection and ruleset auditing.
//!
//! `check` records the current state of each listed repository; `apply`
//! pushes the standard protection rule to repositories where neither branch
//! protection nor rulesets are enabled yet.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context as _, Result as AnyhowResult};
use colored::Colorize;

use crate::gh_api::GhClient;
use crate::tabular;

struct RepoRow {
    team_slug: String,
    repo: String,
    branch: String,
}

fn read_repo_rows(input: &Path) -> AnyhowResult<Vec<RepoRow>> {
    let (header, records) = tabular::read_records(input)?;
    let slug_col = tabular::column_index(&header, "Team Slug")?;
    let repo_col = tabular::column_index(&header, "Repository")?;
    let branch_col = tabular::column_index(&header, "Default Branch")?;

    let mut rows = Vec::new();
    for record in records {
        let field = |col: usize| record.get(col).cloned().unwrap_or_default();
        let repo = field(repo_col);
        if repo.is_empty() {
            continue;
        }
        rows.push(RepoRow {
            team_slug: field(slug_col),
            repo,
            branch: field(branch_col),
        });
    }
    Ok(rows)
}

fn flag(value: bool) -> String {
    if value { "TRUE" } else { "FALSE" }.to_string()
}

pub async fn check(org: &str, token: String, input: &Path, output: &Path) -> AnyhowResult<()> {
    let gh = GhClient::new(token)?;
    let repos = read_repo_rows(input)?;
    println!("Checking protection status for {} repositories...", repos.len());

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut skipped = 0usize;
    for row in &repos {
        let full_name = format!("{}/{}", org, row.repo);
        let protected = match gh.branch_protected(&full_name, &row.branch).await {
            Ok(p) => p,
            Err(e) => {
                skipped += 1;
                eprintln!("Skipping {}: {}", row.repo.red(), e);
                continue;
            }
        };
        // Rulesets are only worth querying when classic protection is off;
        // the status report treats them as alternatives.
        let rulesets = if protected {
            false
        } else {
            match gh.has_rulesets(&full_name).await {
                Ok(r) => r,
                Err(e) => {
                    skipped += 1;
                    eprintln!("Skipping {}: {}", row.repo.red(), e);
                    continue;
                }
            }
        };
        rows.push(vec![
            row.team_slug.clone(),
            row.repo.clone(),
            row.branch.clone(),
            flag(protected),
            flag(rulesets),
        ]);
    }

    if rows.is_empty() {
        println!("No results to write.");
        return Ok(());
    }

    tabular::write_records(
        output,
        &[
            "Team Slug",
            "Repository",
            "Default Branch",
            "Branch Protection",
            "Rulesets Enabled",
        ],
        &rows,
    )?;
    println!(
        "Saved {} results to {} ({} repositories skipped)",
        rows.len(),
        output.display(),
        skipped
    );
    Ok(())
}

fn read_protection_status(path: &Path) -> AnyhowResult<HashMap<String, (bool, bool)>> {
    let (header, records) = tabular::read_records(path)?;
    let repo_col = tabular::column_index(&header, "Repository")?;
    let bp_col = tabular::column_index(&header, "Branch Protection")?;
    let rs_col = tabular::column_index(&header, "Rulesets Enabled")?;

    let truthy = |record: &[String], col: usize| {
        record
            .get(col)
            .map(|v| v.eq_ignore_ascii_case("TRUE"))
            .unwrap_or(false)
    };

    let mut status = HashMap::new();
    for record in records {
        if let Some(repo) = record.get(repo_col) {
            status.insert(repo.clone(), (truthy(&record, bp_col), truthy(&record, rs_col)));
        }
    }
    Ok(status)
}

pub async fn apply(
    org: &str,
    token: String,
    repos_file: &Path,
    protection_file: &Path,
    output: &Path,
) -> AnyhowResult<()> {
    let gh = GhClient::new(token)?;
    let repos = read_repo_rows(repos_file)?;
    let status_by_repo = read_protection_status(protection_file)
        .with_context(|| "Failed to read protection status input")?;

    let mut rows: Vec<Vec<String>> = Vec::new();
    for row in &repos {
        let (protected, rulesets) = status_by_repo
            .get(&row.repo)
            .copied()
            .unwrap_or((false, false));

        // Protection wins the tie-break: an existing classic rule means we
        // never touch the repo, whatever the ruleset state.
        let status = match (protected, rulesets) {
            (true, false) => "Branch protection already enabled".to_string(),
            (false, true) => "Rulesets already enabled".to_string(),
            (true, true) => "Branch protection & rulesets are enabled".to_string(),
            (false, false) => {
                let full_name = format!("{}/{}", org, row.repo);
                match gh.apply_branch_protection(&full_name, &row.branch).await {
                    Ok(()) => {
                        println!("{}/{} - protection applied", row.repo.green(), row.branch);
                        "Branch protection enabled via API".to_string()
                    }
                    Err(e) => {
                        eprintln!("{}/{} - {}", row.repo.red(), row.branch, e);
                        "Failed to enable branch protection".to_string()
                    }
                }
            }
        };
        rows.push(vec![
            row.team_slug.clone(),
            row.repo.clone(),
            row.branch.clone(),
            status,
        ]);
    }

    tabular::write_records(
        output,
        &["Team Slug", "Repository", "Default Branch", "Status"],
        &rows,
    )?;
    println!("Saved {} results to {}", rows.len(), output.display());
    Ok(())
}
