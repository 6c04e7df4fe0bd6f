use std::path::Path;

use anyhow::Result as AnyhowResult;
use colored::Colorize;

use crate::gh_api::GhClient;
use crate::tabular;

/// List every repository of every team named in the teams CSV. A team whose
/// fetch fails is skipped with a warning; the rest of the run continues.
pub async fn run(org: &str, token: String, input: &Path, output: &Path) -> AnyhowResult<()> {
    let gh = GhClient::new(token)?;

    let (header, records) = tabular::read_records(input)?;
    let slug_col = tabular::column_index(&header, "Slug")?;
    let slugs: Vec<String> = records
        .into_iter()
        .filter_map(|row| row.get(slug_col).cloned())
        .filter(|slug| !slug.is_empty())
        .collect();

    println!("Fetching repositories for {} teams...", slugs.len());

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut skipped = 0usize;
    for slug in &slugs {
        match gh.team_repos(org, slug).await {
            Ok(repos) => {
                for repo in repos {
                    rows.push(vec![
                        slug.clone(),
                        repo.name,
                        repo.default_branch.unwrap_or_else(|| "main".to_string()),
                    ]);
                }
            }
            Err(e) => {
                skipped += 1;
                eprintln!("Skipping team {}: {}", slug.red(), e);
            }
        }
    }

    if rows.is_empty() {
        println!("No repositories found for any team.");
        return Ok(());
    }

    tabular::write_records(
        output,
        &["Team Slug", "Repository", "Default Branch"],
        &rows,
    )?;
    println!(
        "Saved {} repositories to {} ({} teams skipped)",
        rows.len(),
        output.display(),
        skipped
    );
    Ok(())
}
