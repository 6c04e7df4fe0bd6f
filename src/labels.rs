use std::path::Path;

use anyhow::{Context as _, Result as AnyhowResult};
use colored::Colorize;
use glob::Pattern;

use crate::aggregate;
use crate::collector::FetchError;
use crate::gh_api::GhClient;
use crate::tabular;

/// Collect the deduplicated set of label names across all org repositories,
/// fetching per-repo label listings through a bounded worker pool.
pub async fn run(
    org: &str,
    token: String,
    task_limit: usize,
    exclude: Vec<String>,
    output: &Path,
) -> AnyhowResult<()> {
    let exclude = exclude
        .iter()
        .filter(|pattern| !pattern.is_empty())
        .map(|pattern| {
            Pattern::new(pattern).with_context(|| format!("Invalid exclude pattern: {}", pattern))
        })
        .collect::<AnyhowResult<Vec<Pattern>>>()?;

    let gh = GhClient::new(token)?;

    println!("Fetching all repositories from org '{}'...", org);
    let repos = gh
        .org_repos(org)
        .await
        .with_context(|| format!("Failed to list repositories for organization {}", org))?;

    let seeds: Vec<String> = repos
        .into_iter()
        .map(|repo| repo.full_name)
        .filter(|full_name| !exclude.iter().any(|pattern| pattern.matches(full_name)))
        .collect();
    println!("Total repositories found: {}", seeds.len());

    if seeds.is_empty() {
        println!("No repositories to scan after applying exclude patterns.");
        return Ok(());
    }

    println!("Fetching labels with {} parallel tasks...", task_limit);
    let gh = &gh;
    let report = aggregate::aggregate(seeds, task_limit, |full_name: String| async move {
        let labels = gh.repo_labels(&full_name).await?;
        Ok::<_, FetchError>(
            labels
                .into_iter()
                .map(|label| label.name.trim().to_string())
                .collect::<Vec<String>>(),
        )
    })
    .await;

    for (full_name, e) in &report.failures {
        eprintln!("Failed to fetch labels for {}: {}", full_name.red(), e);
    }
    println!(
        "Collected {} unique labels from {} repositories ({} failed)",
        report.values.len(),
        report.succeeded,
        report.failures.len()
    );

    let rows: Vec<Vec<String>> = report.values.into_iter().map(|label| vec![label]).collect();
    tabular::write_records(output, &["Label Name"], &rows)?;
    println!("Unique labels written to {}", output.display());
    Ok(())
}
