use anyhow::Result as AnyhowResult;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod aggregate;
mod audit;
mod cli;
mod collector;
mod gh_api;
mod labels;
mod protection;
mod tabular;
mod team_repos;
mod teams;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> AnyhowResult<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Teams { org, token, output } => teams::run(&org, token, &output).await,
        Commands::TeamRepos {
            org,
            token,
            input,
            output,
        } => team_repos::run(&org, token, &input, &output).await,
        Commands::CheckProtection {
            org,
            token,
            input,
            output,
        } => protection::check(&org, token, &input, &output).await,
        Commands::ApplyProtection {
            org,
            token,
            repos,
            protection,
            output,
        } => protection::apply(&org, token, &repos, &protection, &output).await,
        Commands::Labels {
            org,
            token,
            task_limit,
            exclude,
            output,
        } => labels::run(&org, token, task_limit, exclude, &output).await,
        Commands::Audit {
            org,
            token,
            days,
            task_limit,
        } => audit::run(&org, token, days, task_limit).await,
    }
}
