use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "gh-org-audit",
    about = "Audit and configure GitHub organization settings",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all teams in the organization
    Teams {
        /// GitHub organization name
        #[arg(short, long)]
        org: String,

        /// GitHub personal access token
        #[arg(short, long, env = "GITHUB_TOKEN", required = true)]
        token: String,

        /// Output CSV file
        #[arg(long, default_value = "get_list_teams.csv")]
        output: PathBuf,
    },
    /// List the repositories and default branches of each team
    TeamRepos {
        /// GitHub organization name
        #[arg(short, long)]
        org: String,

        /// GitHub personal access token
        #[arg(short, long, env = "GITHUB_TOKEN", required = true)]
        token: String,

        /// Teams CSV produced by the `teams` subcommand
        #[arg(long, default_value = "get_list_teams.csv")]
        input: PathBuf,

        /// Output CSV file
        #[arg(long, default_value = "team_repos.csv")]
        output: PathBuf,
    },
    /// Check branch protection and ruleset status for each listed repository
    CheckProtection {
        /// GitHub organization name
        #[arg(short, long)]
        org: String,

        /// GitHub personal access token
        #[arg(short, long, env = "GITHUB_TOKEN", required = true)]
        token: String,

        /// Repository CSV produced by the `team-repos` subcommand
        #[arg(long, default_value = "team_repos.csv")]
        input: PathBuf,

        /// Output CSV file
        #[arg(long, default_value = "repo_protection_results.csv")]
        output: PathBuf,
    },
    /// Apply the standard branch protection rule where nothing is enabled yet
    ApplyProtection {
        /// GitHub organization name
        #[arg(short, long)]
        org: String,

        /// GitHub personal access token
        #[arg(short, long, env = "GITHUB_TOKEN", required = true)]
        token: String,

        /// Repository CSV produced by the `team-repos` subcommand
        #[arg(long, default_value = "team_repos.csv")]
        repos: PathBuf,

        /// Protection status CSV produced by the `check-protection` subcommand
        #[arg(long, default_value = "repo_protection_results.csv")]
        protection: PathBuf,

        /// Output CSV file
        #[arg(long, default_value = "final_repo_status.csv")]
        output: PathBuf,
    },
    /// Collect the unique label names used across all org repositories
    Labels {
        /// GitHub organization name
        #[arg(short, long)]
        org: String,

        /// GitHub personal access token
        #[arg(short, long, env = "GITHUB_TOKEN", required = true)]
        token: String,

        /// Limit of concurrent label fetches
        #[arg(short = 'l', long, default_value_t = 20)]
        task_limit: usize,

        /// Repos to exclude (globs supported); specify multiple times for multiple repos
        #[arg(short, long, num_args = 0..)]
        exclude: Vec<String>,

        /// Output CSV file
        #[arg(long, default_value = "org_unique_labels.csv")]
        output: PathBuf,
    },
    /// Report repositories created in the last N days with security metadata
    Audit {
        /// GitHub organization name
        #[arg(short, long)]
        org: String,

        /// GitHub personal access token
        #[arg(short, long, env = "GITHUB_TOKEN", required = true)]
        token: String,

        /// Look-back window in days
        #[arg(short, long, default_value_t = 30)]
        days: i64,

        /// Limit of concurrent metadata fetches
        #[arg(short = 'l', long, default_value_t = 5)]
        task_limit: usize,
    },
}
