// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Evalrun CLI
//!
//! Fetch enriched evaluation-run scenarios from the command line.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use evalrun_client::{
    fetch_scenario_steps_bulk, ClientConfig, EvalRunClient, FetchContext, ScenarioWorker,
    DEFAULT_API_URL, DEFAULT_BATCH_CONCURRENCY, DEFAULT_BATCH_SIZE,
};
use evalrun_core::{EnhancedVariant, EvaluatorDto, PreviewTestset, RunData, RunIndex};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "evalrun")]
#[command(about = "Evalrun - evaluation run scenario inspector", long_about = None)]
struct Cli {
    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,

    /// API base URL
    #[arg(long, env = "EVALRUN_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Project the run belongs to
    #[arg(long, env = "EVALRUN_PROJECT_ID", default_value = "")]
    project_id: String,

    /// Bearer token
    #[arg(long, env = "EVALRUN_JWT", hide_env_values = true)]
    jwt: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "EVALRUN_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and enrich scenario steps of a run
    Scenarios {
        /// Evaluation run ID
        #[arg(long)]
        run_id: String,

        /// Run definition (JSON with `steps` and `mappings`)
        #[arg(long)]
        run_data: PathBuf,

        /// Evaluators, testsets and variants (JSON)
        #[arg(long)]
        context: Option<PathBuf>,

        /// Scenarios per results query
        #[arg(long, env = "EVALRUN_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Batches in flight at once
        #[arg(long, env = "EVALRUN_BATCH_CONCURRENCY", default_value_t = DEFAULT_BATCH_CONCURRENCY)]
        batch_concurrency: usize,

        /// Route the fetch through a background worker
        #[arg(long)]
        through_worker: bool,

        /// Scenario IDs
        #[arg(required = true)]
        scenario_ids: Vec<String>,
    },

    /// Print the index derived from a run definition
    Index {
        /// Run definition (JSON with `steps` and `mappings`)
        #[arg(long)]
        run_data: PathBuf,
    },
}

/// Reference data loaded with `--context`.
#[derive(Debug, Default, Deserialize)]
struct ContextFile {
    #[serde(default)]
    evaluators: Vec<EvaluatorDto>,
    #[serde(default)]
    testsets: Vec<PreviewTestset>,
    #[serde(default)]
    variants: Vec<EnhancedVariant>,
}

fn load_run_index(path: &Path) -> Result<RunIndex> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read run data {:?}", path))?;
    let run = RunData::from_json_str(&raw)
        .with_context(|| format!("Invalid run data in {:?}", path))?;
    Ok(RunIndex::build(&run))
}

fn load_context_file(path: Option<&Path>) -> Result<ContextFile> {
    let Some(path) = path else {
        return Ok(ContextFile::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read context {:?}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid context in {:?}", path))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries JSON only
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Index { run_data } => {
            let index = load_run_index(&run_data)?;
            println!("{}", serde_json::to_string_pretty(&index)?);
        }
        Commands::Scenarios {
            run_id,
            run_data,
            context,
            batch_size,
            batch_concurrency,
            through_worker,
            scenario_ids,
        } => {
            let mut config = ClientConfig::new(cli.api_url, cli.project_id)
                .with_timeout(Duration::from_secs(cli.timeout_secs));
            if let Some(jwt) = cli.jwt {
                config = config.with_jwt(jwt);
            }
            let client = EvalRunClient::new(config).context("Failed to build HTTP client")?;

            let extra = load_context_file(context.as_deref())?;
            let fetch_context = FetchContext::new(run_id, load_run_index(&run_data)?)
                .with_evaluators(extra.evaluators)
                .with_testsets(extra.testsets)
                .with_variants(extra.variants)
                .with_batch_size(batch_size)
                .with_batch_concurrency(batch_concurrency);
            debug!(
                steps = fetch_context.run_index.steps.len(),
                evaluators = fetch_context.evaluators.len(),
                "loaded fetch context"
            );

            let scenarios = if through_worker {
                let handle = ScenarioWorker::spawn(client);
                handle
                    .fetch(scenario_ids, fetch_context)
                    .await
                    .context("Scenario worker fetch failed")?
                    .scenarios
            } else {
                fetch_scenario_steps_bulk(&client, &scenario_ids, &fetch_context)
                    .await
                    .context("Scenario fetch failed")?
            };

            info!("Fetched {} scenarios", scenarios.len());
            println!("{}", serde_json::to_string_pretty(&scenarios)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_scenarios() {
        let cli = Cli::try_parse_from([
            "evalrun",
            "--project-id",
            "p1",
            "scenarios",
            "--run-id",
            "run-1",
            "--run-data",
            "run.json",
            "--batch-size",
            "10",
            "0195c2a4-7f1b-7a8e-9d3c-00000000000a",
        ])
        .unwrap();

        match cli.command {
            Commands::Scenarios {
                batch_size,
                scenario_ids,
                through_worker,
                ..
            } => {
                assert_eq!(batch_size, 10);
                assert_eq!(scenario_ids.len(), 1);
                assert!(!through_worker);
            }
            Commands::Index { .. } => panic!("expected scenarios command"),
        }
    }

    #[test]
    fn test_context_file_defaults() {
        let context: ContextFile =
            serde_json::from_str(r#"{"evaluators": [{"id": "ev-1", "slug": "exact_match"}]}"#)
                .unwrap();
        assert_eq!(context.evaluators.len(), 1);
        assert!(context.testsets.is_empty());
        assert!(load_context_file(None).unwrap().variants.is_empty());
    }
}
