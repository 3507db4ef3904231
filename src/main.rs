use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use regtrack::{
    AnthropicClient, AnthropicConfig, MarkdownFileRenderer, Pipeline, PipelineConfig,
    PipelineState, RetryConfig, RetryingClient, RunSummary, TavilyClient, TavilyConfig, normalize,
    read_run_input, write_state,
};

#[derive(Parser)]
#[command(name = "regtrack")]
#[command(author, version, about = "Regulatory compliance analysis pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a business and produce checklists, plans, risks and a report
    Run {
        /// Business description (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for the exported run state (JSON)
        #[arg(short, long)]
        output: PathBuf,

        /// Directory the rendered report is written to
        #[arg(long, default_value = "reports")]
        report_dir: PathBuf,

        /// Concurrent text-generation calls per stage
        #[arg(long, default_value = "4")]
        concurrency: usize,

        /// Extra attempts for responses that cannot be normalized
        #[arg(long, default_value = "1")]
        parse_retries: u32,

        /// Skip web search and classify from the model's knowledge only
        #[arg(long)]
        no_search: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Normalize a saved model response and print the records
    Normalize {
        /// File holding the raw response text
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            output,
            report_dir,
            concurrency,
            parse_retries,
            no_search,
            verbose,
        } => {
            setup_logging(verbose);
            let mut config = PipelineConfig::default();
            config.items.concurrency = concurrency;
            config.items.parse_retries = parse_retries;
            run_pipeline(input, output, report_dir, no_search, config).await
        }
        Commands::Normalize { input } => {
            setup_logging(false);
            normalize_response(input)
        }
    }
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

async fn run_pipeline(
    input: PathBuf,
    output: PathBuf,
    report_dir: PathBuf,
    no_search: bool,
    config: PipelineConfig,
) -> Result<()> {
    info!("Loading business description from {:?}", input);
    let run_input = read_run_input(&input).context("Failed to load run input")?;

    let anthropic_config =
        AnthropicConfig::from_env().context("Failed to configure text generation")?;
    info!("Using model {}", anthropic_config.model);
    let client =
        RetryingClient::new(AnthropicClient::new(anthropic_config), RetryConfig::default());

    let mut pipeline = Pipeline::new(Arc::new(client), config)
        .with_renderer(Arc::new(MarkdownFileRenderer::new(report_dir)));

    if no_search {
        info!("Search disabled");
    } else {
        match TavilyConfig::from_env() {
            Ok(search_config) => {
                pipeline = pipeline.with_search(Arc::new(TavilyClient::new(search_config)));
            }
            Err(e) => warn!("Search unavailable: {:#}", e),
        }
    }

    let initial =
        PipelineState::new(run_input.business_info).with_recipients(run_input.recipients);
    let state = pipeline.run(initial).await.context("Pipeline run failed")?;

    write_state(&state, &output).context("Failed to write run state")?;
    info!("Run state written to {:?}", output);

    println!("{}", RunSummary::from_state(&state));
    Ok(())
}

fn normalize_response(input: PathBuf) -> Result<()> {
    let text = std::fs::read_to_string(&input)
        .with_context(|| format!("Failed to read response file: {:?}", input))?;

    let records = normalize(&text);
    info!("Normalized {} records", records.len());
    println!(
        "{}",
        serde_json::to_string_pretty(&records).context("Failed to serialize records")?
    );
    Ok(())
}
