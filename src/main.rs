// Browser code agent: runs one task against a fresh Chrome page.
//
// Usage: browser-code-agent "<task>"
// The oracle key is read from the variable named by `oracle.api_key_env`.

use anyhow::{Context, Result};
use browser_code_agent::{
    Agent, AgentOutcome, BrowserWrapper, CdpPageDriver, CompletionSchema, Config, OpenAiOracle,
    create_blank_page, launch_browser, load_yaml_config,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_TASK: &str = "Navigate to https://books.toscrape.com. Scrape the first 3 products \
     you see. Return them in the specified JSON format.";

/// One item scraped from a listing page
#[allow(dead_code)]
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct Product {
    /// Name of the product
    name: String,
    /// Price of the product
    price: String,
    /// Link to the product page
    url: String,
}

#[allow(dead_code)]
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct ScrapeResult {
    products: Vec<Product>,
    total_found: u32,
}

fn load_config() -> Result<Config> {
    let mut config = load_yaml_config().context("Failed to load config.yaml")?;
    if let Ok(base) = std::env::var("OPENAI_API_BASE") {
        config.oracle.api_base = base;
    }
    if let Ok(model) = std::env::var("OPENAI_MODEL") {
        config.oracle.model = model;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let task = std::env::args()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ");
    let task = if task.trim().is_empty() {
        DEFAULT_TASK.to_string()
    } else {
        task
    };

    let config = load_config()?;
    let oracle = OpenAiOracle::from_env(&config.oracle).context("Failed to set up oracle")?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping agent");
            interrupt.cancel();
        }
    });

    let browser = launch_browser(&config.browser).await?;
    let outcome = run_task(&task, &browser, Arc::new(oracle), &config, cancel).await;
    browser.shutdown().await;

    match outcome? {
        AgentOutcome::Completed { result, steps } => {
            info!("Finished in {} steps", steps);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        AgentOutcome::BudgetExhausted { steps } => {
            error!("No result after {} steps", steps);
            println!("No result returned.");
        }
    }
    Ok(())
}

async fn run_task(
    task: &str,
    browser: &BrowserWrapper,
    oracle: Arc<OpenAiOracle>,
    config: &Config,
    cancel: CancellationToken,
) -> Result<AgentOutcome> {
    let page = create_blank_page(browser).await?;
    let driver = CdpPageDriver::attach(page)
        .await
        .context("Failed to attach to page")?;

    info!("Task: {}", task);
    let mut agent = Agent::new(
        task,
        CompletionSchema::from_type::<ScrapeResult>(),
        Arc::new(driver),
        oracle,
        config,
    )?;

    let run = agent.run(cancel).await?;
    info!(run_id = %run.run_id, "Agent run finished");
    Ok(run.outcome)
}
