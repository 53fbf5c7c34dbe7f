use anyhow::Context;
use chrono::Local;
use clap::Parser;
use org_scraper::observability::LoggingConfig;
use org_scraper::{
    read_organizations, CredentialProvider, EnvCredentialProvider, FileCredentialProvider,
    FileSink, OutputLayout, RunContext, Runner, ScrapeErrorKind, ScraperConfig,
};
use std::sync::Arc;
use tracing::{info, warn};

mod cli;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("org-scraper error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    LoggingConfig::new()
        .with_level(cli.log_level())
        .with_format(cli.log_format)
        .init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    let operations = cli.operations();
    if operations.is_empty() {
        anyhow::bail!("no operation selected; pass --all or at least one operation flag (see --help)");
    }

    let credentials = match FileCredentialProvider::new(&cli.config).credentials().await {
        Ok(credentials) => credentials,
        Err(e) if e.kind() == ScrapeErrorKind::MissingCredentials => {
            warn!(path = %cli.config.display(), "No usable credential file, reading environment");
            EnvCredentialProvider::from_github_env()
                .credentials()
                .await
                .with_context(|| {
                    format!(
                        "no credentials in {} or GITHUB_USER/GITHUB_TOKEN",
                        cli.config.display()
                    )
                })?
        }
        Err(e) => return Err(e.into()),
    };

    let organizations = read_organizations(&cli.organizations)
        .with_context(|| format!("failed to read {}", cli.organizations.display()))?;
    info!(organizations = organizations.len(), "Organizations loaded");

    let mut builder = ScraperConfig::builder();
    if let Some(base_url) = &cli.base_url {
        builder = builder.base_url(base_url.clone());
    }
    if let Some(limit) = cli.max_concurrent_requests {
        builder = builder.max_concurrent_requests(limit);
    }
    let config = builder.build().context("invalid configuration")?;

    let context = RunContext::connect(&config, credentials, organizations, !cli.no_index_reuse)?;
    let layout = OutputLayout::timestamped(&cli.output, Local::now());
    let sink = FileSink::create(layout.clone())
        .with_context(|| format!("failed to create {}", layout.directory().display()))?;

    let report = Runner::new(context, Arc::new(sink)).run(&operations).await?;

    for failure in &report.failures {
        warn!(
            endpoint = %failure.endpoint,
            context = %failure.context,
            kind = %failure.kind,
            "{}",
            failure.message
        );
    }
    info!(
        directory = %layout.directory().display(),
        tables = report.tables_written,
        graphs = report.graphs_written,
        failures = report.failures.len(),
        requests = report.metrics.requests_total,
        "Scrape finished"
    );
    Ok(())
}
