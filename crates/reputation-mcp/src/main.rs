mod config;
mod error;
mod http;
mod server;

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use reputation_common::lexicon::LexiconOracle;
use reputation_common::llm::{LlmClient, LlmOracle};
use reputation_common::webdriver::WebDriverLauncher;
use reputation_core::scorer::SentimentOracle;

use config::{Config, OracleKind};
use error::AppError;
use server::ReputationServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout is reserved for MCP JSON-RPC
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting reputation-mcp server");

    let config = Config::from_env()?;
    info!(
        webdriver = %config.webdriver.endpoint,
        source_url = %config.webdriver.source_url,
        headless = config.webdriver.headless,
        selector = config.selector.as_css(),
        max_scrolls = config.max_scroll_iterations,
        settle_ms = config.settle_delay.as_millis(),
        policy = %config.policy,
        oracle = ?config.oracle,
        "configuration loaded"
    );

    let launcher = Arc::new(WebDriverLauncher::new(config.webdriver.clone())?);
    let oracle = build_oracle(&config)?;
    let server = ReputationServer::new(config.pipeline(), launcher, oracle);

    if let Some(addr) = &config.http_listen_addr {
        return http::serve(server, addr).await;
    }

    if let Some(addr) = &config.mcp_tcp_listen_addr {
        let listener = TcpListener::bind(addr).await?;
        info!(listen_addr = %addr, "MCP server ready, serving on TCP");
        loop {
            let (stream, peer) = listener.accept().await?;
            let server = server.clone();
            tokio::spawn(async move {
                info!(peer = %peer, "MCP client connected");
                let service = server.serve(stream).await.inspect_err(|e| {
                    tracing::error!(error = %e, "MCP server error");
                })?;
                service.waiting().await?;
                info!(peer = %peer, "MCP client disconnected");
                Ok::<(), anyhow::Error>(())
            });
        }
    }

    info!("MCP server ready, serving on stdio");
    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!(error = %e, "MCP server error");
    })?;
    service.waiting().await?;
    info!("MCP server shut down");
    Ok(())
}

fn build_oracle(config: &Config) -> Result<Arc<dyn SentimentOracle>, AppError> {
    match (config.oracle, &config.llm) {
        (OracleKind::Llm, Some(llm)) => {
            info!(
                base_url = %llm.base_url,
                model = %llm.model,
                timeout_ms = llm.timeout.as_millis(),
                max_retries = llm.max_retries,
                "llm oracle configured"
            );
            Ok(Arc::new(LlmOracle::new(LlmClient::new(llm.clone())?)))
        }
        (OracleKind::Llm, None) => Err(AppError::Config(
            "llm oracle selected without a model".to_string(),
        )),
        (OracleKind::Lexicon, _) => Ok(Arc::new(LexiconOracle::new())),
    }
}
