use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use tracing::info;

use reputation_common::api::{to_api_response, AnalyzeReputationParams, ReputationResponse};
use reputation_core::pipeline::{ReputationPipeline, RunReport};
use reputation_core::provider::SessionLauncher;
use reputation_core::scorer::SentimentOracle;
use reputation_core::subject::SubjectId;

use crate::error::AppError;

/// Shared handle to the pipeline and its collaborators. Cheap to clone; every clone runs
/// against the same launcher and oracle, but each run opens its own session.
#[derive(Clone)]
pub struct ReputationServer {
    pipeline: Arc<ReputationPipeline>,
    launcher: Arc<dyn SessionLauncher>,
    oracle: Arc<dyn SentimentOracle>,
    tool_router: ToolRouter<ReputationServer>,
}

impl ReputationServer {
    pub fn new(
        pipeline: ReputationPipeline,
        launcher: Arc<dyn SessionLauncher>,
        oracle: Arc<dyn SentimentOracle>,
    ) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            launcher,
            oracle,
            tool_router: Self::tool_router(),
        }
    }

    /// Validate `raw_subject` and run the pipeline for it.
    pub async fn analyze(&self, raw_subject: &str) -> Result<RunReport, AppError> {
        let subject = SubjectId::parse(raw_subject)?;
        info!(subject = %subject, oracle = self.oracle.name(), "analyzing reputation");
        let report = self
            .pipeline
            .run(self.launcher.as_ref(), self.oracle.as_ref(), &subject)
            .await?;
        Ok(report)
    }
}

#[tool_router]
impl ReputationServer {
    #[tool(description = "Collect the public reviews of a business from the review site, score each \
review's sentiment and return an overall reputation verdict (Good / Bad / Neutral) with the mean \
score, per-category counts and the score distribution. Takes tens of seconds: the listing page is \
loaded in a browser and scrolled until no more reviews appear.")]
    async fn analyze_reputation(
        &self,
        Parameters(params): Parameters<AnalyzeReputationParams>,
    ) -> Result<Json<ReputationResponse>, String> {
        let report = self
            .analyze(&params.subject)
            .await
            .map_err(|e| format!("analyze_reputation failed: {e}"))?;
        Ok(Json(to_api_response(
            &report,
            params.include_reviews.unwrap_or(false),
        )))
    }
}

#[tool_handler]
impl ServerHandler for ReputationServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "reputation-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Review reputation MCP server. Call analyze_reputation with a business name as \
it appears on the review site (for example \"amazon.com\"). Set include_reviews to get the \
review texts back alongside the scores."
                    .to_string(),
            ),
        }
    }
}
