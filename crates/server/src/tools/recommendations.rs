//! recommendations tool implementation.

use linkmeta_core::{Error, Recommendation};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Output from the recommendations tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RecommendationsOutput {
    /// Recommended URLs; empty while a refresh is pending.
    pub urls: Vec<Recommendation>,
}

/// Implementation of the recommendations tool.
pub async fn recommendations_impl(state: &AppState) -> Result<CallToolResult, McpError> {
    let urls = state.recommendations()?.get_or_schedule().await?;

    let output = RecommendationsOutput { urls };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize recommendations: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubProvider, StubSource, config, state_with};
    use linkmeta_core::{ProviderKind, RawRecommendation};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_schedules_then_serves() {
        let state = state_with(StubProvider::new(ProviderKind::Mozilla, Vec::new()))
            .await
            .with_recommendations(
                &config(),
                Arc::new(StubSource(vec![RawRecommendation { url: "https://example.com/r".into(), published_at: Some(10) }])),
            );

        let result = recommendations_impl(&state).await.unwrap();
        let text = result.content[0].as_text().unwrap().text.clone();
        let first: RecommendationsOutput = serde_json::from_str(&text).unwrap();
        assert!(first.urls.is_empty());
        assert_eq!(state.db.count_jobs().await.unwrap(), 1);

        state.recommendations().unwrap().refresh().await.unwrap();

        let result = recommendations_impl(&state).await.unwrap();
        let text = result.content[0].as_text().unwrap().text.clone();
        let second: RecommendationsOutput = serde_json::from_str(&text).unwrap();
        assert_eq!(second.urls, vec![Recommendation { url: "https://example.com/r".into(), timestamp: 10_000 }]);
    }
}
