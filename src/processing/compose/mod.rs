//! Map-reduce summary composition.
//!
//! Each non-empty cluster is summarized on its own (map), the cluster summaries are condensed
//! with the comprehensive template, and the comprehensive summary is condensed again with the
//! concise template (reduce). Any provider failure aborts the composition.

pub mod templates;

use crate::generation::{GenerationClient, GenerationRequest};
use futures_util::{StreamExt, TryStreamExt, stream};
use std::{fmt, sync::Arc};

use super::{
    clustering::ClusterAssignment,
    types::{PipelineError, TextChunk},
};
pub use templates::{COMPREHENSIVE_TEMPLATE, CONCISE_TEMPLATE, TEMPLATE_VERSION, cluster_instruction};

/// Composer stage issuing a generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryStage {
    /// Summary of a single cluster's chunks.
    PerCluster,
    /// Two-page summary built from the cluster summaries.
    Comprehensive,
    /// One-page summary built from the comprehensive summary.
    Concise,
}

impl fmt::Display for SummaryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PerCluster => "per-cluster",
            Self::Comprehensive => "comprehensive",
            Self::Concise => "concise",
        };
        f.write_str(name)
    }
}

/// Output of a full composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedSummaries {
    /// Summaries of the non-empty clusters, in cluster-id order.
    pub cluster_summaries: Vec<String>,
    /// Two-page summary.
    pub comprehensive: String,
    /// One-page summary.
    pub concise: String,
    /// Generation calls issued.
    pub generation_calls: usize,
}

/// Space-joined member texts for every non-empty cluster, in cluster-id order.
pub fn cluster_texts(chunks: &[TextChunk], assignment: &ClusterAssignment) -> Vec<(usize, String)> {
    (0..assignment.k())
        .filter_map(|cluster_id| {
            let members = assignment.members(cluster_id);
            if members.is_empty() {
                tracing::warn!(cluster_id, "Skipping empty cluster");
                return None;
            }
            let text = members
                .iter()
                .filter_map(|index| chunks.get(*index))
                .map(|chunk| chunk.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            Some((cluster_id, text))
        })
        .collect()
}

/// Drives the generation provider through the map and reduce passes.
pub struct SummaryComposer {
    client: Arc<dyn GenerationClient>,
    concurrency: usize,
}

impl SummaryComposer {
    /// Create a composer issuing at most `concurrency` per-cluster calls at once.
    pub fn new(client: Arc<dyn GenerationClient>, concurrency: usize) -> Self {
        Self {
            client,
            concurrency: concurrency.max(1),
        }
    }

    /// Summarize every non-empty cluster; results come back in cluster-id order.
    pub async fn summarize_clusters(
        &self,
        chunks: &[TextChunk],
        assignment: &ClusterAssignment,
    ) -> Result<Vec<String>, PipelineError> {
        let requests = cluster_texts(chunks, assignment);
        tracing::info!(
            clusters = requests.len(),
            concurrency = self.concurrency,
            "Summarizing clusters"
        );

        stream::iter(requests.into_iter().map(|(cluster_id, text)| {
            let client = Arc::clone(&self.client);
            async move {
                let request = GenerationRequest {
                    instruction: cluster_instruction(cluster_id),
                    text,
                };
                let summary = generate(client.as_ref(), SummaryStage::PerCluster, request).await?;
                tracing::debug!(cluster_id, chars = summary.len(), "Cluster summarized");
                Ok::<_, PipelineError>(summary)
            }
        }))
        .buffered(self.concurrency)
        .try_collect()
        .await
    }

    /// Condense the newline-joined cluster summaries with the comprehensive template.
    pub async fn comprehensive(&self, cluster_summaries: &[String]) -> Result<String, PipelineError> {
        let request = GenerationRequest {
            instruction: COMPREHENSIVE_TEMPLATE.to_string(),
            text: cluster_summaries.join("\n"),
        };
        generate(self.client.as_ref(), SummaryStage::Comprehensive, request).await
    }

    /// Condense the comprehensive summary with the concise template.
    pub async fn concise(&self, comprehensive: &str) -> Result<String, PipelineError> {
        let request = GenerationRequest {
            instruction: CONCISE_TEMPLATE.to_string(),
            text: comprehensive.to_string(),
        };
        generate(self.client.as_ref(), SummaryStage::Concise, request).await
    }

    /// Run the map pass followed by both reduce passes.
    pub async fn compose(
        &self,
        chunks: &[TextChunk],
        assignment: &ClusterAssignment,
    ) -> Result<ComposedSummaries, PipelineError> {
        let cluster_summaries = self.summarize_clusters(chunks, assignment).await?;
        let comprehensive = self.comprehensive(&cluster_summaries).await?;
        let concise = self.concise(&comprehensive).await?;
        let generation_calls = cluster_summaries.len() + 2;

        tracing::info!(
            generation_calls,
            template_version = TEMPLATE_VERSION,
            "Summaries composed"
        );
        Ok(ComposedSummaries {
            cluster_summaries,
            comprehensive,
            concise,
            generation_calls,
        })
    }
}

async fn generate(
    client: &dyn GenerationClient,
    stage: SummaryStage,
    request: GenerationRequest,
) -> Result<String, PipelineError> {
    client.generate(request).await.map_err(|source| {
        tracing::error!(%stage, error = %source, "Summary generation failed");
        PipelineError::SummaryGeneration { stage, source }
    })
}
