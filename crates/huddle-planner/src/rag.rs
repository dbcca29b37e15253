// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retrieval-augmented answering over a conversation's message history.
//!
//! Embeds the query, pulls the top-K most similar indexed messages, and
//! feeds them as context to a completion. Retrieval is best-effort: when the
//! embedding or vector search fails the answer degrades to a plain
//! completion instead of erroring.

use std::sync::Arc;

use huddle_config::model::AgentConfig;
use huddle_core::HuddleError;
use huddle_core::traits::ai::{AiCapability, CompletionOptions};
use huddle_core::types::ConversationId;
use tracing::warn;

const ANSWER_SYSTEM: &str = "You answer questions about a group chat. Ground your answer in \
    the provided conversation excerpts when present.";

const TOP_K: usize = 5;

/// Answer `query` about the conversation using retrieval-augmented
/// completion.
pub async fn answer_query(
    ai: &Arc<dyn AiCapability>,
    conversation_id: &ConversationId,
    query: &str,
    config: &AgentConfig,
) -> Result<String, HuddleError> {
    let context = retrieve_context(ai, conversation_id, query).await;

    let prompt = if context.is_empty() {
        query.to_string()
    } else {
        format!("Context:\n{context}\n\nQuestion: {query}")
    };

    ai.complete(
        ANSWER_SYSTEM,
        &prompt,
        CompletionOptions {
            model: Some(config.model.clone()),
            max_tokens: Some(config.max_tokens),
            temperature: Some(0.3),
        },
    )
    .await
}

/// Top-K similar message snippets for the query, or empty on any retrieval
/// failure.
async fn retrieve_context(
    ai: &Arc<dyn AiCapability>,
    conversation_id: &ConversationId,
    query: &str,
) -> String {
    let vector = match ai.embed(query).await {
        Ok(vector) => vector,
        Err(e) => {
            warn!(error = %e, "query embedding failed, answering without retrieval");
            return String::new();
        }
    };
    let matches = match ai.vector_query(vector, TOP_K).await {
        Ok(matches) => matches,
        Err(e) => {
            warn!(error = %e, "vector search failed, answering without retrieval");
            return String::new();
        }
    };

    matches
        .iter()
        .filter(|hit| {
            hit.metadata
                .get("conversationId")
                .and_then(|value| value.as_str())
                .is_none_or(|conv| conv == conversation_id.0)
        })
        .filter_map(|hit| {
            let content = hit.metadata.get("content")?.as_str()?;
            let sender = hit
                .metadata
                .get("senderId")
                .and_then(|value| value.as_str())
                .unwrap_or("unknown");
            Some(format!("{sender}: {content}"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use huddle_core::traits::ai::{VectorItem, VectorMatch};

    struct RecallAi {
        fail_embed: bool,
    }

    #[async_trait]
    impl AiCapability for RecallAi {
        async fn complete(
            &self,
            _system: &str,
            user: &str,
            options: CompletionOptions,
        ) -> Result<String, HuddleError> {
            match options.model {
                Some(model) if model != AgentConfig::default().model => {
                    Ok(format!("answer to: {user} (model {model})"))
                }
                _ => Ok(format!("answer to: {user}")),
            }
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, HuddleError> {
            if self.fail_embed {
                return Err(HuddleError::ai("embedding down"));
            }
            Ok(vec![0.1; 4])
        }

        async fn vector_upsert(&self, _items: Vec<VectorItem>) -> Result<(), HuddleError> {
            Ok(())
        }

        async fn vector_query(
            &self,
            _vector: Vec<f32>,
            _top_k: usize,
        ) -> Result<Vec<VectorMatch>, HuddleError> {
            Ok(vec![VectorMatch {
                id: "m1".into(),
                score: 0.9,
                metadata: serde_json::json!({
                    "conversationId": "conv-1",
                    "senderId": "bob",
                    "content": "let's meet at noon",
                }),
            }])
        }
    }

    #[tokio::test]
    async fn answer_includes_retrieved_context() {
        let ai: Arc<dyn AiCapability> = Arc::new(RecallAi { fail_embed: false });
        let answer = answer_query(
            &ai,
            &ConversationId("conv-1".into()),
            "when do we meet?",
            &AgentConfig::default(),
        )
        .await
        .unwrap();
        assert!(answer.contains("bob: let's meet at noon"));
        assert!(answer.contains("when do we meet?"));
    }

    #[tokio::test]
    async fn embedding_failure_degrades_to_plain_completion() {
        let ai: Arc<dyn AiCapability> = Arc::new(RecallAi { fail_embed: true });
        let answer = answer_query(
            &ai,
            &ConversationId("conv-1".into()),
            "when do we meet?",
            &AgentConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(answer, "answer to: when do we meet?");
    }

    #[tokio::test]
    async fn completion_runs_against_the_configured_model() {
        let ai: Arc<dyn AiCapability> = Arc::new(RecallAi { fail_embed: true });
        let config = AgentConfig {
            model: "planner-large".into(),
            ..AgentConfig::default()
        };
        let answer = answer_query(&ai, &ConversationId("conv-1".into()), "when?", &config)
            .await
            .unwrap();
        assert!(answer.contains("model planner-large"));
    }
}
