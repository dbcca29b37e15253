// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding / completion / vector-search capability trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::HuddleError;

/// Options for a completion request.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    /// Model identifier to run against. `None` uses the provider default.
    pub model: Option<String>,
    /// Maximum tokens to generate. `None` uses the provider default.
    pub max_tokens: Option<u32>,
    /// Sampling temperature. `None` uses the provider default.
    pub temperature: Option<f32>,
}

/// An item to upsert into the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorItem {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: serde_json::Value,
}

/// A vector-search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    pub metadata: serde_json::Value,
}

/// External AI capability: completions, embeddings, and vector search.
///
/// Failures are transient-collaborator failures per the error taxonomy:
/// callers log and degrade, they never propagate these as fatal.
#[async_trait]
pub trait AiCapability: Send + Sync {
    /// Run a completion and return the raw model text.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: CompletionOptions,
    ) -> Result<String, HuddleError>;

    /// Embed a text into a vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, HuddleError>;

    /// Upsert items into the vector index.
    async fn vector_upsert(&self, items: Vec<VectorItem>) -> Result<(), HuddleError>;

    /// Query the vector index for the `top_k` nearest items.
    async fn vector_query(
        &self,
        vector: Vec<f32>,
        top_k: usize,
    ) -> Result<Vec<VectorMatch>, HuddleError>;
}
