// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock AI capability for deterministic testing.
//!
//! Completions are popped from a FIFO queue; a queued `"ERROR"` marker makes
//! that call fail, which is how tests exercise the retry path. Embeddings are
//! deterministic hashes of the input and the vector store is an in-memory
//! list scored by dot product.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use huddle_core::HuddleError;
use huddle_core::traits::ai::{AiCapability, CompletionOptions, VectorItem, VectorMatch};

/// Queued completion that makes the call return an error instead.
pub const FAIL_MARKER: &str = "ERROR";

/// A mock AI capability with scripted responses.
pub struct MockAi {
    responses: Arc<Mutex<VecDeque<String>>>,
    vectors: Arc<Mutex<Vec<VectorItem>>>,
    fail_embeddings: AtomicBool,
}

impl MockAi {
    /// New mock with an empty response queue.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            vectors: Arc::new(Mutex::new(Vec::new())),
            fail_embeddings: AtomicBool::new(false),
        }
    }

    /// New mock pre-loaded with the given completions.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            vectors: Arc::new(Mutex::new(Vec::new())),
            fail_embeddings: AtomicBool::new(false),
        }
    }

    /// Queue one more completion.
    pub async fn add_response(&self, text: impl Into<String>) {
        self.responses.lock().await.push_back(text.into());
    }

    /// Make every subsequent embed call fail.
    pub fn fail_embeddings(&self) {
        self.fail_embeddings.store(true, Ordering::SeqCst);
    }

    /// Everything upserted into the vector store so far.
    pub async fn stored_vectors(&self) -> Vec<VectorItem> {
        self.vectors.lock().await.clone()
    }

    async fn next_response(&self) -> String {
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| "mock response".to_string())
    }
}

impl Default for MockAi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AiCapability for MockAi {
    async fn complete(
        &self,
        _system: &str,
        _user: &str,
        _options: CompletionOptions,
    ) -> Result<String, HuddleError> {
        let text = self.next_response().await;
        if text == FAIL_MARKER {
            return Err(HuddleError::ai("scripted completion failure"));
        }
        Ok(text)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, HuddleError> {
        if self.fail_embeddings.load(Ordering::SeqCst) {
            return Err(HuddleError::ai("scripted embedding failure"));
        }
        // Deterministic pseudo-embedding from byte content.
        let mut vector = vec![0.0f32; 8];
        for (i, byte) in text.bytes().enumerate() {
            vector[i % 8] += f32::from(byte) / 255.0;
        }
        Ok(vector)
    }

    async fn vector_upsert(&self, items: Vec<VectorItem>) -> Result<(), HuddleError> {
        let mut store = self.vectors.lock().await;
        for item in items {
            store.retain(|existing| existing.id != item.id);
            store.push(item);
        }
        Ok(())
    }

    async fn vector_query(
        &self,
        vector: Vec<f32>,
        top_k: usize,
    ) -> Result<Vec<VectorMatch>, HuddleError> {
        let store = self.vectors.lock().await;
        let mut scored: Vec<VectorMatch> = store
            .iter()
            .map(|item| VectorMatch {
                id: item.id.clone(),
                score: dot(&vector, &item.vector),
                metadata: item.metadata.clone(),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
