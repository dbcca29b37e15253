// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push gateway mock that records every send.

use async_trait::async_trait;
use tokio::sync::Mutex;

use huddle_core::HuddleError;
use huddle_core::traits::push::PushGateway;

/// One recorded push.
#[derive(Debug, Clone)]
pub struct SentPush {
    pub tokens: Vec<String>,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

impl SentPush {
    /// A push with empty title and body is a silent, data-only push.
    pub fn is_silent(&self) -> bool {
        self.title.is_empty() && self.body.is_empty()
    }
}

/// Records every [`PushGateway::send`] for later assertions.
#[derive(Default)]
pub struct MockPush {
    sent: Mutex<Vec<SentPush>>,
    fail: std::sync::atomic::AtomicBool,
}

impl MockPush {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent send fail.
    pub fn fail_sends(&self) {
        self.fail.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    /// All pushes recorded so far, oldest first.
    pub async fn sent(&self) -> Vec<SentPush> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl PushGateway for MockPush {
    async fn send(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
        data: serde_json::Value,
    ) -> Result<(), HuddleError> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(HuddleError::Push {
                message: "scripted gateway failure".to_string(),
            });
        }
        self.sent.lock().await.push(SentPush {
            tokens: tokens.to_vec(),
            title: title.to_string(),
            body: body.to_string(),
            data,
        });
        Ok(())
    }
}
