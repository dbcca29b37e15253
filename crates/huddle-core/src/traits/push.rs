// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push gateway trait.

use async_trait::async_trait;

use crate::error::HuddleError;

/// External push notification gateway.
///
/// A failure from the gateway must never fail the originating message or
/// read-receipt operation; callers log and continue.
#[async_trait]
pub trait PushGateway: Send + Sync {
    /// Deliver one notification payload to a set of device tokens.
    async fn send(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
        data: serde_json::Value,
    ) -> Result<(), HuddleError>;
}
