// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Huddle chat server.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed CRUD operations for
//! messages, read receipts, and agent workflow state.
//!
//! All writes are serialized through `tokio-rusqlite`'s single background
//! thread: the [`Database`] struct IS the single writer. Query modules accept
//! `&Database` and call through `connection().call()`. Do NOT create
//! additional `Connection` instances for writes.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::Database;
pub use models::*;
