// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each accepts `&Database` and runs through the
//! single-writer connection.

pub mod messages;
pub mod receipts;
pub mod workflows;
