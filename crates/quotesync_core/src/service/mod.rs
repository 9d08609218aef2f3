//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate storage, remote and sync capabilities into store operations.
//! - Keep front ends decoupled from storage and network details.

pub mod notification;
pub mod quote_store;
