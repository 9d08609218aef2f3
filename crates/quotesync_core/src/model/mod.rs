//! Domain model for the quote store.
//!
//! # Responsibility
//! - Define quote and conflict records used by core business logic.
//!
//! # Invariants
//! - No two quotes in one store share a non-null `QuoteId`.
//! - Conflict records are transient session state, never durable data.

pub mod conflict;
pub mod quote;
