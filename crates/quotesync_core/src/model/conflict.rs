//! Conflict records produced by sync reconciliation.

use crate::model::quote::{Quote, QuoteId};
use serde::{Deserialize, Serialize};

/// Divergence between a local quote and a server quote sharing one id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRecord {
    /// Local version as it was before the server overwrite.
    pub local: Quote,
    /// Server version that was applied.
    pub server: Quote,
}

impl ConflictRecord {
    pub fn new(local: Quote, server: Quote) -> Self {
        Self { local, server }
    }

    /// Shared remote id, taken from the server side.
    pub fn id(&self) -> Option<QuoteId> {
        self.server.id
    }
}
