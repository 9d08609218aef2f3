//! Remote that is never reachable.
//!
//! Lets the store run purely local (`--offline`, tests with remote disabled).

use super::{RemoteClient, RemoteError, RemoteResult};
use crate::model::quote::{Quote, QuoteId};
use async_trait::async_trait;

#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineRemote;

const OFFLINE_MESSAGE: &str = "remote sync disabled";

#[async_trait]
impl RemoteClient for OfflineRemote {
    async fn fetch_quotes(&self, _limit: usize) -> RemoteResult<Vec<Quote>> {
        Err(RemoteError::Transport(OFFLINE_MESSAGE.to_string()))
    }

    async fn register_quote(&self, _text: &str, _category: &str) -> RemoteResult<QuoteId> {
        Err(RemoteError::Transport(OFFLINE_MESSAGE.to_string()))
    }
}
