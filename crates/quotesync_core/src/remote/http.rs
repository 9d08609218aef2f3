//! REST client for the posts endpoint.
//!
//! Wire mapping: a post `{id, title, body}` is the quote
//! `{id, text: title, category: body}`.

use super::{RemoteClient, RemoteError, RemoteResult};
use crate::config::SyncConfig;
use crate::model::quote::{Quote, QuoteId};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct PostPayload {
    id: QuoteId,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: String,
}

#[derive(Debug, Serialize)]
struct NewPost<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatedPost {
    id: QuoteId,
}

/// `RemoteClient` over HTTP using `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpRemoteClient {
    client: reqwest::Client,
    posts_url: String,
}

impl HttpRemoteClient {
    /// Builds a client for `config.endpoint` with the configured timeout.
    pub fn new(config: &SyncConfig) -> RemoteResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| RemoteError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            posts_url: format!("{}/posts", config.endpoint.trim_end_matches('/')),
        })
    }

    pub fn posts_url(&self) -> &str {
        &self.posts_url
    }
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn fetch_quotes(&self, limit: usize) -> RemoteResult<Vec<Quote>> {
        let response = self
            .client
            .get(&self.posts_url)
            .query(&[("_limit", limit)])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }

        let posts: Vec<PostPayload> = response
            .json()
            .await
            .map_err(|err| RemoteError::Decode(err.to_string()))?;
        debug!(
            "event=remote_fetch module=remote status=ok count={}",
            posts.len()
        );

        Ok(posts
            .into_iter()
            .take(limit)
            .map(|post| Quote::with_id(post.id, post.title, post.body))
            .collect())
    }

    async fn register_quote(&self, text: &str, category: &str) -> RemoteResult<QuoteId> {
        let response = self
            .client
            .post(&self.posts_url)
            .json(&NewPost {
                title: text,
                body: category,
            })
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }

        let created: CreatedPost = response
            .json()
            .await
            .map_err(|err| RemoteError::Decode(err.to_string()))?;
        Ok(created.id)
    }
}

fn transport_error(err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::Transport(format!("request timed out: {err}"))
    } else {
        RemoteError::Transport(err.to_string())
    }
}
