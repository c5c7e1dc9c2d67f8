//! HTTP client for the feed backend

use std::sync::Arc;

use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::{Value, json};

use crate::auth::{TokenSource, Tokens};
use crate::config::{BackendFlavor, Config};
use crate::error::{FeedError, FeedResult};
use crate::models::{FeedPage, ReactionKind};

use super::envelope::{feed_url, normalize_envelope};
use super::{FeedSource, NewPost, PageQuery, PostsApi, ReactionsApi};

/// Which tokens a call needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPolicy {
    /// Send what is available, proceed without
    Optional,
    /// The bearer access token is mandatory
    Bearer,
    /// At least one of the two tokens is mandatory
    Any,
}

/// Headers to attach for `tokens` under `policy`.
///
/// Fails with [`FeedError::AuthMissing`] when the policy cannot be
/// satisfied, before anything touches the network.
pub fn auth_headers(
    flavor: BackendFlavor,
    tokens: &Tokens,
    policy: AuthPolicy,
) -> FeedResult<Vec<(&'static str, String)>> {
    let access = tokens.access.as_deref().filter(|t| !t.is_empty());
    let wp = tokens
        .wp
        .as_deref()
        .filter(|t| !t.is_empty() && flavor.sends_wp_token());

    match policy {
        AuthPolicy::Bearer if access.is_none() => return Err(FeedError::AuthMissing),
        AuthPolicy::Any if access.is_none() && wp.is_none() => {
            return Err(FeedError::AuthMissing);
        }
        _ => {}
    }

    let mut headers = Vec::with_capacity(2);
    if let Some(wp) = wp {
        headers.push(("X-WP-Token", wp.to_string()));
    }
    if let Some(token) = access {
        headers.push(("Authorization", format!("Bearer {token}")));
    }
    Ok(headers)
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email_or_username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePostRequest<'a> {
    description: &'a str,
    media: &'a [String],
    post_type: &'a str,
    group: Option<&'a str>,
}

/// Feed backend client
#[derive(Clone)]
pub struct FeedClient {
    client: Client,
    config: Config,
    tokens: Arc<dyn TokenSource>,
}

impl FeedClient {
    /// Create a client; tokens are read from `tokens` before every call
    pub fn new(config: Config, tokens: Arc<dyn TokenSource>) -> FeedResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("feedkit/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            config,
            tokens,
        })
    }

    /// Configuration in use
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Attach auth headers for the current tokens
    fn authorize(&self, req: RequestBuilder, policy: AuthPolicy) -> FeedResult<RequestBuilder> {
        let tokens = self.tokens.tokens();
        let headers = auth_headers(self.config.backend, &tokens, policy)?;
        Ok(headers
            .into_iter()
            .fold(req, |req, (name, value)| req.header(name, value)))
    }

    /// Send a request and decode the JSON body (`null` when empty)
    async fn send(&self, req: RequestBuilder) -> FeedResult<Value> {
        let response = req.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(FeedError::Http {
                status: status.as_u16(),
                body,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    fn reaction_url(&self, reaction_id: Option<&str>) -> String {
        let base = self.config.endpoint(&self.config.reactions_path);
        match reaction_id {
            Some(id) => format!("{base}/{}", urlencoding::encode(id)),
            None => base,
        }
    }

    /// Sign in; returns the access token issued by the backend
    pub async fn login(&self, username: &str, password: &str) -> FeedResult<String> {
        let url = self.config.endpoint(&self.config.login_path);
        let request = LoginRequest {
            email_or_username: username.trim(),
            password,
        };

        let body = self.send(self.client.post(&url).json(&request)).await?;
        token_from_login(&body).ok_or_else(|| {
            FeedError::MalformedResponse("login response carries no token".to_string())
        })
    }
}

/// Token of a login response, at the top level or under `data`
fn token_from_login(body: &Value) -> Option<String> {
    [body.get("token"), body.get("data").and_then(|d| d.get("token"))]
        .into_iter()
        .flatten()
        .find_map(|t| t.as_str().filter(|t| !t.is_empty()))
        .map(str::to_string)
}

/// Optional `message` of a response body
fn message_of(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

impl FeedSource for FeedClient {
    async fn fetch_page(&self, query: &PageQuery) -> FeedResult<FeedPage> {
        let url = feed_url(&self.config, query);
        tracing::debug!("GET {url}");

        let req = self.authorize(self.client.get(&url), AuthPolicy::Optional)?;
        let body = self.send(req).await?;
        normalize_envelope(body)
    }
}

impl ReactionsApi for FeedClient {
    async fn create_reaction(&self, post_id: &str, kind: ReactionKind) -> FeedResult<()> {
        let req = self.authorize(self.client.post(self.reaction_url(None)), AuthPolicy::Bearer)?;
        let body = json!({ "like": kind.as_str(), "feedPostId": post_id });
        self.send(req.json(&body)).await?;
        Ok(())
    }

    async fn update_reaction(&self, reaction_id: &str, kind: ReactionKind) -> FeedResult<()> {
        let url = self.reaction_url(Some(reaction_id));
        let req = self.authorize(self.client.put(url), AuthPolicy::Bearer)?;
        self.send(req.json(&json!({ "like": kind.as_str() }))).await?;
        Ok(())
    }

    async fn delete_reaction(&self, reaction_id: &str) -> FeedResult<()> {
        let url = self.reaction_url(Some(reaction_id));
        let req = self.authorize(self.client.delete(url), AuthPolicy::Bearer)?;
        self.send(req).await?;
        Ok(())
    }
}

impl PostsApi for FeedClient {
    async fn create_post(&self, post: &NewPost) -> FeedResult<()> {
        let url = self.config.endpoint(&self.config.feed_path);
        let request = CreatePostRequest {
            description: &post.description,
            media: &post.media,
            post_type: post.post_type(),
            group: post.group.as_deref(),
        };

        let req = self.authorize(self.client.post(&url), AuthPolicy::Any)?;
        self.send(req.json(&request)).await?;
        Ok(())
    }

    async fn delete_post(&self, post_id: &str) -> FeedResult<Option<String>> {
        let url = format!(
            "{}/{}",
            self.config.endpoint(&self.config.feed_path),
            urlencoding::encode(post_id)
        );

        let req = self.authorize(self.client.delete(&url), AuthPolicy::Any)?;
        let body = self.send(req).await?;
        Ok(message_of(&body))
    }
}
