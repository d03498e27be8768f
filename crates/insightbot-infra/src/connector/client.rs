//! Bot Connector REST client.
//!
//! Replies are POSTed to
//! `{serviceUrl}/v3/conversations/{conversationId}/activities/{replyToId}`.
//! With app credentials a bearer token is obtained through the
//! client-credentials grant and cached until shortly before expiry. Without
//! credentials (local emulator) replies go out unauthenticated.
//!
//! An authenticated client only talks to hosts on its allowlist: the Bot
//! Framework channel domains plus any configured extras. Replies to any other
//! `serviceUrl` are refused before a token is fetched or a request is made.

use std::time::Duration;

use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};

use insightbot_types::activity::Activity;
use insightbot_types::config::BotSettings;
use insightbot_types::error::ConnectorError;

use crate::azure::{TokenCache, TokenResponse};

const LOGIN_AUTHORITY: &str = "https://login.microsoftonline.com";
const DEFAULT_TENANT: &str = "botframework.com";
const CONNECTOR_SCOPE: &str = "https://api.botframework.com/.default";

/// Domains (and their subdomains) that Bot Framework channels reply through.
const CHANNEL_DOMAINS: [&str; 3] = ["botframework.com", "botframework.us", "trafficmanager.net"];

struct AppCredentials {
    app_id: String,
    app_password: SecretString,
    token_url: String,
}

/// Sends activities back to the channel that delivered the inbound one.
///
/// Does NOT derive Debug: the struct holds the app password.
pub struct BotConnectorClient {
    client: reqwest::Client,
    credentials: Option<AppCredentials>,
    tokens: TokenCache,
    trusted_hosts: Vec<String>,
}

impl BotConnectorClient {
    /// Build from resolved settings. An empty app id disables authentication.
    pub fn from_settings(settings: &BotSettings, timeout: Duration) -> Result<Self, ConnectorError> {
        Self::new(
            &settings.app_id,
            SecretString::from(settings.app_password.expose().to_string()),
            &settings.app_tenant_id,
            timeout,
        )
    }

    pub fn new(
        app_id: &str,
        app_password: SecretString,
        tenant_id: &str,
        timeout: Duration,
    ) -> Result<Self, ConnectorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConnectorError::Transport(format!("failed to build HTTP client: {e}")))?;

        let credentials = (!app_id.trim().is_empty()).then(|| {
            let tenant = match tenant_id.trim() {
                "" => DEFAULT_TENANT,
                tenant => tenant,
            };
            AppCredentials {
                app_id: app_id.trim().to_string(),
                app_password,
                token_url: format!("{LOGIN_AUTHORITY}/{tenant}/oauth2/v2.0/token"),
            }
        });

        Ok(Self {
            client,
            credentials,
            tokens: TokenCache::new(),
            trusted_hosts: CHANNEL_DOMAINS.iter().map(|d| d.to_string()).collect(),
        })
    }

    /// Override the token endpoint (useful for testing).
    pub fn with_token_url(mut self, token_url: &str) -> Self {
        if let Some(credentials) = self.credentials.as_mut() {
            credentials.token_url = token_url.to_string();
        }
        self
    }

    /// Extend the allowlist, e.g. with a self-hosted emulator's host.
    pub fn with_trusted_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.trusted_hosts.extend(
            hosts
                .into_iter()
                .map(|h| normalize_host(h.as_ref()))
                .filter(|h| !h.is_empty()),
        );
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    /// Deliver one outbound activity.
    pub async fn send(&self, activity: &Activity) -> Result<(), ConnectorError> {
        let url = activity_url(activity)?;
        if self.credentials.is_some() {
            let host = url.host_str().unwrap_or_default();
            if !is_trusted_host(host, &self.trusted_hosts) {
                tracing::warn!(
                    host,
                    conversation_id = %activity.conversation.id,
                    "refusing authenticated reply to untrusted serviceUrl"
                );
                return Err(ConnectorError::UntrustedHost(host.to_string()));
            }
        }
        let mut request = self.client.post(url).json(activity);
        if let Some(token) = self.token().await? {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ConnectorError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectorError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        tracing::debug!(
            conversation_id = %activity.conversation.id,
            reply_to_id = ?activity.reply_to_id,
            "reply delivered"
        );
        Ok(())
    }

    async fn token(&self) -> Result<Option<SecretString>, ConnectorError> {
        let Some(credentials) = self.credentials.as_ref() else {
            return Ok(None);
        };
        if let Some(token) = self.tokens.get(CONNECTOR_SCOPE) {
            return Ok(Some(token));
        }

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", credentials.app_id.as_str()),
            ("client_secret", credentials.app_password.expose_secret()),
            ("scope", CONNECTOR_SCOPE),
        ];
        let response = self
            .client
            .post(&credentials.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| ConnectorError::Token(format!("token endpoint unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectorError::Token(format!("HTTP {status}: {body}")));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ConnectorError::Token(format!("invalid token response: {e}")))?;

        let lifetime = token.lifetime();
        let value = SecretString::from(token.access_token);
        self.tokens.insert(CONNECTOR_SCOPE, value.clone(), lifetime);
        tracing::debug!(app_id = %credentials.app_id, "acquired connector token");
        Ok(Some(value))
    }
}

fn normalize_host(host: &str) -> String {
    host.trim().trim_start_matches("*.").trim_end_matches('.').to_ascii_lowercase()
}

/// Exact match or a subdomain of an allowlisted entry.
fn is_trusted_host(host: &str, trusted: &[String]) -> bool {
    let host = normalize_host(host);
    !host.is_empty()
        && trusted.iter().any(|entry| {
            host == *entry
                || host
                    .strip_suffix(entry.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
}

/// `{serviceUrl}/v3/conversations/{id}/activities[/{replyToId}]`
fn activity_url(activity: &Activity) -> Result<Url, ConnectorError> {
    let service_url = activity
        .service_url
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ConnectorError::InvalidUrl("activity has no serviceUrl".to_string()))?;
    if activity.conversation.id.is_empty() {
        return Err(ConnectorError::InvalidUrl(
            "activity has no conversation id".to_string(),
        ));
    }

    let mut url = Url::parse(service_url)
        .map_err(|e| ConnectorError::InvalidUrl(format!("{service_url}: {e}")))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| ConnectorError::InvalidUrl(format!("{service_url} cannot be a base")))?;
        segments
            .pop_if_empty()
            .extend(["v3", "conversations", activity.conversation.id.as_str(), "activities"]);
        if let Some(reply_to) = activity.reply_to_id.as_deref().filter(|id| !id.is_empty()) {
            segments.push(reply_to);
        }
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::spawn_server;
    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Form, Json, Router};
    use insightbot_types::activity::{ActivityType, ChannelAccount, ConversationAccount};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn reply(service_url: &str, reply_to: Option<&str>) -> Activity {
        let inbound = Activity {
            activity_type: ActivityType::Message,
            id: reply_to.map(str::to_string),
            timestamp: None,
            service_url: Some(service_url.to_string()),
            channel_id: Some("emulator".into()),
            from: ChannelAccount {
                id: "user-1".into(),
                name: None,
            },
            conversation: ConversationAccount {
                id: "conv-1".into(),
                ..Default::default()
            },
            recipient: ChannelAccount {
                id: "bot-1".into(),
                name: None,
            },
            text: Some("hi".into()),
            text_format: None,
            locale: None,
            members_added: vec![],
            reply_to_id: None,
        };
        inbound.reply_text("hello back")
    }

    #[derive(Default)]
    struct Seen {
        auth: Vec<Option<String>>,
        paths: Vec<String>,
        texts: Vec<String>,
    }

    fn channel_router(seen: Arc<Mutex<Seen>>, token_hits: Arc<AtomicUsize>) -> Router {
        let record = move |path: String, headers: HeaderMap, body: serde_json::Value| {
            let mut seen = seen.lock().unwrap();
            seen.auth.push(
                headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string),
            );
            seen.paths.push(path);
            seen.texts
                .push(body["text"].as_str().unwrap_or_default().to_string());
        };
        let with_reply = record.clone();
        Router::new()
            .route(
                "/v3/conversations/{conv}/activities/{reply}",
                post(
                    move |Path((conv, reply)): Path<(String, String)>,
                          headers: HeaderMap,
                          Json(body): Json<serde_json::Value>| {
                        let with_reply = with_reply.clone();
                        async move {
                            with_reply(format!("{conv}/{reply}"), headers, body);
                            StatusCode::OK
                        }
                    },
                ),
            )
            .route(
                "/v3/conversations/{conv}/activities",
                post(
                    move |Path(conv): Path<String>,
                          headers: HeaderMap,
                          Json(body): Json<serde_json::Value>| {
                        let record = record.clone();
                        async move {
                            record(conv, headers, body);
                            StatusCode::CREATED
                        }
                    },
                ),
            )
            .route(
                "/tenant/token",
                post(move |Form(form): Form<HashMap<String, String>>| {
                    let token_hits = token_hits.clone();
                    async move {
                        token_hits.fetch_add(1, Ordering::SeqCst);
                        if form.get("client_secret").map(String::as_str) != Some("app-secret")
                            || form.get("scope").map(String::as_str) != Some(CONNECTOR_SCOPE)
                        {
                            return Err(StatusCode::UNAUTHORIZED);
                        }
                        Ok(Json(serde_json::json!({
                            "token_type": "Bearer",
                            "expires_in": 3599,
                            "access_token": "connector-token",
                        })))
                    }
                }),
            )
    }

    #[tokio::test]
    async fn test_unauthenticated_reply_to_activity() {
        let seen = Arc::new(Mutex::new(Seen::default()));
        let base = spawn_server(channel_router(seen.clone(), Arc::default())).await;
        let client =
            BotConnectorClient::new("", SecretString::from(""), "", Duration::from_secs(5)).unwrap();
        assert!(!client.is_authenticated());

        client.send(&reply(&base, Some("act-9"))).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.paths, vec!["conv-1/act-9".to_string()]);
        assert_eq!(seen.auth, vec![None]);
        assert_eq!(seen.texts, vec!["hello back".to_string()]);
    }

    #[tokio::test]
    async fn test_without_reply_to_posts_to_conversation() {
        let seen = Arc::new(Mutex::new(Seen::default()));
        let base = spawn_server(channel_router(seen.clone(), Arc::default())).await;
        let client =
            BotConnectorClient::new("", SecretString::from(""), "", Duration::from_secs(5)).unwrap();

        client.send(&reply(&format!("{base}/"), None)).await.unwrap();
        assert_eq!(seen.lock().unwrap().paths, vec!["conv-1".to_string()]);
    }

    #[tokio::test]
    async fn test_authenticated_reply_caches_token() {
        let seen = Arc::new(Mutex::new(Seen::default()));
        let token_hits = Arc::new(AtomicUsize::new(0));
        let base = spawn_server(channel_router(seen.clone(), token_hits.clone())).await;
        let client = BotConnectorClient::new(
            "app-id",
            SecretString::from("app-secret"),
            "",
            Duration::from_secs(5),
        )
        .unwrap()
        .with_token_url(&format!("{base}/tenant/token"))
        .with_trusted_hosts(["127.0.0.1"]);

        client.send(&reply(&base, Some("a1"))).await.unwrap();
        client.send(&reply(&base, Some("a2"))).await.unwrap();

        assert_eq!(token_hits.load(Ordering::SeqCst), 1);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.auth[0].as_deref(), Some("Bearer connector-token"));
        assert_eq!(seen.auth[1].as_deref(), Some("Bearer connector-token"));
    }

    #[tokio::test]
    async fn test_bad_credentials_are_token_error() {
        let base = spawn_server(channel_router(Arc::default(), Arc::default())).await;
        let client = BotConnectorClient::new(
            "app-id",
            SecretString::from("wrong"),
            "",
            Duration::from_secs(5),
        )
        .unwrap()
        .with_token_url(&format!("{base}/tenant/token"))
        .with_trusted_hosts(["127.0.0.1"]);

        let err = client.send(&reply(&base, Some("a1"))).await.unwrap_err();
        assert!(matches!(err, ConnectorError::Token(_)));
    }

    #[tokio::test]
    async fn test_untrusted_service_url_never_sees_token() {
        let seen = Arc::new(Mutex::new(Seen::default()));
        let token_hits = Arc::new(AtomicUsize::new(0));
        let base = spawn_server(channel_router(seen.clone(), token_hits.clone())).await;
        let client = BotConnectorClient::new(
            "app-id",
            SecretString::from("app-secret"),
            "",
            Duration::from_secs(5),
        )
        .unwrap()
        .with_token_url(&format!("{base}/tenant/token"));

        let err = client.send(&reply(&base, Some("a1"))).await.unwrap_err();
        assert!(matches!(err, ConnectorError::UntrustedHost(ref host) if host == "127.0.0.1"));
        assert_eq!(token_hits.load(Ordering::SeqCst), 0);
        let seen = seen.lock().unwrap();
        assert!(seen.paths.is_empty());
        assert!(seen.auth.is_empty());
    }

    #[tokio::test]
    async fn test_unauthenticated_client_ignores_allowlist() {
        let seen = Arc::new(Mutex::new(Seen::default()));
        let base = spawn_server(channel_router(seen.clone(), Arc::default())).await;
        let client = BotConnectorClient::new("", SecretString::from(""), "", Duration::from_secs(5))
            .unwrap()
            .with_trusted_hosts(["emulator.internal"]);

        client.send(&reply(&base, Some("a1"))).await.unwrap();
        assert_eq!(seen.lock().unwrap().auth, vec![None]);
    }

    #[test]
    fn test_trusted_host_matching() {
        let client = BotConnectorClient::new("", SecretString::from(""), "", Duration::from_secs(5))
            .unwrap()
            .with_trusted_hosts(["*.Emulator.Internal", " "]);
        let trusted = &client.trusted_hosts;

        assert!(is_trusted_host("smba.trafficmanager.net", trusted));
        assert!(is_trusted_host("webchat.botframework.com", trusted));
        assert!(is_trusted_host("botframework.com", trusted));
        assert!(is_trusted_host("EU.SMBA.TRAFFICMANAGER.NET", trusted));
        assert!(is_trusted_host("emulator.internal", trusted));
        assert!(is_trusted_host("bot.emulator.internal", trusted));

        assert!(!is_trusted_host("evilbotframework.com", trusted));
        assert!(!is_trusted_host("botframework.com.attacker.io", trusted));
        assert!(!is_trusted_host("attacker.io", trusted));
        assert!(!is_trusted_host("", trusted));
        assert_eq!(client.trusted_hosts.len(), CHANNEL_DOMAINS.len() + 1);
    }

    #[tokio::test]
    async fn test_rejected_status() {
        let router = Router::new().route(
            "/v3/conversations/{conv}/activities/{reply}",
            post(|| async { (StatusCode::FORBIDDEN, "nope") }),
        );
        let base = spawn_server(router).await;
        let client =
            BotConnectorClient::new("", SecretString::from(""), "", Duration::from_secs(5)).unwrap();

        let err = client.send(&reply(&base, Some("a1"))).await.unwrap_err();
        assert!(matches!(err, ConnectorError::Rejected { status: 403, .. }));
    }

    #[test]
    fn test_missing_service_url() {
        let mut activity = reply("http://localhost", Some("a1"));
        activity.service_url = None;
        assert!(matches!(
            activity_url(&activity),
            Err(ConnectorError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_token_url_uses_tenant() {
        let client = BotConnectorClient::new(
            "app-id",
            SecretString::from("pw"),
            "contoso.onmicrosoft.com",
            Duration::from_secs(5),
        )
        .unwrap();
        let credentials = client.credentials.as_ref().unwrap();
        assert_eq!(
            credentials.token_url,
            "https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/v2.0/token"
        );

        let default_tenant =
            BotConnectorClient::new("app-id", SecretString::from("pw"), "", Duration::from_secs(5))
                .unwrap();
        assert!(
            default_tenant.credentials.as_ref().unwrap().token_url.contains("/botframework.com/")
        );
    }
}
