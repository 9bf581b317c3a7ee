use std::fmt;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("good-vibes api: {status}: {body}")]
    Status { status: StatusCode, body: String },
}

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Option<Duration>,
    pub http_client: Option<HttpClient>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    pub text: String,
    #[serde(default)]
    pub locale: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub emoji: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub author_user: User,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(deserialize_with = "timestamp")]
    pub reply_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vibe {
    #[serde(rename = "goodVibeId")]
    pub id: String,
    #[serde(default)]
    pub collection_id: Option<String>,
    #[serde(default)]
    pub collection_name: Option<Vec<LocalizedText>>,
    #[serde(default)]
    pub card_id: Option<String>,
    #[serde(default)]
    pub card_prompt: Option<Vec<LocalizedText>>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    pub sender_user: User,
    #[serde(deserialize_with = "timestamp")]
    pub creation_date: DateTime<Utc>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recipients: Vec<User>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reactions: Vec<Reaction>,
    #[serde(default)]
    pub reply_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<Reply>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    #[serde(default)]
    pub continuation_token: Option<String>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub total_count: Option<usize>,
    #[serde(default)]
    pub cache_ready: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VibesPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<Vibe>,
    #[serde(default)]
    pub metadata: Option<PageMetadata>,
}

impl VibesPage {
    /// Only an explicit `cacheReady: false` means the backend is still warming up.
    pub fn cache_ready(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|meta| meta.cache_ready)
            .unwrap_or(true)
    }

    pub fn total_count(&self) -> Option<usize> {
        self.metadata.as_ref().and_then(|meta| meta.total_count)
    }

    pub fn continuation_token(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|meta| meta.continuation_token.as_deref())
            .filter(|token| !token.trim().is_empty())
    }
}

/// A recency range served by the cached endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Window {
    Days(u32),
    Months(u32),
}

impl Window {
    fn query(&self) -> (&'static str, String) {
        match self {
            Window::Days(days) => ("daysBack", days.to_string()),
            Window::Months(months) => ("monthsBack", months.to_string()),
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Window::Days(days) => write!(f, "last {days} days"),
            Window::Months(months) => write!(f, "last {months} months"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedUser {
    pub user: User,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedCollection {
    pub name: String,
    pub count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonthlyStandings {
    pub year: i32,
    pub month: u32,
    pub top_senders: Vec<RankedUser>,
    pub top_recipients: Vec<RankedUser>,
    pub top_collections: Vec<RankedCollection>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopSendersEnvelope {
    year: i32,
    month: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    top_senders: Vec<RankedUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopRecipientsEnvelope {
    #[serde(default, deserialize_with = "null_as_default")]
    top_recipients: Vec<RankedUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopCollectionsEnvelope {
    #[serde(default, deserialize_with = "null_as_default")]
    top_collections: Vec<RankedCollection>,
}

pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: Url,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("good-vibes client user agent required");
        }
        let base = if config.base_url.trim().is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            config.base_url.trim().to_string()
        };
        let base_url = Url::parse(&base).with_context(|| format!("parse base url {base:?}"))?;
        if base_url.cannot_be_a_base() {
            bail!("good-vibes base url {base:?} cannot carry a path");
        }

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout.unwrap_or(Duration::from_secs(20)))
                .build()?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Token-paginated listing of public vibes.
    pub fn list_page(&self, continuation: Option<&str>) -> Result<VibesPage> {
        let mut params = vec![("isPublic", "true".to_string())];
        if let Some(token) = continuation {
            params.push(("continuationToken", token.to_string()));
        }
        self.get(&["good-vibes"], &params)
            .context("fetch good vibes page")
    }

    /// Windowed listing served from the backend's precomputed cache.
    pub fn cached_window(&self, window: Window, avatar_size: &str) -> Result<VibesPage> {
        let (key, value) = window.query();
        let params = vec![(key, value), ("avatarSize", avatar_size.to_string())];
        self.get(&["good-vibes", "cached"], &params)
            .with_context(|| format!("fetch good vibes for the {window}"))
    }

    pub fn vibe(&self, id: &str) -> Result<Vibe> {
        if id.trim().is_empty() {
            bail!("good-vibes: vibe id is required");
        }
        self.get(&["good-vibes", id], &[])
            .with_context(|| format!("fetch good vibe {id}"))
    }

    pub fn monthly_standings(&self, year: i32, month: u32, limit: u32) -> Result<MonthlyStandings> {
        let params = vec![
            ("year", year.to_string()),
            ("month", month.to_string()),
            ("limit", limit.to_string()),
        ];
        let senders: TopSendersEnvelope = self
            .get(&["stats", "monthly", "top-senders"], &params)
            .context("fetch top senders")?;
        let recipients: TopRecipientsEnvelope = self
            .get(&["stats", "monthly", "top-recipients"], &params)
            .context("fetch top recipients")?;
        let collections: TopCollectionsEnvelope = self
            .get(&["stats", "monthly", "top-collections"], &params)
            .context("fetch top collections")?;

        Ok(MonthlyStandings {
            year: senders.year,
            month: senders.month,
            top_senders: senders.top_senders,
            top_recipients: recipients.top_recipients,
            top_collections: collections.top_collections,
        })
    }

    fn endpoint(&self, segments: &[&str], params: &[(&str, String)]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("good-vibes base url cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn get<T>(&self, segments: &[&str], params: &[(&str, String)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments, params)?;
        let resp = self
            .http
            .get(url.clone())
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
            .send()
            .with_context(|| format!("request {url}"))?;

        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        if !status.is_success() {
            return Err(ApiError::Status { status, body }.into());
        }
        serde_json::from_str(&body).with_context(|| format!("decode response from {url}"))
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

/// Accepts RFC 3339 as well as offset-less timestamps, which are read as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Ok(naive.and_utc());
        }
    }
    bail!("unrecognized timestamp {raw:?}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::thread;

    use tiny_http::{Header, Response, Server};

    const VIBE_JSON: &str = r#"{
        "goodVibeId": "gv-1",
        "collectionId": null,
        "collectionName": null,
        "cardId": "card-9",
        "cardPrompt": [{"text": "You rock!", "locale": "en"}],
        "prompt": null,
        "message": null,
        "senderUser": {"userId": "u1", "displayName": "Ada", "avatarUrl": null},
        "creationDate": "2026-10-02T09:30:00Z",
        "isPublic": true,
        "recipients": [{"userId": "u2", "displayName": "Grace"}],
        "reactions": [{"emoji": "🎉", "count": 3}],
        "replyCount": 2
    }"#;

    /// Serves `count` requests, answering each with the body registered for its path.
    fn serve(routes: Vec<(&'static str, u16, String)>, count: usize) -> (String, thread::JoinHandle<Vec<String>>) {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let routes: HashMap<&str, (u16, String)> = routes
            .into_iter()
            .map(|(path, status, body)| (path, (status, body)))
            .collect();
        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for _ in 0..count {
                let req = server.recv().unwrap();
                let url = req.url().to_string();
                let path = url.split('?').next().unwrap_or_default().to_string();
                let (status, body) = routes
                    .get(path.as_str())
                    .cloned()
                    .unwrap_or((404, "missing".to_string()));
                let header = Header::from_bytes("Content-Type", "application/json").unwrap();
                req.respond(
                    Response::from_string(body)
                        .with_status_code(status)
                        .with_header(header),
                )
                .unwrap();
                seen.push(url);
            }
            seen
        });
        (format!("http://{addr}/api"), handle)
    }

    fn client(base_url: String) -> Client {
        Client::new(ClientConfig {
            base_url,
            user_agent: "good-vibes-test".into(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn decodes_vibe_with_nulls() {
        let vibe: Vibe = serde_json::from_str(VIBE_JSON).unwrap();
        assert_eq!(vibe.id, "gv-1");
        assert_eq!(vibe.message, "");
        assert_eq!(vibe.recipients.len(), 1);
        assert_eq!(vibe.reply_count, 2);
        assert!(vibe.replies.is_none());
        assert_eq!(vibe.creation_date.to_rfc3339(), "2026-10-02T09:30:00+00:00");
    }

    #[test]
    fn cache_ready_defaults_to_true() {
        let page: VibesPage = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(page.cache_ready());
        let page: VibesPage =
            serde_json::from_str(r#"{"data": [], "metadata": {"cacheReady": false}}"#).unwrap();
        assert!(!page.cache_ready());
    }

    #[test]
    fn parses_offsetless_timestamps() {
        let parsed = parse_timestamp("2026-01-05T08:00:00.123").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-01-05T08:00:00.123+00:00");
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn cached_window_builds_query() {
        let body = format!(
            r#"{{"data": [{VIBE_JSON}], "metadata": {{"totalCount": 7, "cacheReady": true}}}}"#
        );
        let (base, handle) = serve(vec![("/api/good-vibes/cached", 200, body)], 1);
        let page = client(base)
            .cached_window(Window::Days(30), "128x128")
            .unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.total_count(), Some(7));
        let seen = handle.join().unwrap();
        assert_eq!(seen[0], "/api/good-vibes/cached?daysBack=30&avatarSize=128x128");
    }

    #[test]
    fn list_page_passes_continuation_token() {
        let body = r#"{"data": [], "metadata": {"continuationToken": "abc"}}"#.to_string();
        let (base, handle) = serve(vec![("/api/good-vibes", 200, body)], 1);
        let page = client(base).list_page(Some("tok en")).unwrap();
        assert_eq!(page.continuation_token(), Some("abc"));
        let seen = handle.join().unwrap();
        assert_eq!(seen[0], "/api/good-vibes?isPublic=true&continuationToken=tok+en");
    }

    #[test]
    fn status_errors_carry_body() {
        let (base, handle) = serve(vec![("/api/good-vibes/gv-1", 503, "warming up".into())], 1);
        let err = client(base).vibe("gv-1").unwrap_err();
        handle.join().unwrap();
        let api = err.downcast_ref::<ApiError>().expect("api error");
        let ApiError::Status { status, body } = api;
        assert_eq!(*status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, "warming up");
    }

    #[test]
    fn monthly_standings_combines_endpoints() {
        let user = r#"{"user": {"userId": "u1", "displayName": "Ada"}, "count": 4}"#;
        let (base, handle) = serve(
            vec![
                (
                    "/api/stats/monthly/top-senders",
                    200,
                    format!(r#"{{"year": 2026, "month": 10, "topSenders": [{user}]}}"#),
                ),
                (
                    "/api/stats/monthly/top-recipients",
                    200,
                    r#"{"year": 2026, "month": 10, "topRecipients": null}"#.into(),
                ),
                (
                    "/api/stats/monthly/top-collections",
                    200,
                    r#"{"year": 2026, "month": 10, "topCollections": [{"name": "Kudos", "count": 9}]}"#
                        .into(),
                ),
            ],
            3,
        );
        let standings = client(base).monthly_standings(2026, 10, 3).unwrap();
        let seen = handle.join().unwrap();
        assert_eq!(standings.month, 10);
        assert_eq!(standings.top_senders[0].user.display_name, "Ada");
        assert!(standings.top_recipients.is_empty());
        assert_eq!(standings.top_collections[0].name, "Kudos");
        assert!(seen[0].ends_with("?year=2026&month=10&limit=3"));
    }

    #[test]
    fn rejects_blank_user_agent() {
        let result = Client::new(ClientConfig::default());
        assert!(result.is_err());
    }
}
