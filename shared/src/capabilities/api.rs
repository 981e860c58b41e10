//! Backend endpoints and the JSON envelope every response is wrapped in.
//!
//! Each helper builds one request on the `Http` capability and maps the
//! outcome into an [`ApiResult`] before handing it to the event constructor,
//! so the app never sees raw transport errors.

use crux_http::{HttpError, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

use super::AppHttp;
use crate::chat_history::DayBucket;
use crate::event::{Event, HistoryPage, Page, PageRecords, RemovalTarget};
use crate::feed::FetchTicket;
use crate::model::{lenient, FeedKind, Peer, RequestId, ThreadId, UserId};
use crate::pager::PageCursor;
use crate::{ApiError, ApiResult, CHAT_MESSAGE_TYPE};

const CONTENT_TYPE_JSON: &str = "application/json";

/// `{status, message, data, total}` as sent by every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub status: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub total: Option<u64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl<T> Envelope<T> {
    /// Some endpoints answer 200 with an error status in the body.
    pub fn check(self) -> ApiResult<Self> {
        match self.status {
            None | Some(200..=299) => Ok(self),
            Some(status) => {
                let status = u16::try_from(status).unwrap_or(u16::MAX);
                let body = serde_json::json!({
                    "status": status,
                    "message": self.message.unwrap_or_default(),
                });
                Err(ApiError::from_http_status(status, Some(body.to_string().as_bytes())))
            }
        }
    }
}

impl FeedKind {
    #[must_use]
    pub const fn list_path(self) -> &'static str {
        match self {
            Self::SavedTravels => "travels/saved",
            Self::TravelHistory => "travels/history",
            Self::ChatThreads => "chat/threads",
            Self::FriendRequests => "friends/requests",
            Self::Notifications => "notifications",
        }
    }
}

pub fn endpoint(base: &Url, path: &str) -> ApiResult<Url> {
    base.join(path)
        .map_err(|e| ApiError::Decode(format!("bad endpoint {path}: {e}")))
}

pub fn list_url(base: &Url, feed: FeedKind, cursor: PageCursor) -> ApiResult<Url> {
    let mut url = endpoint(base, feed.list_path())?;
    url.query_pairs_mut()
        .append_pair("limit", &cursor.limit.to_string())
        .append_pair("offset", &cursor.offset.to_string());
    Ok(url)
}

pub fn map_http_error(error: HttpError) -> ApiError {
    match error {
        HttpError::Http { code, body, .. } => ApiError::from_http_status(u16::from(code), body.as_deref()),
        HttpError::Json(reason) => ApiError::Decode(reason),
        other => ApiError::Unreachable(other.to_string()),
    }
}

fn read_envelope<T>(result: crux_http::Result<Response<Envelope<T>>>) -> ApiResult<Envelope<T>> {
    match result {
        Ok(mut response) => response
            .take_body()
            .ok_or_else(|| ApiError::Decode("empty response body".into()))?
            .check(),
        Err(e) => Err(map_http_error(e)),
    }
}

fn bearer(token: &SecretString) -> String {
    format!("Bearer {}", token.expose_secret())
}

fn encode<B: Serialize>(body: &B) -> ApiResult<Vec<u8>> {
    serde_json::to_vec(body).map_err(|e| ApiError::Decode(e.to_string()))
}

fn get_list<T, F>(http: &AppHttp, url: &Url, token: &SecretString, make_event: F)
where
    T: DeserializeOwned + Send + 'static,
    F: FnOnce(ApiResult<(Vec<T>, u64)>) -> Event + Send + 'static,
{
    http.get(url.as_str())
        .header("Accept", CONTENT_TYPE_JSON)
        .header("Authorization", bearer(token))
        .expect_json::<Envelope<Vec<T>>>()
        .send(move |result| {
            make_event(read_envelope(result).map(|envelope| {
                let total = envelope.total.unwrap_or(0);
                (envelope.data.unwrap_or_default(), total)
            }))
        });
}

fn post_action<B, F>(http: &AppHttp, url: &Url, token: &SecretString, body: &B, make_event: F) -> ApiResult<()>
where
    B: Serialize,
    F: FnOnce(ApiResult<()>) -> Event + Send + 'static,
{
    let body = encode(body)?;
    http.post(url.as_str())
        .header("Accept", CONTENT_TYPE_JSON)
        .header("Content-Type", CONTENT_TYPE_JSON)
        .header("Authorization", bearer(token))
        .body(body)
        .expect_json::<Envelope<serde_json::Value>>()
        .send(move |result| make_event(read_envelope(result).map(|_| ())));
    Ok(())
}

/// Request one page of `feed`.
#[instrument(skip_all, fields(feed = %feed, seq = ticket.seq()))]
pub fn fetch_page(
    http: &AppHttp,
    base: &Url,
    token: &SecretString,
    feed: FeedKind,
    ticket: FetchTicket,
    cursor: PageCursor,
) -> ApiResult<()> {
    let url = list_url(base, feed, cursor)?;
    debug!(offset = cursor.offset, limit = cursor.limit.get(), "fetching page");

    macro_rules! page {
        ($variant:ident) => {
            get_list(http, &url, token, move |result| Event::PageLoaded {
                feed,
                ticket,
                result: result.map(|(records, total)| Page {
                    records: PageRecords::$variant(records),
                    total,
                }),
            })
        };
    }

    match feed {
        FeedKind::SavedTravels | FeedKind::TravelHistory => page!(Travels),
        FeedKind::ChatThreads => page!(ChatThreads),
        FeedKind::FriendRequests => page!(FriendRequests),
        FeedKind::Notifications => page!(Notifications),
    }
    Ok(())
}

#[derive(Serialize)]
struct ThreadBody {
    thread_id: ThreadId,
}

#[derive(Serialize)]
struct SendBody<'a> {
    thread_id: ThreadId,
    t_user_id: UserId,
    #[serde(rename = "type")]
    kind: &'a str,
    message: &'a str,
}

#[derive(Serialize)]
struct AnswerBody {
    id: RequestId,
    status: &'static str,
}

#[instrument(skip_all, fields(thread = %thread, seq = ticket.seq()))]
pub fn fetch_history(
    http: &AppHttp,
    base: &Url,
    token: &SecretString,
    thread: ThreadId,
    ticket: FetchTicket,
) -> ApiResult<()> {
    let url = endpoint(base, "chat/history")?;
    let body = encode(&ThreadBody { thread_id: thread })?;
    http.post(url.as_str())
        .header("Accept", CONTENT_TYPE_JSON)
        .header("Content-Type", CONTENT_TYPE_JSON)
        .header("Authorization", bearer(token))
        .body(body)
        .expect_json::<Envelope<Vec<DayBucket>>>()
        .send(move |result| Event::ChatHistoryLoaded {
            thread,
            ticket,
            result: read_envelope(result).map(history_page),
        });
    Ok(())
}

fn history_page(envelope: Envelope<Vec<DayBucket>>) -> HistoryPage {
    let peer = envelope
        .extra
        .get("user_detail")
        .cloned()
        .and_then(|raw| match serde_json::from_value::<Peer>(raw) {
            Ok(peer) => Some(peer),
            Err(e) => {
                warn!(error = %e, "ignoring malformed user_detail");
                None
            }
        });
    HistoryPage {
        buckets: envelope.data.unwrap_or_default(),
        peer,
    }
}

#[instrument(skip_all, fields(thread = %thread))]
pub fn send_message(
    http: &AppHttp,
    base: &Url,
    token: &SecretString,
    thread: ThreadId,
    recipient: UserId,
    message: &str,
) -> ApiResult<()> {
    let url = endpoint(base, "chat/send")?;
    let body = SendBody {
        thread_id: thread,
        t_user_id: recipient,
        kind: CHAT_MESSAGE_TYPE,
        message,
    };
    post_action(http, &url, token, &body, move |result| Event::MessageSent { thread, result })
}

#[instrument(skip_all, fields(thread = %thread))]
pub fn clear_history(http: &AppHttp, base: &Url, token: &SecretString, thread: ThreadId) -> ApiResult<()> {
    let url = endpoint(base, "chat/history/clear")?;
    post_action(http, &url, token, &ThreadBody { thread_id: thread }, move |result| {
        Event::ChatHistoryCleared { thread, result }
    })
}

/// Issue the destructive call behind `target`. The list is only touched once
/// the server confirms.
#[instrument(skip_all, fields(target = ?target))]
pub fn remove(http: &AppHttp, base: &Url, token: &SecretString, target: RemovalTarget) -> ApiResult<()> {
    let done = move |result| Event::RemovalCompleted { target, result };
    match target {
        RemovalTarget::Travel { id, .. } => {
            let url = endpoint(base, &format!("travels/delete/{id}"))?;
            http.get(url.as_str())
                .header("Accept", CONTENT_TYPE_JSON)
                .header("Authorization", bearer(token))
                .expect_json::<Envelope<serde_json::Value>>()
                .send(move |result| done(read_envelope(result).map(|_| ())));
            Ok(())
        }
        RemovalTarget::Thread(thread) => {
            let url = endpoint(base, "chat/threads/delete")?;
            post_action(http, &url, token, &ThreadBody { thread_id: thread }, done)
        }
        RemovalTarget::FriendRequest { id, accept } => {
            let url = endpoint(base, "friends/requests/respond")?;
            let body = AnswerBody {
                id,
                status: if accept { "accept" } else { "reject" },
            };
            post_action(http, &url, token, &body, done)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU32;

    fn base() -> Url {
        Url::parse("https://api.layover.test/v1/").unwrap()
    }

    #[test]
    fn list_url_carries_cursor() {
        let cursor = PageCursor {
            offset: 20,
            limit: NonZeroU32::new(10).unwrap(),
        };
        let url = list_url(&base(), FeedKind::ChatThreads, cursor).unwrap();
        assert_eq!(url.as_str(), "https://api.layover.test/v1/chat/threads?limit=10&offset=20");
    }

    #[test]
    fn envelope_reads_total_and_extra_fields() {
        let envelope: Envelope<Vec<serde_json::Value>> = serde_json::from_str(
            r#"{"status":200,"message":"ok","data":[{"id":1}],"total":"14","user_detail":{"id":3}}"#,
        )
        .unwrap();
        assert_eq!(envelope.total, Some(14));
        assert!(envelope.extra.contains_key("user_detail"));
        assert!(envelope.check().is_ok());
    }

    #[test]
    fn envelope_with_error_status_is_rejected() {
        let envelope: Envelope<serde_json::Value> =
            serde_json::from_str(r#"{"status":412,"message":"Already friends"}"#).unwrap();
        assert_eq!(
            envelope.check(),
            Err(ApiError::Validation {
                status: 412,
                message: "Already friends".into()
            })
        );
    }

    #[test]
    fn missing_data_is_an_empty_page() {
        let envelope: Envelope<Vec<DayBucket>> = serde_json::from_str(r#"{"status":200}"#).unwrap();
        let page = history_page(envelope);
        assert!(page.buckets.is_empty());
        assert!(page.peer.is_none());
    }

    #[test]
    fn history_page_picks_up_peer() {
        let envelope: Envelope<Vec<DayBucket>> = serde_json::from_str(
            r#"{"status":200,"data":[],"user_detail":{"id":"8","first_name":"Lea","last_name":"Moss"}}"#,
        )
        .unwrap();
        let page = history_page(envelope);
        assert_eq!(page.peer.map(|p| p.id), Some(UserId(8)));
    }
}
