use std::fmt;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::capabilities::{PersistedSession, SessionError};
use crate::chat_history::DayBucket;
use crate::config::CoreConfig;
use crate::feed::FetchTicket;
use crate::model::{
    ChatTab, ChatThread, FeedKind, FriendRequest, Notification, NotificationId, Peer, PushKind,
    RequestId, Route, SavedTravel, Screen, ThreadId, TravelId, UserId,
};
use crate::signals::Signal;
use crate::ApiResult;

/// Bearer token as handed over by the login flow. Redacted in `Debug`.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn into_secret(self) -> SecretString {
        SecretString::new(self.0)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum PageRecords {
    Travels(Vec<SavedTravel>),
    ChatThreads(Vec<ChatThread>),
    FriendRequests(Vec<FriendRequest>),
    Notifications(Vec<Notification>),
}

impl PageRecords {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Travels(r) => r.len(),
            Self::ChatThreads(r) => r.len(),
            Self::FriendRequests(r) => r.len(),
            Self::Notifications(r) => r.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One page of a feed plus the server's total count.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Page {
    pub records: PageRecords,
    pub total: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HistoryPage {
    pub buckets: Vec<DayBucket>,
    pub peer: Option<Peer>,
}

/// A record the user asked to remove, and the list it comes from.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemovalTarget {
    Travel { feed: FeedKind, id: TravelId },
    Thread(ThreadId),
    FriendRequest { id: RequestId, accept: bool },
}

impl RemovalTarget {
    #[must_use]
    pub const fn feed(self) -> FeedKind {
        match self {
            Self::Travel { feed, .. } => feed,
            Self::Thread(_) => FeedKind::ChatThreads,
            Self::FriendRequest { .. } => FeedKind::FriendRequests,
        }
    }
}

/// Push notification as delivered by the platform.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PushPayload {
    pub push_type: u64,
    #[serde(default)]
    pub push_title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub object_id: Option<u64>,
}

impl PushPayload {
    #[must_use]
    pub fn kind(&self) -> Option<PushKind> {
        PushKind::from_code(self.push_type)
    }

    #[must_use]
    pub fn route(&self) -> Option<Route> {
        self.kind()?.route(self.object_id.map(ThreadId))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    // Setup & session
    Configure(CoreConfig),
    SessionRestoreRequested,
    SessionRestored(Result<Option<PersistedSession>, SessionError>),
    SignedIn { user_id: UserId, token: AuthToken },
    SignedOut,
    SessionPersisted(Result<(), SessionError>),

    // Screen lifecycle
    ScreenOpened(Screen),
    ScreenClosed(Screen),
    ScreenFocused(Screen),
    ChatTabSelected(ChatTab),

    // Feeds
    RefreshRequested(FeedKind),
    LoadMoreRequested(FeedKind),
    PageLoaded {
        feed: FeedKind,
        ticket: FetchTicket,
        result: ApiResult<Page>,
    },
    DeleteTravelRequested { feed: FeedKind, id: TravelId },
    DeleteThreadRequested(ThreadId),
    FriendRequestAnswered { id: RequestId, accept: bool },
    RemovalCompleted {
        target: RemovalTarget,
        result: ApiResult<()>,
    },

    // Chat
    ChatOpened(ThreadId),
    ChatHistoryLoaded {
        thread: ThreadId,
        ticket: FetchTicket,
        result: ApiResult<HistoryPage>,
    },
    MessageSubmitted(String),
    MessageSent {
        thread: ThreadId,
        result: ApiResult<()>,
    },
    ClearHistoryRequested,
    ChatHistoryCleared {
        thread: ThreadId,
        result: ApiResult<()>,
    },

    // Cross-screen & push
    Publish(Signal),
    PushReceived(PushPayload),
    PushOpened(PushPayload),
    BannerTapped,
    NotificationTapped(NotificationId),

    ToastDismissed,
    BannerDismissed,
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Configure(_) => "configure",
            Self::SessionRestoreRequested => "session_restore_requested",
            Self::SessionRestored(_) => "session_restored",
            Self::SignedIn { .. } => "signed_in",
            Self::SignedOut => "signed_out",
            Self::SessionPersisted(_) => "session_persisted",
            Self::ScreenOpened(_) => "screen_opened",
            Self::ScreenClosed(_) => "screen_closed",
            Self::ScreenFocused(_) => "screen_focused",
            Self::ChatTabSelected(_) => "chat_tab_selected",
            Self::RefreshRequested(_) => "refresh_requested",
            Self::LoadMoreRequested(_) => "load_more_requested",
            Self::PageLoaded { .. } => "page_loaded",
            Self::DeleteTravelRequested { .. } => "delete_travel_requested",
            Self::DeleteThreadRequested(_) => "delete_thread_requested",
            Self::FriendRequestAnswered { .. } => "friend_request_answered",
            Self::RemovalCompleted { .. } => "removal_completed",
            Self::ChatOpened(_) => "chat_opened",
            Self::ChatHistoryLoaded { .. } => "chat_history_loaded",
            Self::MessageSubmitted(_) => "message_submitted",
            Self::MessageSent { .. } => "message_sent",
            Self::ClearHistoryRequested => "clear_history_requested",
            Self::ChatHistoryCleared { .. } => "chat_history_cleared",
            Self::Publish(_) => "publish",
            Self::PushReceived(_) => "push_received",
            Self::PushOpened(_) => "push_opened",
            Self::BannerTapped => "banner_tapped",
            Self::NotificationTapped(_) => "notification_tapped",
            Self::ToastDismissed => "toast_dismissed",
            Self::BannerDismissed => "banner_dismissed",
        }
    }

    /// Events that come from the shell rather than from a capability response.
    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        !matches!(
            self,
            Self::SessionRestored(_)
                | Self::SessionPersisted(_)
                | Self::PageLoaded { .. }
                | Self::RemovalCompleted { .. }
                | Self::ChatHistoryLoaded { .. }
                | Self::MessageSent { .. }
                | Self::ChatHistoryCleared { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_token_debug_is_redacted() {
        let token = AuthToken::new("super_secret");
        assert_eq!(format!("{token:?}"), "[REDACTED]");
        let event = Event::SignedIn {
            user_id: UserId(1),
            token,
        };
        assert!(!format!("{event:?}").contains("super_secret"));
    }

    #[test]
    fn push_payload_routes_by_type() {
        let push: PushPayload =
            serde_json::from_str(r#"{"push_type":3,"push_title":"Lea","body":"hey","object_id":44}"#)
                .unwrap();
        assert_eq!(push.route(), Some(Route::ChatHistory { thread: ThreadId(44) }));

        let unknown = PushPayload {
            push_type: 7,
            push_title: String::new(),
            body: String::new(),
            object_id: None,
        };
        assert_eq!(unknown.route(), None);
    }

    #[test]
    fn responses_are_not_user_initiated() {
        assert!(Event::RefreshRequested(FeedKind::Notifications).is_user_initiated());
        assert!(!Event::MessageSent {
            thread: ThreadId(1),
            result: Ok(())
        }
        .is_user_initiated());
    }

    #[test]
    fn removal_target_knows_its_feed() {
        let target = RemovalTarget::Travel {
            feed: FeedKind::TravelHistory,
            id: TravelId(3),
        };
        assert_eq!(target.feed(), FeedKind::TravelHistory);
        assert_eq!(RemovalTarget::Thread(ThreadId(1)).feed(), FeedKind::ChatThreads);
    }
}
