use std::fmt;

use rand::Rng;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};

use crate::chat_history::ChatSession;
use crate::config::CoreConfig;
use crate::event::{Page, PageRecords, RemovalTarget};
use crate::feed::{Feed, FetchRequest, FetchTicket, Outcome, Record, Sequencer};
use crate::signals::{Signal, SignalBus, Subscription};
use crate::PLACEHOLDER_ART_COUNT;

// --- Typed IDs ---

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl $name {
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                lenient::u64(deserializer).map(Self)
            }
        }
    };
}

typed_id!(UserId);
typed_id!(TravelId);
typed_id!(ThreadId);
typed_id!(RequestId);
typed_id!(NotificationId);

/// The backend is inconsistent about numbers vs numeric strings.
pub(crate) mod lenient {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrString {
        Num(u64),
        Str(String),
    }

    pub fn u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match NumOrString::deserialize(deserializer)? {
            NumOrString::Num(n) => Ok(n),
            NumOrString::Str(s) => s.trim().parse().map_err(D::Error::custom),
        }
    }

    pub fn opt_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        match Option::<NumOrString>::deserialize(deserializer)? {
            None => Ok(None),
            Some(NumOrString::Num(n)) => Ok(Some(n)),
            Some(NumOrString::Str(s)) if s.trim().is_empty() => Ok(None),
            Some(NumOrString::Str(s)) => s.trim().parse().map(Some).map_err(D::Error::custom),
        }
    }
}

/// Server timestamps: `YYYY-MM-DD HH:MM:SS` in UTC, or RFC 3339.
pub(crate) mod server_time {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        NaiveDateTime::parse_from_str(raw, FORMAT)
            .map(|naive| naive.and_utc())
            .ok()
            .or_else(|| {
                DateTime::parse_from_rfc3339(raw)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc))
            })
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}")))
    }
}

/// The other participant of a chat, as sent alongside the history.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Peer {
    pub id: UserId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub profile_image: Option<String>,
}

impl Peer {
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

// --- Feed records ---

type Extra = serde_json::Map<String, serde_json::Value>;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TravelMode {
    Plane,
    #[default]
    #[serde(other)]
    Layover,
}

impl TravelMode {
    #[must_use]
    pub const fn art_prefix(self) -> &'static str {
        match self {
            Self::Plane => "travel",
            Self::Layover => "layover",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SavedTravel {
    pub id: TravelId,
    #[serde(rename = "type", default)]
    pub mode: TravelMode,
    #[serde(default)]
    pub city_name: Option<String>,
    #[serde(default)]
    pub city_image: Option<String>,
    #[serde(default)]
    pub flight_number: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    /// Bundled artwork shown when the server has no city image.
    #[serde(default, skip_deserializing)]
    pub placeholder_art: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl SavedTravel {
    #[must_use]
    pub fn needs_placeholder(&self) -> bool {
        self.city_image.as_deref().map_or(true, |s| s.trim().is_empty())
    }

    /// Pick artwork once; later pages and refreshes keep whatever was chosen.
    pub fn assign_placeholder<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.placeholder_art.is_none() && self.needs_placeholder() {
            let index = rng.gen_range(1..=PLACEHOLDER_ART_COUNT);
            self.placeholder_art = Some(format!("{}_{index}", self.mode.art_prefix()));
        }
    }
}

impl Record for SavedTravel {
    type Id = TravelId;

    fn id(&self) -> TravelId {
        self.id
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChatThread {
    pub id: ThreadId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub message_latest: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Record for ChatThread {
    type Id = ThreadId;

    fn id(&self) -> ThreadId {
        self.id
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FriendRequest {
    pub id: RequestId,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Record for FriendRequest {
    type Id = RequestId;

    fn id(&self) -> RequestId {
        self.id
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Notification {
    pub id: NotificationId,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub push_type: Option<u64>,
    #[serde(default)]
    pub push_title: Option<String>,
    #[serde(default)]
    pub push_message: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub object_id: Option<u64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Notification {
    #[must_use]
    pub fn route(&self) -> Option<Route> {
        PushKind::from_code(self.push_type?)?.route(self.object_id.map(ThreadId))
    }
}

impl Record for Notification {
    type Id = NotificationId;

    fn id(&self) -> NotificationId {
        self.id
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    SavedTravels,
    TravelHistory,
    ChatThreads,
    FriendRequests,
    Notifications,
}

impl FeedKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SavedTravels => "saved_travels",
            Self::TravelHistory => "travel_history",
            Self::ChatThreads => "chat_threads",
            Self::FriendRequests => "friend_requests",
            Self::Notifications => "notifications",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Screens & routing ---

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Home,
    Travels,
    Chat,
    ChatHistory,
    Notification,
    Other,
}

impl Screen {
    /// The list a screen shows, if any.
    #[must_use]
    pub const fn feed(self, tab: ChatTab) -> Option<FeedKind> {
        match self {
            Self::Home => Some(FeedKind::SavedTravels),
            Self::Travels => Some(FeedKind::TravelHistory),
            Self::Chat => Some(tab.feed()),
            Self::Notification => Some(FeedKind::Notifications),
            Self::ChatHistory | Self::Other => None,
        }
    }

    /// Signals a screen listens to while it is open.
    #[must_use]
    pub const fn signals(self) -> &'static [Signal] {
        match self {
            Self::Home | Self::Travels => &[Signal::SavedTravelsChanged],
            Self::ChatHistory => &[Signal::ChatHistoryChanged],
            Self::Chat | Self::Notification | Self::Other => &[],
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatTab {
    #[default]
    Threads,
    Requests,
}

impl ChatTab {
    #[must_use]
    pub const fn feed(self) -> FeedKind {
        match self {
            Self::Threads => FeedKind::ChatThreads,
            Self::Requests => FeedKind::FriendRequests,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum Route {
    Login,
    Chat { tab: ChatTab },
    ChatHistory { thread: ThreadId },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushKind {
    FriendRequest,
    RequestAccepted,
    NewMessage,
}

impl PushKind {
    #[must_use]
    pub const fn from_code(code: u64) -> Option<Self> {
        match code {
            1 => Some(Self::FriendRequest),
            2 => Some(Self::RequestAccepted),
            3 => Some(Self::NewMessage),
            _ => None,
        }
    }

    #[must_use]
    pub const fn route(self, thread: Option<ThreadId>) -> Option<Route> {
        match self {
            Self::FriendRequest => Some(Route::Chat { tab: ChatTab::Requests }),
            Self::RequestAccepted => Some(Route::Chat { tab: ChatTab::Threads }),
            Self::NewMessage => match thread {
                Some(thread) => Some(Route::ChatHistory { thread }),
                None => None,
            },
        }
    }
}

// --- Transient UI state ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    #[default]
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
}

impl Toast {
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Error,
        }
    }
}

/// In-app banner for a push that arrived while the app was in the foreground.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    pub title: String,
    pub body: String,
    pub route: Option<Route>,
}

// --- Session ---

#[derive(Clone, Debug)]
pub struct Session {
    pub user_id: UserId,
    pub token: SecretString,
}

// --- Model ---

macro_rules! with_feed {
    ($model:expr, $kind:expr, |$feed:ident| $body:expr) => {
        match $kind {
            FeedKind::SavedTravels => {
                let $feed = &mut $model.saved_travels;
                $body
            }
            FeedKind::TravelHistory => {
                let $feed = &mut $model.travel_history;
                $body
            }
            FeedKind::ChatThreads => {
                let $feed = &mut $model.chat_threads;
                $body
            }
            FeedKind::FriendRequests => {
                let $feed = &mut $model.friend_requests;
                $body
            }
            FeedKind::Notifications => {
                let $feed = &mut $model.notifications;
                $body
            }
        }
    };
}

#[derive(Debug)]
pub struct Model {
    pub config: CoreConfig,
    pub session: Option<Session>,
    pub active_screen: Option<Screen>,
    pub chat_tab: ChatTab,

    pub saved_travels: Feed<SavedTravel>,
    pub travel_history: Feed<SavedTravel>,
    pub chat_threads: Feed<ChatThread>,
    pub friend_requests: Feed<FriendRequest>,
    pub notifications: Feed<Notification>,
    pub chat: Option<ChatSession>,
    /// Chat reload counter while no chat is open.
    chat_tickets: Sequencer,

    pub bus: SignalBus<Screen>,
    pub subscriptions: Vec<(Screen, Subscription)>,

    pub toast: Option<Toast>,
    pub banner: Option<Banner>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new(CoreConfig::default())
    }
}

impl Model {
    #[must_use]
    pub fn new(config: CoreConfig) -> Self {
        let limit = config.page_limit;
        Self {
            config,
            session: None,
            active_screen: None,
            chat_tab: ChatTab::default(),
            saved_travels: Feed::new(limit),
            travel_history: Feed::new(limit),
            chat_threads: Feed::new(limit),
            friend_requests: Feed::new(limit),
            notifications: Feed::new(limit),
            chat: None,
            chat_tickets: Sequencer::default(),
            bus: SignalBus::new(),
            subscriptions: Vec::new(),
            toast: None,
            banner: None,
        }
    }

    /// Swap in a new config. Feeds are emptied when the page size changes.
    pub fn apply_config(&mut self, config: CoreConfig) {
        let resized = config.page_limit != self.config.page_limit;
        self.config = config;
        if resized {
            self.reset_feeds();
        }
    }

    fn reset_feeds(&mut self) {
        let limit = self.config.page_limit;
        self.saved_travels.reset(limit);
        self.travel_history.reset(limit);
        self.chat_threads.reset(limit);
        self.friend_requests.reset(limit);
        self.notifications.reset(limit);
    }

    /// Make `thread` the open chat. Reopening the open thread keeps its history.
    pub fn open_chat(&mut self, thread: ThreadId) {
        if self.chat.as_ref().is_some_and(|c| c.thread() == thread) {
            return;
        }
        self.close_chat();
        let sequencer = std::mem::take(&mut self.chat_tickets);
        self.chat = Some(ChatSession::with_sequencer(thread, sequencer));
    }

    pub fn close_chat(&mut self) {
        if let Some(chat) = self.chat.take() {
            self.chat_tickets = chat.into_sequencer();
        }
    }

    pub fn begin_refresh(&mut self, kind: FeedKind) -> FetchRequest {
        with_feed!(self, kind, |feed| feed.begin_refresh())
    }

    pub fn begin_load_more(&mut self, kind: FeedKind) -> Option<FetchRequest> {
        with_feed!(self, kind, |feed| feed.begin_load_more())
    }

    pub fn fail_fetch(&mut self, kind: FeedKind, ticket: FetchTicket) -> Outcome {
        with_feed!(self, kind, |feed| feed.fail(ticket))
    }

    /// Hand a page to the feed it was requested for. Returns `None` when the
    /// page holds records of a different kind than the feed.
    pub fn apply_page<R: Rng + ?Sized>(
        &mut self,
        kind: FeedKind,
        ticket: FetchTicket,
        page: Page,
        rng: &mut R,
    ) -> Option<Outcome> {
        let total = page.total;
        match page.records {
            PageRecords::Travels(mut records) => {
                for travel in &mut records {
                    travel.assign_placeholder(rng);
                }
                match kind {
                    FeedKind::SavedTravels => Some(self.saved_travels.complete(ticket, records, total)),
                    FeedKind::TravelHistory => Some(self.travel_history.complete(ticket, records, total)),
                    _ => None,
                }
            }
            PageRecords::ChatThreads(records) if kind == FeedKind::ChatThreads => {
                Some(self.chat_threads.complete(ticket, records, total))
            }
            PageRecords::FriendRequests(records) if kind == FeedKind::FriendRequests => {
                Some(self.friend_requests.complete(ticket, records, total))
            }
            PageRecords::Notifications(records) if kind == FeedKind::Notifications => {
                Some(self.notifications.complete(ticket, records, total))
            }
            _ => None,
        }
    }

    /// Drop a record the server just deleted. Returns whether it was present.
    pub fn remove_record(&mut self, target: RemovalTarget) -> bool {
        match target {
            RemovalTarget::Travel { feed: FeedKind::SavedTravels, id } => {
                self.saved_travels.remove_by_id(id).is_some()
            }
            RemovalTarget::Travel { feed: FeedKind::TravelHistory, id } => {
                self.travel_history.remove_by_id(id).is_some()
            }
            RemovalTarget::Travel { .. } => false,
            RemovalTarget::Thread(id) => {
                if self.chat.as_ref().is_some_and(|c| c.thread() == id) {
                    self.close_chat();
                }
                self.chat_threads.remove_by_id(id).is_some()
            }
            RemovalTarget::FriendRequest { id, .. } => self.friend_requests.remove_by_id(id).is_some(),
        }
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }

    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.session.as_ref().map(|s| s.user_id)
    }

    #[must_use]
    pub fn is_subscribed(&self, screen: Screen) -> bool {
        self.subscriptions.iter().any(|(s, _)| *s == screen)
    }

    /// Forget everything tied to the signed-in user. Screen state and
    /// ticket counters survive.
    pub fn clear_user_data(&mut self) {
        self.session = None;
        self.chat_tab = ChatTab::default();
        self.reset_feeds();
        self.close_chat();
        self.toast = None;
        self.banner = None;
    }

    pub fn show_toast(&mut self, toast: Toast) {
        self.toast = Some(toast);
    }
}
