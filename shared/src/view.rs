use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::chat_history::{ChatSession, MessageId};
use crate::feed::{Emptiness, Feed};
use crate::model::{
    Banner, ChatTab, ChatThread, FriendRequest, Model, Notification, Route, SavedTravel, Screen,
    ThreadId, Toast, ToastKind,
};
use crate::{CHAT_DAY_FORMAT, CHAT_TIME_FORMAT};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FeedView<T> {
    pub items: Vec<T>,
    pub emptiness: Emptiness,
    /// Only true once a refresh has confirmed there is nothing to show.
    pub show_empty_message: bool,
    pub total_count: u64,
    pub can_load_more: bool,
    pub is_refreshing: bool,
    pub is_loading_more: bool,
}

impl<T: Clone> From<&Feed<T>> for FeedView<T> {
    fn from(feed: &Feed<T>) -> Self {
        Self {
            items: feed.records().to_vec(),
            emptiness: feed.emptiness(),
            show_empty_message: feed.emptiness() == Emptiness::IsEmpty,
            total_count: feed.total_count(),
            can_load_more: feed.can_load_more(),
            is_refreshing: feed.is_refreshing(),
            is_loading_more: feed.is_loading_more(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MessageView {
    pub id: MessageId,
    pub body: String,
    pub time: String,
    pub outgoing: bool,
    /// Echoed locally and not yet confirmed by a reload.
    pub pending: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DayView {
    pub label: String,
    pub messages: Vec<MessageView>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChatView {
    pub thread: ThreadId,
    pub peer_name: Option<String>,
    pub peer_image: Option<String>,
    pub days: Vec<DayView>,
    pub is_loading: bool,
    pub is_sending: bool,
}

impl ChatView {
    fn build(chat: &ChatSession, offset: &FixedOffset) -> Self {
        let history = chat.history();
        let peer = history.peer();
        let days = history
            .buckets()
            .iter()
            .map(|bucket| DayView {
                label: bucket
                    .created_at
                    .with_timezone(offset)
                    .format(CHAT_DAY_FORMAT)
                    .to_string(),
                messages: bucket
                    .messages
                    .iter()
                    .map(|m| MessageView {
                        id: m.id,
                        body: m.body.clone(),
                        time: m.created_at.with_timezone(offset).format(CHAT_TIME_FORMAT).to_string(),
                        outgoing: m.is_outgoing(peer),
                        pending: m.is_local_echo(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            thread: chat.thread(),
            peer_name: peer.map(crate::model::Peer::display_name),
            peer_image: peer.and_then(|p| p.profile_image.clone()),
            days,
            is_loading: chat.is_reloading(),
            is_sending: chat.is_sending(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ToastView {
    pub message: String,
    pub kind: ToastKind,
    pub duration_ms: u64,
}

impl ToastView {
    fn build(toast: &Toast, duration_ms: u64) -> Self {
        Self {
            message: toast.message.clone(),
            kind: toast.kind,
            duration_ms,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BannerView {
    pub title: String,
    pub body: String,
    pub route: Option<Route>,
    /// The shell hides the banner after this long.
    pub duration_ms: u64,
}

impl BannerView {
    fn build(banner: &Banner, duration_ms: u64) -> Self {
        Self {
            title: banner.title.clone(),
            body: banner.body.clone(),
            route: banner.route,
            duration_ms,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ViewModel {
    pub signed_in: bool,
    pub active_screen: Option<Screen>,
    pub chat_tab: ChatTab,
    pub saved_travels: FeedView<SavedTravel>,
    pub travel_history: FeedView<SavedTravel>,
    pub chat_threads: FeedView<ChatThread>,
    pub friend_requests: FeedView<FriendRequest>,
    pub notifications: FeedView<Notification>,
    pub chat: Option<ChatView>,
    pub toast: Option<ToastView>,
    pub banner: Option<BannerView>,
}

impl From<&Model> for ViewModel {
    fn from(model: &Model) -> Self {
        let offset = model.config.utc_offset();
        Self {
            signed_in: model.is_signed_in(),
            active_screen: model.active_screen,
            chat_tab: model.chat_tab,
            saved_travels: FeedView::from(&model.saved_travels),
            travel_history: FeedView::from(&model.travel_history),
            chat_threads: FeedView::from(&model.chat_threads),
            friend_requests: FeedView::from(&model.friend_requests),
            notifications: FeedView::from(&model.notifications),
            chat: model.chat.as_ref().map(|c| ChatView::build(c, &offset)),
            toast: model
                .toast
                .as_ref()
                .map(|t| ToastView::build(t, model.config.toast_duration_ms)),
            banner: model
                .banner
                .as_ref()
                .map(|b| BannerView::build(b, model.config.banner_duration_ms)),
        }
    }
}
