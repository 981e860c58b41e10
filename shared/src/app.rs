use chrono::Utc;
use secrecy::SecretString;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::capabilities::{api, session, Capabilities};
use crate::event::{Event, PushPayload, RemovalTarget};
use crate::feed::{FetchRequest, Outcome};
use crate::model::{FeedKind, Model, Route, Screen, Session, Toast};
use crate::signals::Signal;
use crate::view::ViewModel;
use crate::{ApiError, MAX_MESSAGE_CHARS};

#[derive(Default)]
pub struct App;

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        trace!(event = event.name(), user = event.is_user_initiated(), "update");

        match event {
            Event::Configure(config) => match config.validate() {
                Ok(()) => {
                    info!(base = %config.api_base_url, limit = config.page_limit.get(), "configured");
                    model.apply_config(config);
                }
                Err(e) => warn!(error = %e, "rejecting config, keeping previous"),
            },

            Event::SessionRestoreRequested => session::restore(&caps.key_value),
            Event::SessionRestored(result) => match result {
                Ok(Some(persisted)) => {
                    info!(user = %persisted.user_id, "session restored");
                    model.session = Some(Session::from(persisted));
                }
                Ok(None) => debug!("no stored session"),
                Err(e) => warn!(error = %e, "could not restore session"),
            },
            Event::SignedIn { user_id, token } => {
                model.clear_user_data();
                let session = Session {
                    user_id,
                    token: token.into_secret(),
                };
                if let Err(e) = session::persist(&caps.key_value, &session) {
                    warn!(error = %e, "could not persist session");
                }
                model.session = Some(session);
                info!(user = %user_id, "signed in");
            }
            Event::SignedOut => {
                model.clear_user_data();
                session::forget(&caps.key_value);
                info!("signed out");
            }
            Event::SessionPersisted(result) => {
                if let Err(e) = result {
                    warn!(error = %e, "session storage failed");
                }
            }

            Event::ScreenOpened(screen) => {
                model.active_screen = Some(screen);
                Self::subscribe(screen, model);
                Self::load_screen(screen, model, caps);
            }
            Event::ScreenFocused(screen) => {
                model.active_screen = Some(screen);
                Self::load_screen(screen, model, caps);
            }
            Event::ScreenClosed(screen) => Self::close_screen(screen, model),
            Event::ChatTabSelected(tab) => {
                model.chat_tab = tab;
                Self::refresh(tab.feed(), model, caps);
            }

            Event::RefreshRequested(feed) => Self::refresh(feed, model, caps),
            Event::LoadMoreRequested(feed) => Self::load_more(feed, model, caps),
            Event::PageLoaded { feed, ticket, result } => match result {
                Ok(page) => {
                    let count = page.records.len();
                    let total = page.total;
                    match model.apply_page(feed, ticket, page, &mut rand::thread_rng()) {
                        Some(Outcome::Applied) => {
                            debug!(feed = %feed, seq = ticket.seq(), count, total, "page applied");
                        }
                        Some(Outcome::Stale) => {}
                        None => {
                            warn!(feed = %feed, "page holds records for another feed");
                            let _ = model.fail_fetch(feed, ticket);
                        }
                    }
                }
                Err(e) => {
                    if model.fail_fetch(feed, ticket) == Outcome::Applied {
                        Self::report(&e, model, caps);
                    } else {
                        debug!(feed = %feed, seq = ticket.seq(), error = %e, "ignoring failure of superseded request");
                    }
                }
            },

            Event::DeleteTravelRequested { feed, id } => match feed {
                FeedKind::SavedTravels | FeedKind::TravelHistory => {
                    Self::request_removal(RemovalTarget::Travel { feed, id }, model, caps);
                }
                other => warn!(feed = %other, "travel delete for a non-travel feed"),
            },
            Event::DeleteThreadRequested(thread) => {
                Self::request_removal(RemovalTarget::Thread(thread), model, caps);
            }
            Event::FriendRequestAnswered { id, accept } => {
                Self::request_removal(RemovalTarget::FriendRequest { id, accept }, model, caps);
            }
            Event::RemovalCompleted { target, result } => match result {
                Ok(()) => {
                    if !model.remove_record(target) {
                        debug!(?target, "removed record was no longer listed");
                    }
                }
                Err(e) => Self::report(&e, model, caps),
            },

            Event::ChatOpened(thread) => {
                model.open_chat(thread);
                Self::reload_chat(model, caps);
            }
            Event::ChatHistoryLoaded {
                thread,
                ticket,
                result,
            } => {
                let Some(chat) = model.chat.as_mut().filter(|c| c.thread() == thread) else {
                    debug!(thread = %thread, "history arrived for a chat that is no longer open");
                    return;
                };
                match result {
                    Ok(page) => {
                        let _ = chat.complete_reload(ticket, page.buckets, page.peer);
                    }
                    Err(e) => {
                        if chat.fail_reload(ticket) == Outcome::Applied {
                            Self::report(&e, model, caps);
                        }
                    }
                }
            }
            Event::MessageSubmitted(body) => Self::send_message(body, model, caps),
            Event::MessageSent { thread, result } => {
                if let Some(chat) = model.chat.as_mut().filter(|c| c.thread() == thread) {
                    chat.finish_send();
                }
                match result {
                    Ok(()) => {
                        if model.chat.as_ref().is_some_and(|c| c.thread() == thread) {
                            Self::reload_chat(model, caps);
                        }
                    }
                    // The echo stays visible until the next reload.
                    Err(e) => Self::report(&e, model, caps),
                }
            }
            Event::ClearHistoryRequested => {
                let Some(thread) = model.chat.as_ref().map(crate::chat_history::ChatSession::thread) else {
                    warn!("clear history without an open chat");
                    return;
                };
                if let Some((base, token)) = Self::api_context(model) {
                    if let Err(e) = api::clear_history(&caps.http, &base, &token, thread) {
                        Self::report(&e, model, caps);
                    }
                }
            }
            Event::ChatHistoryCleared { thread, result } => match result {
                Ok(()) => {
                    if model.chat.as_ref().is_some_and(|c| c.thread() == thread) {
                        Self::reload_chat(model, caps);
                    }
                }
                Err(e) => Self::report(&e, model, caps),
            },

            Event::Publish(signal) => Self::publish(signal, model, caps),
            Event::PushReceived(push) => Self::push_received(push, model, caps),
            Event::PushOpened(push) => match push.route() {
                Some(route) => Self::navigate(route, model, caps),
                None => warn!(push_type = push.push_type, "push without a known destination"),
            },
            Event::BannerTapped => {
                if let Some(route) = model.banner.take().and_then(|b| b.route) {
                    Self::navigate(route, model, caps);
                }
            }
            Event::NotificationTapped(id) => {
                match model.notifications.get(id).and_then(crate::model::Notification::route) {
                    Some(route) => Self::navigate(route, model, caps),
                    None => debug!(notification = %id, "notification has no destination"),
                }
            }

            Event::ToastDismissed => model.toast = None,
            Event::BannerDismissed => model.banner = None,
        }

        caps.render.render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel::from(model)
    }
}

impl App {
    /// Base URL and bearer token for an authenticated call. Without either
    /// the call is skipped and the user is told why.
    fn api_context(model: &mut Model) -> Option<(Url, SecretString)> {
        let Some(token) = model.session.as_ref().map(|s| s.token.clone()) else {
            warn!("request without a session");
            model.show_toast(Toast::error("Please sign in to continue."));
            return None;
        };
        match model.config.base_url() {
            Ok(base) => Some((base, token)),
            Err(e) => {
                warn!(error = %e, "no usable api base url");
                model.show_toast(Toast::error("The app is misconfigured. Please update it."));
                None
            }
        }
    }

    /// Toast the failure; an expired session also sends the user back to login.
    fn report(error: &ApiError, model: &mut Model, caps: &Capabilities) {
        warn!(code = error.code(), error = %error, "request failed");
        if error.is_unauthorized() {
            model.clear_user_data();
            session::forget(&caps.key_value);
            caps.navigation.reset_to_login(model.config.auth_reset_delay_ms);
        }
        model.show_toast(Toast::error(error.user_facing_message()));
    }

    fn subscribe(screen: Screen, model: &mut Model) {
        if model.is_subscribed(screen) {
            return;
        }
        for &signal in screen.signals() {
            let subscription = model.bus.subscribe(signal, screen);
            model.subscriptions.push((screen, subscription));
        }
    }

    fn close_screen(screen: Screen, model: &mut Model) {
        let (closing, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut model.subscriptions)
            .into_iter()
            .partition(|(s, _)| *s == screen);
        model.subscriptions = kept;
        for (_, subscription) in closing {
            model.bus.unsubscribe(subscription);
        }
        if model.active_screen == Some(screen) {
            model.active_screen = None;
        }
        if screen == Screen::ChatHistory {
            model.close_chat();
        }
    }

    fn load_screen(screen: Screen, model: &mut Model, caps: &Capabilities) {
        if screen == Screen::ChatHistory {
            if model.chat.is_some() {
                Self::reload_chat(model, caps);
            }
        } else if let Some(feed) = screen.feed(model.chat_tab) {
            Self::refresh(feed, model, caps);
        }
    }

    fn refresh(feed: FeedKind, model: &mut Model, caps: &Capabilities) {
        let Some((base, token)) = Self::api_context(model) else {
            return;
        };
        let request = model.begin_refresh(feed);
        Self::fetch(feed, request, &base, &token, model, caps);
    }

    fn load_more(feed: FeedKind, model: &mut Model, caps: &Capabilities) {
        let Some((base, token)) = Self::api_context(model) else {
            return;
        };
        match model.begin_load_more(feed) {
            Some(request) => Self::fetch(feed, request, &base, &token, model, caps),
            None => trace!(feed = %feed, "nothing more to load"),
        }
    }

    fn fetch(
        feed: FeedKind,
        request: FetchRequest,
        base: &Url,
        token: &SecretString,
        model: &mut Model,
        caps: &Capabilities,
    ) {
        if let Err(e) = api::fetch_page(&caps.http, base, token, feed, request.ticket, request.cursor) {
            let _ = model.fail_fetch(feed, request.ticket);
            Self::report(&e, model, caps);
        }
    }

    fn request_removal(target: RemovalTarget, model: &mut Model, caps: &Capabilities) {
        let Some((base, token)) = Self::api_context(model) else {
            return;
        };
        if let Err(e) = api::remove(&caps.http, &base, &token, target) {
            Self::report(&e, model, caps);
        }
    }

    fn reload_chat(model: &mut Model, caps: &Capabilities) {
        let Some((base, token)) = Self::api_context(model) else {
            return;
        };
        let Some(chat) = model.chat.as_mut() else {
            return;
        };
        let thread = chat.thread();
        let ticket = chat.begin_reload();
        if let Err(e) = api::fetch_history(&caps.http, &base, &token, thread, ticket) {
            let _ = chat.fail_reload(ticket);
            Self::report(&e, model, caps);
        }
    }

    fn send_message(body: String, model: &mut Model, caps: &Capabilities) {
        let body = body.trim().to_string();
        if body.is_empty() {
            return;
        }
        if body.chars().count() > MAX_MESSAGE_CHARS {
            model.show_toast(Toast::error(format!(
                "Messages can be at most {MAX_MESSAGE_CHARS} characters."
            )));
            return;
        }
        let Some(author) = model.user_id() else {
            warn!("message submitted without a session");
            model.show_toast(Toast::error("Please sign in to continue."));
            return;
        };
        let Some((base, token)) = Self::api_context(model) else {
            return;
        };
        let now = Utc::now().with_timezone(&model.config.utc_offset());
        let Some(chat) = model.chat.as_mut() else {
            warn!("message submitted without an open chat");
            return;
        };
        let Some(recipient) = chat.history().peer().map(|p| p.id) else {
            model.show_toast(Toast::error("This chat is still loading. Please try again."));
            return;
        };

        let thread = chat.thread();
        let echo = chat.history_mut().append_local_message(body.as_str(), author, now);
        chat.begin_send();
        debug!(thread = %thread, ?echo, "echoed outgoing message");

        if let Err(e) = api::send_message(&caps.http, &base, &token, thread, recipient, &body) {
            chat.finish_send();
            Self::report(&e, model, caps);
        }
    }

    fn publish(signal: Signal, model: &mut Model, caps: &Capabilities) {
        let mut targets = Vec::new();
        let delivered = model.bus.publish(signal, |screen| targets.push(*screen));
        debug!(?signal, delivered, "signal published");

        for screen in targets {
            match (screen, signal) {
                (Screen::Home, Signal::SavedTravelsChanged) => {
                    Self::refresh(FeedKind::SavedTravels, model, caps);
                }
                (Screen::Travels, Signal::SavedTravelsChanged) => {
                    Self::refresh(FeedKind::TravelHistory, model, caps);
                }
                (Screen::ChatHistory, Signal::ChatHistoryChanged) => Self::reload_chat(model, caps),
                (screen, signal) => trace!(?screen, ?signal, "screen ignores signal"),
            }
        }
    }

    fn push_received(push: PushPayload, model: &mut Model, caps: &Capabilities) {
        if model.active_screen == Some(Screen::ChatHistory) {
            Self::publish(Signal::ChatHistoryChanged, model, caps);
            return;
        }
        let route = push.route();
        if route.is_none() {
            debug!(push_type = push.push_type, "push type has no destination");
        }
        model.banner = Some(crate::model::Banner {
            title: push.push_title,
            body: push.body,
            route,
        });
    }

    fn navigate(route: Route, model: &mut Model, caps: &Capabilities) {
        if let Route::Chat { tab } = route {
            model.chat_tab = tab;
        }
        debug!(?route, "navigating");
        caps.navigation.open(route);
    }
}
