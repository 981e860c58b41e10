use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::feed::{FetchTicket, Outcome, Sequencer};
use crate::model::{server_time, Peer, ThreadId, UserId};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum MessageId {
    Server(u64),
    Local(Uuid),
}

/// Where a message in the history came from.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageOrigin {
    #[default]
    Remote,
    /// Echoed locally before the server confirmed it.
    Local,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender_id: UserId,
    #[serde(rename = "message", default)]
    pub body: String,
    #[serde(with = "server_time")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub origin: MessageOrigin,
}

impl ChatMessage {
    #[must_use]
    pub fn is_local_echo(&self) -> bool {
        self.origin == MessageOrigin::Local
    }

    /// Right-hand bubble: anything we echoed, or anything not sent by the peer.
    #[must_use]
    pub fn is_outgoing(&self, peer: Option<&Peer>) -> bool {
        self.is_local_echo() || peer.map_or(true, |p| p.id != self.sender_id)
    }
}

/// All messages sent on one calendar day.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DayBucket {
    #[serde(with = "server_time")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "all_message", default)]
    pub messages: Vec<ChatMessage>,
}

impl DayBucket {
    fn is_same_day(&self, now: &DateTime<FixedOffset>) -> bool {
        self.created_at.with_timezone(now.offset()).date_naive() == now.date_naive()
    }
}

/// Day-bucketed history of one chat thread, plus any locally echoed messages
/// that the next server reload will replace.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChatHistory {
    buckets: Vec<DayBucket>,
    peer: Option<Peer>,
}

impl ChatHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Echo a message the user just typed. Returns the echo's local id.
    pub fn append_local_message(
        &mut self,
        body: impl Into<String>,
        author: UserId,
        now: DateTime<FixedOffset>,
    ) -> MessageId {
        let id = MessageId::Local(Uuid::new_v4());
        let created_at = now.with_timezone(&Utc);
        let message = ChatMessage {
            id,
            sender_id: author,
            body: body.into(),
            created_at,
            origin: MessageOrigin::Local,
        };

        match self.buckets.last_mut() {
            Some(last) if !last.messages.is_empty() && last.is_same_day(&now) => {
                last.messages.push(message);
            }
            _ => self.buckets.push(DayBucket {
                created_at,
                messages: vec![message],
            }),
        }
        id
    }

    /// Replace everything with the server's view; every local echo is dropped.
    pub fn replace_from_server(&mut self, buckets: Vec<DayBucket>, peer: Option<Peer>) {
        self.buckets = buckets;
        if peer.is_some() {
            self.peer = peer;
        }
    }

    #[must_use]
    pub fn buckets(&self) -> &[DayBucket] {
        &self.buckets
    }

    #[must_use]
    pub fn peer(&self) -> Option<&Peer> {
        self.peer.as_ref()
    }

    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.buckets.iter().flat_map(|b| b.messages.iter())
    }

    #[must_use]
    pub fn local_echo_count(&self) -> usize {
        self.messages().filter(|m| m.is_local_echo()).count()
    }
}

/// The chat thread currently open on the ChatHistory screen.
#[derive(Debug)]
pub struct ChatSession {
    thread: ThreadId,
    history: ChatHistory,
    sequencer: Sequencer,
    pending_sends: u32,
}

impl ChatSession {
    #[must_use]
    pub fn new(thread: ThreadId) -> Self {
        Self::with_sequencer(thread, Sequencer::default())
    }

    /// Open `thread` continuing the ticket numbering of an earlier session.
    #[must_use]
    pub fn with_sequencer(thread: ThreadId, mut sequencer: Sequencer) -> Self {
        let _ = sequencer.cancel();
        Self {
            thread,
            history: ChatHistory::new(),
            sequencer,
            pending_sends: 0,
        }
    }

    /// Close the session, keeping its ticket counter for the next one.
    #[must_use]
    pub fn into_sequencer(self) -> Sequencer {
        let mut sequencer = self.sequencer;
        let _ = sequencer.cancel();
        sequencer
    }

    #[must_use]
    pub const fn thread(&self) -> ThreadId {
        self.thread
    }

    #[must_use]
    pub const fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut ChatHistory {
        &mut self.history
    }

    pub fn begin_reload(&mut self) -> FetchTicket {
        self.sequencer.issue()
    }

    pub fn complete_reload(
        &mut self,
        ticket: FetchTicket,
        buckets: Vec<DayBucket>,
        peer: Option<Peer>,
    ) -> Outcome {
        if !self.sequencer.settle(ticket) {
            tracing::debug!(thread = %self.thread, %ticket, "dropping stale chat history");
            return Outcome::Stale;
        }
        self.history.replace_from_server(buckets, peer);
        Outcome::Applied
    }

    pub fn fail_reload(&mut self, ticket: FetchTicket) -> Outcome {
        if self.sequencer.settle(ticket) {
            Outcome::Applied
        } else {
            Outcome::Stale
        }
    }

    #[must_use]
    pub const fn in_flight(&self) -> Option<FetchTicket> {
        self.sequencer.in_flight()
    }

    #[must_use]
    pub const fn is_reloading(&self) -> bool {
        self.in_flight().is_some()
    }

    pub fn begin_send(&mut self) {
        self.pending_sends = self.pending_sends.saturating_add(1);
    }

    pub fn finish_send(&mut self) {
        self.pending_sends = self.pending_sends.saturating_sub(1);
    }

    #[must_use]
    pub const fn is_sending(&self) -> bool {
        self.pending_sends > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn local(offset_hours: i32, y: i32, m: u32, d: u32, h: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(offset_hours * 3600)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, 0, 0)
            .unwrap()
    }

    fn server_message(id: u64, sender: u64, at: DateTime<Utc>) -> ChatMessage {
        ChatMessage {
            id: MessageId::Server(id),
            sender_id: UserId(sender),
            body: format!("message {id}"),
            created_at: at,
            origin: MessageOrigin::Remote,
        }
    }

    fn bucket(at: DateTime<Utc>, messages: Vec<ChatMessage>) -> DayBucket {
        DayBucket { created_at: at, messages }
    }

    fn peer(id: u64) -> Peer {
        Peer {
            id: UserId(id),
            first_name: "Ana".into(),
            last_name: "Silva".into(),
            profile_image: None,
        }
    }

    #[test]
    fn echo_into_empty_history_creates_bucket() {
        let mut history = ChatHistory::new();
        history.append_local_message("hi", UserId(1), local(0, 2024, 3, 1, 10));
        assert_eq!(history.buckets().len(), 1);
        assert_eq!(history.buckets()[0].messages.len(), 1);
        assert!(history.buckets()[0].messages[0].is_local_echo());
    }

    #[test]
    fn echo_same_day_appends_to_last_bucket() {
        let mut history = ChatHistory::new();
        history.replace_from_server(
            vec![bucket(utc(2024, 3, 1, 8), vec![server_message(1, 2, utc(2024, 3, 1, 8))])],
            Some(peer(2)),
        );
        history.append_local_message("hello", UserId(1), local(0, 2024, 3, 1, 18));
        assert_eq!(history.buckets().len(), 1);
        assert_eq!(history.buckets()[0].messages.len(), 2);
    }

    #[test]
    fn echo_next_day_opens_new_bucket() {
        let mut history = ChatHistory::new();
        history.replace_from_server(
            vec![bucket(utc(2024, 3, 1, 8), vec![server_message(1, 2, utc(2024, 3, 1, 8))])],
            None,
        );
        history.append_local_message("morning", UserId(1), local(0, 2024, 3, 2, 7));
        assert_eq!(history.buckets().len(), 2);
    }

    #[test]
    fn calendar_day_is_judged_in_local_offset() {
        // 23:00 UTC on the 1st is already the 2nd at UTC+2.
        let mut history = ChatHistory::new();
        history.replace_from_server(
            vec![bucket(utc(2024, 3, 1, 23), vec![server_message(1, 2, utc(2024, 3, 1, 23))])],
            None,
        );
        history.append_local_message("late", UserId(1), local(2, 2024, 3, 2, 9));
        assert_eq!(history.buckets().len(), 1);
    }

    #[test]
    fn empty_last_bucket_is_not_reused() {
        let mut history = ChatHistory::new();
        history.replace_from_server(vec![bucket(utc(2024, 3, 1, 8), vec![])], None);
        history.append_local_message("hi", UserId(1), local(0, 2024, 3, 1, 9));
        assert_eq!(history.buckets().len(), 2);
    }

    #[test]
    fn reload_discards_all_echoes() {
        let mut history = ChatHistory::new();
        history.append_local_message("one", UserId(1), local(0, 2024, 3, 1, 9));
        history.append_local_message("two", UserId(1), local(0, 2024, 3, 1, 9));
        assert_eq!(history.local_echo_count(), 2);

        let server = vec![bucket(
            utc(2024, 3, 1, 9),
            vec![server_message(10, 1, utc(2024, 3, 1, 9))],
        )];
        history.replace_from_server(server.clone(), Some(peer(2)));
        assert_eq!(history.local_echo_count(), 0);
        assert_eq!(history.buckets(), server.as_slice());
    }

    #[test]
    fn echo_is_outgoing_even_when_sender_matches_peer() {
        let p = peer(1);
        let mut history = ChatHistory::new();
        history.append_local_message("hi", UserId(1), local(0, 2024, 3, 1, 9));
        let echo = history.messages().next().unwrap();
        assert!(echo.is_outgoing(Some(&p)));

        let incoming = server_message(5, 1, utc(2024, 3, 1, 9));
        assert!(!incoming.is_outgoing(Some(&p)));
        let mine = server_message(6, 7, utc(2024, 3, 1, 9));
        assert!(mine.is_outgoing(Some(&p)));
    }

    #[test]
    fn server_payload_parses() {
        let raw = serde_json::json!([{
            "created_at": "2024-03-01 08:15:00",
            "all_message": [
                {"id": 91, "sender_id": "4", "message": "hey", "created_at": "2024-03-01 08:15:00"}
            ]
        }]);
        let buckets: Vec<DayBucket> = serde_json::from_value(raw).unwrap();
        let msg = &buckets[0].messages[0];
        assert_eq!(msg.id, MessageId::Server(91));
        assert_eq!(msg.sender_id, UserId(4));
        assert_eq!(msg.origin, MessageOrigin::Remote);
    }

    #[test]
    fn stale_reload_is_dropped() {
        let mut session = ChatSession::new(ThreadId(3));
        let first = session.begin_reload();
        let second = session.begin_reload();
        let old = vec![bucket(utc(2024, 3, 1, 8), vec![server_message(1, 2, utc(2024, 3, 1, 8))])];
        assert_eq!(session.complete_reload(first, old, None), Outcome::Stale);
        assert!(session.history().buckets().is_empty());
        assert!(session.is_reloading());
        assert_eq!(session.complete_reload(second, vec![], None), Outcome::Applied);
        assert!(!session.is_reloading());
    }

    #[test]
    fn reopened_session_rejects_reloads_of_the_previous_one() {
        let mut first = ChatSession::new(ThreadId(3));
        let old = first.begin_reload();

        let mut reopened = ChatSession::with_sequencer(ThreadId(3), first.into_sequencer());
        assert!(!reopened.is_reloading());
        let current = reopened.begin_reload();
        assert_ne!(old, current);

        let late = vec![bucket(utc(2024, 3, 1, 8), vec![server_message(1, 2, utc(2024, 3, 1, 8))])];
        assert_eq!(reopened.complete_reload(old, late, None), Outcome::Stale);
        assert!(reopened.history().buckets().is_empty());
        assert_eq!(reopened.in_flight(), Some(current));
    }
}
