#![allow(dead_code)]

use std::ops::Range;

use crux_core::testing::AppTester;
use serde_json::json;
use shared::capabilities::NavigationOperation;
use shared::event::AuthToken;
use shared::model::{ChatThread, Notification, SavedTravel, UserId};
use shared::{App, Effect, Event, Model};

pub const ME: UserId = UserId(1);

pub fn signed_in() -> (AppTester<App, Effect>, Model) {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    let _ = app.update(
        Event::SignedIn {
            user_id: ME,
            token: AuthToken::new("t0k3n"),
        },
        &mut model,
    );
    (app, model)
}

pub fn http_urls(effects: &[Effect]) -> Vec<String> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Http(request) => Some(request.operation.url.clone()),
            _ => None,
        })
        .collect()
}

pub fn navigation(effects: &[Effect]) -> Vec<NavigationOperation> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Navigation(request) => Some(request.operation.clone()),
            _ => None,
        })
        .collect()
}

pub fn renders(effects: &[Effect]) -> bool {
    effects.iter().any(|e| matches!(e, Effect::Render(_)))
}

pub fn travels(ids: Range<u64>) -> Vec<SavedTravel> {
    ids.map(|id| {
        serde_json::from_value(json!({
            "id": id,
            "type": "Plane",
            "city_name": format!("City {id}"),
        }))
        .unwrap()
    })
    .collect()
}

pub fn threads(ids: Range<u64>) -> Vec<ChatThread> {
    ids.map(|id| serde_json::from_value(json!({"id": id, "name": format!("Thread {id}")})).unwrap())
        .collect()
}

pub fn notifications(ids: Range<u64>) -> Vec<Notification> {
    ids.map(|id| {
        serde_json::from_value(json!({
            "id": id,
            "push_type": 3,
            "push_title": "New message",
            "object_id": 40 + id,
        }))
        .unwrap()
    })
    .collect()
}
