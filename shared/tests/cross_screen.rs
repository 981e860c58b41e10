mod common;

use common::{http_urls, signed_in};
use shared::model::Screen;
use shared::signals::Signal;
use shared::Event;

#[test]
fn saved_travel_change_refreshes_every_open_travel_screen() {
    let (app, mut model) = signed_in();

    // 1. Home and Travels both open (Home stays mounted under Travels).
    let _ = app.update(Event::ScreenOpened(Screen::Home), &mut model);
    let _ = app.update(Event::ScreenOpened(Screen::Travels), &mut model);
    assert_eq!(model.bus.subscriber_count(Signal::SavedTravelsChanged), 2);

    // 2. Another screen saves a travel.
    let update = app.update(Event::Publish(Signal::SavedTravelsChanged), &mut model);
    let urls = http_urls(&update.effects);
    assert_eq!(urls.len(), 2);
    assert!(urls[0].contains("travels/saved"));
    assert!(urls[1].contains("travels/history"));

    // 3. Closing Travels disposes its subscription.
    let _ = app.update(Event::ScreenClosed(Screen::Travels), &mut model);
    let update = app.update(Event::Publish(Signal::SavedTravelsChanged), &mut model);
    let urls = http_urls(&update.effects);
    assert_eq!(urls.len(), 1);
    assert!(urls[0].contains("travels/saved"));
}

#[test]
fn reopening_a_screen_does_not_double_subscribe() {
    let (app, mut model) = signed_in();
    let _ = app.update(Event::ScreenOpened(Screen::Home), &mut model);
    let _ = app.update(Event::ScreenOpened(Screen::Home), &mut model);
    assert_eq!(model.bus.subscriber_count(Signal::SavedTravelsChanged), 1);
}

#[test]
fn signal_without_subscribers_is_dropped() {
    let (app, mut model) = signed_in();
    let update = app.update(Event::Publish(Signal::ChatHistoryChanged), &mut model);
    assert!(http_urls(&update.effects).is_empty());

    // Opening the chat afterwards does not replay it.
    let _ = app.update(Event::ScreenOpened(Screen::ChatHistory), &mut model);
    assert!(model.chat.is_none());
    assert_eq!(model.bus.subscriber_count(Signal::ChatHistoryChanged), 1);
}

#[test]
fn unauthorized_keeps_screen_subscriptions() {
    let (app, mut model) = signed_in();
    let _ = app.update(Event::ScreenOpened(Screen::Home), &mut model);
    let ticket = model.saved_travels.in_flight().unwrap();
    let _ = app.update(
        Event::PageLoaded {
            feed: shared::model::FeedKind::SavedTravels,
            ticket,
            result: Err(shared::ApiError::Unauthorized {
                message: "expired".into(),
            }),
        },
        &mut model,
    );
    assert!(model.session.is_none());
    assert_eq!(model.bus.subscriber_count(Signal::SavedTravelsChanged), 1);

    // Signed out: a publish reaches Home but no request goes out.
    let update = app.update(Event::Publish(Signal::SavedTravelsChanged), &mut model);
    assert!(http_urls(&update.effects).is_empty());
}
