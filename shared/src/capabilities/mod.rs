pub mod api;
mod navigation;
pub mod session;

pub use self::api::Envelope;
pub use self::navigation::{Navigation, NavigationOperation};
pub use self::session::{PersistedSession, SessionError};

pub use crux_core::render::Render;
pub use crux_http::Http;
pub use crux_kv::KeyValue;

use crate::app::App;
use crate::event::Event;

pub type AppHttp = Http<Event>;
pub type AppKv = KeyValue<Event>;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub http: Http<Event>,
    pub key_value: KeyValue<Event>,
    pub render: Render<Event>,
    pub navigation: Navigation<Event>,
}
