//! Persisted client-side stores. Each store owns one storage namespace and is
//! the only writer to it.

mod cards;
mod cookies;
mod push;
mod session;
mod settings;

pub use cards::CardStore;
pub use push::PushTokenStore;
pub use session::{SessionStore, SessionToken};
pub use settings::{SettingsStore, Theme};
