pub mod api_types;
pub mod auth;
pub mod flashcards;
pub mod gateway;
pub mod notifications;
pub mod types;
pub mod uploads;

pub use auth::{AuthApi, ProfileUpdate};
pub use flashcards::{FlashcardApi, SuggestionQuery};
pub use gateway::HttpGateway;
pub use notifications::NotificationApi;
pub use uploads::UploadApi;
