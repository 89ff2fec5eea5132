//! Domain queries and mutations built on the query cache.

pub mod flashcards;
pub mod keys;
pub mod notifications;

pub use flashcards::FlashcardQueries;
pub use notifications::NotificationQueries;
