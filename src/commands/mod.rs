pub mod chat;
pub mod console;
pub mod notifications;
pub mod settings;
pub mod streamers;
