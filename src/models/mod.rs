pub mod chat;
pub mod settings;
pub mod stream;
pub mod streamer;
pub mod user;
