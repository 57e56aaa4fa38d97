pub mod diagnostic_logger;
pub mod irc_parser;
pub mod irc_service;
pub mod live_notification_service;
pub mod message_bus;
pub mod reconcile_service;
pub mod storage_service;
pub mod streamer_store;
pub mod twitch_service;
