// The core module contains all business logic.
// Nothing in here knows about serenity; the Discord layer adapts to it.

#[path = "modules/mod.rs"]
pub mod modules;

#[path = "storage/kv_store.rs"]
pub mod storage;

#[path = "timezones/timezone_module.rs"]
pub mod timezones;
