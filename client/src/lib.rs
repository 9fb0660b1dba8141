//! Operational data layer of the hosting dashboard: REST client, roster
//! reconciliation, push-channel subscriber and log tailing.

pub mod api;
pub mod app;
pub mod config;
pub mod logs;
pub mod push;
pub mod roster;
pub mod storage;
pub mod utils;
