//! Wire and data types shared between the dashboard client and the hosting
//! platform's backend: raw endpoint payloads, the canonical instance record
//! they normalize into, push-channel frames and REST envelopes.

pub mod playerdiff;
pub mod push;
pub mod raw;
pub mod records;
pub mod rest;
