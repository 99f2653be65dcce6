//! Remote backend adapter: reqwest client, response envelopes, cookie session.

pub mod client;
pub mod cookies;
pub mod envelope;
pub mod error;
pub mod wire;

pub use client::ApiClient;
