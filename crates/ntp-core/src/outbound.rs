//! A single, global `reqwest::Client`, built once and reused for every
//! upstream call. No `http::Request` indirection layer, since this service
//! only ever runs natively — there's no wasm32 host transport to support.

use once_cell::sync::Lazy;
use reqwest::Client;
use std::time::Duration;

pub static CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .expect("failed to build outbound HTTP client")
});
