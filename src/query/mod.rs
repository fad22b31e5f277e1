//! Key enumeration over a store's streaming key listing

pub mod keys;

pub use keys::{coerce_token, decode_key, list_keys};
