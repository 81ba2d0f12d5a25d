//! CLI command definitions.

pub mod fetch;
pub mod fingerprint;
pub mod inspect;
pub mod prefetch;
pub mod verify;
