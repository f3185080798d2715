//! Integration test crate for the attribution record store.
//!
//! The scenarios live under `tests/`: `submit_flow.rs` submits and lists
//! end to end over memory and file ledgers, `listing_recovery.rs` lists over
//! damaged records and a damaged index, and `index_race.rs` forces two
//! clients to overlap on the key index append.
//!
//! ```sh
//! cargo test -p shapley-integration-tests
//! ```
