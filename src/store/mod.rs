//! Job persistence.
//!
//! # Architecture
//!
//! The store has three layers:
//!
//! 1. **[`JobStore<B>`](job_store::JobStore)** -- Key naming, record
//!    serialization, retention, the start-time index and terminal-state
//!    immutability. Generic over any [`StoreBackend`].
//!
//! 2. **[`StoreClient`](client::StoreClient)** -- An ordered endpoint list
//!    with one writable endpoint. Writes go to the writable endpoint, reads
//!    fall back across all of them. Implements [`StoreBackend`] itself, so a
//!    `JobStore<StoreClient>` is the production configuration.
//!
//! 3. **[`StoreBackend`]** -- Dumb KV trait that nodes implement (in-memory,
//!    Redis). No domain logic.
//!
//! # Backends
//!
//! - [`InMemoryBackend`](memory::InMemoryBackend) -- `DashMap` backed, with
//!   TTL and a switch that simulates an outage.
//! - [`RedisBackend`](crate::store::redis::RedisBackend) -- standalone or
//!   sentinel-resolved Redis. Available behind the `redis` feature flag.

pub mod backend;
pub mod client;
pub mod job_store;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use backend::{ScoreBound, ScoreRange, ScoredMember, StoreBackend, StoreError};
pub use client::{Endpoint, StoreClient};
pub use job_store::{CreateOutcome, JobStore};
pub use memory::InMemoryBackend;
