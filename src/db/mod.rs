//! Vote store: models, schema and the SQLite-backed gateway.
//!
//! Layout:
//! - `models.rs`: records written to and aggregates read from the store
//! - `schema.rs`: bootstrap DDL and the prepared statements
//! - `sqlite.rs`: `Gateway`, the single persistence entry point

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::{MediaVote, NewMediaPlay, User, UserStats, Vote, VoteTally, WriteResult};
pub use sqlite::{Gateway, GatewayOptions};
