pub mod config;
pub mod db;
pub mod error;

pub use db::{Gateway, GatewayOptions};
pub use error::TallyError;
