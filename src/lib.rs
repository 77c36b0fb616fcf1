//! Client for the developer portal backend: OAuth2 client applications,
//! their credentials, the country/product catalog, product pairings and user
//! accounts, with role gating and a read-through cache in front.

pub mod access;
pub mod api;
pub mod approval;
pub mod cache;
pub mod config;
pub mod disclosure;
pub mod envelope;
pub mod error;
pub mod models;
pub mod mutation;
pub mod portal;
pub mod resources;
pub mod session;

pub use config::Config;
pub use error::{ErrorKind, PortalError};
pub use portal::Portal;
