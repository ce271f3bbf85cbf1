//! Core functionality for the portón authentication core.
//!
//! This crate contains the domain types, repository traits and services that
//! make up the authentication and session layer of the record-keeping
//! application: credential verification with progressive account lockout,
//! short-lived signed access tokens, long-lived hashed refresh tokens with
//! revocation, an append-only audit trail and a per-address login rate
//! limiter.
//!
//! Storage backends implement the traits in [`repositories`]; the `porton`
//! crate wires the services together into the boundary operations.

pub mod account;
pub mod audit;
pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod repositories;
pub mod services;
pub mod token;

pub use account::{Account, AccountId, Identity, Permission, Role};
pub use client::ClientInfo;
pub use error::Error;
pub use token::{IssuedRefreshToken, RefreshToken};
