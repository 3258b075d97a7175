//! Core types and trait definitions for the allergen lookup service.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::AllergenStore`]; the API and the CLI
//! depend on the abstraction and on the pure functions in [`analysis`],
//! [`highlight`] and [`access`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
#![allow(async_fn_in_trait)]

pub mod access;
pub mod analysis;
pub mod catalog;
pub mod error;
pub mod highlight;
pub mod history;
pub mod password;
pub mod seed;
pub mod session;
pub mod store;
pub mod user;

pub use error::{Error, Result};
