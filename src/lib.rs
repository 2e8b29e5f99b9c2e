//! Backend core for the Tradenomix trader network: messaging store, post feed, auth
//! bootstrap, trader directory and the HTTP surface that exposes them.

// Interdiction stricte de pratiques dangereuses ou non idiomatiques
#![deny(unsafe_code)] // Le code unsafe est interdit
#![deny(missing_docs)] // Toute fonction, struct, enum ou module public doit être documenté
#![deny(non_camel_case_types)]
#![deny(unused_must_use)] // Oblige à gérer explicitement les Result et Option
#![deny(non_snake_case)]
#![deny(non_upper_case_globals)]
#![deny(nonstandard_style)]
#![forbid(unsafe_op_in_unsafe_fn)]
// Clippy pour stricte discipline
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::unwrap_used)] // Interdit unwrap()
#![deny(clippy::expect_used)] // Interdit expect()
#![deny(clippy::panic)]
#![deny(clippy::print_stdout)] // Interdit println!() en production
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_in_result)]
#![deny(clippy::redundant_clone)]
#![deny(clippy::shadow_unrelated)]
#![deny(clippy::too_many_arguments)]
#![deny(overflowing_literals)]
#![allow(clippy::module_name_repetitions)]

/// Authentication bootstrap: validation, identity providers, user records, reconciliation.
pub mod auth;
/// Configuration, errors and identifiers shared by every subsystem.
pub mod core;
/// Trader profiles and leaderboard.
pub mod directory;
/// Post feed with likes and comments.
pub mod feed;
/// In-process conversation store with snapshot subscribers.
pub mod messaging;
/// HTTP server and API routes.
#[allow(clippy::missing_errors_doc, clippy::unused_async)]
pub mod server;
/// Entry helpers to start the Tradenomix server.
pub mod start_tradenomix;

pub use crate::core::{TradenomixConfig, TradenomixError, TradenomixResult};
