//! Ask an installed Stacks wallet to sign transactions on an app's behalf.
//!
//! A request is signed with the app's session key as an ES256K token, shown
//! to the user in the wallet's own window, and answered with the signed
//! transaction through a per-request message channel.

pub mod address;
pub mod clarity;
pub mod cli;
pub mod codec;
pub mod commands;
pub mod config;
pub mod connect;
pub mod crypto;
pub mod error;
pub mod listener;
pub mod network;
pub mod popup;
pub mod session;
pub mod stacks_tx;
pub mod token;
pub mod transactions;

pub use connect::Connect;
pub use error::{ConnectError, Result};
