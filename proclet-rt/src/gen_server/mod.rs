//! Generic servers: a request/reply process pattern with fixed callbacks.
//!
//! - [`GenServer`] - the callback trait (`init`, `handle_call`,
//!   `handle_cast`, `handle_info`, `terminate`)
//! - [`InitResult`] / [`CallResult`] / [`CastResult`] - tagged results
//! - [`start`] / [`start_opts`] / [`start_link`] - spawn with the init
//!   handshake

pub mod run;
pub mod traits;
pub mod types;

pub use run::{start, start_link, start_opts};
pub use traits::GenServer;
pub use types::{CallResult, CastResult, InitResult};
