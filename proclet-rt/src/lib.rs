//! # proclet-rt - Erlang/OTP-Inspired In-Process Actor Runtime
//!
//! Lightweight processes over Tokio tasks with typed identifiers, bounded
//! mailboxes, links, monitors, exit propagation, a generic-server
//! abstraction, a name registry, and a timer service.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//! use proclet_rt::gen_server::{self, CallResult, GenServer};
//! use proclet_rt::message::{ReplyTo, TermBox};
//! use proclet_rt::process::ProcessContext;
//! use proclet_rt::Env;
//!
//! #[derive(Debug)]
//! struct Get;
//!
//! struct Counter {
//!     count: u64,
//! }
//!
//! #[async_trait]
//! impl GenServer for Counter {
//!     async fn handle_call(
//!         &mut self,
//!         _ctx: &mut ProcessContext,
//!         req: TermBox,
//!         _reply: &mut ReplyTo,
//!     ) -> CallResult {
//!         if req.is::<Get>() {
//!             return CallResult::reply(self.count);
//!         }
//!         self.count += 1;
//!         CallResult::reply(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), proclet_rt::RtError> {
//!     let env = Env::new();
//!     let pid = gen_server::start(&env, Counter { count: 0 }, ()).await?;
//!
//!     let count = pid.call(Get).await?;
//!     assert_eq!(count.downcast_ref::<u64>(), Some(&0));
//!
//!     pid.stop().await
//! }
//! ```
//!
//! # Core Concepts
//!
//! - **Process**: one Tokio task reading two bounded mailboxes (user and
//!   system). Sends never block; a full mailbox pushes back with
//!   `chan_full`.
//! - **[`Pid`]**: the shared process handle - identity, send/call, the exit
//!   signal, and monitor tables.
//! - **Links**: symmetric relationships propagating exits; processes that
//!   trap exits observe them as [`message::Info::Exit`] messages instead.
//! - **Monitors**: directional observation delivering one
//!   [`message::MonitorDown`] per reference.
//! - **Generic server**: the `init`/`handle_call`/`handle_cast`/
//!   `handle_info`/`terminate` loop with tagged results and an inactivity
//!   timer.
//! - **[`Env`]**: the process group - pid allocation, name registry (flat
//!   and prefix-scoped) with automatic cleanup on death, reference
//!   generator.
//! - **[`TimerServer`]**: one-shot and interval deliveries with uniform
//!   cancellation.
//!
//! # Module Organization
//!
//! - [`process`] - handles, messaging, links/monitors, the driver
//! - [`gen_server`] - the generic-server trait, results, and start functions
//! - [`env`] - environments and the name registry
//! - [`timer`] - the timer server and lightweight one-shot timers
//! - [`message`] - payloads ([`message::Term`]) and envelopes
//! - [`mailbox`] - bounded mailboxes
//! - [`tracer`] - callback tracing (console and fan-out implementations)
//! - [`util`] - [`Ref`] and friends
//! - [`error`] - [`RtError`] and [`ExitReason`]

pub mod env;
pub mod error;
pub mod gen_server;
pub mod mailbox;
pub mod message;
pub mod process;
pub mod timer;
pub mod tracer;
pub mod util;

// Re-export commonly used types
pub use env::Env;
pub use error::{ExitReason, RtError};
pub use gen_server::{CallResult, CastResult, GenServer, InitResult};
pub use message::{Info, MonitorDown, ReplyTo, Term, TermBox};
pub use process::{Driver, Pid, ProcResult, ProcessContext, Received, SpawnOpts, WeakPid};
pub use timer::{Timer, TimerServer};
pub use tracer::{ChainTracer, ConsoleTracer, TraceEvent, Tracer};
pub use util::Ref;
