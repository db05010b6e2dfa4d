//! The generic-server callback interface.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use async_trait::async_trait;

// Layer 3: Internal module imports
use super::types::{CallResult, CastResult, InitResult};
use crate::error::ExitReason;
use crate::message::{Info, ReplyTo, TermBox};
use crate::process::ProcessContext;

/// Callback interface of a generic server.
///
/// A server is any state struct implementing this trait; the runtime drives
/// it from one task, so callbacks take `&mut self` and never race. The
/// `ctx` parameter is the process context, giving callbacks access to
/// links, monitors, trap-exit, and the process's own pid.
///
/// Every callback has a default: `init` succeeds, calls reply `()`, casts
/// and infos are ignored, `terminate` does nothing. Implement what the
/// server actually needs.
///
/// # Example
/// ```rust,ignore
/// use async_trait::async_trait;
/// use proclet_rt::gen_server::{CallResult, GenServer};
/// use proclet_rt::message::{ReplyTo, TermBox};
/// use proclet_rt::process::ProcessContext;
///
/// struct Counter {
///     count: u64,
/// }
///
/// #[derive(Debug)]
/// struct Bump;
///
/// #[async_trait]
/// impl GenServer for Counter {
///     async fn handle_call(
///         &mut self,
///         _ctx: &mut ProcessContext,
///         req: TermBox,
///         _reply: &mut ReplyTo,
///     ) -> CallResult {
///         if req.is::<Bump>() {
///             self.count += 1;
///         }
///         CallResult::reply(self.count)
///     }
/// }
/// ```
#[async_trait]
pub trait GenServer: Send + 'static {
    /// Initialize the server state.
    ///
    /// The spawner blocks until this returns; returning
    /// [`InitResult::Stop`] (or panicking) fails the start call and the pid
    /// is never handed out.
    async fn init(&mut self, ctx: &mut ProcessContext, args: TermBox) -> InitResult {
        let _ = (ctx, args);
        InitResult::Ok
    }

    /// Handle a synchronous request from [`Pid::call`](crate::process::Pid::call).
    ///
    /// Reply through the returned [`CallResult`], or take `reply` and
    /// answer later from another callback.
    async fn handle_call(
        &mut self,
        ctx: &mut ProcessContext,
        req: TermBox,
        reply: &mut ReplyTo,
    ) -> CallResult {
        let _ = (ctx, req, reply);
        CallResult::reply(())
    }

    /// Handle an asynchronous message from [`Pid::send`](crate::process::Pid::send).
    async fn handle_cast(&mut self, ctx: &mut ProcessContext, req: TermBox) -> CastResult {
        let _ = (ctx, req);
        CastResult::NoReply
    }

    /// Handle a notification: the inactivity timeout, a trapped exit, a
    /// monitor-down, or a [`Pid::send_info`](crate::process::Pid::send_info)
    /// payload.
    async fn handle_info(&mut self, ctx: &mut ProcessContext, info: Info) -> CastResult {
        let _ = (ctx, info);
        CastResult::NoReply
    }

    /// Called exactly once when the server is going down, whatever the
    /// cause. A panic here is recovered and does not mask `reason`.
    async fn terminate(&mut self, ctx: &mut ProcessContext, reason: &ExitReason) {
        let _ = (ctx, reason);
    }
}
