//! The generic-server loop and start functions.

// Layer 1: Standard library imports
use std::panic::AssertUnwindSafe;
use std::time::Duration;

// Layer 2: Third-party crate imports
use futures::FutureExt;
use tokio::sync::oneshot;
use tokio::time::Instant;

// Layer 3: Internal module imports
use super::traits::GenServer;
use super::types::{CallResult, CastResult, InitResult};
use crate::env::environment::Allocated;
use crate::env::Env;
use crate::error::{ExitReason, RtError};
use crate::message::{Info, ReplyTo, Term, TermBox, UsrMsg};
use crate::process::driver::{panic_message, Driver};
use crate::process::{Pid, ProcessContext, SpawnOpts};

const TAG_INIT: &str = "Init";
const TAG_HANDLE_CALL: &str = "HandleCall";
const TAG_HANDLE_CAST: &str = "HandleCast";
const TAG_HANDLE_INFO: &str = "HandleInfo";
const TAG_TERMINATE: &str = "Terminate";

/// Start a generic server in `env` with default options.
///
/// Blocks until the server's `init` has run; the pid is returned only on a
/// successful handshake.
///
/// # Errors
///
/// The reason returned by a failed `init` (as [`RtError::Callback`], or
/// [`RtError::NoProc`] for reason `no_proc`), or a registration error when
/// the options name the process.
pub async fn start<G: GenServer>(env: &Env, server: G, args: impl Term) -> Result<Pid, RtError> {
    start_opts(env, server, args, SpawnOpts::new()).await
}

/// Start a generic server with explicit [`SpawnOpts`].
///
/// With a name and `with_spawn_or_locate`, an existing registration short-
/// circuits the spawn: the existing pid is returned and `server` is
/// dropped without running.
pub async fn start_opts<G: GenServer>(
    env: &Env,
    server: G,
    args: impl Term,
    opts: SpawnOpts,
) -> Result<Pid, RtError> {
    let link_to = opts.link_to().cloned();
    let tracer = opts.tracer().cloned();

    let (pid, mailboxes) = match env.alloc_pid(&opts)? {
        Allocated::Existing(pid) => return Ok(pid),
        Allocated::New(pid, mailboxes) => (pid, mailboxes),
    };

    let driver = Driver::new(ProcessContext::new(pid.clone(), tracer), mailboxes);
    let (init_tx, init_rx) = oneshot::channel();

    tokio::spawn(run_server(server, driver, Box::new(args), init_tx, link_to));

    match init_rx.await {
        Ok(Ok(())) => Ok(pid),
        Ok(Err(reason)) => Err(RtError::from(reason)),
        Err(_) => Err(RtError::NoProc),
    }
}

/// Start a generic server linked to `parent`, in `parent`'s environment.
pub async fn start_link<G: GenServer>(
    parent: &Pid,
    server: G,
    args: impl Term,
    opts: SpawnOpts,
) -> Result<Pid, RtError> {
    let env = Env::from_shared(parent.env_shared()?);
    start_opts(&env, server, args, opts.with_link_to(parent.clone())).await
}

enum Step {
    Continue(Option<Duration>),
    Stop(ExitReason),
}

fn arm(timeout: Duration) -> Option<Instant> {
    if timeout.is_zero() {
        None
    } else {
        Some(Instant::now() + timeout)
    }
}

async fn idle_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// The server loop. Spawned as the process task; finishes with teardown.
pub(crate) async fn run_server<G: GenServer>(
    mut server: G,
    mut driver: Driver,
    args: TermBox,
    init_tx: oneshot::Sender<Result<(), ExitReason>>,
    link_to: Option<Pid>,
) {
    if let Some(parent) = link_to {
        driver.ctx.link(&parent);
    }

    let mut deadline: Option<Instant> = None;

    let reason: ExitReason = 'run: {
        // -------- init + handshake
        let span = driver.ctx.trace_enter(TAG_INIT, &args);
        let outcome = AssertUnwindSafe(server.init(&mut driver.ctx, args))
            .catch_unwind()
            .await;

        let failed = match outcome {
            Ok(result) => {
                driver.ctx.trace_exit(span, TAG_INIT, &result);
                match result {
                    InitResult::Ok => None,
                    InitResult::Timeout(timeout) => {
                        deadline = arm(timeout);
                        None
                    }
                    InitResult::Stop(reason) => Some(reason),
                }
            }
            Err(panic) => {
                let reason = ExitReason::Other(panic_message(panic));
                driver.ctx.trace_exit(span, TAG_INIT, &reason);
                Some(reason)
            }
        };

        if let Some(reason) = failed {
            let _ = init_tx.send(Err(reason.clone()));
            break 'run reason;
        }
        let _ = init_tx.send(Ok(()));

        // -------- main loop
        loop {
            // system messages first, without blocking
            while let Some(msg) = driver.sys.try_recv() {
                if let Err(reason) = driver.ctx.handle_sys_msg(msg) {
                    break 'run reason;
                }
            }

            let idle = idle_until(deadline);
            tokio::select! {
                biased;
                msg = driver.sys.recv() => match msg {
                    Some(msg) => {
                        if let Err(reason) = driver.ctx.handle_sys_msg(msg) {
                            break 'run reason;
                        }
                    }
                    None => break 'run ExitReason::Normal,
                },
                msg = driver.usr.recv() => {
                    let Some(msg) = msg else {
                        break 'run ExitReason::Normal;
                    };
                    let step = match msg {
                        UsrMsg::Call { req, reply } => {
                            do_call(&mut server, &mut driver.ctx, req, reply).await
                        }
                        UsrMsg::Cast(req) => {
                            do_cast(&mut server, &mut driver.ctx, req).await
                        }
                        UsrMsg::Info(info) => {
                            do_info(&mut server, &mut driver.ctx, info).await
                        }
                    };
                    match step {
                        Step::Continue(next) => deadline = next.and_then(arm),
                        Step::Stop(reason) => break 'run reason,
                    }
                }
                _ = idle => {
                    deadline = None;
                    match do_info(&mut server, &mut driver.ctx, Info::Timeout).await {
                        Step::Continue(next) => deadline = next.and_then(arm),
                        Step::Stop(reason) => break 'run reason,
                    }
                }
            }
        }
    };

    // -------- terminate, exactly once, never masking the reason
    let span = driver.ctx.trace_enter(TAG_TERMINATE, &reason);
    let _ = AssertUnwindSafe(server.terminate(&mut driver.ctx, &reason))
        .catch_unwind()
        .await;
    driver.ctx.trace_exit(span, TAG_TERMINATE, &reason);

    driver.teardown(reason);
}

async fn do_call<G: GenServer>(
    server: &mut G,
    ctx: &mut ProcessContext,
    req: TermBox,
    mut reply: ReplyTo,
) -> Step {
    let span = ctx.trace_enter(TAG_HANDLE_CALL, &req);
    let outcome = AssertUnwindSafe(server.handle_call(ctx, req, &mut reply))
        .catch_unwind()
        .await;

    match outcome {
        Ok(result) => {
            ctx.trace_exit(span, TAG_HANDLE_CALL, &result);
            match result {
                CallResult::Reply(value) => {
                    reply.reply_term(value);
                    Step::Continue(None)
                }
                CallResult::ReplyTimeout(value, timeout) => {
                    reply.reply_term(value);
                    Step::Continue(Some(timeout))
                }
                CallResult::NoReply => Step::Continue(None),
                CallResult::NoReplyTimeout(timeout) => Step::Continue(Some(timeout)),
                CallResult::Stop(reason, value) => {
                    reply.reply_term(value);
                    Step::Stop(reason)
                }
                CallResult::Failure(err) => {
                    let reason = ExitReason::Other(err.to_string());
                    reply.reply_err(err);
                    Step::Stop(reason)
                }
            }
        }
        Err(panic) => {
            let message = panic_message(panic);
            ctx.trace_exit(span, TAG_HANDLE_CALL, &format_args!("crashed: {message}"));
            reply.reply_err(RtError::Callback(message.clone()));
            Step::Stop(ExitReason::Other(message))
        }
    }
}

async fn do_cast<G: GenServer>(server: &mut G, ctx: &mut ProcessContext, req: TermBox) -> Step {
    let span = ctx.trace_enter(TAG_HANDLE_CAST, &req);
    let outcome = AssertUnwindSafe(server.handle_cast(ctx, req))
        .catch_unwind()
        .await;
    interpret_async(ctx, TAG_HANDLE_CAST, span, outcome)
}

async fn do_info<G: GenServer>(server: &mut G, ctx: &mut ProcessContext, info: Info) -> Step {
    let span = ctx.trace_enter(TAG_HANDLE_INFO, &info);
    let outcome = AssertUnwindSafe(server.handle_info(ctx, info))
        .catch_unwind()
        .await;
    interpret_async(ctx, TAG_HANDLE_INFO, span, outcome)
}

fn interpret_async(
    ctx: &ProcessContext,
    tag: &'static str,
    span: Option<crate::process::context::TraceSpan>,
    outcome: Result<CastResult, Box<dyn std::any::Any + Send>>,
) -> Step {
    match outcome {
        Ok(result) => {
            ctx.trace_exit(span, tag, &result);
            match result {
                CastResult::NoReply => Step::Continue(None),
                CastResult::NoReplyTimeout(timeout) => Step::Continue(Some(timeout)),
                CastResult::Stop(reason) => Step::Stop(reason),
                CastResult::Failure(err) => Step::Stop(ExitReason::Other(err.to_string())),
            }
        }
        Err(panic) => {
            let message = panic_message(panic);
            ctx.trace_exit(span, tag, &format_args!("crashed: {message}"));
            Step::Stop(ExitReason::Other(message))
        }
    }
}
