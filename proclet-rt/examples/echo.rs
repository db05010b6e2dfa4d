//! Minimal walkthrough: a generic server answering calls, with console
//! tracing.
//!
//! Run with: `cargo run --example echo`

use std::sync::Arc;

use async_trait::async_trait;
use proclet_rt::gen_server::{self, CallResult, GenServer};
use proclet_rt::message::{ReplyTo, TermBox};
use proclet_rt::process::ProcessContext;
use proclet_rt::{ConsoleTracer, Env, RtError, SpawnOpts};

#[derive(Debug, Clone)]
struct Echo(String);

struct EchoServer;

#[async_trait]
impl GenServer for EchoServer {
    async fn handle_call(
        &mut self,
        _ctx: &mut ProcessContext,
        req: TermBox,
        _reply: &mut ReplyTo,
    ) -> CallResult {
        match req.downcast::<Echo>() {
            Ok(echo) => CallResult::reply(Echo(echo.0)),
            Err(_) => CallResult::Failure(RtError::BadArg("expected Echo")),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), RtError> {
    let env = Env::new();

    let pid = gen_server::start_opts(
        &env,
        EchoServer,
        (),
        SpawnOpts::new()
            .with_name("echo")
            .with_tracer(Arc::new(ConsoleTracer::new())),
    )
    .await?;

    println!("echo server running as {pid}");

    let reply = pid.call(Echo("hello".into())).await?;
    if let Some(echo) = reply.downcast_ref::<Echo>() {
        println!("reply: {}", echo.0);
    }

    pid.stop().await
}
