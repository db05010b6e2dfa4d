//! The registrar process.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use async_trait::async_trait;

// Layer 3: Internal module imports
use crate::gen_server::{GenServer, InitResult};
use crate::message::TermBox;
use crate::process::ProcessContext;

/// The environment's coordinating process, holding proc-id 0.
///
/// Registry mutations run under the environment's lock on the caller's
/// task, and name purges run on the dying process's task through the
/// registrar pid's monitor-down hook; the loop itself only has to exist,
/// anchor the monitors, and absorb exit signals from processes linked to
/// it.
pub(crate) struct RegistrarServer;

#[async_trait]
impl GenServer for RegistrarServer {
    async fn init(&mut self, ctx: &mut ProcessContext, _args: TermBox) -> InitResult {
        ctx.set_trap_exit(true);
        InitResult::Ok
    }
}
