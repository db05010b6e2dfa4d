//! Human-readable tracer printing to stdout.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::traits::{TraceEvent, Tracer};

/// Prints one line per event:
///
/// ```text
/// 2026-08-01 12:00:00.000017 <0.1.2> call -> HandleCall(Ping)
/// 2026-08-01 12:00:00.000051 <0.1.2> call <- HandleCall(Ping)=Reply(Pong), 34µs
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleTracer;

impl ConsoleTracer {
    /// A console tracer.
    pub fn new() -> Self {
        Self
    }
}

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

impl Tracer for ConsoleTracer {
    fn event(&self, event: &TraceEvent) {
        match event {
            TraceEvent::Call {
                pid,
                time,
                tag,
                arg,
            } => {
                println!("{} {} call -> {}({})", time.format(TIME_FORMAT), pid, tag, arg);
            }
            TraceEvent::CallResult {
                pid,
                time,
                tag,
                arg,
                result,
                duration,
            } => {
                println!(
                    "{} {} call <- {}({})={}, {:?}",
                    time.format(TIME_FORMAT),
                    pid,
                    tag,
                    arg,
                    result,
                    duration
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_console_tracer_handles_both_kinds() {
        let tracer = ConsoleTracer::new();
        tracer.event(&TraceEvent::Call {
            pid: "<0.1.1>".into(),
            time: Utc::now(),
            tag: "Init",
            arg: "()".into(),
        });
        tracer.event(&TraceEvent::CallResult {
            pid: "<0.1.1>".into(),
            time: Utc::now(),
            tag: "Init",
            arg: "()".into(),
            result: "Ok".into(),
            duration: std::time::Duration::from_micros(5),
        });
    }
}
