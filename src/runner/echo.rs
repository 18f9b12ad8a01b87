//! Local runner that echoes the active prompt.
//!
//! Useful for checking what a model would receive: the response cell ends
//! up holding the last message after path-template expansion.

use tracing::debug;

use super::{CellRunner, RunFuture, RunInvocation};

/// Echoes the last message back into the response cell, line by line.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoRunner;

impl CellRunner for EchoRunner {
    fn run(&self, invocation: RunInvocation) -> RunFuture<'_> {
        Box::pin(async move {
            let RunInvocation {
                messages, output, ..
            } = invocation;

            output.clear_output().await?;
            output
                .append_trace(&format!("echo runner received {} message(s)", messages.len()))
                .await?;

            let Some(last) = messages.last() else {
                return Ok(());
            };

            for line in last.content.split_inclusive('\n') {
                if output.cancellation().is_cancelled() {
                    debug!("echo runner cancelled");
                    break;
                }
                output.append_output(line).await?;
            }

            Ok(())
        })
    }
}
