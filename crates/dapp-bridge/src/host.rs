use std::rc::Rc;

use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::{JoinError, JoinSet, LocalSet};

use dapp_bridge_core::{
    BridgeOrchestrator, ChainDataPort, ContentViewPort, PersistencePort, PromptPort, SignerPort,
};

/// One raw channel message as the content view would post it.
#[derive(Debug, Deserialize)]
pub struct InboundLine {
    pub channel: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

pub fn parse_line(line: &str) -> Option<InboundLine> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str(trimmed) {
        Ok(inbound) => Some(inbound),
        Err(e) => {
            tracing::warn!(error = %e, "skipping unparseable input line");
            None
        }
    }
}

/// Feeds every input line to the bridge until EOF, then waits for the requests still in
/// flight. Each message runs as its own local task, so a request parked on a prompt or
/// an RPC call does not hold up the lines after it. Returns the number of messages
/// handed to the bridge.
pub async fn run<S, D, P, W, V, R>(
    bridge: Rc<BridgeOrchestrator<S, D, P, W, V>>,
    reader: R,
) -> std::io::Result<usize>
where
    S: SignerPort + 'static,
    D: ChainDataPort + 'static,
    P: PromptPort + 'static,
    W: PersistencePort + 'static,
    V: ContentViewPort + 'static,
    R: AsyncBufRead + Unpin,
{
    let local = LocalSet::new();
    local
        .run_until(async move {
            let mut lines = reader.lines();
            let mut in_flight = JoinSet::new();
            let mut handled = 0;
            while let Some(line) = lines.next_line().await? {
                let Some(inbound) = parse_line(&line) else {
                    continue;
                };
                handled += 1;
                let bridge = Rc::clone(&bridge);
                in_flight.spawn_local(async move {
                    // Failures are logged by the bridge and never stop the loop.
                    let _ = bridge
                        .handle_inbound_event(&inbound.channel, &inbound.args)
                        .await;
                });
                while let Some(done) = in_flight.try_join_next() {
                    report(done);
                }
            }
            tracing::debug!(in_flight = in_flight.len(), "input closed; draining requests");
            while let Some(done) = in_flight.join_next().await {
                report(done);
            }
            Ok::<_, std::io::Error>(handled)
        })
        .await
}

fn report(done: Result<(), JoinError>) {
    if let Err(e) = done {
        tracing::error!(error = %e, "bridge request task failed");
    }
}
