//! dapp-bridge: headless host for the dapp bridge.
//!
//! Reads `{"channel": .., "args": [..]}` lines from stdin and writes the scripts the
//! content view would evaluate to stdout. Logs go to stderr.

mod host;

use std::rc::Rc;

use eyre::WrapErr;

use dapp_bridge_adapters::{
    BridgeAdapterConfig, DeterministicSigner, InMemoryPersistence, JsonRpcChainDataAdapter,
    ScriptedPromptAdapter, StdoutContentView,
};
use dapp_bridge_core::{BridgeOrchestrator, ChainRegistry};

#[tokio::main(flavor = "current_thread")]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = BridgeAdapterConfig::from_env();
    tracing::info!(
        chain_id = %config.chain_id,
        rpc_url = %config.rpc_url,
        auto_approve = config.auto_approve,
        "starting dapp-bridge"
    );

    let bridge = Rc::new(BridgeOrchestrator::new(
        DeterministicSigner::with_config(&config),
        JsonRpcChainDataAdapter::with_config(&config),
        ScriptedPromptAdapter::with_config(&config),
        InMemoryPersistence::default(),
        ChainRegistry::new(config.bootstrap_chain()),
        config.bridge_options(),
    ));
    bridge.attach(StdoutContentView);
    bridge
        .on_content_loaded()
        .wrap_err("failed to inject provider config")?;

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let handled = host::run(Rc::clone(&bridge), stdin)
        .await
        .wrap_err("failed to read bridge input")?;

    let orphaned = bridge.detach();
    tracing::info!(handled, orphaned, "input closed; shutting down");
    Ok(())
}
