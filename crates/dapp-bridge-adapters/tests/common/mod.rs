#![allow(dead_code)]

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::{json, Value};
use tiny_http::{Response, Server, StatusCode};

use dapp_bridge_adapters::{
    BridgeAdapterConfig, DeterministicSigner, InMemoryPersistence, JsonRpcChainDataAdapter,
    RecordingContentView, ScriptedPromptAdapter,
};
use dapp_bridge_core::{BridgeOrchestrator, ChainConfig, ChainId, ChainRegistry, NativeCurrency};

pub const SEED: &str = "adapter test seed";
pub const PASSPHRASE: &str = "hunter2";

/// Outcome of one mocked JSON-RPC method.
pub enum Reply {
    Result(Value),
    RpcError(&'static str),
    Status(u16),
}

pub struct MockRpc {
    pub url: String,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

impl MockRpc {
    pub fn methods(&self) -> Vec<String> {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .map(|(method, _)| method.clone())
            .collect()
    }

    pub fn params(&self, method: &str) -> Value {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .expect("method was called")
    }

    pub fn chain(&self) -> ChainConfig {
        chain_at(&self.url)
    }
}

/// Serves up to `max_requests` JSON-RPC calls, answering each with `handler(method, params)`.
pub fn spawn_rpc_server<F>(max_requests: usize, handler: F) -> MockRpc
where
    F: Fn(&str, &Value) -> Reply + Send + 'static,
{
    let server = Server::http("127.0.0.1:0").expect("start server");
    let url = format!("http://{}", server.server_addr());
    let calls = Arc::new(Mutex::new(Vec::<(String, Value)>::new()));
    let recorded = Arc::clone(&calls);

    thread::spawn(move || {
        for _ in 0..max_requests {
            let mut req = match server.recv() {
                Ok(r) => r,
                Err(_) => break,
            };
            let mut body = String::new();
            let _ = req.as_reader().read_to_string(&mut body);
            let request: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
            let method = request
                .get("method")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();
            let params = request.get("params").cloned().unwrap_or(Value::Null);
            if let Ok(mut g) = recorded.lock() {
                g.push((method.clone(), params.clone()));
            }

            let (code, payload) = match handler(&method, &params) {
                Reply::Result(result) => (200, json!({"jsonrpc": "2.0", "id": 1, "result": result})),
                Reply::RpcError(message) => (
                    200,
                    json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32000, "message": message}}),
                ),
                Reply::Status(code) => (code, json!({"error": "unavailable"})),
            };
            let response =
                Response::from_string(payload.to_string()).with_status_code(StatusCode(code));
            let _ = req.respond(response);
        }
    });

    MockRpc { url, calls }
}

pub fn chain_at(url: &str) -> ChainConfig {
    ChainConfig {
        chain_id: ChainId(25),
        rpc_urls: vec![url.to_owned()],
        chain_name: "Cronos".to_owned(),
        native_currency: NativeCurrency {
            name: "Cronos".to_owned(),
            symbol: "CRO".to_owned(),
            decimals: 18,
        },
        block_explorer_urls: vec![],
    }
}

pub fn test_config(rpc_url: &str) -> BridgeAdapterConfig {
    BridgeAdapterConfig {
        rpc_url: rpc_url.to_owned(),
        rpc_timeout_ms: 5_000,
        auto_approve: true,
        passphrase: Some(PASSPHRASE.to_owned()),
        signer_seed: SEED.to_owned(),
        ..BridgeAdapterConfig::default()
    }
}

pub type AdapterBridge = BridgeOrchestrator<
    DeterministicSigner,
    JsonRpcChainDataAdapter,
    ScriptedPromptAdapter,
    InMemoryPersistence,
    RecordingContentView,
>;

pub struct AdapterHarness {
    pub bridge: AdapterBridge,
    pub view: RecordingContentView,
    pub persistence: InMemoryPersistence,
}

pub fn adapter_bridge(cfg: &BridgeAdapterConfig) -> AdapterHarness {
    let view = RecordingContentView::default();
    let persistence = InMemoryPersistence::default();
    let bridge = BridgeOrchestrator::new(
        DeterministicSigner::with_config(cfg),
        JsonRpcChainDataAdapter::with_config(cfg),
        ScriptedPromptAdapter::with_config(cfg),
        persistence.clone(),
        ChainRegistry::new(cfg.bootstrap_chain()),
        cfg.bridge_options(),
    );
    bridge.attach(view.clone());
    AdapterHarness {
        bridge,
        view,
        persistence,
    }
}
