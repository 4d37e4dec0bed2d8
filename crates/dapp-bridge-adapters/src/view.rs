use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use dapp_bridge_core::{ContentViewPort, PortError};

/// Writes each script to stdout on its own line, for a host process driving the bridge.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutContentView;

impl ContentViewPort for StdoutContentView {
    fn execute_script(&self, script: &str) -> Result<(), PortError> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{script}")
            .and_then(|()| out.flush())
            .map_err(|e| PortError::Transport(format!("stdout write failed: {e}")))
    }
}

/// Keeps every executed script. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingContentView {
    scripts: Arc<Mutex<Vec<String>>>,
}

impl RecordingContentView {
    pub fn scripts(&self) -> Vec<String> {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ContentViewPort for RecordingContentView {
    fn execute_script(&self, script: &str) -> Result<(), PortError> {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(script.to_owned());
        Ok(())
    }
}
