//! Delivery of visibility changes to connected renderers.

use busyd_core::ipc::{self, DaemonMsg};
use tokio::sync::mpsc;

/// State shared between the fan-out task and IPC handlers.
#[derive(Default)]
pub struct Shared {
    /// Last visibility pushed to renderers.
    visible: bool,
    /// Channels to send messages to connected renderer clients.
    renderer_txs: Vec<mpsc::UnboundedSender<String>>,
}

impl Shared {
    /// Record a new visibility and push it to every renderer. Renderers whose
    /// receiving side is gone are dropped.
    pub fn broadcast(&mut self, visible: bool) {
        self.visible = visible;
        let line = ipc::encode(&DaemonMsg::Visibility { visible });
        self.renderer_txs.retain(|tx| tx.send(line.clone()).is_ok());
    }

    /// Add a renderer and send it the current value. Registering the same
    /// channel twice only replays the value. Returns the value sent.
    pub fn register(&mut self, tx: &mpsc::UnboundedSender<String>) -> bool {
        if !self.renderer_txs.iter().any(|t| t.same_channel(tx)) {
            self.renderer_txs.push(tx.clone());
        }
        let visible = self.visible;
        let _ = tx.send(ipc::encode(&DaemonMsg::Visibility { visible }));
        visible
    }

    pub fn unregister(&mut self, tx: &mpsc::UnboundedSender<String>) {
        self.renderer_txs.retain(|t| !t.same_channel(tx));
    }

    pub fn renderer_count(&self) -> usize {
        self.renderer_txs.len()
    }
}
