mod driver;
mod fanout;

use anyhow::{Context, Result};
use busyd_core::config::{self, Config};
use busyd_core::engine::VisibilityEngine;
use busyd_core::ipc::{self, ClientMsg, DaemonMsg};
use driver::Input;
use fanout::Shared;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("busyd=info".parse().context("parsing log directive")?),
        )
        .init();

    info!("busyd starting");

    let config = Config::load().context("loading config")?;
    let engine = VisibilityEngine::new(&config.timing).context("validating [timing] config")?;
    info!(
        debounce_delay_ms = config.timing.debounce_delay_ms,
        min_duration_ms = config.timing.min_duration_ms,
        extra_duration_ms = config.timing.extra_duration_ms,
        "timing loaded"
    );

    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (output_tx, mut output_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let driver_handle = tokio::spawn(driver::run(engine, input_rx, shutdown_rx, output_tx));

    let shared = Arc::new(Mutex::new(Shared::default()));

    // Fan-out: push every emission to all renderers, in order
    let shared_out = Arc::clone(&shared);
    let fanout_handle = tokio::spawn(async move {
        while let Some(visible) = output_rx.recv().await {
            let mut shared = shared_out.lock().await;
            shared.broadcast(visible);
            info!(visible, renderers = shared.renderer_count(), "visibility changed");
        }
    });

    // Start IPC listener
    let socket_path = config::socket_path();
    // Remove stale socket
    let _ = std::fs::remove_file(&socket_path);
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let listener = UnixListener::bind(&socket_path)
        .with_context(|| format!("binding socket {}", socket_path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o666)).ok();
    }
    info!(path = %socket_path.display(), "IPC socket listening");

    let shared_ipc = Arc::clone(&shared);
    let accept_handle = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let shared = Arc::clone(&shared_ipc);
                    tokio::spawn(handle_ipc_client(stream, shared, input_tx.clone()));
                }
                Err(e) => {
                    warn!(error = %e, "IPC accept error");
                }
            }
        }
    });

    wait_for_signal().await?;

    info!("busyd shutting down");
    accept_handle.abort();
    let _ = shutdown_tx.send(());
    let _ = driver_handle.await;
    let _ = fanout_handle.await;
    let _ = std::fs::remove_file(&socket_path);
    Ok(())
}

async fn wait_for_signal() -> Result<()> {
    let mut term = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.context("waiting for Ctrl-C")?,
        _ = term.recv() => {}
    }
    Ok(())
}

fn ack(ok: bool, message: impl Into<String>) -> String {
    ipc::encode(&DaemonMsg::Ack {
        ok,
        message: message.into(),
    })
}

async fn handle_ipc_client(
    stream: UnixStream,
    shared: Arc<Mutex<Shared>>,
    input_tx: mpsc::UnboundedSender<Input>,
) {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    // Channel for sending messages back to this client
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    // Writer task
    let write_handle = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if writer.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let mut is_renderer = false;

    while let Ok(Some(line)) = lines.next_line().await {
        let Some(msg) = ipc::decode_client(&line) else {
            warn!(line = %line.trim(), "ignoring malformed IPC message");
            continue;
        };

        match msg {
            ClientMsg::RegisterRenderer => {
                is_renderer = true;
                let mut shared = shared.lock().await;
                let visible = shared.register(&tx);
                info!(visible, renderers = shared.renderer_count(), "renderer registered");
            }
            ClientMsg::Activity { pending } => {
                let reply = match input_tx.send(Input::Activity(pending)) {
                    Ok(()) => ack(true, format!("activity: {}", pending)),
                    Err(_) => ack(false, "daemon is shutting down"),
                };
                let _ = tx.send(reply);
            }
            ClientMsg::Override { visible } => {
                info!(visible, "override via IPC");
                let reply = match input_tx.send(Input::Override(visible)) {
                    Ok(()) => ack(true, format!("override: {}", visible)),
                    Err(_) => ack(false, "daemon is shutting down"),
                };
                let _ = tx.send(reply);
            }
            ClientMsg::GetStatus => {
                let (reply_tx, reply_rx) = oneshot::channel();
                let snapshot = match input_tx.send(Input::Snapshot(reply_tx)) {
                    Ok(()) => reply_rx.await.ok(),
                    Err(_) => None,
                };
                let reply = match snapshot {
                    Some(snap) => ipc::encode(&DaemonMsg::Status {
                        visible: snap.visible,
                        state: snap.state.as_str().to_string(),
                        debounce_delay_ms: snap.timing.debounce_delay.as_millis() as u64,
                        min_duration_ms: snap.timing.min_duration.as_millis() as u64,
                        extra_duration_ms: snap.timing.extra_duration.as_millis() as u64,
                        version: env!("CARGO_PKG_VERSION").to_string(),
                    }),
                    None => ack(false, "daemon is shutting down"),
                };
                let _ = tx.send(reply);
            }
        }
    }

    // Client disconnected — remove renderer sender if registered
    if is_renderer {
        shared.lock().await.unregister(&tx);
    }

    write_handle.abort();
}
