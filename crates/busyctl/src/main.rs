use anyhow::{Context, Result};
use busyd_core::config;
use busyd_core::ipc::{self, ClientMsg, DaemonMsg};
use clap::{Parser, Subcommand};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;

#[derive(Parser)]
#[command(name = "busyctl", about = "Control the busyd daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show daemon status
    Status,
    /// Force the busy indicator on, bypassing debounce
    Show,
    /// Force the busy indicator off, bypassing hold timers
    Hide,
    /// Report that work is pending
    Busy,
    /// Report that no work is pending
    Idle,
    /// Register as a renderer and print every visibility change
    Watch,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let socket_path = config::socket_path();
    let stream = UnixStream::connect(&socket_path).with_context(|| {
        format!(
            "connecting to busyd at {}\nIs the daemon running?",
            socket_path.display()
        )
    })?;

    let mut writer = stream.try_clone().context("cloning stream")?;
    let reader = BufReader::new(stream);

    let msg = match cli.command {
        Command::Status => ClientMsg::GetStatus,
        Command::Show => ClientMsg::Override { visible: true },
        Command::Hide => ClientMsg::Override { visible: false },
        Command::Busy => ClientMsg::Activity { pending: true },
        Command::Idle => ClientMsg::Activity { pending: false },
        Command::Watch => ClientMsg::RegisterRenderer,
    };
    let watching = matches!(msg, ClientMsg::RegisterRenderer);

    writer
        .write_all(ipc::encode(&msg).as_bytes())
        .context("sending command")?;

    for line in reader.lines() {
        let line = line.context("reading response")?;
        let Some(resp) = ipc::decode_daemon(&line) else {
            continue;
        };
        match resp {
            DaemonMsg::Visibility { visible } => {
                println!("{}", if visible { "shown" } else { "hidden" });
                continue;
            }
            DaemonMsg::Status {
                visible,
                state,
                debounce_delay_ms,
                min_duration_ms,
                extra_duration_ms,
                version,
            } => {
                println!("busyd v{}", version);
                println!("  visible:  {}", visible);
                println!("  state:    {}", state);
                println!(
                    "  timing:   debounce {}ms, min {}ms, extra {}ms",
                    debounce_delay_ms, min_duration_ms, extra_duration_ms
                );
            }
            DaemonMsg::Ack { ok, message } => {
                if ok {
                    println!("{}", message);
                } else {
                    eprintln!("error: {}", message);
                    std::process::exit(1);
                }
            }
        }
        if !watching {
            break;
        }
    }

    Ok(())
}
