//! Task that owns the [`VisibilityEngine`] and serializes every event into it.
//!
//! Inputs arrive on one channel, the engine's single timer is a `sleep_until`
//! on its next deadline, and emissions leave in processing order on the
//! output channel.

use busyd_core::engine::{EngineState, Timing, VisibilityEngine};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub visible: bool,
    pub state: EngineState,
    pub timing: Timing,
}

#[derive(Debug)]
pub enum Input {
    Activity(bool),
    Override(bool),
    Snapshot(oneshot::Sender<Snapshot>),
}

/// Run until `shutdown` resolves or every input sender is dropped, then tear
/// the engine down. Nothing is sent on `output` after that.
pub async fn run(
    mut engine: VisibilityEngine,
    mut inputs: mpsc::UnboundedReceiver<Input>,
    mut shutdown: oneshot::Receiver<()>,
    output: mpsc::UnboundedSender<bool>,
) {
    info!("visibility driver started");

    loop {
        let deadline = engine.next_deadline();
        let sleep_fut = time::sleep_until(
            deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(86400)),
        );

        // A due timer is handled before inputs queued behind it.
        let emitted = tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = sleep_fut, if deadline.is_some() => engine.check_timer(Instant::now()),
            input = inputs.recv() => match input {
                Some(Input::Activity(pending)) => engine.on_activity(pending, Instant::now()),
                Some(Input::Override(visible)) => engine.on_override(visible, Instant::now()),
                Some(Input::Snapshot(reply)) => {
                    let _ = reply.send(Snapshot {
                        visible: engine.is_visible(),
                        state: engine.state(),
                        timing: engine.timing(),
                    });
                    None
                }
                None => break,
            },
        };

        if let Some(visible) = emitted {
            if output.send(visible).is_err() {
                debug!("output receiver gone");
                break;
            }
        }
    }

    engine.shutdown();
    info!("visibility driver stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use busyd_core::config::TimingConfig;
    use tokio::task::JoinHandle;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    struct Harness {
        inputs: mpsc::UnboundedSender<Input>,
        shutdown: oneshot::Sender<()>,
        driver: JoinHandle<()>,
        collected: JoinHandle<Vec<(u64, bool)>>,
    }

    impl Harness {
        fn start(debounce: i64, min: i64, extra: i64) -> Self {
            let engine =
                VisibilityEngine::new(&TimingConfig::new(debounce, min, extra)).unwrap();
            let (inputs, input_rx) = mpsc::unbounded_channel();
            let (shutdown, shutdown_rx) = oneshot::channel();
            let (output_tx, mut output_rx) = mpsc::unbounded_channel();
            let t0 = Instant::now();

            let driver = tokio::spawn(run(engine, input_rx, shutdown_rx, output_tx));
            let collected = tokio::spawn(async move {
                let mut seen = Vec::new();
                while let Some(v) = output_rx.recv().await {
                    seen.push((t0.elapsed().as_millis() as u64, v));
                }
                seen
            });

            Self {
                inputs,
                shutdown,
                driver,
                collected,
            }
        }

        fn send(&self, input: Input) {
            self.inputs.send(input).unwrap();
        }

        async fn snapshot(&self) -> Snapshot {
            let (tx, rx) = oneshot::channel();
            self.send(Input::Snapshot(tx));
            rx.await.unwrap()
        }

        /// Let pending timers run, close the inputs and return every emission.
        async fn finish(self) -> Vec<(u64, bool)> {
            time::sleep(ms(10_000)).await;
            drop(self.inputs);
            self.driver.await.unwrap();
            self.collected.await.unwrap()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn short_burst_never_shows() {
        let h = Harness::start(100, 500, 0);
        h.send(Input::Activity(true));
        time::sleep(ms(50)).await;
        h.send(Input::Activity(false));
        assert!(h.finish().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn long_activity_shows_after_debounce_and_hides_on_completion() {
        let h = Harness::start(100, 500, 0);
        h.send(Input::Activity(true));
        time::sleep(ms(600)).await;
        h.send(Input::Activity(false));
        assert_eq!(h.finish().await, vec![(100, true), (600, false)]);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_debounce_shows_at_once_and_extra_duration_wins() {
        let h = Harness::start(0, 200, 300);
        h.send(Input::Activity(true));
        time::sleep(ms(50)).await;
        h.send(Input::Activity(false));
        assert_eq!(h.finish().await, vec![(0, true), (350, false)]);
    }

    #[tokio::test(start_paused = true)]
    async fn min_duration_holds_indicator() {
        let h = Harness::start(0, 500, 0);
        h.send(Input::Activity(true));
        time::sleep(ms(100)).await;
        h.send(Input::Activity(false));
        assert_eq!(h.finish().await, vec![(0, true), (500, false)]);
    }

    #[tokio::test(start_paused = true)]
    async fn override_bypasses_debounce_and_resets_floor() {
        let h = Harness::start(1000, 300, 0);
        h.send(Input::Activity(true));
        time::sleep(ms(200)).await;
        h.send(Input::Override(true));
        time::sleep(ms(100)).await;
        h.send(Input::Activity(false));
        // floor is 200 + 300, not the cancelled debounce at 1000
        assert_eq!(h.finish().await, vec![(200, true), (500, false)]);
    }

    #[tokio::test(start_paused = true)]
    async fn override_hide_is_immediate() {
        let h = Harness::start(0, 5000, 0);
        h.send(Input::Activity(true));
        time::sleep(ms(100)).await;
        h.send(Input::Override(false));
        assert_eq!(h.finish().await, vec![(0, true), (100, false)]);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_reports_state_and_timing() {
        let h = Harness::start(100, 500, 0);
        h.send(Input::Activity(true));
        let snap = h.snapshot().await;
        assert_eq!(snap.state, EngineState::AwaitingShow);
        assert!(!snap.visible);
        assert_eq!(snap.timing.debounce_delay, ms(100));

        time::sleep(ms(150)).await;
        let snap = h.snapshot().await;
        assert_eq!(snap.state, EngineState::Visible);
        assert!(snap.visible);
        h.finish().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_pending_timer() {
        let h = Harness::start(100, 0, 0);
        h.send(Input::Activity(true));
        time::sleep(ms(50)).await;
        h.shutdown.send(()).unwrap();
        h.driver.await.unwrap();

        time::sleep(ms(1000)).await;
        assert!(h.inputs.send(Input::Override(true)).is_err(), "driver no longer listens");
        assert!(h.collected.await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn closing_inputs_stops_the_driver() {
        let h = Harness::start(0, 0, 0);
        h.send(Input::Override(true));
        drop(h.inputs);
        h.driver.await.unwrap();
        assert_eq!(h.collected.await.unwrap(), vec![(0, true)]);
    }
}
