//! Control runtime — drives the [`SessionManager`] from the control queue.
//!
//! ```text
//!  ┌───────────────────┐ try_send ┌──────────────┐ receive ┌──────────────────┐
//!  │ signaling adapter │─────────▶│              │────────▶│                  │
//!  ├───────────────────┤          │ ControlQueue │         │  SessionManager  │
//!  │   peer adapter    │─────────▶│   (64 deep)  │         │ (control thread) │
//!  └───────────────────┘          └──────────────┘         └──────────────────┘
//! ```
//!
//! Adapter threads only ever [`push`] onto the queue.  The control loop has
//! exactly two suspension points: waiting for the next event and waiting
//! out a reconnect backoff.  The backoff wait is raced against the queue so
//! a `Shutdown` (or anything else) is still handled promptly while the link
//! is down.

use core::time::Duration;
use std::time::Instant;

use async_io_mini::Timer;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use log::{info, warn};

use crate::app::commands::ControlEvent;
use crate::app::manager::{Flow, SessionManager};
use crate::app::ports::{ActuatorPort, EventSink, PeerConnector, SignalingPort};

/// Inbound queue depth.
pub const CONTROL_QUEUE_DEPTH: usize = 64;

/// Multi-producer queue feeding the control thread.
pub type ControlChannel = Channel<CriticalSectionRawMutex, ControlEvent, CONTROL_QUEUE_DEPTH>;

/// Enqueue an event without blocking.  Returns `false` (and logs) if the
/// queue is full and the event was dropped.
pub fn push(queue: &ControlChannel, event: ControlEvent) -> bool {
    match queue.try_send(event) {
        Ok(()) => true,
        Err(TrySendError::Full(event)) => {
            warn!("Control queue full, dropping {:?}", event);
            false
        }
    }
}

/// Run the control loop until a `Shutdown` event is handled.
pub async fn run<S, C, A, E>(manager: &mut SessionManager<S, C, A, E>, queue: &ControlChannel)
where
    S: SignalingPort,
    C: PeerConnector,
    A: ActuatorPort,
    E: EventSink,
{
    manager.start();

    loop {
        if let Some(delay) = manager.take_reconnect_delay() {
            if wait_backoff(manager, queue, delay).await == Flow::Exit {
                break;
            }
            manager.connect();
            continue;
        }

        let event = queue.receive().await;
        if manager.handle(event) == Flow::Exit {
            break;
        }
    }

    info!("Control loop exited");
}

/// Host [`run`] on a local executor and block the calling thread on it.
pub fn run_blocking<S, C, A, E>(manager: &mut SessionManager<S, C, A, E>, queue: &ControlChannel)
where
    S: SignalingPort,
    C: PeerConnector,
    A: ActuatorPort,
    E: EventSink,
{
    let executor: edge_executor::LocalExecutor<'_, 8> = edge_executor::LocalExecutor::new();
    futures_lite::future::block_on(executor.run(run(manager, queue)));
}

/// Sleep for `delay`, handling queued events meanwhile.
async fn wait_backoff<S, C, A, E>(
    manager: &mut SessionManager<S, C, A, E>,
    queue: &ControlChannel,
    delay: Duration,
) -> Flow
where
    S: SignalingPort,
    C: PeerConnector,
    A: ActuatorPort,
    E: EventSink,
{
    let deadline = Instant::now() + delay;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Flow::Continue;
        }

        let next = futures_lite::future::or(async { Some(queue.receive().await) }, async {
            Timer::after(remaining).await;
            None
        })
        .await;

        match next {
            None => return Flow::Continue,
            Some(event) => {
                if manager.handle(event) == Flow::Exit {
                    return Flow::Exit;
                }
            }
        }
    }
}
