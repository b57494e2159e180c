//! In-flight gate for graceful shutdown.
//!
//! Externally triggered operations enter the gate and hold an [`InFlightGuard`] until
//! they finish. Shutdown closes the gate, so later calls are refused, then waits for
//! the guards still alive to drop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Gate {
    closed: AtomicBool,
    in_flight: AtomicUsize,
    idle: Notify,
}

/// Shared admission gate. Clones refer to the same gate.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    gate: Arc<Gate>,
}

impl InFlight {
    /// Create an open gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits one operation, or returns `None` once the gate is closed.
    #[must_use]
    pub fn enter(&self) -> Option<InFlightGuard> {
        self.gate.in_flight.fetch_add(1, Ordering::SeqCst);
        if self.gate.closed.load(Ordering::SeqCst) {
            // Closed between the check and the increment: back out.
            self.release();
            return None;
        }
        Some(InFlightGuard { gate: self.clone() })
    }

    /// Refuse every later `enter`.
    pub fn close(&self) {
        self.gate.closed.store(true, Ordering::SeqCst);
        tracing::debug!(in_flight = self.in_flight(), "In-flight gate closed");
    }

    /// Whether the gate has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.gate.closed.load(Ordering::SeqCst)
    }

    /// Operations currently admitted.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.gate.in_flight.load(Ordering::SeqCst)
    }

    /// Waits up to `grace` for admitted operations to finish.
    ///
    /// Returns `true` if none were left when it returned. Only meaningful after
    /// [`close`](Self::close); an open gate may admit new work at any time.
    pub async fn drain(&self, grace: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.gate.idle.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.in_flight() == 0 {
                    return;
                }
                notified.await;
            }
        };

        if tokio::time::timeout(grace, wait).await.is_ok() {
            true
        } else {
            tracing::warn!(
                in_flight = self.in_flight(),
                "Grace period elapsed with operations still in flight"
            );
            false
        }
    }

    fn release(&self) {
        if self.gate.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.gate.idle.notify_waiters();
        }
    }
}

/// Proof of admission. Dropping it marks the operation finished.
#[derive(Debug)]
pub struct InFlightGuard {
    gate: InFlight,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.gate.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_gate_refuses() {
        let gate = InFlight::new();
        assert!(gate.enter().is_some());
        gate.close();
        assert!(gate.enter().is_none());
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test]
    async fn drain_with_nothing_in_flight() {
        let gate = InFlight::new();
        gate.close();
        assert!(gate.drain(Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn drain_waits_for_guards() {
        let gate = InFlight::new();
        let guard = gate.enter();
        gate.close();

        let release = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            drop(guard);
        });

        assert!(gate.drain(Duration::from_secs(5)).await);
        assert_eq!(gate.in_flight(), 0);
        let _ = release.await;
    }

    #[tokio::test(start_paused = true)]
    async fn drain_gives_up_after_grace() {
        let gate = InFlight::new();
        let _guard = gate.enter();
        gate.close();

        assert!(!gate.drain(Duration::from_secs(1)).await);
        assert_eq!(gate.in_flight(), 1);
    }
}
