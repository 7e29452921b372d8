//! Cancellation of a running push
//!
//! An [`Interrupt`] resolves once its handle fires (or Ctrl-C arrives, for
//! [`Interrupt::ctrl_c`]). The orchestrator races each phase against it.

use tokio::sync::watch;

/// Fires the paired [`Interrupt`]
#[derive(Debug)]
pub struct InterruptHandle(watch::Sender<bool>);

impl InterruptHandle {
    /// Wake every waiter
    pub fn fire(&self) {
        self.0.send_replace(true);
    }
}

/// A signal the push gives up on
#[derive(Debug, Clone)]
pub struct Interrupt {
    rx: watch::Receiver<bool>,
}

impl Interrupt {
    /// An interrupt fired through the returned handle
    pub fn channel() -> (InterruptHandle, Self) {
        let (tx, rx) = watch::channel(false);
        (InterruptHandle(tx), Self { rx })
    }

    /// An interrupt that never fires
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    /// An interrupt fired by Ctrl-C. Must be called inside a runtime.
    pub fn ctrl_c() -> Self {
        let (handle, interrupt) = Self::channel();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::debug!("interrupted");
                handle.fire();
            }
        });
        interrupt
    }

    /// Resolve once fired; pend forever if the handle is gone unfired
    pub async fn wait(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|fired| *fired).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
