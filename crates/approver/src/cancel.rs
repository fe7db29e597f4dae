//! Externally triggered review cancellation.

use std::future::Future;

use tokio::sync::watch;

use crate::{Error, Result};

/// Fires a [`Cancellation`].
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancel every review observing this handle's signal.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Signal observed by a running review.
///
/// Collaborator calls made during a review are raced against the signal.
/// Once it fires, the in-flight call is dropped and the review returns
/// [`Error::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    rx: Option<watch::Receiver<bool>>,
}

impl Cancellation {
    /// Create a signal together with the handle that fires it.
    pub fn new() -> (CancelHandle, Self) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, Self { rx: Some(rx) })
    }

    /// A signal that never fires.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once the signal fires. Never resolves if the handle was
    /// dropped without cancelling.
    pub async fn cancelled(&self) {
        let Some(rx) = &self.rx else {
            return std::future::pending().await;
        };

        let mut rx = rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }

    /// Run `fut` unless the signal fires first.
    pub(crate) async fn guard<F: Future>(&self, fut: F) -> Result<F::Output> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.cancelled() => Err(Error::Cancelled),
            output = fut => Ok(output),
        }
    }
}
