//! One-shot completion broadcast for a run

use tokio::sync::watch;

/// Fires once when a run completes
///
/// Listeners that subscribe after the signal fired observe it immediately.
#[derive(Debug)]
pub struct CompletionSignal {
    sender: watch::Sender<bool>,
}

impl CompletionSignal {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    /// Fires the signal; returns false if it had already fired
    pub fn fire(&self) -> bool {
        self.sender.send_if_modified(|fired| {
            if *fired {
                return false;
            }
            *fired = true;
            true
        })
    }

    pub fn is_fired(&self) -> bool {
        *self.sender.borrow()
    }

    pub fn subscribe(&self) -> CompletionListener {
        CompletionListener {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for CompletionSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits for a [`CompletionSignal`]
#[derive(Debug, Clone)]
pub struct CompletionListener {
    receiver: watch::Receiver<bool>,
}

impl CompletionListener {
    /// Resolves once the run has completed
    pub async fn wait(&mut self) {
        // The sender lives as long as the run; a dropped sender means the run is gone
        let _ = self.receiver.wait_for(|fired| *fired).await;
    }
}
