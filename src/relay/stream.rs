//! Synthetic streaming: reveal an already complete reply a token at a
//! time. Purely cosmetic, the full text is known before it starts.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(25);

const TIMEOUT_GRACE: Duration = Duration::from_secs(1);

/// Split text on whitespace boundaries. Each token keeps its trailing
/// whitespace so joining the tokens yields the original text.
pub fn tokens(text: &str) -> Vec<&str> {
    text.split_inclusive(char::is_whitespace).collect()
}

/// How long the animation may run before it is stopped regardless of
/// cancellation. Saturates instead of overflowing for huge intervals.
pub fn safety_timeout(token_count: usize, interval: Duration) -> Duration {
    let tokens = u32::try_from(token_count).unwrap_or(u32::MAX);
    interval
        .saturating_mul(2)
        .saturating_mul(tokens)
        .saturating_add(TIMEOUT_GRACE)
}

/// A handle used to stop an animation early.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    /// Stop emitting tokens. Takes effect before the next token.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealEnd {
    Completed,
    Cancelled,
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealOutcome {
    pub emitted: usize,
    pub end: RevealEnd,
}

/// A running animation: the token stream plus the means to stop it.
pub struct Reveal {
    pub tokens: UnboundedReceiverStream<String>,
    pub cancel: CancelHandle,
    task: JoinHandle<RevealOutcome>,
}

impl Reveal {
    /// Wait for the animation task to finish.
    pub async fn finish(self) -> anyhow::Result<RevealOutcome> {
        Ok(self.task.await?)
    }
}

/// Start revealing `text`, one token per `interval`.
///
/// The task stops on whichever comes first: all tokens emitted, the
/// cancel handle, or the safety timeout. Both stop sources are checked
/// before every token.
pub fn reveal(text: &str, interval: Duration) -> Reveal {
    let parts: Vec<String> = tokens(text).into_iter().map(String::from).collect();
    let cancel = CancelHandle::default();
    let token = cancel.token.clone();
    let (tx, rx) = mpsc::unbounded_channel::<String>();
    let deadline = tokio::time::sleep(safety_timeout(parts.len(), interval));

    let task = tokio::spawn(async move {
        tokio::pin!(deadline);
        let mut emitted = 0;

        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        return RevealOutcome { emitted, end: RevealEnd::Cancelled };
                    }
                    _ = &mut deadline => {
                        tracing::debug!("Reveal timed out after {} tokens", emitted);
                        return RevealOutcome { emitted, end: RevealEnd::TimedOut };
                    }
                    _ = tokio::time::sleep(interval) => {}
                }
            }

            if token.is_cancelled() {
                return RevealOutcome {
                    emitted,
                    end: RevealEnd::Cancelled,
                };
            }

            // Receiver gone means nobody is watching anymore
            if tx.send(part).is_err() {
                return RevealOutcome {
                    emitted,
                    end: RevealEnd::Cancelled,
                };
            }
            emitted += 1;
        }

        RevealOutcome {
            emitted,
            end: RevealEnd::Completed,
        }
    });

    Reveal {
        tokens: UnboundedReceiverStream::new(rx),
        cancel,
        task,
    }
}
