use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::core::{ClientConfig, chat_filter, init_tracing};
use crate::openai::{Message, Role};
use crate::relay::{CancelHandle, Conversation, RelayClient, View};

/// Exit status for a process stopped by SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Routes Ctrl-C to the reveal that is currently playing, if any.
///
/// One listener serves the whole session. Outside of an animation an
/// interrupt is not claimed, so the caller can fall back to exiting.
#[derive(Clone, Default)]
struct Interrupts {
    playing: Arc<Mutex<Option<CancelHandle>>>,
}

impl Interrupts {
    fn arm(&self, cancel: CancelHandle) {
        *self.playing.lock().unwrap_or_else(PoisonError::into_inner) = Some(cancel);
    }

    fn disarm(&self) {
        self.playing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Cancel the playing reveal. Returns false when nothing was playing.
    fn interrupt(&self) -> bool {
        let playing = self
            .playing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match playing {
            Some(cancel) => {
                cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Listen for Ctrl-C until the process ends. While the prompt is
    /// active rustyline reads Ctrl-C as a key, so this only sees signals
    /// that arrive while a request or reveal is in flight.
    fn listen(&self) {
        let interrupts = self.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if !interrupts.interrupt() {
                    // No animation to stop, behave like the default handler
                    std::process::exit(INTERRUPTED_EXIT_CODE);
                }
            }
        });
    }
}

/// Prints assistant messages as they appear or grow. User messages are
/// already on screen from the prompt and system messages stay hidden.
#[derive(Default)]
struct TerminalView {
    seen_messages: usize,
    seen_bytes: usize,
}

impl View for TerminalView {
    fn scroll_to_latest(&mut self, transcript: &[Message]) {
        let mut stdout = io::stdout().lock();
        let start = self.seen_messages.saturating_sub(1);

        for (i, msg) in transcript.iter().enumerate().skip(start) {
            let growing = i + 1 == self.seen_messages;
            if !growing && msg.role != Role::Assistant {
                continue;
            }
            if !growing {
                let stamp = msg.timestamp.as_deref().unwrap_or("--:--");
                let _ = write!(stdout, "[{}] ", stamp);
            }
            let from = if growing { self.seen_bytes } else { 0 };
            let _ = write!(stdout, "{}", msg.content.get(from..).unwrap_or_default());
        }
        let _ = stdout.flush();

        self.seen_messages = transcript.len();
        self.seen_bytes = transcript.last().map(|m| m.content.len()).unwrap_or(0);
    }

    fn show_banner(&mut self, banner: Option<&str>) {
        if let Some(banner) = banner {
            eprintln!("\n!! {}", banner);
        }
    }
}

pub async fn run(
    endpoint: Option<String>,
    model: Option<String>,
    system: Option<String>,
    stream: bool,
    interval_ms: u64,
) -> Result<()> {
    init_tracing(&chat_filter());

    let mut rl = DefaultEditor::new()?;
    let interrupts = Interrupts::default();
    if stream {
        interrupts.listen();
    }

    let defaults = ClientConfig::default();
    let config = ClientConfig {
        endpoint: endpoint.unwrap_or(defaults.endpoint),
        shared_secret: defaults.shared_secret,
        model,
    };
    let interval = Duration::from_millis(interval_ms);
    let history = system
        .map(|s| vec![Message::new(Role::System, &s)])
        .unwrap_or_default();

    let mut convo =
        Conversation::new(RelayClient::new(config), TerminalView::default()).with_transcript(history);

    loop {
        let readline = rl.readline(">>> ");
        match readline {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());

                if stream {
                    match convo.send_turn_streaming(&line, interval).await {
                        Ok(Some(reveal)) => {
                            // Ctrl-C stops the animation, the rest of the reply is dropped
                            interrupts.arm(reveal.cancel.clone());
                            let outcome = convo.play(reveal).await;
                            interrupts.disarm();
                            tracing::debug!("Reveal finished: {:?}", outcome?);
                        }
                        Ok(None) => continue,
                        // Already rendered as a message and banner
                        Err(_) => {}
                    }
                } else if let Ok(None) = convo.send_turn(&line).await {
                    continue;
                }
                println!();
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}
