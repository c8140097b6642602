//! Speech recognition capability
//!
//! A recognizer is started with a `RecognizerSink` bound to one session
//! generation. Every event it delivers carries that generation, which lets
//! the session discard anything that arrives after the session ended.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::control::Input;
use crate::error::{Result, VoiceError};
use crate::session::Generation;

/// Event delivered by a recognizer for a given session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizerEvent {
    pub generation: Generation,
    pub kind: RecognizerEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognizerEventKind {
    /// The capability confirmed that listening began
    Started,
    /// Latest transcript for the current utterance
    Result(String),
    /// Terminal failure, e.g. "not-allowed" or "network"
    Error(String),
    /// The capability stopped on its own
    Ended,
}

/// Handle a recognizer uses to report events for one session
#[derive(Debug, Clone)]
pub struct RecognizerSink {
    generation: Generation,
    tx: mpsc::UnboundedSender<Input>,
}

impl RecognizerSink {
    pub fn new(generation: Generation, tx: mpsc::UnboundedSender<Input>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn started(&self) -> Result<()> {
        self.send(RecognizerEventKind::Started)
    }

    pub fn result(&self, text: impl Into<String>) -> Result<()> {
        self.send(RecognizerEventKind::Result(text.into()))
    }

    pub fn error(&self, code: impl Into<String>) -> Result<()> {
        self.send(RecognizerEventKind::Error(code.into()))
    }

    pub fn ended(&self) -> Result<()> {
        self.send(RecognizerEventKind::Ended)
    }

    fn send(&self, kind: RecognizerEventKind) -> Result<()> {
        let event = RecognizerEvent {
            generation: self.generation,
            kind,
        };
        self.tx
            .send(Input::Recognizer(event))
            .map_err(|_| VoiceError::Channel("control loop closed".to_string()))
    }
}

/// Continuous speech-to-text capability
pub trait Recognizer: Send {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Side-effect-free probe for device support
    fn is_available(&self) -> bool;

    /// Begin listening; events for this session go to `sink`
    fn start(&mut self, sink: RecognizerSink) -> Result<()>;

    /// Stop listening. Events may still straggle in afterwards.
    fn stop(&mut self);
}

/// Recognizer that treats each line on stdin as a final transcript
///
/// Useful on machines without a speech engine and for driving the daemon
/// by hand. The reader thread is spawned on first start and lives for the
/// rest of the process; lines read while no session is active are dropped.
pub struct ConsoleRecognizer {
    active: Arc<Mutex<Option<RecognizerSink>>>,
    closed: Arc<AtomicBool>,
    reader_spawned: bool,
}

impl ConsoleRecognizer {
    pub fn new() -> Self {
        Self {
            active: Arc::new(Mutex::new(None)),
            closed: Arc::new(AtomicBool::new(false)),
            reader_spawned: false,
        }
    }

    fn spawn_reader(&mut self) -> Result<()> {
        if self.reader_spawned {
            return Ok(());
        }

        let active = Arc::clone(&self.active);
        let closed = Arc::clone(&self.closed);

        thread::Builder::new()
            .name("console-recognizer".to_string())
            .spawn(move || {
                info!("console recognizer thread started");
                read_lines(std::io::stdin().lock(), &active, &closed);
                info!("console recognizer thread stopped");
            })
            .map_err(|e| VoiceError::StartFailure(e.to_string()))?;

        self.reader_spawned = true;
        Ok(())
    }
}

impl Default for ConsoleRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Recognizer for ConsoleRecognizer {
    fn name(&self) -> &'static str {
        "console"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn start(&mut self, sink: RecognizerSink) -> Result<()> {
        self.spawn_reader()?;

        // The reader marks input closed under this lock, so a sink is never
        // installed after it has finished. Holding the slot while confirming
        // also keeps any result from overtaking Started.
        let mut active = self.active.lock();
        if self.closed.load(Ordering::SeqCst) {
            return Err(VoiceError::StartFailure("console input closed".to_string()));
        }
        if active.is_some() {
            return Err(VoiceError::StartFailure("recognizer already running".to_string()));
        }
        sink.started()?;
        debug!(generation = %sink.generation(), "console recognizer listening");
        *active = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(sink) = self.active.lock().take() {
            debug!(generation = %sink.generation(), "console recognizer stopped");
        }
    }
}

/// Forward lines to the active sink until input ends
///
/// `closed` is set before the final event goes out, so by the time the
/// session sees Ended or Error no further start can succeed.
fn read_lines<R: BufRead>(
    input: R,
    active: &Mutex<Option<RecognizerSink>>,
    closed: &AtomicBool,
) {
    for line in input.lines() {
        let text = match line {
            Ok(text) => text,
            Err(e) => {
                warn!(?e, "console read failed");
                if let Some(sink) = close(active, closed) {
                    let _ = sink.error(e.kind().to_string());
                }
                return;
            }
        };

        if text.trim().is_empty() {
            continue;
        }

        let delivered = match active.lock().as_ref() {
            Some(sink) => sink.result(text),
            None => {
                debug!("not listening, dropping console input");
                Ok(())
            }
        };
        if let Err(e) = delivered {
            warn!(?e, "failed to deliver transcript");
            close(active, closed);
            return;
        }
    }

    if let Some(sink) = close(active, closed) {
        let _ = sink.ended();
    }
}

/// Mark input closed and release the active sink in one step
fn close(active: &Mutex<Option<RecognizerSink>>, closed: &AtomicBool) -> Option<RecognizerSink> {
    let mut slot = active.lock();
    closed.store(true, Ordering::SeqCst);
    slot.take()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::UnboundedReceiver<Input>) -> Vec<RecognizerEventKind> {
        let mut kinds = Vec::new();
        while let Ok(input) = rx.try_recv() {
            if let Input::Recognizer(event) = input {
                kinds.push(event.kind);
            }
        }
        kinds
    }

    #[test]
    fn test_sink_tags_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = RecognizerSink::new(Generation::default().next(), tx);
        sink.result("home").unwrap();

        match rx.try_recv().unwrap() {
            Input::Recognizer(event) => {
                assert_eq!(event.generation, Generation::default().next());
                assert_eq!(event.kind, RecognizerEventKind::Result("home".to_string()));
            }
            other => panic!("unexpected input {other:?}"),
        }
    }

    #[test]
    fn test_sink_reports_closed_channel() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sink = RecognizerSink::new(Generation::default(), tx);
        assert!(matches!(sink.started(), Err(VoiceError::Channel(_))));
    }

    #[test]
    fn test_read_lines_forwards_and_ends() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let active = Mutex::new(Some(RecognizerSink::new(Generation::default(), tx)));
        let closed = AtomicBool::new(false);

        read_lines("go home\n\n  \nhealth please\n".as_bytes(), &active, &closed);

        assert_eq!(
            drain(&mut rx),
            vec![
                RecognizerEventKind::Result("go home".to_string()),
                RecognizerEventKind::Result("health please".to_string()),
                RecognizerEventKind::Ended,
            ]
        );
        assert!(active.lock().is_none());
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_read_lines_drops_input_when_stopped() {
        let (_tx, mut rx) = mpsc::unbounded_channel::<Input>();
        let active = Mutex::new(None);
        let closed = AtomicBool::new(false);

        read_lines("home\n".as_bytes(), &active, &closed);

        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_input_closed_before_ended_is_delivered() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = RecognizerSink::new(Generation::default(), tx.clone());
        let active = Arc::new(Mutex::new(Some(sink)));
        let closed = Arc::new(AtomicBool::new(false));

        read_lines("".as_bytes(), &active, &closed);
        assert_eq!(drain(&mut rx), vec![RecognizerEventKind::Ended]);

        // A start issued after Ended must not install a sink on the dead reader
        let mut recognizer = ConsoleRecognizer {
            active,
            closed,
            reader_spawned: true,
        };
        let sink = RecognizerSink::new(Generation::default().next(), tx);
        assert!(matches!(
            recognizer.start(sink),
            Err(VoiceError::StartFailure(_))
        ));
        assert!(recognizer.active.lock().is_none());
        assert!(drain(&mut rx).is_empty());
    }
}
