//! Voice navigator actor

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::commands::{lookup, match_commands, CommandEntry, CommandId};
use crate::error::VoiceError;
use crate::events::{Notification, VoiceEvent};
use crate::session::{SessionManager, SessionState, SessionUpdate, StartOutcome};
use crate::speech::{FeedbackSpeaker, RecognizerEvent};

const ACTIVE_ANNOUNCEMENT: &str = "Voice navigation active. What would you like to do?";
const PAUSED_ANNOUNCEMENT: &str = "Voice navigation paused";
const FEEDBACK_ENABLED_ANNOUNCEMENT: &str = "Voice feedback enabled";

/// User-triggerable actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    ToggleListening,
    ToggleMute,
}

/// Everything the navigator reacts to
#[derive(Debug, Clone)]
pub enum Input {
    Control(ControlAction),
    Recognizer(RecognizerEvent),
}

/// Read-only view for the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlStatus {
    pub state: SessionState,
    /// Whether the listening toggle should be offered
    pub listening_available: bool,
    pub feedback_available: bool,
    pub muted: bool,
    pub transcript: String,
    pub commands: Vec<CommandInfo>,
}

/// Command vocabulary entry for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandInfo {
    pub phrase: String,
    pub id: CommandId,
}

impl From<&CommandEntry> for CommandInfo {
    fn from(entry: &CommandEntry) -> Self {
        Self {
            phrase: entry.phrase.to_string(),
            id: entry.id,
        }
    }
}

type CommandCallback = Box<dyn FnMut(CommandId) + Send>;

pub struct VoiceNavigator {
    session: SessionManager,
    speaker: FeedbackSpeaker,
    transcript: String,
    on_command: CommandCallback,
    event_tx: broadcast::Sender<VoiceEvent>,
}

impl VoiceNavigator {
    /// Create a navigator; `on_command` runs once per matched command
    pub fn new(
        session: SessionManager,
        speaker: FeedbackSpeaker,
        on_command: impl FnMut(CommandId) + Send + 'static,
        event_tx: broadcast::Sender<VoiceEvent>,
    ) -> Self {
        Self {
            session,
            speaker,
            transcript: String::new(),
            on_command: Box::new(on_command),
            event_tx,
        }
    }

    /// Snapshot of everything the UI renders
    pub fn status(&self) -> ControlStatus {
        ControlStatus {
            state: self.session.state(),
            listening_available: self.session.is_available(),
            feedback_available: self.speaker.is_available(),
            muted: self.speaker.is_muted(),
            transcript: self.transcript.clone(),
            commands: lookup().iter().map(CommandInfo::from).collect(),
        }
    }

    /// Process inputs until every sender is gone
    pub async fn run(&mut self, mut input_rx: mpsc::UnboundedReceiver<Input>) {
        info!("voice navigator started");

        while let Some(input) = input_rx.recv().await {
            self.handle(input);
        }

        info!("voice navigator stopped");
    }

    /// Handle one input, then hand the surviving announcement to the synthesizer
    pub fn handle(&mut self, input: Input) {
        match input {
            Input::Control(ControlAction::ToggleListening) => self.toggle_listening(),
            Input::Control(ControlAction::ToggleMute) => self.toggle_mute(),
            Input::Recognizer(event) => self.handle_recognizer_event(event),
        }
        self.speaker.flush();
    }

    /// Stop listening and silence speech without announcing anything
    pub fn shutdown(&mut self) {
        if self.session.stop() {
            self.emit(VoiceEvent::SessionStateChanged {
                state: SessionState::Idle,
            });
        }
        self.speaker.silence();
    }

    fn toggle_listening(&mut self) {
        if self.session.state() == SessionState::Listening {
            self.session.stop();
            self.emit_state();
            self.speaker.announce(PAUSED_ANNOUNCEMENT);
            return;
        }

        match self.session.start() {
            Ok(StartOutcome::Started) => {
                debug!(generation = %self.session.generation(), "listening session opened");
                self.transcript.clear();
                self.emit_state();
                self.emit(VoiceEvent::TranscriptUpdated {
                    text: String::new(),
                });
            }
            Ok(StartOutcome::AlreadyListening) => {}
            Err(e) => self.notify_error(&e),
        }
    }

    fn toggle_mute(&mut self) {
        let muted = !self.speaker.is_muted();
        self.speaker.set_muted(muted);
        info!(muted, "voice feedback toggled");
        self.emit(VoiceEvent::MuteChanged { muted });

        if muted {
            self.emit(VoiceEvent::Notification(Notification::info("Voice feedback muted")));
        } else {
            self.speaker.announce(FEEDBACK_ENABLED_ANNOUNCEMENT);
        }
    }

    fn handle_recognizer_event(&mut self, event: RecognizerEvent) {
        match self.session.handle_event(event) {
            SessionUpdate::Ignored => {}
            SessionUpdate::Confirmed => self.speaker.announce(ACTIVE_ANNOUNCEMENT),
            SessionUpdate::Transcript(text) => self.handle_transcript(text),
            SessionUpdate::Failed(e) => {
                self.emit(VoiceEvent::SessionStateChanged {
                    state: SessionState::Error,
                });
                self.emit_state();
                self.notify_error(&e);
            }
            SessionUpdate::Ended => self.emit_state(),
        }
    }

    fn handle_transcript(&mut self, text: String) {
        let matches = match_commands(&text);
        debug!(%text, matched = matches.len(), "transcript received");

        self.transcript = text.clone();
        self.emit(VoiceEvent::TranscriptUpdated { text });

        for command in matches {
            info!(%command, "voice command matched");
            (self.on_command)(command);
            self.emit(VoiceEvent::CommandMatched { command });
            self.speaker
                .announce(format!("Navigating to {}", command.phrase()));
        }
    }

    fn notify_error(&self, err: &VoiceError) {
        warn!(?err, recoverable = err.is_recoverable(), "voice navigation error");
        self.emit(VoiceEvent::Notification(Notification::from_error(err)));
    }

    fn emit_state(&self) {
        self.emit(VoiceEvent::SessionStateChanged {
            state: self.session.state(),
        });
    }

    fn emit(&self, event: VoiceEvent) {
        debug!(%event, "emitting event");
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::ipc::protocol::DaemonStatus;
    use crate::speech::testing::{FakeRecognizer, FakeSynthesizer, SynthCall};
    use crate::speech::VoiceParams;

    struct Harness {
        navigator: VoiceNavigator,
        recognizer: FakeRecognizer,
        synth: FakeSynthesizer,
        dispatched: Arc<Mutex<Vec<CommandId>>>,
        input_rx: mpsc::UnboundedReceiver<Input>,
        event_rx: broadcast::Receiver<VoiceEvent>,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_recognizer(FakeRecognizer::new())
        }

        fn with_recognizer(recognizer: FakeRecognizer) -> Self {
            let synth = FakeSynthesizer::new();
            let (input_tx, input_rx) = mpsc::unbounded_channel();
            let (event_tx, event_rx) = broadcast::channel(64);
            let dispatched = Arc::new(Mutex::new(Vec::new()));

            let session = SessionManager::new(Some(Box::new(recognizer.clone())), input_tx);
            let speaker = FeedbackSpeaker::new(Some(Box::new(synth.clone())), VoiceParams::default());
            let sink = Arc::clone(&dispatched);
            let navigator = VoiceNavigator::new(
                session,
                speaker,
                move |command| sink.lock().push(command),
                event_tx,
            );

            Self {
                navigator,
                recognizer,
                synth,
                dispatched,
                input_rx,
                event_rx,
            }
        }

        fn act(&mut self, action: ControlAction) {
            self.navigator.handle(Input::Control(action));
        }

        /// Feed queued recognizer events through the navigator
        fn pump(&mut self) {
            while let Ok(input) = self.input_rx.try_recv() {
                self.navigator.handle(input);
            }
        }

        /// Start listening and deliver the recognizer's confirmation
        fn start_confirmed(&mut self) {
            self.act(ControlAction::ToggleListening);
            self.recognizer.sink().started().unwrap();
            self.pump();
        }

        fn events(&mut self) -> Vec<VoiceEvent> {
            let mut events = Vec::new();
            while let Ok(event) = self.event_rx.try_recv() {
                events.push(event);
            }
            events
        }

        fn dispatched(&self) -> Vec<CommandId> {
            self.dispatched.lock().clone()
        }
    }

    #[test]
    fn test_start_announces_after_confirmation() {
        let mut h = Harness::new();
        h.act(ControlAction::ToggleListening);
        assert_eq!(h.navigator.status().state, SessionState::Listening);
        assert!(h.synth.spoken().is_empty());

        h.recognizer.sink().started().unwrap();
        h.pump();
        assert_eq!(h.synth.spoken(), vec![ACTIVE_ANNOUNCEMENT.to_string()]);
    }

    #[test]
    fn test_double_start_announces_once() {
        let mut h = Harness::new();
        h.start_confirmed();

        // ToggleListening would stop here, so repeat the start on the session
        h.navigator.session.start().unwrap();
        h.recognizer.sink().started().unwrap();
        h.pump();

        assert_eq!(h.recognizer.starts(), 1);
        assert_eq!(h.synth.spoken(), vec![ACTIVE_ANNOUNCEMENT.to_string()]);
    }

    #[test]
    fn test_transcript_dispatches_every_match_in_order() {
        let mut h = Harness::new();
        h.start_confirmed();

        h.recognizer.sink().result("Please call emergency now").unwrap();
        h.pump();

        assert_eq!(
            h.dispatched(),
            vec![CommandId::Emergency, CommandId::CallEmergency]
        );
        assert_eq!(h.navigator.status().transcript, "Please call emergency now");
        // The second announcement supersedes the first within one input
        assert_eq!(
            h.synth.spoken().last(),
            Some(&"Navigating to call emergency".to_string())
        );
        assert!(!h
            .synth
            .spoken()
            .contains(&"Navigating to emergency".to_string()));
    }

    #[test]
    fn test_transcript_events_in_order() {
        let mut h = Harness::new();
        h.start_confirmed();
        h.events();

        h.recognizer.sink().result("go home").unwrap();
        h.pump();

        assert_eq!(
            h.events(),
            vec![
                VoiceEvent::TranscriptUpdated {
                    text: "go home".to_string()
                },
                VoiceEvent::CommandMatched {
                    command: CommandId::Home
                },
            ]
        );
    }

    #[test]
    fn test_stop_then_late_result_is_discarded() {
        let mut h = Harness::new();
        h.start_confirmed();
        let sink = h.recognizer.sink();

        h.act(ControlAction::ToggleListening);
        assert_eq!(h.navigator.status().state, SessionState::Idle);
        let spoken_before = h.synth.calls();

        sink.result("home").unwrap();
        h.pump();

        assert!(h.dispatched().is_empty());
        assert_eq!(h.synth.calls(), spoken_before);
        assert_eq!(h.navigator.status().transcript, "");
    }

    #[test]
    fn test_restart_clears_served_transcript() {
        let mut h = Harness::new();
        let mut served = DaemonStatus::new(h.navigator.status());

        h.start_confirmed();
        h.recognizer.sink().result("go home").unwrap();
        h.pump();
        h.act(ControlAction::ToggleListening);
        h.act(ControlAction::ToggleListening);

        for event in h.events() {
            served.apply(&event);
        }

        assert_eq!(h.navigator.status().transcript, "");
        assert_eq!(served.control, h.navigator.status());
    }

    #[test]
    fn test_stop_announces_pause() {
        let mut h = Harness::new();
        h.start_confirmed();
        h.act(ControlAction::ToggleListening);

        assert_eq!(h.synth.spoken().last(), Some(&PAUSED_ANNOUNCEMENT.to_string()));
        assert_eq!(h.recognizer.stops(), 1);
    }

    #[test]
    fn test_unavailable_capability() {
        let mut h = Harness::with_recognizer(FakeRecognizer::unavailable());
        assert!(!h.navigator.status().listening_available);

        h.act(ControlAction::ToggleListening);

        assert_eq!(h.navigator.status().state, SessionState::Idle);
        assert!(h.synth.calls().is_empty());
        let events = h.events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            VoiceEvent::Notification(n) => {
                assert_eq!(n.title, "Speech Recognition Not Available")
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_start_failure_reported() {
        let mut h = Harness::new();
        h.recognizer.reject_next_start("not-allowed");
        h.act(ControlAction::ToggleListening);

        assert_eq!(h.navigator.status().state, SessionState::Idle);
        assert!(matches!(
            h.events().as_slice(),
            [VoiceEvent::Notification(n)] if n.title == "Couldn't start voice recognition"
        ));
    }

    #[test]
    fn test_recognition_error_notifies_and_stops() {
        let mut h = Harness::new();
        h.start_confirmed();
        h.events();

        h.recognizer.sink().error("network").unwrap();
        h.pump();

        let events = h.events();
        assert_eq!(
            events[..2],
            [
                VoiceEvent::SessionStateChanged {
                    state: SessionState::Error
                },
                VoiceEvent::SessionStateChanged {
                    state: SessionState::Idle
                },
            ]
        );
        match &events[2] {
            VoiceEvent::Notification(n) => {
                assert!(n.description.as_deref().unwrap_or_default().contains("network"))
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(h.navigator.status().state, SessionState::Idle);
        assert_eq!(h.recognizer.starts(), 1);
    }

    #[test]
    fn test_mute_toggle() {
        let mut h = Harness::new();
        h.start_confirmed();

        h.act(ControlAction::ToggleMute);
        assert!(h.navigator.status().muted);
        assert_eq!(h.synth.calls().last(), Some(&SynthCall::Cancel));

        let calls_while_muted = h.synth.calls();
        h.recognizer.sink().result("health").unwrap();
        h.pump();
        assert_eq!(h.dispatched(), vec![CommandId::Health]);
        assert_eq!(h.synth.calls(), calls_while_muted);

        h.act(ControlAction::ToggleMute);
        assert!(!h.navigator.status().muted);
        assert_eq!(
            h.synth.spoken().last(),
            Some(&FEEDBACK_ENABLED_ANNOUNCEMENT.to_string())
        );
    }

    #[test]
    fn test_mute_does_not_gate_session() {
        let mut h = Harness::new();
        h.act(ControlAction::ToggleMute);
        h.start_confirmed();

        assert_eq!(h.navigator.status().state, SessionState::Listening);
        assert!(h.synth.calls().is_empty());
    }

    #[test]
    fn test_status_lists_vocabulary() {
        let h = Harness::new();
        let status = h.navigator.status();
        assert_eq!(status.commands.len(), lookup().len());
        assert_eq!(status.commands[7].phrase, "call emergency");
        assert!(status.feedback_available);
    }

    #[test]
    fn test_shutdown_is_silent() {
        let mut h = Harness::new();
        h.start_confirmed();
        let spoken = h.synth.spoken();

        h.navigator.shutdown();

        assert_eq!(h.navigator.status().state, SessionState::Idle);
        assert_eq!(h.synth.spoken(), spoken);
    }

    #[tokio::test]
    async fn test_run_processes_inputs_in_order() {
        let mut h = Harness::new();
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(Input::Control(ControlAction::ToggleMute)).unwrap();
        tx.send(Input::Control(ControlAction::ToggleMute)).unwrap();
        drop(tx);

        h.navigator.run(rx).await;

        assert!(!h.navigator.status().muted);
        assert_eq!(h.synth.spoken(), vec![FEEDBACK_ENABLED_ANNOUNCEMENT.to_string()]);
    }
}
