/*!
    Fault & status state machine.

    Consumes the graph's asynchronous message stream and maintains the
    externally observable media state. Policy (restart, display clearing)
    stays with the controller; this type only classifies.
*/

use std::sync::atomic::{AtomicBool, Ordering};

use mediagraph_types::{AtomicMediaState, GraphMessage, GraphState, MediaState};

/**
    Faults the controller must react to.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultKind {
    /// The graph reported an unrecoverable error.
    Error,
    /// The graph reached end of stream.
    Eos,
}

/**
    Tracks the media state of one bridge instance.

    Written only from the message-handling path; read from arbitrary host
    threads.
*/
pub struct StatusMachine {
    label: String,
    state: AtomicMediaState,
    buffering: AtomicBool,
}

impl StatusMachine {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            state: AtomicMediaState::new(MediaState::None),
            buffering: AtomicBool::new(false),
        }
    }

    /**
        The externally observable media state.

        While buffering is in progress the state reads as `Buffering`,
        unless the machine is already in `Error`.
    */
    pub fn media_state(&self) -> MediaState {
        let state = self.state.load();
        if self.buffering.load(Ordering::Acquire) && state != MediaState::Error {
            return MediaState::Buffering;
        }
        state
    }

    /**
        Force the state; used by the controller for transitions the graph
        does not announce (build start, teardown).
    */
    pub fn force(&self, state: MediaState) {
        self.state.store(state);
    }

    /**
        Apply one graph message to the state, in emission order.

        Returns the fault the controller must react to, if any.
    */
    pub fn apply(&self, message: &GraphMessage) -> Option<FaultKind> {
        match message {
            GraphMessage::StateChanged(GraphState::Ready) => {
                self.state.store(MediaState::Stopped);
                None
            }
            GraphMessage::StateChanged(GraphState::Paused) => {
                self.state.store(MediaState::Paused);
                None
            }
            GraphMessage::StateChanged(GraphState::Playing) => {
                self.state.store(MediaState::Playing);
                None
            }
            GraphMessage::StateChanged(GraphState::Null) => {
                // The graph never announces Null on its own during normal
                // operation; teardown is silent.
                log::warn!("source '{}': unexpected Null state from graph", self.label);
                self.state.store(MediaState::None);
                None
            }
            GraphMessage::Error(message) => {
                log::error!("source '{}': {message}", self.label);
                self.state.store(MediaState::Error);
                Some(FaultKind::Error)
            }
            GraphMessage::Warning(message) => {
                log::warn!("source '{}': {message}", self.label);
                None
            }
            GraphMessage::Eos => {
                self.state.store(MediaState::Ended);
                Some(FaultKind::Eos)
            }
            GraphMessage::Buffering(percent) => {
                self.buffering.store(*percent < 100, Ordering::Release);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> StatusMachine {
        StatusMachine::new("test")
    }

    #[test]
    fn state_changes_follow_the_table() {
        let status = machine();

        assert_eq!(status.apply(&GraphMessage::StateChanged(GraphState::Ready)), None);
        assert_eq!(status.media_state(), MediaState::Stopped);

        assert_eq!(status.apply(&GraphMessage::StateChanged(GraphState::Paused)), None);
        assert_eq!(status.media_state(), MediaState::Paused);

        assert_eq!(status.apply(&GraphMessage::StateChanged(GraphState::Playing)), None);
        assert_eq!(status.media_state(), MediaState::Playing);

        assert_eq!(status.apply(&GraphMessage::StateChanged(GraphState::Null)), None);
        assert_eq!(status.media_state(), MediaState::None);
    }

    #[test]
    fn error_reports_a_fault() {
        let status = machine();
        assert_eq!(
            status.apply(&GraphMessage::Error("device lost".into())),
            Some(FaultKind::Error)
        );
        assert_eq!(status.media_state(), MediaState::Error);
    }

    #[test]
    fn eos_reports_a_fault() {
        let status = machine();
        assert_eq!(status.apply(&GraphMessage::Eos), Some(FaultKind::Eos));
        assert_eq!(status.media_state(), MediaState::Ended);
    }

    #[test]
    fn warning_changes_nothing() {
        let status = machine();
        status.apply(&GraphMessage::StateChanged(GraphState::Playing));
        assert_eq!(status.apply(&GraphMessage::Warning("late buffer".into())), None);
        assert_eq!(status.media_state(), MediaState::Playing);
    }

    #[test]
    fn buffering_overlays_until_complete() {
        let status = machine();
        status.apply(&GraphMessage::StateChanged(GraphState::Playing));

        status.apply(&GraphMessage::Buffering(40));
        assert_eq!(status.media_state(), MediaState::Buffering);

        status.apply(&GraphMessage::Buffering(100));
        assert_eq!(status.media_state(), MediaState::Playing);
    }

    #[test]
    fn buffering_does_not_mask_error() {
        let status = machine();
        status.apply(&GraphMessage::Buffering(10));
        status.apply(&GraphMessage::Error("gone".into()));
        assert_eq!(status.media_state(), MediaState::Error);
    }

    #[test]
    fn force_sets_controller_driven_states() {
        let status = machine();
        status.force(MediaState::Opening);
        assert_eq!(status.media_state(), MediaState::Opening);
    }
}
