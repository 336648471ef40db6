/*!
    Lifecycle and status state types.
*/

use std::sync::atomic::{AtomicU8, Ordering};

/**
    Lifecycle state of a graph instance.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GraphState {
    /// No resources allocated; the instance is inert.
    Null,
    /// Built and ready to transition further.
    Ready,
    /// Prerolled but not advancing.
    Paused,
    /// Running; buffers flow.
    Playing,
}

/**
    Externally observable media state of a bridge instance.

    Mutated only by the fault & status state machine in response to graph
    messages; read on demand from arbitrary host threads.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MediaState {
    None = 0,
    Opening = 1,
    Buffering = 2,
    Paused = 3,
    Playing = 4,
    Stopped = 5,
    Ended = 6,
    Error = 7,
}

impl MediaState {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Opening,
            2 => Self::Buffering,
            3 => Self::Paused,
            4 => Self::Playing,
            5 => Self::Stopped,
            6 => Self::Ended,
            7 => Self::Error,
            _ => Self::None,
        }
    }
}

/**
    Atomic cell holding a [`MediaState`].

    The media state is the one field written from the message-handling path
    and read from arbitrary host threads, so it gets lock-free read/write
    discipline.
*/
pub struct AtomicMediaState {
    inner: AtomicU8,
}

impl AtomicMediaState {
    pub const fn new(state: MediaState) -> Self {
        Self { inner: AtomicU8::new(state as u8) }
    }

    pub fn load(&self) -> MediaState {
        MediaState::from_u8(self.inner.load(Ordering::Acquire))
    }

    pub fn store(&self, state: MediaState) {
        self.inner.store(state as u8, Ordering::Release);
    }
}

impl Default for AtomicMediaState {
    fn default() -> Self {
        Self::new(MediaState::None)
    }
}

/**
    Asynchronous messages emitted by a graph instance on its message bus.

    Delivered strictly in emission order, on the execution context that also
    performs control operations.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphMessage {
    /// The instance changed lifecycle state.
    StateChanged(GraphState),
    /// The instance hit an unrecoverable error.
    Error(String),
    /// A non-fatal problem worth logging.
    Warning(String),
    /// End of stream reached.
    Eos,
    /// Buffering progress in percent; 100 means done.
    Buffering(u8),
}

static_assertions::assert_impl_all!(AtomicMediaState: Send, Sync);
static_assertions::assert_impl_all!(GraphMessage: Send, Sync);
