/*!
    Shared types for the mediagraph crate family.

    This crate defines the vocabulary of the family — the types that cross
    crate boundaries. It has no dependency on any media engine, so consumers
    can depend on it without pulling in engine bindings.

    # Format Types

    - [`VideoFormat`] - Host video pixel formats and their graph-side names
    - [`SampleFormat`] - Host audio sample formats and their graph-side names
    - [`SpeakerLayout`] - Audio channel layouts keyed by channel count

    # Timing

    - [`Rational`] - Rational numbers for time bases and frame rates
    - [`Pts`] - Timestamps in time_base units

    # Boundary Data

    - [`GraphBuffer`] - A timestamped, caps-tagged block of media data
    - [`ContentDescriptor`] - Typed capability descriptor for a buffer
    - [`Colorimetry`] - Color range and matrix information for raw video

    # State

    - [`MediaState`] and [`AtomicMediaState`] - Externally observable status
    - [`GraphState`] - Lifecycle state of a graph instance
    - [`GraphMessage`] - Asynchronous messages emitted by a graph

    # Error Handling

    - [`Error`] and [`Result`] - Common error types
*/

mod buffer;
mod error;
mod format;
mod rational;
mod state;
mod timestamp;

pub use buffer::{AudioCaps, Colorimetry, ColorMatrix, ColorRange, ContentDescriptor, EncodedCaps, GraphBuffer, VideoCaps};
pub use error::{Error, Result};
pub use format::{Plane, SampleFormat, SpeakerLayout, VideoFormat};
pub use rational::Rational;
pub use state::{AtomicMediaState, GraphMessage, GraphState, MediaState};
pub use timestamp::Pts;
