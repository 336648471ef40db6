/*!
    Boundary buffer and capability descriptor types.
*/

use crate::{Pts, Rational};

/**
    Color range of raw video content.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ColorRange {
    /// Range not declared by the graph; host default applies.
    #[default]
    Unspecified,
    /// Full range (0-255).
    Full,
    /// Limited range (16-235).
    Partial,
}

/**
    Color matrix of raw video content.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ColorMatrix {
    /// Matrix not declared by the graph; host default applies.
    #[default]
    Unspecified,
    /// BT.601 (standard definition).
    Bt601,
    /// BT.709 (high definition).
    Bt709,
}

/**
    Colorimetry information attached to raw video capabilities.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Colorimetry {
    pub range: ColorRange,
    pub matrix: ColorMatrix,
}

/**
    Capabilities of a raw video buffer.

    The `format` field carries the graph-side format name; only the format
    translator interprets it.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoCaps {
    /// Graph-side format name (e.g. "I420").
    pub format: String,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frame rate.
    pub framerate: Rational,
    /// Color range and matrix.
    pub colorimetry: Colorimetry,
}

/**
    Capabilities of a raw audio buffer.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioCaps {
    /// Graph-side format name (e.g. "S16LE").
    pub format: String,
    /// Sample rate in Hz.
    pub rate: u32,
    /// Number of interleaved channels.
    pub channels: u16,
}

/**
    Capabilities of an encoded buffer (one access unit).
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedCaps {
    /// Graph-side media type name (e.g. "video/encoded,media=h264").
    pub media: String,
}

/**
    Typed capability descriptor exchanged at the injection/extraction
    boundary.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentDescriptor {
    Video(VideoCaps),
    Audio(AudioCaps),
    Encoded(EncodedCaps),
}

impl ContentDescriptor {
    /**
        Returns the video capabilities if this describes raw video.
    */
    pub fn as_video(&self) -> Option<&VideoCaps> {
        match self {
            Self::Video(caps) => Some(caps),
            _ => None,
        }
    }

    /**
        Returns the audio capabilities if this describes raw audio.
    */
    pub fn as_audio(&self) -> Option<&AudioCaps> {
        match self {
            Self::Audio(caps) => Some(caps),
            _ => None,
        }
    }
}

/**
    A timestamped, formatted block of media data flowing across the
    host/graph boundary in either direction.

    Ownership of the data transfers with the buffer: into the graph on
    injection, back to the bridge on extraction.
*/
#[derive(Clone, Debug)]
pub struct GraphBuffer {
    /// The payload bytes.
    pub data: Vec<u8>,
    /// Presentation timestamp.
    pub pts: Option<Pts>,
    /// Decoding timestamp (encoded buffers only; may differ from PTS).
    pub dts: Option<Pts>,
    /// Time base for interpreting the timestamps.
    pub time_base: Rational,
    /// Whether the buffer can be decoded independently.
    pub keyframe: bool,
    /// What the payload is.
    pub caps: ContentDescriptor,
}

impl GraphBuffer {
    /**
        Create a buffer on the graph clock (nanosecond time base).
    */
    pub fn new(data: Vec<u8>, pts: Option<Pts>, caps: ContentDescriptor) -> Self {
        Self {
            data,
            pts,
            dts: None,
            time_base: Rational::NANOSECONDS,
            keyframe: true,
            caps,
        }
    }
}

// Buffers cross thread boundaries between the host and the graph.
static_assertions::assert_impl_all!(GraphBuffer: Send, Sync);
static_assertions::assert_impl_all!(ContentDescriptor: Send, Sync);
