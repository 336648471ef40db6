/*!
    Host-side frame structures and callback traits.

    These are the shapes the host hands to the bridge and expects back.
    Frames delivered to the host own their data and describe the plane
    layout explicitly; frames coming from the host borrow the host's
    memory for the duration of the call.
*/

use mediagraph_types::{Colorimetry, Plane, Pts, Rational, SampleFormat, SpeakerLayout, VideoFormat};

/**
    A raw video frame delivered to the host.
*/
#[derive(Clone, Debug)]
pub struct HostVideoFrame {
    /// Pixel data; plane positions are given by `planes`.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: VideoFormat,
    /// Per-plane offset and stride into `data`.
    pub planes: Vec<Plane>,
    /// Color range and matrix, mapped from the graph's declaration.
    pub colorimetry: Colorimetry,
    /// Presentation timestamp in `time_base` units.
    pub timestamp: Pts,
    pub time_base: Rational,
}

/**
    A raw audio buffer delivered to the host. Samples are interleaved.
*/
#[derive(Clone, Debug)]
pub struct HostAudioFrame {
    pub data: Vec<u8>,
    /// Number of sample frames (one sample per channel each).
    pub frames: usize,
    pub sample_rate: u32,
    pub format: SampleFormat,
    pub layout: SpeakerLayout,
    /// Presentation timestamp in `time_base` units.
    pub timestamp: Pts,
    pub time_base: Rational,
}

/**
    One plane of a host-owned raw frame on its way into the graph.

    Borrowed: the memory belongs to the host and is only valid for the
    duration of the call it was passed in.
*/
#[derive(Clone, Copy, Debug)]
pub struct RawPlane<'a> {
    pub data: &'a [u8],
    /// Bytes per row, including any host-side padding.
    pub stride: usize,
}

/**
    A host-owned raw video frame on its way into the graph.
*/
#[derive(Clone, Debug)]
pub struct RawVideoFrame<'a> {
    pub planes: Vec<RawPlane<'a>>,
    /// Host frame index (encoders) or host timestamp in nanoseconds.
    pub pts: i64,
}

/**
    Which elementary stream an encoded packet belongs to.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketKind {
    Video,
    Audio,
}

/**
    An encoded access unit delivered to the host.
*/
#[derive(Clone, Debug)]
pub struct EncodedPacket {
    pub data: Vec<u8>,
    /// Presentation timestamp in `time_base` units, rebased to the first
    /// output buffer.
    pub pts: Pts,
    /// Decoding timestamp, rebased the same way.
    pub dts: Pts,
    pub time_base: Rational,
    pub keyframe: bool,
    pub kind: PacketKind,
}

/**
    The callbacks a source-style host exposes for asynchronous delivery.

    `output_video(None)` clears the display.
*/
pub trait SourceHost: Send + Sync {
    fn output_video(&self, frame: Option<HostVideoFrame>);
    fn output_audio(&self, audio: HostAudioFrame);
}
