/*!
    Host-facing adapter variants.

    Four thin variants over the bridge core, differing only in which
    injection/extraction points exist and which host callback shapes they
    satisfy:

    - [`CaptureSource`] - asynchronous raw delivery into a source-style
      host, with the full playback-control surface
    - [`Encoder`] - raw frames in, encoded access units out, non-blocking
    - [`Filter`] - synchronous in-place frame transformation
    - [`Output`] - encoded packets in, muxed artifact out, with a draining
      stop

    The [`properties`] module provides the declarative configuration schema
    hosts render; defaults come from the config types' `Default` impls.
*/

mod annexb;
mod encoder;
mod filter;
mod output;
pub mod properties;
mod source;

pub use encoder::{Encoder, EncoderVideoInfo};
pub use filter::Filter;
pub use output::Output;
pub use source::CaptureSource;

pub use mediagraph_bridge::host::{
    EncodedPacket, HostAudioFrame, HostVideoFrame, PacketKind, RawPlane, RawVideoFrame, SourceHost,
};
pub use mediagraph_bridge::{
    EncoderConfig, FilterConfig, OutputConfig, PipelineConfig, RateControl,
};
