/*!
    Filter adapter.

    The host hands a frame in and requires the transformed frame as the
    direct return value, so this variant is fully synchronous: push, then
    block on the pull. The graph is built lazily on the first frame (the
    host supplies no format up front) and rebuilt whenever the description
    or the frame shape changes. Every failure path returns the input frame
    untouched.
*/

use std::sync::Arc;
use std::time::Duration;

use mediagraph_bridge::host::{HostAudioFrame, HostVideoFrame};
use mediagraph_bridge::{FilterConfig, marshal};
use mediagraph_engine::{Extraction, GraphEngine, GraphInstance, Injection, template};
use mediagraph_types::{
    AudioCaps, ContentDescriptor, GraphMessage, GraphState, Rational, Result, SampleFormat,
    SpeakerLayout, VideoCaps, VideoFormat,
};

/// How long a pull may block before the frame passes through unfiltered.
const PULL_TIMEOUT: Duration = Duration::from_millis(500);

/// The latched input shape a filter graph was built for.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Shape {
    Video { format: VideoFormat, width: u32, height: u32 },
    Audio { format: SampleFormat, rate: u32, layout: SpeakerLayout },
}

struct FilterGraph {
    graph: Box<dyn GraphInstance>,
    injection: Arc<dyn Injection>,
    extraction: Arc<dyn Extraction>,
    shape: Shape,
}

impl Drop for FilterGraph {
    fn drop(&mut self) {
        let _ = self.graph.set_state(GraphState::Null);
    }
}

/**
    Synchronous in-place filter over one lazily built graph per media
    kind.
*/
pub struct Filter {
    label: String,
    engine: Arc<dyn GraphEngine>,
    config: FilterConfig,
    video: Option<FilterGraph>,
    audio: Option<FilterGraph>,
}

impl Filter {
    pub fn create(label: impl Into<String>, config: FilterConfig, engine: Arc<dyn GraphEngine>) -> Self {
        Self { label: label.into(), engine, config, video: None, audio: None }
    }

    /**
        Apply a new description. Tears both graphs down synchronously; the
        next frame rebuilds.
    */
    pub fn update(&mut self, config: FilterConfig) {
        self.config = config;
        self.video = None;
        self.audio = None;
    }

    fn build(&self, description: String, shape: Shape) -> Result<FilterGraph> {
        let mut graph = self.engine.build(&description)?;
        let label = self.label.clone();
        graph.set_bus_callback(Box::new(move |message| match message {
            GraphMessage::Error(text) => log::error!("filter '{label}': {text}"),
            GraphMessage::Warning(text) => log::warn!("filter '{label}': {text}"),
            _ => {}
        }));
        let injection = graph
            .injection(template::INJECTION)
            .ok_or_else(|| mediagraph_types::Error::parse("filter injection point missing"))?;
        let extraction = graph
            .extraction(template::EXTRACTION)
            .ok_or_else(|| mediagraph_types::Error::parse("filter extraction point missing"))?;
        extraction.set_sync(false);
        graph.set_state(GraphState::Playing)?;
        Ok(FilterGraph { graph, injection, extraction, shape })
    }

    /**
        Transform one video frame in place. On any failure the frame is
        returned unmodified.
    */
    pub fn filter_video(&mut self, frame: &mut HostVideoFrame) {
        let shape = Shape::Video { format: frame.format, width: frame.width, height: frame.height };
        if self.video.as_ref().is_none_or(|active| active.shape != shape) {
            let description =
                template::filter_video(&self.config.description, frame.format, frame.width, frame.height);
            match self.build(description, shape) {
                Ok(built) => self.video = Some(built),
                Err(e) => {
                    log::error!("filter '{}': {e}", self.label);
                    self.video = None;
                    return;
                }
            }
        }
        let Some(active) = self.video.as_ref() else { return };

        let expected = frame.format.buffer_size(frame.width, frame.height);
        if frame.data.len() != expected {
            log::error!("filter '{}': frame size mismatch, passing through", self.label);
            return;
        }

        let caps = ContentDescriptor::Video(VideoCaps {
            format: frame.format.graph_name().into(),
            width: frame.width,
            height: frame.height,
            framerate: Rational::new(0, 1),
            colorimetry: frame.colorimetry,
        });
        let pts = frame.timestamp.rescale(frame.time_base, Rational::NANOSECONDS);
        let buffer = marshal::wrap_packed(frame.data.clone(), Some(pts), caps);

        if let Err(e) = active.injection.push(buffer) {
            log::warn!("filter '{}': {e}", self.label);
            return;
        }
        match active.extraction.pull(PULL_TIMEOUT) {
            Some(out) if out.data.len() == expected => frame.data = out.data,
            Some(_) => log::warn!("filter '{}': transformed frame has wrong size", self.label),
            None => log::warn!("filter '{}': no transformed frame, passing through", self.label),
        }
    }

    /**
        Transform one audio buffer in place. On any failure the samples
        are returned unmodified.
    */
    pub fn filter_audio(&mut self, audio: &mut HostAudioFrame) {
        let shape =
            Shape::Audio { format: audio.format, rate: audio.sample_rate, layout: audio.layout };
        if self.audio.as_ref().is_none_or(|active| active.shape != shape) {
            let description = template::filter_audio(
                &self.config.description,
                audio.format,
                audio.sample_rate,
                audio.layout.channels(),
            );
            match self.build(description, shape) {
                Ok(built) => self.audio = Some(built),
                Err(e) => {
                    log::error!("filter '{}': {e}", self.label);
                    self.audio = None;
                    return;
                }
            }
        }
        let Some(active) = self.audio.as_ref() else { return };

        let caps = ContentDescriptor::Audio(AudioCaps {
            format: audio.format.graph_name().into(),
            rate: audio.sample_rate,
            channels: audio.layout.channels(),
        });
        let pts = audio.timestamp.rescale(audio.time_base, Rational::NANOSECONDS);
        let buffer = marshal::wrap_packed(audio.data.clone(), Some(pts), caps);

        if let Err(e) = active.injection.push(buffer) {
            log::warn!("filter '{}': {e}", self.label);
            return;
        }
        match active.extraction.pull(PULL_TIMEOUT) {
            Some(out) if out.data.len() == audio.data.len() => audio.data = out.data,
            Some(_) => log::warn!("filter '{}': transformed audio has wrong size", self.label),
            None => log::warn!("filter '{}': no transformed audio, passing through", self.label),
        }
    }
}
