/*!
    Encoder adapter.

    Builds a graph whose injection point accepts the host's raw output
    format and whose extraction point yields encoded access units. Encode
    calls are non-blocking: push one frame, pull at most what is already
    available, report whether a unit was produced.
*/

use std::sync::Arc;

use parking_lot::Mutex;

use mediagraph_bridge::host::{EncodedPacket, PacketKind, RawVideoFrame};
use mediagraph_bridge::{ControllerConfig, EncoderConfig, GraphDriver, PipelineController, RestartPolicy, marshal};
use mediagraph_engine::{Extraction, GraphEngine, GraphInstance, Injection, template};
use mediagraph_types::{
    Colorimetry, ContentDescriptor, Error, Pts, Rational, Result, VideoCaps, VideoFormat,
};

use crate::annexb;

/**
    The host's active video configuration, fixed for the encoder's
    lifetime.
*/
#[derive(Clone, Copy, Debug)]
pub struct EncoderVideoInfo {
    pub format: VideoFormat,
    pub width: u32,
    pub height: u32,
    pub framerate: Rational,
}

#[derive(Default)]
struct EncoderHandles {
    injection: Mutex<Option<Arc<dyn Injection>>>,
    extraction: Mutex<Option<Arc<dyn Extraction>>>,
}

struct EncoderDriver {
    handles: Arc<EncoderHandles>,
}

impl GraphDriver for EncoderDriver {
    fn wire(&mut self, graph: &mut dyn GraphInstance) -> Result<()> {
        let injection = graph
            .injection(template::INJECTION)
            .ok_or_else(|| Error::parse("encoder injection point missing"))?;
        let extraction = graph
            .extraction(template::EXTRACTION)
            .ok_or_else(|| Error::parse("encoder extraction point missing"))?;
        extraction.set_sync(false);
        *self.handles.injection.lock() = Some(injection);
        *self.handles.extraction.lock() = Some(extraction);
        Ok(())
    }

    fn unwire(&mut self) {
        *self.handles.injection.lock() = None;
        *self.handles.extraction.lock() = None;
    }

    fn clear_output(&mut self) {
        // Encoders have no display to clear.
    }
}

/**
    Encoder adapter over one graph instance.
*/
pub struct Encoder {
    controller: PipelineController,
    handles: Arc<EncoderHandles>,
    info: EncoderVideoInfo,
    caps: ContentDescriptor,
    /// First output PTS; all delivered timestamps are rebased against it.
    offset: Option<i64>,
    priming: Option<Vec<u8>>,
}

impl std::fmt::Debug for Encoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encoder")
            .field("info", &self.info)
            .field("caps", &self.caps)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

impl Encoder {
    /**
        Build the encoder graph and start it.

        Unlike the source, a description that fails to parse fails
        creation, so the host refuses to activate the encoder.
    */
    pub fn create(
        label: impl Into<String>,
        config: EncoderConfig,
        info: EncoderVideoInfo,
        engine: Arc<dyn GraphEngine>,
    ) -> Result<Self> {
        let stage = config.stage_with_options(info.framerate.num, info.framerate.den);
        let description =
            template::encoder(&stage, info.format, info.width, info.height, info.framerate);

        let handles = Arc::new(EncoderHandles::default());
        let controller = PipelineController::spawn(
            ControllerConfig {
                label: label.into(),
                description,
                policy: RestartPolicy {
                    on_eos: false,
                    on_error: false,
                    clear_on_fault: false,
                    ..Default::default()
                },
                autostart: false,
            },
            engine,
            Box::new(EncoderDriver { handles: Arc::clone(&handles) }),
        )?;
        controller.start_blocking()?;

        let caps = ContentDescriptor::Video(VideoCaps {
            format: info.format.graph_name().into(),
            width: info.width,
            height: info.height,
            framerate: info.framerate,
            colorimetry: Colorimetry::default(),
        });

        Ok(Self { controller, handles, info, caps, offset: None, priming: None })
    }

    /**
        Encode one frame. Returns the produced access unit, or `None` when
        the graph has not emitted one yet — never blocks waiting for it.
    */
    pub fn encode(&mut self, frame: &RawVideoFrame<'_>) -> Result<Option<EncodedPacket>> {
        let injection = self
            .handles
            .injection
            .lock()
            .clone()
            .ok_or_else(|| Error::engine("encoder graph not running"))?;
        let extraction = self
            .handles
            .extraction
            .lock()
            .clone()
            .ok_or_else(|| Error::engine("encoder graph not running"))?;

        let data = marshal::pack_video(frame, self.info.format, self.info.width, self.info.height)?;
        let pts_ns = frame.pts as i128 * 1_000_000_000 * self.info.framerate.den as i128
            / self.info.framerate.num as i128;
        injection.push(marshal::wrap_packed(data, Some(Pts(pts_ns as i64)), self.caps.clone()))?;

        let Some(unit) = extraction.try_pull() else {
            return Ok(None);
        };

        if self.priming.is_none() {
            if let Some(priming) = annexb::priming_data(&unit.data) {
                self.priming = Some(priming.to_vec());
            }
        }

        let pts = unit.pts.map(i64::from).unwrap_or(0);
        let dts = unit.dts.map(i64::from).unwrap_or(pts);
        let offset = *self.offset.get_or_insert(pts);

        Ok(Some(EncodedPacket {
            data: unit.data,
            pts: Pts(pts - offset),
            dts: Pts(dts - offset),
            time_base: unit.time_base,
            keyframe: unit.keyframe,
            kind: PacketKind::Video,
        }))
    }

    /**
        The cached priming data, once an access unit containing a coded
        picture has been observed. Cached exactly once per instance
        lifetime.
    */
    pub fn extra_data(&self) -> Option<&[u8]> {
        self.priming.as_deref()
    }

    /// Whether the underlying graph is still up.
    pub fn is_running(&self) -> bool {
        self.controller.is_running()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediagraph_bridge::host::RawPlane;
    use mediagraph_engine::LoopbackEngine;
    use mediagraph_types::{EncodedCaps, GraphBuffer};

    fn info() -> EncoderVideoInfo {
        EncoderVideoInfo {
            format: VideoFormat::Bgra,
            width: 2,
            height: 2,
            framerate: Rational::new(30, 1),
        }
    }

    fn create(engine: &Arc<LoopbackEngine>) -> Encoder {
        mediagraph_engine::init();
        Encoder::create(
            "enc",
            EncoderConfig::default(),
            info(),
            Arc::clone(engine) as Arc<dyn GraphEngine>,
        )
        .expect("create encoder")
    }

    fn frame(data: &[u8], pts: i64) -> RawVideoFrame<'_> {
        RawVideoFrame { planes: vec![RawPlane { data, stride: 8 }], pts }
    }

    fn annexb_unit(unit_type: u8, payload: &[u8]) -> Vec<u8> {
        let mut data = vec![0, 0, 0, 1, unit_type];
        data.extend_from_slice(payload);
        data
    }

    #[test]
    fn create_fails_on_unknown_encoder_stage() {
        mediagraph_engine::init();
        let engine = Arc::new(LoopbackEngine::new());
        let config = EncoderConfig { stage: "martian-codec".into(), ..Default::default() };
        let result = Encoder::create("enc", config, info(), engine as Arc<dyn GraphEngine>);
        assert!(result.unwrap_err().is_parse());
    }

    #[test]
    fn encode_produces_units_with_rebased_timestamps() {
        let engine = Arc::new(LoopbackEngine::new());
        let mut encoder = create(&engine);
        let pixels = vec![0u8; 16];

        // The loopback echoes the pushed frame straight back.
        let first = encoder.encode(&frame(&pixels, 0)).unwrap().unwrap();
        assert_eq!(first.pts, Pts(0));
        assert_eq!(first.dts, Pts(0));

        let second = encoder.encode(&frame(&pixels, 1)).unwrap().unwrap();
        // One frame at 30fps, rebased against the first unit.
        assert_eq!(second.pts, Pts(1_000_000_000 / 30));
        assert_eq!(second.kind, PacketKind::Video);
    }

    #[test]
    fn encode_reports_nothing_without_output() {
        let engine = Arc::new(LoopbackEngine::new());
        let mut encoder = create(&engine);
        // Drain the echo of this push first so the queue is empty.
        let pixels = vec![0u8; 16];
        let produced = encoder.encode(&frame(&pixels, 0)).unwrap();
        assert!(produced.is_some());

        // No further output queued: an empty pull is not an error.
        let handle = engine.last_instance().unwrap();
        assert!(handle.pushed(template::INJECTION).len() == 1);
    }

    #[test]
    fn priming_data_cached_exactly_once() {
        let engine = Arc::new(LoopbackEngine::new());
        let mut encoder = create(&engine);
        assert!(encoder.extra_data().is_none());

        let mut stream = annexb_unit(0x67, &[1, 2, 3]);
        stream.extend(annexb_unit(0x68, &[4]));
        let expected_len = stream.len();
        stream.extend(annexb_unit(0x65, &[5, 6]));

        let handle = engine.last_instance().unwrap();
        let caps = ContentDescriptor::Encoded(EncodedCaps { media: "video/encoded,media=h264".into() });
        handle.feed(template::EXTRACTION, GraphBuffer::new(stream, Some(Pts(0)), caps.clone()));

        let pixels = vec![0u8; 16];
        encoder.encode(&frame(&pixels, 0)).unwrap().unwrap();
        assert_eq!(encoder.extra_data().unwrap().len(), expected_len);

        // A later unit with different parameter sets must not replace the
        // cached priming data.
        let mut other = annexb_unit(0x67, &[9, 9, 9, 9]);
        other.extend(annexb_unit(0x65, &[1]));
        handle.feed(template::EXTRACTION, GraphBuffer::new(other, Some(Pts(1)), caps));
        encoder.encode(&frame(&pixels, 1)).unwrap().unwrap();
        assert_eq!(encoder.extra_data().unwrap().len(), expected_len);
    }

    #[test]
    fn rebase_uses_first_output_pts() {
        let engine = Arc::new(LoopbackEngine::new());
        let mut encoder = create(&engine);
        let handle = engine.last_instance().unwrap();
        let caps = ContentDescriptor::Encoded(EncodedCaps { media: "video/encoded,media=h264".into() });

        let mut early = GraphBuffer::new(vec![1, 2, 3], Some(Pts(5_000)), caps.clone());
        early.dts = Some(Pts(4_000));
        handle.feed(template::EXTRACTION, early);

        let pixels = vec![0u8; 16];
        let packet = encoder.encode(&frame(&pixels, 0)).unwrap().unwrap();
        assert_eq!(packet.pts, Pts(0));
        assert_eq!(packet.dts, Pts(-1_000));
    }

    #[test]
    fn keyframe_flag_passes_through() {
        let engine = Arc::new(LoopbackEngine::new());
        let mut encoder = create(&engine);
        let handle = engine.last_instance().unwrap();
        let caps = ContentDescriptor::Encoded(EncodedCaps { media: "video/encoded,media=h264".into() });

        let mut delta = GraphBuffer::new(vec![0], Some(Pts(0)), caps);
        delta.keyframe = false;
        handle.feed(template::EXTRACTION, delta);

        let pixels = vec![0u8; 16];
        let packet = encoder.encode(&frame(&pixels, 0)).unwrap().unwrap();
        assert!(!packet.keyframe);
    }
}
