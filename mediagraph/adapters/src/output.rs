/*!
    Output adapter.

    Owns a graph with two pre-declared encoded injection points matching
    the host's active encoder configuration. Stopping signals end-of-stream
    on both injections and blocks until the graph itself reports
    end-of-stream before tearing down, so no buffered data is silently
    dropped.
*/

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use mediagraph_bridge::host::{EncodedPacket, PacketKind};
use mediagraph_bridge::{ControllerConfig, GraphDriver, OutputConfig, PipelineController, RestartPolicy};
use mediagraph_engine::{GraphEngine, GraphInstance, Injection, template};
use mediagraph_types::{ContentDescriptor, EncodedCaps, Error, GraphBuffer, Rational, Result};

/// How long `stop` waits for the graph to drain before tearing down
/// anyway.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Default)]
struct OutputHandles {
    video: Mutex<Option<Arc<dyn Injection>>>,
    audio: Mutex<Option<Arc<dyn Injection>>>,
}

struct OutputDriver {
    handles: Arc<OutputHandles>,
}

impl GraphDriver for OutputDriver {
    fn wire(&mut self, graph: &mut dyn GraphInstance) -> Result<()> {
        let video = graph
            .injection(template::VIDEO_INJECTION)
            .ok_or_else(|| Error::parse("output video injection point missing"))?;
        let audio = graph
            .injection(template::AUDIO_INJECTION)
            .ok_or_else(|| Error::parse("output audio injection point missing"))?;
        *self.handles.video.lock() = Some(video);
        *self.handles.audio.lock() = Some(audio);
        Ok(())
    }

    fn unwire(&mut self) {
        *self.handles.video.lock() = None;
        *self.handles.audio.lock() = None;
    }

    fn clear_output(&mut self) {
        // Outputs have no display to clear.
    }
}

/**
    Output adapter over one graph instance.
*/
pub struct Output {
    label: String,
    controller: PipelineController,
    handles: Arc<OutputHandles>,
    video_caps: ContentDescriptor,
    audio_caps: ContentDescriptor,
}

impl Output {
    /**
        Create the output. The graph is built on [`start`](Self::start),
        not here.
    */
    pub fn create(
        label: impl Into<String>,
        config: OutputConfig,
        engine: Arc<dyn GraphEngine>,
    ) -> Result<Self> {
        let label = label.into();
        let description =
            template::output(&config.description, &config.video_media, &config.audio_media);
        let handles = Arc::new(OutputHandles::default());
        let controller = PipelineController::spawn(
            ControllerConfig {
                label: label.clone(),
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
            Box::new(OutputDriver { handles: Arc::clone(&handles) }),
        )?;
        Ok(Self {
            label,
            controller,
            handles,
            video_caps: ContentDescriptor::Encoded(EncodedCaps { media: config.video_media }),
            audio_caps: ContentDescriptor::Encoded(EncodedCaps { media: config.audio_media }),
        })
    }

    /**
        Build the graph and begin capturing. Returns false when the build
        fails, so the host refuses to start recording.
    */
    pub fn start(&self) -> bool {
        match self.controller.start_blocking() {
            Ok(()) => true,
            Err(e) => {
                log::error!("output '{}': {e}", self.label);
                false
            }
        }
    }

    /**
        Submit one encoded packet to the matching injection point.
    */
    pub fn encoded_packet(&self, packet: &EncodedPacket) -> Result<()> {
        let slot = match packet.kind {
            PacketKind::Video => &self.handles.video,
            PacketKind::Audio => &self.handles.audio,
        };
        let injection =
            slot.lock().clone().ok_or_else(|| Error::engine("output graph not running"))?;

        let mut buffer = GraphBuffer::new(
            packet.data.clone(),
            Some(packet.pts.rescale(packet.time_base, Rational::NANOSECONDS)),
            match packet.kind {
                PacketKind::Video => self.video_caps.clone(),
                PacketKind::Audio => self.audio_caps.clone(),
            },
        );
        buffer.dts = Some(packet.dts.rescale(packet.time_base, Rational::NANOSECONDS));
        buffer.keyframe = packet.keyframe;
        injection.push(buffer)
    }

    /**
        Signal end-of-stream on both injection points, wait for the graph
        to report end-of-stream, then tear down. Nothing submitted before
        the call is dropped.
    */
    pub fn stop(&self) {
        let injections: Vec<_> = [&self.handles.video, &self.handles.audio]
            .into_iter()
            .filter_map(|slot| slot.lock().clone())
            .collect();
        if injections.is_empty() {
            return;
        }
        for injection in injections {
            injection.end_of_stream();
        }
        if !self.controller.wait_for_eos(DRAIN_TIMEOUT) {
            log::warn!("output '{}': graph did not drain in time", self.label);
        }
        let _ = self.controller.stop_blocking();
    }

    /// Whether the graph is currently capturing.
    pub fn is_running(&self) -> bool {
        self.controller.is_running()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediagraph_engine::LoopbackEngine;
    use mediagraph_types::Pts;

    fn packet(kind: PacketKind, data: Vec<u8>, pts: i64) -> EncodedPacket {
        EncodedPacket {
            data,
            pts: Pts(pts),
            dts: Pts(pts),
            time_base: Rational::NANOSECONDS,
            keyframe: true,
            kind,
        }
    }

    fn create(engine: &Arc<LoopbackEngine>) -> Output {
        mediagraph_engine::init();
        Output::create("out", OutputConfig::default(), Arc::clone(engine) as Arc<dyn GraphEngine>)
            .expect("create output")
    }

    #[test]
    fn start_builds_the_graph() {
        let engine = Arc::new(LoopbackEngine::new());
        let output = create(&engine);
        assert_eq!(engine.build_count(), 0);
        assert!(output.start());
        assert_eq!(engine.build_count(), 1);
        assert!(output.is_running());
    }

    #[test]
    fn start_fails_on_bad_description() {
        mediagraph_engine::init();
        let engine = Arc::new(LoopbackEngine::new());
        let config = OutputConfig { description: "bogus-muxer".into(), ..Default::default() };
        let output =
            Output::create("out", config, Arc::clone(&engine) as Arc<dyn GraphEngine>).unwrap();
        assert!(!output.start());
    }

    #[test]
    fn packets_route_to_their_stream() {
        let engine = Arc::new(LoopbackEngine::new());
        let output = create(&engine);
        output.start();

        output.encoded_packet(&packet(PacketKind::Video, vec![1, 2], 0)).unwrap();
        output.encoded_packet(&packet(PacketKind::Audio, vec![3], 0)).unwrap();
        output.encoded_packet(&packet(PacketKind::Video, vec![4], 1)).unwrap();

        let handle = engine.last_instance().unwrap();
        assert_eq!(handle.pushed(template::VIDEO_INJECTION).len(), 2);
        assert_eq!(handle.pushed(template::AUDIO_INJECTION).len(), 1);
    }

    #[test]
    fn packet_submission_fails_before_start() {
        let engine = Arc::new(LoopbackEngine::new());
        let output = create(&engine);
        assert!(output.encoded_packet(&packet(PacketKind::Video, vec![1], 0)).is_err());
    }

    #[test]
    fn stop_drains_before_teardown() {
        let engine = Arc::new(LoopbackEngine::new());
        let output = create(&engine);
        output.start();

        let submitted: Vec<Vec<u8>> = (0..5u8).map(|i| vec![i; 3]).collect();
        for (i, data) in submitted.iter().enumerate() {
            output.encoded_packet(&packet(PacketKind::Video, data.clone(), i as i64)).unwrap();
        }
        output.encoded_packet(&packet(PacketKind::Audio, vec![9], 0)).unwrap();

        let handle = engine.last_instance().unwrap();
        output.stop();

        // Both injections saw end-of-stream, and every submitted byte made
        // it into the graph before teardown.
        assert!(handle.eos_received(template::VIDEO_INJECTION));
        assert!(handle.eos_received(template::AUDIO_INJECTION));
        let recorded: Vec<Vec<u8>> =
            handle.pushed(template::VIDEO_INJECTION).into_iter().map(|b| b.data).collect();
        assert_eq!(recorded, submitted);
        assert!(!output.is_running());
    }

    #[test]
    fn stop_without_start_is_a_no_op() {
        let engine = Arc::new(LoopbackEngine::new());
        let output = create(&engine);
        output.stop();
        assert!(!output.is_running());
    }
}
