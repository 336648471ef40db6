/*!
    Capture source adapter.

    Owns a controller whose graph delivers raw video and audio into a
    source-style host through asynchronous extraction callbacks. Supports
    the full playback-control surface on top of the controller.
*/

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use mediagraph_bridge::host::SourceHost;
use mediagraph_bridge::{
    ControllerConfig, FrameCounter, GraphDriver, PipelineConfig, PipelineController, RestartPolicy,
    SampleCounter, marshal,
};
use mediagraph_engine::{GraphEngine, GraphInstance, template};
use mediagraph_types::{Error, GraphBuffer, MediaState, Rational, Result};

fn policy_from(config: &PipelineConfig) -> RestartPolicy {
    RestartPolicy {
        on_eos: config.restart_on_eos,
        on_error: config.restart_on_error,
        delay: Duration::from_millis(config.restart_delay_ms),
        clear_on_fault: config.clear_on_end,
    }
}

struct SourceShared {
    label: String,
    host: Arc<dyn SourceHost>,
    config: Mutex<PipelineConfig>,
    /// Synthesized-timestamp counters; reset on every (re)build so a run
    /// never mixes timestamp sources.
    video_clock: Mutex<Option<FrameCounter>>,
    audio_clock: Mutex<Option<SampleCounter>>,
}

impl SourceShared {
    fn deliver_video(&self, buffer: GraphBuffer) {
        let use_graph_timestamps = self.config.lock().use_graph_timestamps_video;
        let framerate = buffer.caps.as_video().map(|caps| caps.framerate);

        match marshal::unpack_video(buffer) {
            Ok(mut frame) => {
                if !use_graph_timestamps {
                    let mut clock = self.video_clock.lock();
                    let clock = clock.get_or_insert_with(|| {
                        // Without a declared frame rate the counter runs on
                        // the graph clock, one tick per frame.
                        let rate = match framerate {
                            Some(rate) if rate.num > 0 => rate,
                            _ => Rational::new(1_000_000_000, 1),
                        };
                        FrameCounter::new(rate)
                    });
                    frame.time_base = clock.time_base();
                    frame.timestamp = clock.next();
                }
                self.host.output_video(Some(frame));
            }
            Err(e) => {
                log::error!("source '{}': {e}", self.label);
                self.host.output_video(None);
            }
        }
    }

    fn deliver_audio(&self, buffer: GraphBuffer) {
        let use_graph_timestamps = self.config.lock().use_graph_timestamps_audio;

        match marshal::unpack_audio(buffer) {
            Ok(mut audio) => {
                if !use_graph_timestamps {
                    let mut clock = self.audio_clock.lock();
                    let clock =
                        clock.get_or_insert_with(|| SampleCounter::new(audio.sample_rate));
                    audio.time_base = clock.time_base();
                    audio.timestamp = clock.next(audio.frames);
                }
                self.host.output_audio(audio);
            }
            Err(e) => {
                // Absent output; never propagate garbage into the host.
                log::error!("source '{}': {e}", self.label);
            }
        }
    }
}

struct SourceDriver {
    shared: Arc<SourceShared>,
}

impl SourceDriver {
    fn wire_anchor(
        &self,
        graph: &mut dyn GraphInstance,
        anchor: &str,
        extraction_name: &str,
        sync: bool,
        deliver: impl Fn(&SourceShared, GraphBuffer) + Send + Sync + 'static,
    ) -> Result<()> {
        if !graph.is_linked(anchor) {
            // The user deleted this branch; drop the anchor instead of
            // leaving an unconnected stage to stall the graph.
            graph.detach(extraction_name);
            return Ok(());
        }
        let Some(extraction) = graph.extraction(extraction_name) else {
            return Err(Error::parse(format!("extraction point '{extraction_name}' missing")));
        };
        extraction.set_sync(sync);
        let shared = Arc::clone(&self.shared);
        extraction.set_callback(Box::new(move |buffer| deliver(&shared, buffer)));
        Ok(())
    }
}

impl GraphDriver for SourceDriver {
    fn wire(&mut self, graph: &mut dyn GraphInstance) -> Result<()> {
        *self.shared.video_clock.lock() = None;
        *self.shared.audio_clock.lock() = None;

        let (sync_video, sync_audio) = {
            let config = self.shared.config.lock();
            (config.sync_extraction_video, config.sync_extraction_audio)
        };
        self.wire_anchor(
            graph,
            template::VIDEO_ANCHOR,
            template::VIDEO_EXTRACTION,
            sync_video,
            SourceShared::deliver_video,
        )?;
        self.wire_anchor(
            graph,
            template::AUDIO_ANCHOR,
            template::AUDIO_EXTRACTION,
            sync_audio,
            SourceShared::deliver_audio,
        )?;
        Ok(())
    }

    fn unwire(&mut self) {
        // Handles die with the instance; nothing retained here.
    }

    fn clear_output(&mut self) {
        self.shared.host.output_video(None);
    }
}

/**
    Source-style adapter: a graph whose output is pushed into the host as
    it arrives.
*/
pub struct CaptureSource {
    controller: PipelineController,
    shared: Arc<SourceShared>,
    visible: AtomicBool,
}

impl CaptureSource {
    /**
        Create the source. Unless `stop_on_hide` is set, the graph starts
        immediately; with it set, the graph starts on [`show`](Self::show).

        Fails only on resource errors (the execution context could not be
        created) — a bad description leaves the source alive and idle, like
        any later build failure.
    */
    pub fn create(
        label: impl Into<String>,
        config: PipelineConfig,
        engine: Arc<dyn GraphEngine>,
        host: Arc<dyn SourceHost>,
    ) -> Result<Self> {
        let label = label.into();
        let shared = Arc::new(SourceShared {
            label: label.clone(),
            host,
            config: Mutex::new(config.clone()),
            video_clock: Mutex::new(None),
            audio_clock: Mutex::new(None),
        });
        let controller = PipelineController::spawn(
            ControllerConfig {
                label,
                description: template::source(&config.description),
                policy: policy_from(&config),
                autostart: !config.stop_on_hide,
            },
            engine,
            Box::new(SourceDriver { shared: Arc::clone(&shared) }),
        )?;
        Ok(Self { controller, shared, visible: AtomicBool::new(false) })
    }

    /// The source became visible; start the graph if it is not running.
    pub fn show(&self) {
        self.visible.store(true, Ordering::Release);
        if !self.controller.is_running() {
            let _ = self.controller.start_blocking();
        }
    }

    /// The source was hidden; stop the graph if so configured.
    pub fn hide(&self) {
        self.visible.store(false, Ordering::Release);
        if self.shared.config.lock().stop_on_hide {
            let _ = self.controller.stop_blocking();
        }
    }

    /**
        Apply a new configuration: tear down, then start again unless the
        source is hidden with `stop_on_hide` set.
    */
    pub fn update(&self, config: PipelineConfig) {
        let description = template::source(&config.description);
        let policy = policy_from(&config);
        let then_start = !(config.stop_on_hide && !self.visible.load(Ordering::Acquire));
        *self.shared.config.lock() = config;
        if let Err(e) = self.controller.update(description, policy, then_start) {
            log::error!("source '{}': {e}", self.shared.label);
        }
    }

    /// The externally observable media state.
    pub fn media_state(&self) -> MediaState {
        self.controller.media_state()
    }

    /// Current playback position in milliseconds.
    pub fn time_ms(&self) -> u64 {
        self.controller.position().map(|p| p.as_millis() as u64).unwrap_or(0)
    }

    /// Stream duration in milliseconds, zero when unknown.
    pub fn duration_ms(&self) -> u64 {
        self.controller.duration().map(|d| d.as_millis() as u64).unwrap_or(0)
    }

    /// Pause or resume playback.
    pub fn play_pause(&self, pause: bool) {
        self.controller.play_pause(pause);
    }

    /// Stop playback and release the graph.
    pub fn stop(&self) {
        self.controller.stop();
    }

    /// Tear down and rebuild the graph.
    pub fn restart(&self) {
        self.controller.restart();
    }

    /// Seek to a position in milliseconds.
    pub fn set_time(&self, position_ms: u64) {
        self.controller.seek(Duration::from_millis(position_ms));
    }
}
