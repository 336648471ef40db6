/*!
    Configuration types.

    Each adapter variant has a configuration struct whose `Default` impl is
    the host-visible set of defaults. Hosts persist these; everything
    derives serde.
*/

use serde::{Deserialize, Serialize};

/**
    Configuration for the capture-source variant (and the controller
    policies shared with the other variants).
*/
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// User-supplied graph description. Links into the fixed anchors with
    /// `video.` and `audio.`.
    pub description: String,
    /// Pass graph timestamps through for video instead of synthesizing.
    pub use_graph_timestamps_video: bool,
    /// Pass graph timestamps through for audio instead of synthesizing.
    pub use_graph_timestamps_audio: bool,
    /// Synchronize video extraction against the graph clock.
    pub sync_extraction_video: bool,
    /// Synchronize audio extraction against the graph clock.
    pub sync_extraction_audio: bool,
    /// Try to restart when end of stream is reached.
    pub restart_on_eos: bool,
    /// Try to restart after the graph encountered an error.
    pub restart_on_error: bool,
    /// Delay before an error-triggered restart, in milliseconds.
    pub restart_delay_ms: u64,
    /// Stop the graph while the source is hidden.
    pub stop_on_hide: bool,
    /// Clear the displayed image after end-of-stream or error.
    pub clear_on_end: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            description: "testsrc is-live=true ! video/raw,framerate=30/1,width=960,height=540 ! video. \
                          tone wave=ticks is-live=true ! audio/raw,channels=2,rate=44100 ! audio."
                .into(),
            use_graph_timestamps_video: false,
            use_graph_timestamps_audio: false,
            sync_extraction_video: true,
            sync_extraction_audio: true,
            restart_on_eos: true,
            restart_on_error: false,
            restart_delay_ms: 2000,
            stop_on_hide: true,
            clear_on_end: true,
        }
    }
}

/**
    Encoder rate-control mode.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateControl {
    /// Constant bitrate.
    Cbr,
    /// Variable bitrate.
    Vbr,
    /// Constant quantizer.
    Cqp,
}

impl RateControl {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cbr => "cbr",
            Self::Vbr => "vbr",
            Self::Cqp => "cqp",
        }
    }
}

/**
    Configuration for the encoder variant.
*/
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Name of the encoder stage to use.
    pub stage: String,
    /// Target bitrate in kbit/s.
    pub bitrate: u32,
    /// Keyframe interval in seconds.
    pub keyint_sec: u32,
    /// Rate-control mode.
    pub rate_control: RateControl,
    /// Device selector for hardware-accelerated stages.
    pub device: Option<String>,
    /// Free-form `key=value` pairs appended to the encoder stage.
    pub extra_options: String,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            stage: "x264".into(),
            bitrate: 2500,
            keyint_sec: 2,
            rate_control: RateControl::Cbr,
            device: None,
            extra_options: String::new(),
        }
    }
}

impl EncoderConfig {
    /**
        The encoder stage with all of its options rendered, ready for
        template substitution. The keyframe interval is converted from
        seconds to frames using the active frame rate.
    */
    pub fn stage_with_options(&self, fps_num: i32, fps_den: i32) -> String {
        let keyint_frames = self.keyint_sec as i64 * fps_num as i64 / fps_den as i64;
        let mut stage = format!(
            "{} bitrate={} key-int={} rate-control={}",
            self.stage,
            self.bitrate,
            keyint_frames,
            self.rate_control.as_str(),
        );
        if let Some(device) = &self.device {
            stage.push_str(&format!(" device={device}"));
        }
        for option in self.extra_options.split_whitespace() {
            if option.contains('=') {
                stage.push(' ');
                stage.push_str(option);
            }
        }
        stage
    }
}

/**
    Configuration for the filter variant.
*/
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FilterConfig {
    /// User-supplied stages inserted between injection and extraction.
    pub description: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self { description: "flip direction=horizontal".into() }
    }
}

/**
    Configuration for the output variant.
*/
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputConfig {
    /// User-supplied muxer and sink chain; the muxer stage must be named
    /// `mux` so the injection chains can link into it.
    pub description: String,
    /// Graph media type of the encoded video injection.
    pub video_media: String,
    /// Graph media type of the encoded audio injection.
    pub audio_media: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            description: "mux name=mux ! filesink location=output.ts".into(),
            video_media: "video/encoded,media=h264,alignment=au".into(),
            audio_media: "audio/encoded,media=aac".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_defaults_match_host_documentation() {
        let config = PipelineConfig::default();
        assert!(config.description.contains("video."));
        assert!(config.description.contains("audio."));
        assert!(!config.use_graph_timestamps_video);
        assert!(!config.use_graph_timestamps_audio);
        assert!(config.sync_extraction_video);
        assert!(config.restart_on_eos);
        assert!(!config.restart_on_error);
        assert_eq!(config.restart_delay_ms, 2000);
        assert!(config.stop_on_hide);
        assert!(config.clear_on_end);
    }

    #[test]
    fn encoder_defaults() {
        let config = EncoderConfig::default();
        assert_eq!(config.stage, "x264");
        assert_eq!(config.bitrate, 2500);
        assert_eq!(config.keyint_sec, 2);
        assert_eq!(config.rate_control, RateControl::Cbr);
        assert!(config.device.is_none());
    }

    #[test]
    fn encoder_stage_options_render_keyint_in_frames() {
        let config = EncoderConfig { bitrate: 4000, ..Default::default() };
        let stage = config.stage_with_options(30, 1);
        assert_eq!(stage, "x264 bitrate=4000 key-int=60 rate-control=cbr");
    }

    #[test]
    fn encoder_extra_options_appended() {
        let config = EncoderConfig {
            device: Some("renderD128".into()),
            extra_options: "tune=zerolatency speed-preset=fast garbage".into(),
            ..Default::default()
        };
        let stage = config.stage_with_options(60, 1);
        assert!(stage.contains("device=renderD128"));
        assert!(stage.contains("tune=zerolatency"));
        assert!(stage.contains("speed-preset=fast"));
        // Tokens without '=' are not options and are dropped.
        assert!(!stage.contains("garbage"));
    }

    #[test]
    fn config_round_trips_through_serde() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.restart_delay_ms, config.restart_delay_ms);
        assert_eq!(back.description, config.description);
    }
}
