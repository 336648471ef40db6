/*!
    Graph description templates.

    Each adapter variant wraps the user-supplied description in fixed
    scaffolding: anchor stages the bridge resolves by name, and capability
    constraints that force negotiation into the supported format sets. The
    constraint lists are derived from the format translator so the two can
    never drift apart.
*/

use mediagraph_types::{Rational, SampleFormat, SpeakerLayout, VideoFormat};

/// Name of the video anchor stage users link to (`video.`).
pub const VIDEO_ANCHOR: &str = "video";
/// Name of the audio anchor stage users link to (`audio.`).
pub const AUDIO_ANCHOR: &str = "audio";
/// Name of the video extraction point behind the video anchor.
pub const VIDEO_EXTRACTION: &str = "video_out";
/// Name of the audio extraction point behind the audio anchor.
pub const AUDIO_EXTRACTION: &str = "audio_out";
/// Name of the single injection point used by encoder and filter graphs.
pub const INJECTION: &str = "in";
/// Name of the single extraction point used by encoder and filter graphs.
pub const EXTRACTION: &str = "out";
/// Names of the output variant's two injection points.
pub const VIDEO_INJECTION: &str = "video_in";
pub const AUDIO_INJECTION: &str = "audio_in";
/// Name of the muxer stage output injections link to (`mux.`).
pub const MUX_ANCHOR: &str = "mux";

fn video_format_set() -> String {
    let names: Vec<&str> = VideoFormat::ALL.iter().map(|f| f.graph_name()).collect();
    names.join(",")
}

fn audio_format_set() -> String {
    let names: Vec<&str> = SampleFormat::ALL.iter().map(|f| f.graph_name()).collect();
    names.join(",")
}

fn channel_set() -> String {
    let counts: Vec<String> = SpeakerLayout::SUPPORTED_CHANNELS
        .iter()
        .map(|c| c.to_string())
        .collect();
    counts.join(",")
}

/**
    Wrap a capture-source description.

    Appends the video and audio anchor chains; the user description links
    into them with `video.` and `audio.`.
*/
pub fn source(user_description: &str) -> String {
    format!(
        "convert name={VIDEO_ANCHOR} ! video/raw,format={{{video}}} ! \
         extract name={VIDEO_EXTRACTION} \
         convert name={AUDIO_ANCHOR} ! resample ! \
         audio/raw,format={{{audio}}},channels={{{channels}}} ! \
         extract name={AUDIO_EXTRACTION} \
         {user_description}",
        video = video_format_set(),
        audio = audio_format_set(),
        channels = channel_set(),
    )
}

/**
    Build an encoder description around the given encoder stage.

    The injection point is constrained to the host's active raw video
    format; the extraction point yields byte-stream access units.
*/
pub fn encoder(
    stage_with_options: &str,
    format: VideoFormat,
    width: u32,
    height: u32,
    framerate: Rational,
) -> String {
    format!(
        "inject name={INJECTION} ! \
         video/raw,format={fmt},width={width},height={height},framerate={num}/{den} ! \
         convert ! {stage_with_options} ! parse ! \
         video/encoded,media=h264,alignment=au ! extract name={EXTRACTION}",
        fmt = format.graph_name(),
        num = framerate.num,
        den = framerate.den,
    )
}

/**
    Wrap a video filter description.

    The extraction side converts back to the injected format so the host
    gets its frame in the same shape it handed over.
*/
pub fn filter_video(user_description: &str, format: VideoFormat, width: u32, height: u32) -> String {
    format!(
        "inject name={INJECTION} ! \
         video/raw,format={fmt},width={width},height={height},framerate=0/1 ! \
         {user_description} ! convert ! video/raw,format={fmt} ! \
         extract name={EXTRACTION}",
        fmt = format.graph_name(),
    )
}

/**
    Wrap an audio filter description.
*/
pub fn filter_audio(
    user_description: &str,
    format: SampleFormat,
    rate: u32,
    channels: u16,
) -> String {
    format!(
        "inject name={INJECTION} ! \
         audio/raw,format={fmt},rate={rate},channels={channels} ! \
         {user_description} ! convert ! resample ! \
         audio/raw,format={fmt},rate={rate},channels={channels} ! \
         extract name={EXTRACTION}",
        fmt = format.graph_name(),
    )
}

/**
    Build an output description.

    The two injection points are pre-declared with the encoded media types
    of the host's active encoders; the user description supplies the muxer
    and sink chain, with the muxer stage named `mux`.
*/
pub fn output(user_description: &str, video_media: &str, audio_media: &str) -> String {
    format!(
        "inject name={VIDEO_INJECTION} ! {video_media} ! {MUX_ANCHOR}. \
         inject name={AUDIO_INJECTION} ! {audio_media} ! {MUX_ANCHOR}. \
         {user_description}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_template_contains_anchors_and_user_text() {
        let description = source("testsrc ! video.");
        assert!(description.contains("name=video"));
        assert!(description.contains("name=video_out"));
        assert!(description.contains("name=audio_out"));
        assert!(description.contains("testsrc ! video."));
    }

    #[test]
    fn source_template_constraints_come_from_translator() {
        let description = source("testsrc ! video.");
        for format in VideoFormat::ALL {
            assert!(description.contains(format.graph_name()));
        }
        for format in SampleFormat::ALL {
            assert!(description.contains(format.graph_name()));
        }
        assert!(description.contains("channels={1,2,3,4,5,6,8}"));
    }

    #[test]
    fn encoder_template_pins_input_caps() {
        let description = encoder("x264 bitrate=2500", VideoFormat::Nv12, 1280, 720, Rational::new(30, 1));
        assert!(description.contains("format=NV12"));
        assert!(description.contains("width=1280,height=720"));
        assert!(description.contains("framerate=30/1"));
        assert!(description.contains("x264 bitrate=2500"));
        assert!(description.contains("alignment=au"));
    }

    #[test]
    fn filter_template_converts_back_to_input_format() {
        let description = filter_video("flip", VideoFormat::Bgra, 640, 480);
        assert_eq!(description.matches("format=BGRA").count(), 2);
    }

    #[test]
    fn output_template_declares_both_injections() {
        let description = output(
            "mux name=mux ! filesink",
            "video/encoded,media=h264",
            "audio/encoded,media=aac",
        );
        assert!(description.contains("name=video_in"));
        assert!(description.contains("name=audio_in"));
        assert_eq!(description.matches("mux.").count(), 2);
    }
}
