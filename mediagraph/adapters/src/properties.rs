/*!
    Declarative configuration schema.

    Hosts render these specs into whatever settings surface they have.
    The encoder's stage list is filtered through the engine's stage
    registry so only available stages are offered; nothing else depends on
    that answer.
*/

use mediagraph_engine::GraphEngine;

/**
    The kind of widget a property renders as.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyKind {
    Text { multiline: bool },
    Bool,
    Int { min: i64, max: i64, step: i64 },
    List { options: Vec<(String, String)> },
}

/**
    One configuration property.
*/
#[derive(Clone, Debug)]
pub struct PropertySpec {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: PropertyKind,
}

fn text(key: &'static str, label: &'static str, multiline: bool) -> PropertySpec {
    PropertySpec { key, label, kind: PropertyKind::Text { multiline } }
}

fn boolean(key: &'static str, label: &'static str) -> PropertySpec {
    PropertySpec { key, label, kind: PropertyKind::Bool }
}

fn int(key: &'static str, label: &'static str, min: i64, max: i64, step: i64) -> PropertySpec {
    PropertySpec { key, label, kind: PropertyKind::Int { min, max, step } }
}

/**
    Properties of the capture source.
*/
pub fn source_properties() -> Vec<PropertySpec> {
    vec![
        text("description", "Graph description", true),
        boolean("use_graph_timestamps_video", "Use graph time stamps (video)"),
        boolean("use_graph_timestamps_audio", "Use graph time stamps (audio)"),
        boolean("sync_extraction_video", "Sync video extraction to clock"),
        boolean("sync_extraction_audio", "Sync audio extraction to clock"),
        boolean("restart_on_eos", "Try to restart when end of stream is reached"),
        boolean("restart_on_error", "Try to restart after an error"),
        int("restart_delay_ms", "Error timeout (ms)", 0, 10_000, 100),
        boolean("stop_on_hide", "Stop graph when hidden"),
        boolean("clear_on_end", "Clear image data after end-of-stream or error"),
    ]
}

/// Candidate encoder stages, offered only when the engine has them.
const ENCODER_STAGES: &[(&str, &str)] = &[
    ("x264", "x264 (software)"),
    ("nvenc", "NVIDIA (NVENC)"),
    ("vaapienc", "VAAPI"),
    ("vtenc", "Apple (VideoToolbox)"),
];

/**
    Properties of the encoder, with the stage list filtered by
    availability.
*/
pub fn encoder_properties(engine: &dyn GraphEngine) -> Vec<PropertySpec> {
    let options = ENCODER_STAGES
        .iter()
        .copied()
        .filter(|(stage, _)| engine.has_stage(stage))
        .map(|(stage, label)| (stage.to_string(), label.to_string()))
        .collect();
    vec![
        PropertySpec { key: "stage", label: "Encoder type", kind: PropertyKind::List { options } },
        int("bitrate", "Bitrate", 50, 10_000_000, 50),
        PropertySpec {
            key: "rate_control",
            label: "Rate control",
            kind: PropertyKind::List {
                options: vec![
                    ("cbr".into(), "Constant bitrate".into()),
                    ("vbr".into(), "Variable bitrate".into()),
                    ("cqp".into(), "Constant quantizer".into()),
                ],
            },
        },
        int("keyint_sec", "Keyframe interval (seconds)", 0, 20, 1),
        text("device", "Device", false),
        text("extra_options", "Extra stage options", false),
    ]
}

/**
    Properties of the filter.
*/
pub fn filter_properties() -> Vec<PropertySpec> {
    vec![text("description", "Graph description", true)]
}

/**
    Properties of the output.
*/
pub fn output_properties() -> Vec<PropertySpec> {
    vec![text("description", "Muxer and sink description", true)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediagraph_engine::LoopbackEngine;

    #[test]
    fn source_schema_covers_every_config_key() {
        let keys: Vec<&str> = source_properties().iter().map(|p| p.key).collect();
        for key in [
            "description",
            "use_graph_timestamps_video",
            "use_graph_timestamps_audio",
            "sync_extraction_video",
            "sync_extraction_audio",
            "restart_on_eos",
            "restart_on_error",
            "restart_delay_ms",
            "stop_on_hide",
            "clear_on_end",
        ] {
            assert!(keys.contains(&key), "missing {key}");
        }
    }

    #[test]
    fn encoder_stage_list_is_filtered_by_availability() {
        let engine = LoopbackEngine::new();
        let props = encoder_properties(&engine);
        let PropertyKind::List { options } = &props[0].kind else {
            panic!("first property must be the stage list");
        };
        // The default loopback registry only knows the software stage.
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].0, "x264");

        let engine = LoopbackEngine::new().with_stages(["nvenc"]);
        let props = encoder_properties(&engine);
        let PropertyKind::List { options } = &props[0].kind else {
            panic!("first property must be the stage list");
        };
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn restart_delay_bounds_match_host_ui() {
        let props = source_properties();
        let delay = props.iter().find(|p| p.key == "restart_delay_ms").unwrap();
        assert_eq!(delay.kind, PropertyKind::Int { min: 0, max: 10_000, step: 100 });
    }
}
