//! Controller creation requires the process-wide engine initialization.
//! Runs in its own test binary so no other test has initialized it first.

use std::sync::Arc;

use mediagraph_bridge::{ControllerConfig, GraphDriver, PipelineController, RestartPolicy};
use mediagraph_engine::{GraphInstance, LoopbackEngine};
use mediagraph_types::Result;

struct NoopDriver;

impl GraphDriver for NoopDriver {
    fn wire(&mut self, _graph: &mut dyn GraphInstance) -> Result<()> {
        Ok(())
    }
    fn unwire(&mut self) {}
    fn clear_output(&mut self) {}
}

#[test]
fn spawn_fails_before_engine_init() {
    let engine = Arc::new(LoopbackEngine::new());
    let result = PipelineController::spawn(
        ControllerConfig {
            label: "uninit".into(),
            description: "convert name=video ! extract name=out".into(),
            policy: RestartPolicy::default(),
            autostart: false,
        },
        engine as Arc<dyn mediagraph_engine::GraphEngine>,
        Box::new(NoopDriver),
    );
    assert!(result.is_err());
}
