/*!
    Pipeline lifecycle controller and frame/sample bridge.

    This crate is the core of the mediagraph family: it builds a processing
    graph from a description, owns its execution context, pushes and pulls
    buffers across the host/graph boundary with correct timestamping and
    format translation, and reacts to asynchronous graph events with a
    restart/recovery policy.

    # Components

    - [`PipelineController`] - graph lifecycle state machine with a
      dedicated execution thread and thread-safe control surface
    - [`GraphDriver`] - adapter hook for wiring anchors after each build
    - [`StatusMachine`] - fault & status state machine over graph messages
    - [`marshal`] - frame/sample marshaling between host and graph shapes
    - [`FrameCounter`] and [`SampleCounter`] - synthesized timestamps
    - [`host`] - host-side frame structures and callback traits
    - configuration types with host-visible defaults
*/

mod clock;
mod config;
mod controller;
pub mod host;
pub mod marshal;
mod status;

pub use clock::{FrameCounter, SampleCounter};
pub use config::{EncoderConfig, FilterConfig, OutputConfig, PipelineConfig, RateControl};
pub use controller::{ControllerConfig, GraphDriver, PipelineController, RestartPolicy};
pub use status::{FaultKind, StatusMachine};
