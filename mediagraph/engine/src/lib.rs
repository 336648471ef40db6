/*!
    Black-box media graph engine boundary for the mediagraph crate family.

    The engine behind this boundary is an external capability: build a graph
    from a textual description, expose named injection/extraction points,
    deliver buffers with timestamps and a declared format, and emit
    asynchronous status messages. Nothing above this crate may depend on how
    the engine does any of that.

    # Traits

    - [`GraphEngine`] - builds graph instances and answers stage queries
    - [`GraphInstance`] - an opaque, built, stateful processing graph
    - [`Injection`] - a named point where the bridge pushes buffers in
    - [`Extraction`] - a named point where the bridge pulls buffers out

    # Process-wide Initialization

    [`init`] and [`shutdown`] bracket all engine use with reference
    counting; they are called once per embedding, never per instance.

    # Description Templates

    The [`template`] module substitutes a user-supplied description into the
    fixed anchor/capability-negotiation scaffolding each adapter variant
    requires.

    # Loopback Engine

    [`LoopbackEngine`] is a minimal in-process engine used by tests and
    demos. It parses stage chains, routes injected buffers to reachable
    extractions unchanged, and emits bus messages. It is a stand-in, not a
    media engine.
*/

mod init;
mod loopback;
pub mod template;
mod traits;

pub use init::{init, is_initialized, shutdown};
pub use loopback::{LoopbackEngine, LoopbackHandle};
pub use traits::{BusCallback, Extraction, GraphEngine, GraphInstance, Injection, SampleCallback};
