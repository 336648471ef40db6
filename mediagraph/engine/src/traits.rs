/*!
    The engine boundary traits.
*/

use std::sync::Arc;
use std::time::Duration;

use mediagraph_types::{ContentDescriptor, GraphBuffer, GraphMessage, GraphState, Result};

/**
    Callback invoked for every message the graph emits on its bus.

    Messages are delivered strictly in emission order. The callback must not
    block; the usual implementation posts the message onto the controller's
    event loop.
*/
pub type BusCallback = Box<dyn Fn(GraphMessage) + Send>;

/**
    Callback invoked for every buffer an extraction point produces, when the
    extraction is driven asynchronously instead of being pulled.
*/
pub type SampleCallback = Box<dyn Fn(GraphBuffer) + Send + Sync>;

/**
    Builds graph instances from textual descriptions and answers
    capability queries.

    Engines are shared (`Arc`) across every adapter in a process; building
    is the only way to obtain a [`GraphInstance`].
*/
pub trait GraphEngine: Send + Sync {
    /**
        Parse a description and build a graph instance in the `Null` state.

        A malformed description yields a parse error; the caller owns the
        decision whether that is fatal.
    */
    fn build(&self, description: &str) -> Result<Box<dyn GraphInstance>>;

    /**
        Returns true if a processing stage with the given name is available.

        Used purely to populate optional configuration choices; building
        never depends on this answer.
    */
    fn has_stage(&self, name: &str) -> bool;
}

/**
    An opaque, built, stateful processing graph.

    Exactly one instance exists per bridge instance at any time. Lifecycle
    mutations are serialized by the owning controller; the handles returned
    by [`injection`](Self::injection) and [`extraction`](Self::extraction)
    are internally synchronized and may be used from host callback threads.
*/
pub trait GraphInstance: Send + std::fmt::Debug {
    /**
        Transition the instance to the given lifecycle state.
    */
    fn set_state(&mut self, state: GraphState) -> Result<()>;

    /**
        The current lifecycle state.
    */
    fn state(&self) -> GraphState;

    /**
        Install the bus message callback. Replaces any previous callback.
    */
    fn set_bus_callback(&mut self, callback: BusCallback);

    /**
        Resolve a named injection point. Returns `None` if no such point
        exists in the built graph.
    */
    fn injection(&mut self, name: &str) -> Option<Arc<dyn Injection>>;

    /**
        Resolve a named extraction point. Returns `None` if no such point
        exists, or if it has been detached.
    */
    fn extraction(&mut self, name: &str) -> Option<Arc<dyn Extraction>>;

    /**
        Returns true if the named anchor stage is linked to something inside
        the description (as opposed to sitting unconnected because the user
        deleted the branch feeding it).
    */
    fn is_linked(&self, name: &str) -> bool;

    /**
        Detach a named extraction point from the instance so an unconnected
        anchor does not stall the graph. After this, resolving the point
        returns `None`.
    */
    fn detach(&mut self, name: &str);

    /**
        Returns true if the instance supports seeking.
    */
    fn seekable(&self) -> bool;

    /**
        Request a flushing seek to the given position, snapped to the
        nearest keyframe-aligned point when the underlying format requires
        it.
    */
    fn seek(&mut self, position: Duration) -> Result<()>;

    /**
        Current playback position, if the instance can report one.
    */
    fn position(&self) -> Option<Duration>;

    /**
        Total stream duration, if known.
    */
    fn duration(&self) -> Option<Duration>;
}

/**
    A named point where the bridge pushes buffers into the graph.

    Thread-safe; pushing happens on whatever thread the host invokes the
    bridge from.
*/
pub trait Injection: Send + Sync {
    /**
        Push one buffer into the graph. Ownership transfers to the graph.

        Fails if the instance is not in a state that accepts data.
    */
    fn push(&self, buffer: GraphBuffer) -> Result<()>;

    /**
        Signal that no more buffers will be pushed through this point.
    */
    fn end_of_stream(&self);
}

/**
    A named point where the bridge pulls buffers out of the graph.

    Thread-safe. A point is driven either by callback (asynchronous
    delivery) or by pulling; installing a callback takes precedence over
    queued delivery.
*/
pub trait Extraction: Send + Sync {
    /**
        Control whether delivery is synchronized against the graph clock.
    */
    fn set_sync(&self, sync: bool);

    /**
        Cap the number of buffered-but-unconsumed buffers. The graph blocks
        its producer side rather than queue more. Zero means unbounded.
    */
    fn set_max_buffered(&self, max: usize);

    /**
        Install an asynchronous delivery callback.
    */
    fn set_callback(&self, callback: SampleCallback);

    /**
        Pull one buffer if one is immediately available.
    */
    fn try_pull(&self) -> Option<GraphBuffer>;

    /**
        Pull one buffer, waiting up to `timeout` for it.
    */
    fn pull(&self, timeout: Duration) -> Option<GraphBuffer>;

    /**
        The declared capabilities of this point, once negotiated.
    */
    fn caps(&self) -> Option<ContentDescriptor>;
}
