/*!
    Minimal in-process graph engine for tests and demos.

    The loopback engine understands the description grammar (stages joined
    by `!`, `name=` properties, caps constraint tokens, `name.` chain
    links), validates stage names against a configurable set, and routes
    every injected buffer unchanged to the extraction points reachable from
    the injection. It performs no media processing; it exists so the bridge
    and adapters can be exercised without a real engine.
*/

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use mediagraph_types::{ContentDescriptor, Error, GraphBuffer, GraphMessage, GraphState, Result};

use crate::traits::{BusCallback, Extraction, GraphEngine, GraphInstance, Injection, SampleCallback};

const DEFAULT_STAGES: &[&str] = &[
    "inject", "extract", "convert", "resample", "parse", "mux", "filesink", "queue", "testsrc",
    "tone", "flip", "identity", "x264",
];

#[derive(Debug)]
struct Stage {
    /// Stage kind, or the raw caps token for constraint stages.
    kind: String,
    /// Value of the `name=` property, if any.
    name: Option<String>,
}

#[derive(Debug)]
struct Chain {
    stages: Vec<Stage>,
    /// Target stage name when the chain ends in a `name.` link.
    tail_link: Option<String>,
}

fn parse_description(description: &str, known_stages: &HashSet<String>) -> Result<Vec<Chain>> {
    let mut chains: Vec<Chain> = Vec::new();
    let mut current: Vec<Stage> = Vec::new();
    let mut after_bang = false;

    let close = |chains: &mut Vec<Chain>, current: &mut Vec<Stage>, link: Option<String>| {
        if !current.is_empty() || link.is_some() {
            chains.push(Chain { stages: std::mem::take(current), tail_link: link });
        }
    };

    for word in description.split_whitespace() {
        if word == "!" {
            if current.is_empty() {
                return Err(Error::parse("'!' with nothing before it"));
            }
            if after_bang {
                return Err(Error::parse("repeated '!'"));
            }
            after_bang = true;
            continue;
        }

        let slash = word.find('/');
        let equals = word.find('=');
        let is_caps = matches!((slash, equals), (Some(s), Some(e)) if s < e)
            || (slash.is_some() && equals.is_none());

        if !is_caps && word.len() > 1 && word.ends_with('.') {
            // Chain link: terminate the current chain into a named stage.
            if current.is_empty() {
                return Err(Error::parse(format!("link '{word}' with nothing before it")));
            }
            let target = word.trim_end_matches('.').to_string();
            close(&mut chains, &mut current, Some(target));
            after_bang = false;
            continue;
        }

        if !is_caps && equals.is_some() {
            // Property of the preceding stage.
            let Some(stage) = current.last_mut() else {
                return Err(Error::parse(format!("property '{word}' before any stage")));
            };
            let (key, value) = word.split_at(equals.unwrap());
            if key == "name" {
                stage.name = Some(value[1..].to_string());
            }
            continue;
        }

        // A stage or caps token: either continues the chain (after `!`) or
        // starts a new one.
        if !current.is_empty() && !after_bang {
            close(&mut chains, &mut current, None);
        }
        after_bang = false;

        if !is_caps && !known_stages.contains(word) {
            return Err(Error::parse(format!("unknown stage '{word}'")));
        }
        current.push(Stage { kind: word.to_string(), name: None });
    }

    if after_bang {
        return Err(Error::parse("description ends with '!'"));
    }
    close(&mut chains, &mut current, None);

    if chains.is_empty() {
        return Err(Error::parse("empty description"));
    }
    Ok(chains)
}

/// Extraction names reachable from the stage at (`chain`, `index`).
fn reachable_extractions(
    chains: &[Chain],
    chain: usize,
    index: usize,
    visited: &mut HashSet<usize>,
    out: &mut Vec<String>,
) {
    if !visited.insert(chain) {
        return;
    }
    for stage in &chains[chain].stages[index..] {
        if stage.kind == "extract" {
            if let Some(name) = &stage.name {
                out.push(name.clone());
            }
        }
    }
    if let Some(target) = &chains[chain].tail_link {
        for (ci, c) in chains.iter().enumerate() {
            if let Some(si) = c.stages.iter().position(|s| s.name.as_deref() == Some(target)) {
                reachable_extractions(chains, ci, si, visited, out);
            }
        }
    }
}

struct LoopbackExtraction {
    queue: Mutex<VecDeque<GraphBuffer>>,
    available: Condvar,
    callback: Mutex<Option<SampleCallback>>,
    sync: AtomicBool,
    max_buffered: AtomicUsize,
    last_caps: Mutex<Option<ContentDescriptor>>,
}

impl LoopbackExtraction {
    fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            callback: Mutex::new(None),
            sync: AtomicBool::new(true),
            max_buffered: AtomicUsize::new(0),
            last_caps: Mutex::new(None),
        }
    }

    fn deliver(&self, buffer: GraphBuffer) {
        *self.last_caps.lock() = Some(buffer.caps.clone());
        if let Some(callback) = &*self.callback.lock() {
            callback(buffer);
            return;
        }
        let mut queue = self.queue.lock();
        let max = self.max_buffered.load(Ordering::Relaxed);
        if max > 0 && queue.len() >= max {
            queue.pop_front();
        }
        queue.push_back(buffer);
        self.available.notify_one();
    }
}

impl Extraction for LoopbackExtraction {
    fn set_sync(&self, sync: bool) {
        self.sync.store(sync, Ordering::Relaxed);
    }

    fn set_max_buffered(&self, max: usize) {
        self.max_buffered.store(max, Ordering::Relaxed);
    }

    fn set_callback(&self, callback: SampleCallback) {
        *self.callback.lock() = Some(callback);
    }

    fn try_pull(&self) -> Option<GraphBuffer> {
        self.queue.lock().pop_front()
    }

    fn pull(&self, timeout: Duration) -> Option<GraphBuffer> {
        let deadline = Instant::now() + timeout;
        let mut queue = self.queue.lock();
        loop {
            if let Some(buffer) = queue.pop_front() {
                return Some(buffer);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            if self.available.wait_for(&mut queue, deadline - now).timed_out() {
                return queue.pop_front();
            }
        }
    }

    fn caps(&self) -> Option<ContentDescriptor> {
        self.last_caps.lock().clone()
    }
}

struct LoopbackInjection {
    shared: Weak<InstanceShared>,
    targets: Vec<String>,
    pushed: Mutex<Vec<GraphBuffer>>,
    eos: AtomicBool,
}

impl Injection for LoopbackInjection {
    fn push(&self, buffer: GraphBuffer) -> Result<()> {
        let Some(shared) = self.shared.upgrade() else {
            return Err(Error::engine("graph instance released"));
        };
        if *shared.state.lock() != GraphState::Playing {
            return Err(Error::engine("graph is not playing"));
        }
        self.pushed.lock().push(buffer.clone());
        let extractions = shared.extractions.lock();
        for target in &self.targets {
            if let Some(extraction) = extractions.get(target) {
                extraction.deliver(buffer.clone());
            }
        }
        Ok(())
    }

    fn end_of_stream(&self) {
        self.eos.store(true, Ordering::SeqCst);
        if let Some(shared) = self.shared.upgrade() {
            shared.maybe_emit_eos();
        }
    }
}

struct InstanceShared {
    state: Mutex<GraphState>,
    bus: Mutex<Option<BusCallback>>,
    injections: Mutex<HashMap<String, Arc<LoopbackInjection>>>,
    extractions: Mutex<HashMap<String, Arc<LoopbackExtraction>>>,
    /// Stage names some chain links into (targets of `name.`).
    linked: HashSet<String>,
    seekable: bool,
    duration: Option<Duration>,
    position: Mutex<Duration>,
}

impl InstanceShared {
    fn emit(&self, message: GraphMessage) {
        if let Some(callback) = &*self.bus.lock() {
            callback(message);
        }
    }

    /// Emit EOS once every injection has signaled end-of-stream.
    fn maybe_emit_eos(&self) {
        let injections = self.injections.lock();
        if !injections.is_empty() && injections.values().all(|i| i.eos.load(Ordering::SeqCst)) {
            drop(injections);
            self.emit(GraphMessage::Eos);
        }
    }
}

struct LoopbackInstance {
    shared: Arc<InstanceShared>,
}

impl std::fmt::Debug for LoopbackInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackInstance").finish_non_exhaustive()
    }
}

impl GraphInstance for LoopbackInstance {
    fn set_state(&mut self, state: GraphState) -> Result<()> {
        {
            let mut current = self.shared.state.lock();
            if *current == state {
                return Ok(());
            }
            *current = state;
        }
        self.shared.emit(GraphMessage::StateChanged(state));
        Ok(())
    }

    fn state(&self) -> GraphState {
        *self.shared.state.lock()
    }

    fn set_bus_callback(&mut self, callback: BusCallback) {
        *self.shared.bus.lock() = Some(callback);
    }

    fn injection(&mut self, name: &str) -> Option<Arc<dyn Injection>> {
        self.shared
            .injections
            .lock()
            .get(name)
            .map(|i| Arc::clone(i) as Arc<dyn Injection>)
    }

    fn extraction(&mut self, name: &str) -> Option<Arc<dyn Extraction>> {
        self.shared
            .extractions
            .lock()
            .get(name)
            .map(|e| Arc::clone(e) as Arc<dyn Extraction>)
    }

    fn is_linked(&self, name: &str) -> bool {
        self.shared.linked.contains(name)
    }

    fn detach(&mut self, name: &str) {
        self.shared.extractions.lock().remove(name);
    }

    fn seekable(&self) -> bool {
        self.shared.seekable
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        if !self.shared.seekable {
            return Err(Error::engine("graph does not support seeking"));
        }
        *self.shared.position.lock() = position;
        // A flushing seek re-arms end-of-stream detection.
        for injection in self.shared.injections.lock().values() {
            injection.eos.store(false, Ordering::SeqCst);
        }
        Ok(())
    }

    fn position(&self) -> Option<Duration> {
        Some(*self.shared.position.lock())
    }

    fn duration(&self) -> Option<Duration> {
        self.shared.duration
    }
}

/**
    Builder-configurable in-process engine.

    See the module docs; this is a routing stand-in for tests and demos.
*/
pub struct LoopbackEngine {
    stages: HashSet<String>,
    seekable: bool,
    duration: Option<Duration>,
    built: Mutex<Vec<Arc<InstanceShared>>>,
}

impl LoopbackEngine {
    pub fn new() -> Self {
        Self {
            stages: DEFAULT_STAGES.iter().map(|s| s.to_string()).collect(),
            seekable: true,
            duration: None,
            built: Mutex::new(Vec::new()),
        }
    }

    /**
        Make additional stage names known to the parser and
        [`GraphEngine::has_stage`].
    */
    pub fn with_stages<I: IntoIterator<Item = S>, S: Into<String>>(mut self, stages: I) -> Self {
        self.stages.extend(stages.into_iter().map(Into::into));
        self
    }

    /**
        Control whether built instances report themselves seekable.
    */
    pub fn with_seekable(mut self, seekable: bool) -> Self {
        self.seekable = seekable;
        self
    }

    /**
        Give built instances a fixed reported duration.
    */
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /**
        Handle to the most recently built instance, for driving tests.
    */
    pub fn last_instance(&self) -> Option<LoopbackHandle> {
        self.built.lock().last().map(|shared| LoopbackHandle { shared: Arc::clone(shared) })
    }

    /**
        Number of instances built over this engine's lifetime.
    */
    pub fn build_count(&self) -> usize {
        self.built.lock().len()
    }
}

impl Default for LoopbackEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphEngine for LoopbackEngine {
    fn build(&self, description: &str) -> Result<Box<dyn GraphInstance>> {
        let chains = parse_description(description, &self.stages)?;

        let linked: HashSet<String> = chains.iter().filter_map(|c| c.tail_link.clone()).collect();

        let mut extractions = HashMap::new();
        for chain in &chains {
            for stage in &chain.stages {
                if stage.kind == "extract" {
                    if let Some(name) = &stage.name {
                        extractions.insert(name.clone(), Arc::new(LoopbackExtraction::new()));
                    }
                }
            }
        }

        let shared = Arc::new(InstanceShared {
            state: Mutex::new(GraphState::Null),
            bus: Mutex::new(None),
            injections: Mutex::new(HashMap::new()),
            extractions: Mutex::new(extractions),
            linked,
            seekable: self.seekable,
            duration: self.duration,
            position: Mutex::new(Duration::ZERO),
        });

        let mut injections = HashMap::new();
        for (ci, chain) in chains.iter().enumerate() {
            for (si, stage) in chain.stages.iter().enumerate() {
                if stage.kind == "inject" {
                    if let Some(name) = &stage.name {
                        let mut targets = Vec::new();
                        reachable_extractions(&chains, ci, si + 1, &mut HashSet::new(), &mut targets);
                        injections.insert(
                            name.clone(),
                            Arc::new(LoopbackInjection {
                                shared: Arc::downgrade(&shared),
                                targets,
                                pushed: Mutex::new(Vec::new()),
                                eos: AtomicBool::new(false),
                            }),
                        );
                    }
                }
            }
        }
        *shared.injections.lock() = injections;

        self.built.lock().push(Arc::clone(&shared));
        Ok(Box::new(LoopbackInstance { shared }))
    }

    fn has_stage(&self, name: &str) -> bool {
        self.stages.contains(name)
    }
}

/**
    Test-side handle into a built loopback instance.
*/
pub struct LoopbackHandle {
    shared: Arc<InstanceShared>,
}

impl LoopbackHandle {
    /// Emit a message on the instance's bus, as the graph would.
    pub fn emit(&self, message: GraphMessage) {
        self.shared.emit(message);
    }

    /// Deliver a buffer to a named extraction, as the graph would.
    /// Returns false if the extraction does not exist (e.g. detached).
    pub fn feed(&self, extraction: &str, buffer: GraphBuffer) -> bool {
        let extractions = self.shared.extractions.lock();
        match extractions.get(extraction) {
            Some(e) => {
                let e = Arc::clone(e);
                drop(extractions);
                e.deliver(buffer);
                true
            }
            None => false,
        }
    }

    /// Every buffer pushed into a named injection so far.
    pub fn pushed(&self, injection: &str) -> Vec<GraphBuffer> {
        self.shared
            .injections
            .lock()
            .get(injection)
            .map(|i| i.pushed.lock().clone())
            .unwrap_or_default()
    }

    /// Whether a named injection has received end-of-stream.
    pub fn eos_received(&self, injection: &str) -> bool {
        self.shared
            .injections
            .lock()
            .get(injection)
            .is_some_and(|i| i.eos.load(Ordering::SeqCst))
    }

    /// Whether the named extraction still exists (i.e. was not detached).
    pub fn has_extraction(&self, name: &str) -> bool {
        self.shared.extractions.lock().contains_key(name)
    }

    /// Whether a named extraction synchronizes delivery against the graph
    /// clock. `None` if the extraction does not exist.
    pub fn extraction_synced(&self, name: &str) -> Option<bool> {
        self.shared
            .extractions
            .lock()
            .get(name)
            .map(|e| e.sync.load(Ordering::Relaxed))
    }

    /// Current lifecycle state of the instance.
    pub fn state(&self) -> GraphState {
        *self.shared.state.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediagraph_types::{EncodedCaps, Pts};

    fn caps() -> ContentDescriptor {
        ContentDescriptor::Encoded(EncodedCaps { media: "video/encoded,media=h264".into() })
    }

    fn buffer(byte: u8) -> GraphBuffer {
        GraphBuffer::new(vec![byte; 4], Some(Pts(0)), caps())
    }

    #[test]
    fn parses_simple_chain() {
        let engine = LoopbackEngine::new();
        assert!(engine.build("inject name=in ! convert ! extract name=out").is_ok());
    }

    #[test]
    fn rejects_unknown_stage() {
        let engine = LoopbackEngine::new();
        let err = engine.build("inject name=in ! frobnicate ! extract name=out").unwrap_err();
        assert!(err.is_parse());
        assert!(format!("{err}").contains("frobnicate"));
    }

    #[test]
    fn rejects_dangling_separator() {
        let engine = LoopbackEngine::new();
        assert!(engine.build("convert !").unwrap_err().is_parse());
        assert!(engine.build("! convert").unwrap_err().is_parse());
    }

    #[test]
    fn rejects_empty_description() {
        let engine = LoopbackEngine::new();
        assert!(engine.build("   ").unwrap_err().is_parse());
    }

    #[test]
    fn caps_tokens_are_not_stage_names() {
        let engine = LoopbackEngine::new();
        // The caps token contains '=' but must not be treated as a stage
        // or a property.
        assert!(
            engine
                .build("inject name=in ! video/raw,format=I420,framerate=30/1 ! extract name=out")
                .is_ok()
        );
    }

    #[test]
    fn routes_injected_buffers_to_reachable_extraction() {
        let engine = LoopbackEngine::new();
        let mut graph = engine
            .build("inject name=in ! convert ! extract name=out")
            .unwrap();
        graph.set_state(GraphState::Playing).unwrap();

        let injection = graph.injection("in").unwrap();
        let extraction = graph.extraction("out").unwrap();

        injection.push(buffer(1)).unwrap();
        let pulled = extraction.try_pull().unwrap();
        assert_eq!(pulled.data, vec![1; 4]);
        assert!(extraction.try_pull().is_none());
    }

    #[test]
    fn routes_across_chain_links() {
        let engine = LoopbackEngine::new();
        let mut graph = engine
            .build("inject name=in ! mux. mux name=mux ! extract name=out")
            .unwrap();
        graph.set_state(GraphState::Playing).unwrap();

        graph.injection("in").unwrap().push(buffer(2)).unwrap();
        assert!(graph.extraction("out").unwrap().try_pull().is_some());
    }

    #[test]
    fn push_fails_when_not_playing() {
        let engine = LoopbackEngine::new();
        let mut graph = engine.build("inject name=in ! extract name=out").unwrap();
        let injection = graph.injection("in").unwrap();
        assert!(injection.push(buffer(0)).is_err());
    }

    #[test]
    fn linked_reflects_chain_links() {
        let engine = LoopbackEngine::new();
        let graph = engine
            .build("testsrc ! video. convert name=video ! extract name=video_out convert name=audio ! extract name=audio_out")
            .unwrap();
        assert!(graph.is_linked("video"));
        assert!(!graph.is_linked("audio"));
    }

    #[test]
    fn detach_removes_extraction() {
        let engine = LoopbackEngine::new();
        let mut graph = engine.build("inject name=in ! extract name=out").unwrap();
        graph.detach("out");
        assert!(graph.extraction("out").is_none());
    }

    #[test]
    fn state_changes_reach_the_bus() {
        let engine = LoopbackEngine::new();
        let mut graph = engine.build("convert name=video ! extract name=out").unwrap();
        let (tx, rx) = std::sync::mpsc::channel();
        graph.set_bus_callback(Box::new(move |message| {
            let _ = tx.send(message);
        }));
        graph.set_state(GraphState::Playing).unwrap();
        assert_eq!(rx.try_recv().unwrap(), GraphMessage::StateChanged(GraphState::Playing));
    }

    #[test]
    fn eos_emitted_once_all_injections_finish() {
        let engine = LoopbackEngine::new();
        let mut graph = engine
            .build("inject name=a ! mux. inject name=b ! mux. mux name=mux ! filesink")
            .unwrap();
        let (tx, rx) = std::sync::mpsc::channel();
        graph.set_bus_callback(Box::new(move |message| {
            let _ = tx.send(message);
        }));
        graph.set_state(GraphState::Playing).unwrap();
        rx.try_recv().unwrap(); // state change

        let a = graph.injection("a").unwrap();
        let b = graph.injection("b").unwrap();
        a.end_of_stream();
        assert!(rx.try_recv().is_err());
        b.end_of_stream();
        assert_eq!(rx.try_recv().unwrap(), GraphMessage::Eos);
    }

    #[test]
    fn callback_delivery_bypasses_queue() {
        let engine = LoopbackEngine::new();
        let mut graph = engine.build("inject name=in ! extract name=out").unwrap();
        graph.set_state(GraphState::Playing).unwrap();

        let extraction = graph.extraction("out").unwrap();
        let (tx, rx) = std::sync::mpsc::channel();
        extraction.set_callback(Box::new(move |b| {
            let _ = tx.send(b);
        }));

        graph.injection("in").unwrap().push(buffer(3)).unwrap();
        assert!(rx.try_recv().is_ok());
        assert!(extraction.try_pull().is_none());
    }

    #[test]
    fn max_buffered_caps_the_queue() {
        let engine = LoopbackEngine::new();
        let mut graph = engine.build("inject name=in ! extract name=out").unwrap();
        graph.set_state(GraphState::Playing).unwrap();

        let extraction = graph.extraction("out").unwrap();
        extraction.set_max_buffered(1);

        let injection = graph.injection("in").unwrap();
        injection.push(buffer(1)).unwrap();
        injection.push(buffer(2)).unwrap();

        let pulled = extraction.try_pull().unwrap();
        assert_eq!(pulled.data, vec![2; 4]);
        assert!(extraction.try_pull().is_none());
    }

    #[test]
    fn seek_on_unseekable_instance_fails() {
        let engine = LoopbackEngine::new().with_seekable(false);
        let mut graph = engine.build("convert name=video ! extract name=out").unwrap();
        assert!(!graph.seekable());
        assert!(graph.seek(Duration::ZERO).is_err());
    }

    #[test]
    fn build_count_and_last_instance() {
        let engine = LoopbackEngine::new();
        assert_eq!(engine.build_count(), 0);
        let _g = engine.build("convert name=video ! extract name=out").unwrap();
        assert_eq!(engine.build_count(), 1);
        assert!(engine.last_instance().is_some());
    }

    #[test]
    fn handle_feed_respects_detach() {
        let engine = LoopbackEngine::new();
        let mut graph = engine.build("inject name=in ! extract name=out").unwrap();
        let handle = engine.last_instance().unwrap();
        assert!(handle.feed("out", buffer(9)));
        graph.detach("out");
        assert!(!handle.feed("out", buffer(9)));
    }
}
