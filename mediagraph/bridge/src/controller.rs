/*!
    Graph lifecycle controller.

    One controller owns one graph instance (or none) plus the dedicated
    execution thread that serializes every graph-mutating operation. Control
    operations may be requested from any thread; they are marshaled onto the
    execution thread either fire-and-forget or blocking until acknowledged.
    Construction blocks the creating thread until the loop's first
    iteration, so callers never observe a not-yet-built instance.

    The execution thread also consumes the graph's message bus, strictly in
    emission order, and drives the restart policy: a fault schedules at most
    one timed restart, which an explicit stop cancels.
*/

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use mediagraph_engine::{GraphEngine, GraphInstance};
use mediagraph_types::{Error, GraphMessage, GraphState, MediaState, Result};

use crate::status::{FaultKind, StatusMachine};

/// How long the loop sleeps when nothing is scheduled.
const IDLE_WAIT: Duration = Duration::from_secs(3600);

/**
    Restart and display policy applied by the execution loop.
*/
#[derive(Clone, Copy, Debug)]
pub struct RestartPolicy {
    /// Restart (rewind, or rebuild) when end of stream is reached.
    pub on_eos: bool,
    /// Rebuild after the graph reports an error.
    pub on_error: bool,
    /// Delay before a fault-triggered rebuild. Zero means "on the next
    /// loop iteration", never synchronously inline.
    pub delay: Duration,
    /// Clear the last displayed frame when a fault ends the stream.
    pub clear_on_fault: bool,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            on_eos: true,
            on_error: false,
            delay: Duration::from_millis(2000),
            clear_on_fault: true,
        }
    }
}

/**
    Configuration for spawning a controller.
*/
pub struct ControllerConfig {
    /// Instance identity used in log messages.
    pub label: String,
    /// Full graph description, template-substituted by the adapter.
    pub description: String,
    pub policy: RestartPolicy,
    /// Build and start the graph during construction.
    pub autostart: bool,
}

/**
    Adapter hook invoked by the execution loop around graph lifecycle
    events. Lives on the execution thread.
*/
pub trait GraphDriver: Send + 'static {
    /**
        Wire up anchors after a successful build: resolve injection and
        extraction points, prune unlinked anchors, install callbacks,
        reset timestamp counters.
    */
    fn wire(&mut self, graph: &mut dyn GraphInstance) -> Result<()>;

    /**
        The instance is going away; drop any handles taken in `wire`.
    */
    fn unwire(&mut self);

    /**
        Push an empty output downstream so the host does not keep showing
        stale data.
    */
    fn clear_output(&mut self);

    /**
        A build attempt failed. The default pushes empty output.
    */
    fn build_failed(&mut self) {
        self.clear_output();
    }
}

enum Task {
    Start(Option<SyncSender<Result<()>>>),
    Stop(Option<SyncSender<Result<()>>>),
    Restart(Option<SyncSender<Result<()>>>),
    SetPaused(bool),
    Seek(Duration),
    Update {
        description: String,
        policy: RestartPolicy,
        then_start: bool,
        ack: SyncSender<Result<()>>,
    },
    Shutdown,
}

enum LoopEvent {
    Task(Task),
    Bus(GraphMessage),
}

struct Shared {
    status: StatusMachine,
    /// The one graph instance, owned here. Lifecycle mutations happen only
    /// on the execution thread; queries lock briefly from any thread.
    graph: Mutex<Option<Box<dyn GraphInstance>>>,
    eos: Mutex<bool>,
    eos_signal: Condvar,
}

/**
    Thread-safe control surface over one graph instance.

    Dropping the controller requests loop exit and joins the execution
    thread.
*/
pub struct PipelineController {
    shared: Arc<Shared>,
    tasks: Sender<LoopEvent>,
    thread: Option<JoinHandle<()>>,
}

impl PipelineController {
    /**
        Spawn the execution thread and block until its first iteration.

        With `autostart` set the initial build happens before this returns;
        a failed build leaves the controller alive in the `Null` state (use
        [`start_blocking`](Self::start_blocking) when a build failure must
        fail creation). Thread spawn failure is a resource error and fails
        creation outright.
    */
    pub fn spawn(
        config: ControllerConfig,
        engine: Arc<dyn GraphEngine>,
        driver: Box<dyn GraphDriver>,
    ) -> Result<Self> {
        if !mediagraph_engine::is_initialized() {
            return Err(Error::engine("engine is not initialized"));
        }

        let (tasks, events) = mpsc::channel();
        let shared = Arc::new(Shared {
            status: StatusMachine::new(config.label.as_str()),
            graph: Mutex::new(None),
            eos: Mutex::new(false),
            eos_signal: Condvar::new(),
        });

        let context = Loop {
            label: config.label.clone(),
            description: config.description,
            policy: config.policy,
            engine,
            driver,
            shared: Arc::clone(&shared),
            bus_tx: tasks.clone(),
            pending_restart: None,
        };

        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let autostart = config.autostart;
        let thread = thread::Builder::new()
            .name(format!("graph-{}", config.label))
            .spawn(move || context.run(events, ready_tx, autostart))?;

        ready_rx
            .recv()
            .map_err(|_| Error::engine("execution thread exited during construction"))?;

        Ok(Self { shared, tasks, thread: Some(thread) })
    }

    fn post(&self, task: Task) {
        let _ = self.tasks.send(LoopEvent::Task(task));
    }

    fn post_blocking(&self, make: impl FnOnce(SyncSender<Result<()>>) -> Task) -> Result<()> {
        let (ack_tx, ack_rx) = mpsc::sync_channel(1);
        self.post(make(ack_tx));
        match ack_rx.recv() {
            Ok(result) => result,
            Err(_) => Err(Error::engine("execution thread gone")),
        }
    }

    /// Build and start the graph. No-op if already running.
    pub fn start(&self) {
        self.post(Task::Start(None));
    }

    /// Like [`start`](Self::start), but blocks and reports build errors.
    pub fn start_blocking(&self) -> Result<()> {
        self.post_blocking(|ack| Task::Start(Some(ack)))
    }

    /// Tear the graph down and cancel any pending restart.
    pub fn stop(&self) {
        self.post(Task::Stop(None));
    }

    /// Like [`stop`](Self::stop), but blocks until torn down.
    pub fn stop_blocking(&self) -> Result<()> {
        self.post_blocking(|ack| Task::Stop(Some(ack)))
    }

    /// Stop, rebuild, and start as one atomic step on the execution thread.
    pub fn restart(&self) {
        self.post(Task::Restart(None));
    }

    /// Like [`restart`](Self::restart), but blocks and reports build errors.
    pub fn restart_blocking(&self) -> Result<()> {
        self.post_blocking(|ack| Task::Restart(Some(ack)))
    }

    /// Pause or resume the running graph without rebuilding.
    pub fn play_pause(&self, pause: bool) {
        self.post(Task::SetPaused(pause));
    }

    /// Request a flushing seek. Logged and ignored if the graph cannot
    /// seek.
    pub fn seek(&self, position: Duration) {
        self.post(Task::Seek(position));
    }

    /**
        Replace description and policy, tearing down the current graph and
        optionally starting the new one. Blocks until done.
    */
    pub fn update(&self, description: String, policy: RestartPolicy, then_start: bool) -> Result<()> {
        self.post_blocking(move |ack| Task::Update { description, policy, then_start, ack })
    }

    /// The externally observable media state.
    pub fn media_state(&self) -> MediaState {
        self.shared.status.media_state()
    }

    /// Whether a graph instance currently exists.
    pub fn is_running(&self) -> bool {
        self.shared.graph.lock().is_some()
    }

    /// Current playback position, if the graph reports one.
    pub fn position(&self) -> Option<Duration> {
        self.shared.graph.lock().as_ref().and_then(|graph| graph.position())
    }

    /// Stream duration, if the graph reports one.
    pub fn duration(&self) -> Option<Duration> {
        self.shared.graph.lock().as_ref().and_then(|graph| graph.duration())
    }

    /**
        Block until the graph reports end of stream, or the timeout
        elapses. Returns true if end of stream was reached.
    */
    pub fn wait_for_eos(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut eos = self.shared.eos.lock();
        while !*eos {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            if self.shared.eos_signal.wait_for(&mut eos, deadline - now).timed_out() {
                return *eos;
            }
        }
        true
    }
}

impl Drop for PipelineController {
    fn drop(&mut self) {
        let _ = self.tasks.send(LoopEvent::Task(Task::Shutdown));
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// State owned by the execution thread.
struct Loop {
    label: String,
    description: String,
    policy: RestartPolicy,
    engine: Arc<dyn GraphEngine>,
    driver: Box<dyn GraphDriver>,
    shared: Arc<Shared>,
    bus_tx: Sender<LoopEvent>,
    pending_restart: Option<Instant>,
}

impl Loop {
    fn run(mut self, events: Receiver<LoopEvent>, ready: SyncSender<()>, autostart: bool) {
        if autostart {
            let _ = self.start();
        }
        let _ = ready.send(());

        loop {
            let timeout = match self.pending_restart {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => IDLE_WAIT,
            };
            match events.recv_timeout(timeout) {
                Ok(LoopEvent::Task(task)) => {
                    if self.handle_task(task) {
                        break;
                    }
                }
                Ok(LoopEvent::Bus(message)) => self.handle_message(message),
                Err(RecvTimeoutError::Timeout) => {
                    if self.pending_restart.is_some_and(|deadline| Instant::now() >= deadline) {
                        self.pending_restart = None;
                        log::info!("source '{}': restarting pipeline", self.label);
                        self.stop();
                        let _ = self.start();
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        self.pending_restart = None;
        self.stop();
    }

    /// Returns true when the loop should exit.
    fn handle_task(&mut self, task: Task) -> bool {
        match task {
            Task::Start(ack) => {
                let result = self.start();
                if let Some(ack) = ack {
                    let _ = ack.send(result);
                }
            }
            Task::Stop(ack) => {
                self.pending_restart = None;
                self.stop();
                if let Some(ack) = ack {
                    let _ = ack.send(Ok(()));
                }
            }
            Task::Restart(ack) => {
                self.pending_restart = None;
                self.stop();
                let result = self.start();
                if let Some(ack) = ack {
                    let _ = ack.send(result);
                }
            }
            Task::SetPaused(paused) => {
                let mut slot = self.shared.graph.lock();
                if let Some(graph) = slot.as_mut() {
                    let target = if paused { GraphState::Paused } else { GraphState::Playing };
                    if let Err(e) = graph.set_state(target) {
                        log::warn!("source '{}': state change failed: {e}", self.label);
                    }
                }
            }
            Task::Seek(position) => {
                let mut slot = self.shared.graph.lock();
                if let Some(graph) = slot.as_mut() {
                    if !graph.seekable() {
                        log::info!("source '{}': seeking is not supported", self.label);
                    } else if let Err(e) = graph.seek(position) {
                        log::warn!("source '{}': seek failed: {e}", self.label);
                    }
                }
            }
            Task::Update { description, policy, then_start, ack } => {
                self.pending_restart = None;
                self.stop();
                self.description = description;
                self.policy = policy;
                let result = if then_start { self.start() } else { Ok(()) };
                let _ = ack.send(result);
            }
            Task::Shutdown => return true,
        }
        false
    }

    fn start(&mut self) -> Result<()> {
        if self.shared.graph.lock().is_some() {
            return Ok(());
        }
        *self.shared.eos.lock() = false;
        self.shared.status.force(MediaState::Opening);

        let mut graph = match self.engine.build(&self.description) {
            Ok(graph) => graph,
            Err(e) => {
                log::error!("source '{}': cannot build graph: {e}", self.label);
                self.driver.build_failed();
                self.shared.status.force(MediaState::Error);
                return Err(e);
            }
        };

        let bus_tx = self.bus_tx.clone();
        graph.set_bus_callback(Box::new(move |message| {
            let _ = bus_tx.send(LoopEvent::Bus(message));
        }));

        if let Err(e) = self.driver.wire(graph.as_mut()) {
            log::error!("source '{}': cannot wire anchors: {e}", self.label);
            let _ = graph.set_state(GraphState::Null);
            self.driver.build_failed();
            self.shared.status.force(MediaState::Error);
            return Err(e);
        }

        if let Err(e) = graph.set_state(GraphState::Playing) {
            log::error!("source '{}': cannot start graph: {e}", self.label);
            let _ = graph.set_state(GraphState::Null);
            self.driver.unwire();
            self.shared.status.force(MediaState::Error);
            return Err(e);
        }

        *self.shared.graph.lock() = Some(graph);
        Ok(())
    }

    /// Tear down the instance. Only ever runs on the execution thread.
    fn stop(&mut self) {
        let graph = self.shared.graph.lock().take();
        let Some(mut graph) = graph else { return };
        if let Err(e) = graph.set_state(GraphState::Null) {
            log::warn!("source '{}': teardown state change failed: {e}", self.label);
        }
        drop(graph);
        self.driver.unwire();
        self.driver.clear_output();
        self.shared.status.force(MediaState::None);
    }

    fn handle_message(&mut self, message: GraphMessage) {
        match self.shared.status.apply(&message) {
            None => {}
            Some(FaultKind::Eos) => self.handle_eos(),
            Some(FaultKind::Error) => self.handle_error(),
        }
    }

    fn handle_eos(&mut self) {
        *self.shared.eos.lock() = true;
        self.shared.eos_signal.notify_all();

        if self.policy.on_eos {
            // A seekable graph rewinds in place; everything else falls back
            // to a scheduled rebuild.
            {
                let mut slot = self.shared.graph.lock();
                if let Some(graph) = slot.as_mut() {
                    if graph.seekable() && graph.seek(Duration::ZERO).is_ok() {
                        log::debug!("source '{}': rewound after end of stream", self.label);
                        self.shared.status.force(MediaState::Playing);
                        return;
                    }
                }
            }
            self.schedule_restart();
        } else if self.policy.clear_on_fault {
            self.driver.clear_output();
        }
    }

    fn handle_error(&mut self) {
        // The graph is not usable after a fatal error; take it down now.
        // The media state stays Error until a restart succeeds.
        let graph = self.shared.graph.lock().take();
        if let Some(mut graph) = graph {
            let _ = graph.set_state(GraphState::Null);
            drop(graph);
            self.driver.unwire();
        }
        if self.policy.clear_on_fault {
            self.driver.clear_output();
        }
        if self.policy.on_error {
            self.schedule_restart();
        }
    }

    fn schedule_restart(&mut self) {
        // At most one pending restart; repeated faults do not stack.
        if self.pending_restart.is_none() {
            self.pending_restart = Some(Instant::now() + self.policy.delay);
            log::info!(
                "source '{}': restart scheduled in {}ms",
                self.label,
                self.policy.delay.as_millis()
            );
        }
    }
}
