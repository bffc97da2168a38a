//! Actor System Core
//!
//! Hosts actors: assigns each a mailbox, runs its startup hook, drives its
//! interval tasks and dispatches every inbound message as its own task so a
//! slow handler never stalls the mailbox.
//!
//! ## Lifecycle
//!
//! `Created → Started → Running`. An actor with an [`AgentProfile`] is
//! registered with the system's [`Discovery`] first, then the startup hook
//! runs exactly once before any interval tick or message dispatch. A failing
//! registration or hook is logged and the actor still starts.
//!
//! ## Fault isolation
//!
//! Handler errors and panics are caught at the dispatch boundary, logged with
//! the message's correlation id, and never take the actor down. Messages with
//! no registered handler are dropped with a warning.
//!
//! # Lock Ordering
//!
//! When acquiring multiple locks, ALWAYS follow this order:
//! 1. `actors` (read or write)
//! 2. `task_registry` (read or write)

use crate::context::ActorContext;
use crate::discovery::{AgentProfile, AgentStatus, Discovery, REGISTRATION_KEY};
use crate::messages::{correlation_label, Envelope, HandlerTable, Hook, Inbound};
use crate::registry::MailboxRegistry;
use crate::state::{ActorState, StateStore};
use crate::transport::{LocalTransport, Transport};
use crate::{ActorError, Result};

use futures::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use types::{Address, MessageBody, MessageType, RoutingTable};

const DEFAULT_MAILBOX_CAPACITY: usize = 1000;

static NEXT_SYSTEM_ID: AtomicU64 = AtomicU64::new(1);

/// Actor status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorStatus {
    /// Mailbox registered, startup hook not finished
    Created,
    /// Startup hook finished, interval tasks starting
    Started,
    /// Dispatching messages
    Running,
    Stopped,
}

/// Handle to a spawned actor
#[derive(Debug, Clone)]
pub struct ActorHandle {
    pub address: Address,
    pub name: String,
    pub handled_types: Vec<MessageType>,
    pub spawned_at: Instant,
    /// Registered with discovery on startup
    pub advertised: bool,
    status: Arc<Mutex<ActorStatus>>,
}

impl ActorHandle {
    pub fn status(&self) -> ActorStatus {
        *self.status.lock()
    }
}

/// System-wide metrics
#[derive(Debug, Default)]
pub struct SystemMetrics {
    pub actors_spawned: AtomicU64,
    pub actors_stopped: AtomicU64,
    pub messages_dispatched: AtomicU64,
    pub total_processing_time_ns: AtomicU64,
    pub handler_failures: AtomicU64,
    pub unhandled_messages: AtomicU64,
    pub interval_ticks: AtomicU64,
    pub startup_failures: AtomicU64,
    pub registration_failures: AtomicU64,
}

impl SystemMetrics {
    pub fn record_message_handled(&self, duration: Duration) {
        self.messages_dispatched.fetch_add(1, Ordering::Relaxed);
        self.total_processing_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn record_handler_failure(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unhandled(&self) {
        self.unhandled_messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_interval_tick(&self) {
        self.interval_ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_startup_failure(&self) {
        self.startup_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_registration_failure(&self) {
        self.registration_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn avg_processing_time_ns(&self) -> f64 {
        let count = self.messages_dispatched.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        self.total_processing_time_ns.load(Ordering::Relaxed) as f64 / count as f64
    }

    pub fn get_stats(&self) -> SystemStats {
        SystemStats {
            actors_spawned: self.actors_spawned.load(Ordering::Relaxed),
            actors_stopped: self.actors_stopped.load(Ordering::Relaxed),
            messages_dispatched: self.messages_dispatched.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            unhandled_messages: self.unhandled_messages.load(Ordering::Relaxed),
            interval_ticks: self.interval_ticks.load(Ordering::Relaxed),
            startup_failures: self.startup_failures.load(Ordering::Relaxed),
            registration_failures: self.registration_failures.load(Ordering::Relaxed),
            avg_processing_time_ns: self.avg_processing_time_ns(),
        }
    }
}

/// System statistics snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct SystemStats {
    pub actors_spawned: u64,
    pub actors_stopped: u64,
    pub messages_dispatched: u64,
    pub handler_failures: u64,
    pub unhandled_messages: u64,
    pub interval_ticks: u64,
    pub startup_failures: u64,
    pub registration_failures: u64,
    pub avg_processing_time_ns: f64,
}

/// Declarative description of an actor, consumed by [`ActorSystem::spawn`]
pub struct ActorBuilder {
    name: String,
    address: Address,
    handlers: HandlerTable,
    startup: Option<Hook>,
    intervals: Vec<(Duration, Hook)>,
    store: Option<Arc<dyn StateStore>>,
    profile: Option<AgentProfile>,
    mailbox_capacity: usize,
}

impl ActorBuilder {
    pub fn new(name: impl Into<String>, address: Address) -> Self {
        Self {
            name: name.into(),
            address,
            handlers: HandlerTable::new(),
            startup: None,
            intervals: Vec::new(),
            store: None,
            profile: None,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Bind a raw handler to `message_type`. A later registration for the
    /// same type replaces this one.
    pub fn register<F, Fut>(mut self, message_type: MessageType, handler: F) -> Self
    where
        F: Fn(ActorContext, Envelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.handlers.insert(
            message_type,
            Arc::new(move |ctx: ActorContext, envelope: Envelope| handler(ctx, envelope).boxed()),
        );
        self
    }

    /// Bind a typed handler under `T::TYPE`
    pub fn on_message<T, F, Fut>(self, handler: F) -> Self
    where
        T: MessageBody,
        F: Fn(ActorContext, Inbound<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        self.register(T::TYPE, move |ctx, envelope: Envelope| {
            let handler = Arc::clone(&handler);
            async move {
                let actual = envelope.message.message_type();
                let inbound = Inbound::<T>::from_envelope(envelope).ok_or(
                    ActorError::UnexpectedPayload {
                        expected: T::TYPE,
                        actual,
                    },
                )?;
                handler(ctx, inbound).await
            }
        })
    }

    /// Run once after the address is assigned and before any dispatch
    pub fn on_startup<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ActorContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.startup = Some(Arc::new(move |ctx: ActorContext| hook(ctx).boxed()));
        self
    }

    /// Run `task` every `period`, concurrently with message dispatch
    pub fn on_interval<F, Fut>(mut self, period: Duration, task: F) -> Self
    where
        F: Fn(ActorContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.intervals
            .push((period, Arc::new(move |ctx: ActorContext| task(ctx).boxed())));
        self
    }

    /// Register with the system's discovery service on startup
    pub fn advertise(mut self, profile: AgentProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.mailbox_capacity == 0 {
            return Err(ActorError::configuration(
                "mailbox capacity must be non-zero",
                Some("mailbox_capacity"),
            ));
        }
        if self.intervals.iter().any(|(period, _)| period.is_zero()) {
            return Err(ActorError::configuration(
                "interval period must be non-zero",
                Some("period"),
            ));
        }
        Ok(())
    }
}

/// Core actor system managing actor lifecycles and routing
#[derive(Clone)]
pub struct ActorSystem {
    /// All actors in the system
    actors: Arc<RwLock<HashMap<Address, ActorHandle>>>,

    /// Address → mailbox lookup shared with the transport
    registry: Arc<MailboxRegistry>,

    transport: Arc<dyn Transport>,

    /// Role → address table injected into every actor
    routing: Arc<RoutingTable>,

    /// System-wide metrics
    metrics: Arc<SystemMetrics>,

    /// Task registry for proper cleanup on shutdown
    task_registry: Arc<RwLock<HashMap<Address, JoinHandle<()>>>>,

    /// Where advertised actors are registered
    discovery: Option<Arc<dyn Discovery>>,

    /// System ID for debugging
    system_id: String,
}

impl ActorSystem {
    /// System with an in-process transport
    pub fn new(routing: Arc<RoutingTable>) -> Self {
        let registry = Arc::new(MailboxRegistry::new());
        let transport: Arc<dyn Transport> = Arc::new(LocalTransport::new(Arc::clone(&registry)));
        Self::with_transport(routing, registry, transport)
    }

    /// System with a caller-supplied transport over `registry`
    pub fn with_transport(
        routing: Arc<RoutingTable>,
        registry: Arc<MailboxRegistry>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let system_id = format!(
            "system-{}-{}",
            std::process::id(),
            NEXT_SYSTEM_ID.fetch_add(1, Ordering::Relaxed)
        );
        info!(system_id = %system_id, routes = routing.len(), "Creating actor system");

        Self {
            actors: Arc::new(RwLock::new(HashMap::new())),
            registry,
            transport,
            routing,
            metrics: Arc::new(SystemMetrics::default()),
            task_registry: Arc::new(RwLock::new(HashMap::new())),
            discovery: None,
            system_id,
        }
    }

    /// Register actors spawned with a profile with `discovery`
    pub fn with_discovery(mut self, discovery: Arc<dyn Discovery>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    pub fn discovery(&self) -> Option<&Arc<dyn Discovery>> {
        self.discovery.as_ref()
    }

    /// Spawn an actor at its preassigned address
    pub async fn spawn(&self, builder: ActorBuilder) -> Result<Address> {
        builder.validate()?;

        let address = builder.address.clone();
        let start_time = Instant::now();

        let (sender, receiver) = mpsc::channel(builder.mailbox_capacity);
        self.registry.register(address.clone(), sender).await?;

        let state = builder
            .store
            .map(ActorState::with_store)
            .unwrap_or_default();
        let ctx = ActorContext::new(
            address.clone(),
            builder.name.as_str(),
            state,
            Arc::clone(&self.routing),
            Arc::clone(&self.transport),
        );

        let status = Arc::new(Mutex::new(ActorStatus::Created));
        let handle = ActorHandle {
            address: address.clone(),
            name: builder.name.clone(),
            handled_types: builder.handlers.message_types(),
            spawned_at: start_time,
            advertised: builder.profile.is_some(),
            status: Arc::clone(&status),
        };

        let registration = match (&self.discovery, builder.profile) {
            (Some(discovery), Some(profile)) => Some((Arc::clone(discovery), profile)),
            (None, Some(profile)) => {
                debug!(actor = %builder.name, role = %profile.role, "No discovery service - not registering");
                None
            }
            _ => None,
        };

        let task = ActorTask {
            ctx,
            handlers: Arc::new(builder.handlers),
            registration,
            startup: builder.startup,
            intervals: builder.intervals,
            receiver,
            status,
            metrics: Arc::clone(&self.metrics),
        };

        let mut actors = self.actors.write().await;
        let task_handle = tokio::spawn(task.run());
        self.task_registry
            .write()
            .await
            .insert(address.clone(), task_handle);
        actors.insert(address.clone(), handle);
        drop(actors);

        self.metrics.actors_spawned.fetch_add(1, Ordering::Relaxed);

        info!(
            actor = %builder.name,
            address = %address,
            system_id = %self.system_id,
            spawn_duration_us = start_time.elapsed().as_micros() as u64,
            "Actor spawned"
        );
        Ok(address)
    }

    /// Hand an envelope to the transport
    pub async fn deliver(&self, envelope: Envelope) -> Result<()> {
        self.transport.deliver(envelope).await
    }

    pub async fn status(&self, address: &Address) -> Option<ActorStatus> {
        self.actors.read().await.get(address).map(ActorHandle::status)
    }

    pub async fn get_actor(&self, address: &Address) -> Option<ActorHandle> {
        self.actors.read().await.get(address).cloned()
    }

    pub async fn actor_count(&self) -> usize {
        self.actors.read().await.len()
    }

    /// Stop one actor: abort its tasks and close its mailbox
    pub async fn stop_actor(&self, address: &Address) -> Result<()> {
        let actors = self.actors.read().await;
        let Some(handle) = actors.get(address) else {
            warn!(address = %address, "Attempted to stop unknown actor");
            return Err(ActorError::unreachable(address));
        };

        let task_handle = self.task_registry.write().await.remove(address);
        let Some(task_handle) = task_handle else {
            debug!(address = %address, "Actor already stopped");
            return Ok(());
        };

        task_handle.abort();
        if let Err(e) = task_handle.await {
            if !e.is_cancelled() {
                warn!(address = %address, error = %e, "Actor task finished with error");
            }
        }

        *handle.status.lock() = ActorStatus::Stopped;
        let advertised = handle.advertised;
        drop(actors);

        self.registry.unregister(address).await?;
        if let (true, Some(discovery)) = (advertised, &self.discovery) {
            if let Err(e) = discovery.update_status(address, AgentStatus::Stopped).await {
                warn!(address = %address, error = %e, "Failed to mark agent stopped");
            }
        }
        self.metrics.actors_stopped.fetch_add(1, Ordering::Relaxed);
        info!(address = %address, "Actor stopped");
        Ok(())
    }

    /// Stop every actor
    pub async fn shutdown(&self) {
        let addresses: Vec<Address> = self.actors.read().await.keys().cloned().collect();
        for address in addresses {
            if let Err(e) = self.stop_actor(&address).await {
                warn!(address = %address, error = %e, "Failed to stop actor during shutdown");
            }
        }
        info!(system_id = %self.system_id, "Actor system shut down");
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn registry(&self) -> &Arc<MailboxRegistry> {
        &self.registry
    }

    pub fn routing(&self) -> &Arc<RoutingTable> {
        &self.routing
    }

    pub fn metrics(&self) -> &Arc<SystemMetrics> {
        &self.metrics
    }
}

/// Everything one running actor owns
struct ActorTask {
    ctx: ActorContext,
    handlers: Arc<HandlerTable>,
    registration: Option<(Arc<dyn Discovery>, AgentProfile)>,
    startup: Option<Hook>,
    intervals: Vec<(Duration, Hook)>,
    receiver: mpsc::Receiver<Envelope>,
    status: Arc<Mutex<ActorStatus>>,
    metrics: Arc<SystemMetrics>,
}

impl ActorTask {
    async fn run(self) {
        let ActorTask {
            ctx,
            handlers,
            registration,
            startup,
            intervals,
            mut receiver,
            status,
            metrics,
        } = self;

        if let Some((discovery, profile)) = registration {
            register(&ctx, discovery.as_ref(), &profile, &metrics).await;
        }

        if let Some(hook) = startup {
            match AssertUnwindSafe(hook(ctx.clone())).catch_unwind().await {
                Ok(Ok(())) => debug!(actor = %ctx.name(), "Startup hook completed"),
                Ok(Err(e)) => {
                    metrics.record_startup_failure();
                    error!(
                        actor = %ctx.name(),
                        category = e.category(),
                        error = %e,
                        "Startup hook failed - continuing"
                    );
                }
                Err(panic) => {
                    metrics.record_startup_failure();
                    error!(
                        actor = %ctx.name(),
                        panic = %panic_message(&*panic),
                        "Startup hook panicked - continuing"
                    );
                }
            }
        }
        *status.lock() = ActorStatus::Started;

        // Interval tasks and in-flight dispatches live in one set, so aborting
        // this task aborts all of them.
        let mut tasks = JoinSet::new();
        for (period, task) in intervals {
            tasks.spawn(run_interval(ctx.clone(), period, task, Arc::clone(&metrics)));
        }

        *status.lock() = ActorStatus::Running;
        info!(actor = %ctx.name(), address = %ctx.address(), "Actor running");

        loop {
            tokio::select! {
                inbound = receiver.recv() => match inbound {
                    Some(envelope) => {
                        tasks.spawn(dispatch(
                            ctx.clone(),
                            Arc::clone(&handlers),
                            envelope,
                            Arc::clone(&metrics),
                        ));
                    }
                    None => {
                        debug!(actor = %ctx.name(), "Mailbox closed");
                        break;
                    }
                },
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}
    }
}

async fn register(
    ctx: &ActorContext,
    discovery: &dyn Discovery,
    profile: &AgentProfile,
    metrics: &SystemMetrics,
) {
    let stored = match discovery.register(ctx.address(), profile).await {
        Ok(registration) => ctx.state().put(REGISTRATION_KEY, &registration),
        Err(e) => Err(e),
    };
    match stored {
        Ok(()) => debug!(actor = %ctx.name(), role = %profile.role, "Registered with discovery"),
        Err(e) => {
            metrics.record_registration_failure();
            warn!(
                actor = %ctx.name(),
                role = %profile.role,
                category = e.category(),
                error = %e,
                "Discovery registration failed - continuing"
            );
        }
    }
}

async fn dispatch(
    ctx: ActorContext,
    handlers: Arc<HandlerTable>,
    envelope: Envelope,
    metrics: Arc<SystemMetrics>,
) {
    let message_type = envelope.message.message_type();
    let correlation_id = correlation_label(envelope.correlation_id());

    let Some(handler) = handlers.get(message_type).cloned() else {
        metrics.record_unhandled();
        warn!(
            actor = %ctx.name(),
            message_type = %message_type,
            from = %envelope.from,
            correlation_id = %correlation_id,
            "No handler registered - dropping message"
        );
        return;
    };

    let start = Instant::now();
    let outcome = AssertUnwindSafe(handler(ctx.clone(), envelope))
        .catch_unwind()
        .await;
    metrics.record_message_handled(start.elapsed());

    match outcome {
        Ok(Ok(())) => debug!(
            actor = %ctx.name(),
            message_type = %message_type,
            correlation_id = %correlation_id,
            "Message handled"
        ),
        Ok(Err(e)) => {
            metrics.record_handler_failure();
            error!(
                actor = %ctx.name(),
                message_type = %message_type,
                correlation_id = %correlation_id,
                category = e.category(),
                error = %e,
                "Handler failed"
            );
        }
        Err(panic) => {
            metrics.record_handler_failure();
            error!(
                actor = %ctx.name(),
                message_type = %message_type,
                correlation_id = %correlation_id,
                panic = %panic_message(&*panic),
                "Handler panicked"
            );
        }
    }
}

async fn run_interval(ctx: ActorContext, period: Duration, task: Hook, metrics: Arc<SystemMetrics>) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        metrics.record_interval_tick();

        match AssertUnwindSafe(task(ctx.clone())).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(
                actor = %ctx.name(),
                category = e.category(),
                error = %e,
                "Interval task failed"
            ),
            Err(panic) => error!(
                actor = %ctx.name(),
                panic = %panic_message(&*panic),
                "Interval task panicked"
            ),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
