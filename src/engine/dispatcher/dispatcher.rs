use std::{any::Any, panic::AssertUnwindSafe, sync::{Arc, atomic::{AtomicU64, Ordering}}, time::{Duration, Instant}};

use futures::{FutureExt, future::BoxFuture};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::engine::{
    arguments::parsers::ParserRegistry,
    chat_event::chat_event::ChatEvent,
    commands::{CommandGroup, commands::{CommandBuilder, CommandContext, CommandDescriptor, ExecutionMode}, invocation::ParsedInvocation},
    cooldown::cooldown::{CooldownStore, CooldownTicket},
    dispatcher::queue::{DrainStats, OrderedQueues, WorkerPool},
    failure::failure::{Failure, FailureReport, aggregate},
    handler::handler::PlatformAdapter,
    permissions::permissions::PermissionLevel,
    replies::Replies,
    state::def::{EngineConfig, EngineError, EngineResult},
    trigger::index::TriggerIndex,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateRejection {
    DeveloperOnly,
    MissingPermission(PermissionLevel),
    NsfwOnly,
    Cooldown(Duration),
}

#[derive(Debug)]
pub enum DispatchOutcome {
    /// No prefix, or no trigger matched.
    Ignored,
    /// Ran inline; the handler has finished.
    Invoked(Arc<ParsedInvocation>),
    /// Handed to the worker pool, on the given ordering key if any.
    Queued { invocation: Arc<ParsedInvocation>, key: Option<String> },
    Rejected { invocation: Arc<ParsedInvocation>, rejection: GateRejection },
    Failed { failures: Vec<Failure>, report: Option<FailureReport> },
}

impl DispatchOutcome {
    pub fn invocation(&self) -> Option<&Arc<ParsedInvocation>> {
        match self {
            DispatchOutcome::Invoked(invocation) => Some(invocation),
            DispatchOutcome::Queued { invocation, .. } => Some(invocation),
            DispatchOutcome::Rejected { invocation, .. } => Some(invocation),
            DispatchOutcome::Ignored | DispatchOutcome::Failed { .. } => None,
        }
    }

    pub fn failures(&self) -> &[Failure] {
        match self {
            DispatchOutcome::Failed { failures, .. } => failures,
            _ => &[],
        }
    }
}

/// Hooks for observing dispatches. Every method defaults to doing nothing.
pub trait DispatchListener: Send + Sync {
    fn on_command(&self, _invocation: &ParsedInvocation, _event: &ChatEvent) {}
    fn on_completed(&self, _invocation: &ParsedInvocation, _elapsed: Duration) {}
    /// Called once per failed handler run.
    fn on_command_exception(&self, _invocation: &ParsedInvocation, _error: &EngineError) {}
    fn on_parse_failure(&self, _event: &ChatEvent, _report: &FailureReport) {}
    fn on_rejected(&self, _invocation: &ParsedInvocation, _event: &ChatEvent, _rejection: &GateRejection) {}
}

pub struct LoggingListener;

impl DispatchListener for LoggingListener {
    fn on_command(&self, invocation: &ParsedInvocation, event: &ChatEvent) {
        info!("{} used `{}` in {}:{}", event.display_name(), invocation.command.path, event.platform, event.channel);
    }

    fn on_completed(&self, invocation: &ParsedInvocation, elapsed: Duration) {
        debug!("`{}` finished in {:?}", invocation.command.path, elapsed);
    }

    fn on_command_exception(&self, invocation: &ParsedInvocation, error: &EngineError) {
        error!("`{}` failed: {error}", invocation.command.path);
    }

    fn on_parse_failure(&self, event: &ChatEvent, report: &FailureReport) {
        debug!("No command matched `{}`: {:?}", event.message, report);
    }

    fn on_rejected(&self, invocation: &ParsedInvocation, event: &ChatEvent, rejection: &GateRejection) {
        info!("Rejected `{}` for {}: {:?}", invocation.command.path, event.display_name(), rejection);
    }
}

#[derive(Default)]
struct ExecutionStats {
    executed: AtomicU64,
    failed: AtomicU64,
}

#[derive(Clone)]
pub struct Dispatcher {
    index: Arc<RwLock<TriggerIndex>>,
    config: Arc<EngineConfig>,
    cooldowns: Arc<CooldownStore>,
    queues: Arc<OrderedQueues>,
    pool: WorkerPool,
    adapter: Arc<dyn PlatformAdapter>,
    listener: Arc<dyn DispatchListener>,
    stats: Arc<ExecutionStats>,
}

impl Dispatcher {
    pub fn new(config: EngineConfig, registry: ParserRegistry, adapter: Arc<dyn PlatformAdapter>) -> Self {
        let pool = WorkerPool::new(config.max_workers);
        Dispatcher {
            index: Arc::new(RwLock::new(TriggerIndex::new(registry, config.clone()))),
            config: Arc::new(config),
            cooldowns: Arc::new(CooldownStore::new()),
            queues: Arc::new(OrderedQueues::new(pool.clone())),
            pool,
            adapter,
            listener: Arc::new(LoggingListener),
            stats: Arc::new(ExecutionStats::default()),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn DispatchListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cooldowns(&self) -> &CooldownStore {
        &self.cooldowns
    }

    pub fn index(&self) -> &Arc<RwLock<TriggerIndex>> {
        &self.index
    }

    pub async fn register(&self, command: CommandBuilder) -> EngineResult<Arc<CommandDescriptor>> {
        self.index.write().await.register(command)
    }

    pub async fn register_group(&self, group: CommandGroup) -> EngineResult<Vec<Arc<CommandDescriptor>>> {
        self.index.write().await.register_group(group)
    }

    pub async fn drain_stats(&self) -> DrainStats {
        let (active_queues, pending) = self.queues.snapshot().await;
        DrainStats {
            active_queues,
            pending,
            enqueued: self.queues.enqueued(),
            drains_started: self.queues.drains_started(),
            executed: self.stats.executed.load(Ordering::SeqCst),
            failed: self.stats.failed.load(Ordering::SeqCst),
        }
    }

    pub async fn dispatch(&self, raw: &str, event: ChatEvent) -> DispatchOutcome {
        let Some(body) = raw.strip_prefix(self.config.prefix.as_str()) else {
            return DispatchOutcome::Ignored;
        };

        let outcome = {
            let index = self.index.read().await;
            index.resolve(body, &event, self.adapter.as_ref())
        };

        let Some(invocation) = outcome.invocation else {
            if outcome.failures.is_empty() {
                return DispatchOutcome::Ignored;
            }
            return self.report_failures(outcome.failures, &event).await;
        };
        let invocation = Arc::new(invocation);

        let ticket = match self.check_gates(&invocation, &event) {
            Ok(ticket) => ticket,
            Err(rejection) => {
                self.listener.on_rejected(&invocation, &event, &rejection);
                if self.config.reply_on_rejection {
                    self.reply(&event, &Replies::rejection(&rejection, event.display_name())).await;
                }
                return DispatchOutcome::Rejected { invocation, rejection };
            }
        };

        self.listener.on_command(&invocation, &event);
        let command = invocation.command.clone();
        let job = self.execution(invocation.clone(), event.clone(), ticket);

        match &command.execution {
            ExecutionMode::Inline => {
                job.await;
                DispatchOutcome::Invoked(invocation)
            }
            ExecutionMode::Async => {
                self.pool.spawn(job);
                DispatchOutcome::Queued { invocation, key: None }
            }
            ExecutionMode::Ordered(key_of) => match key_of(&invocation, &event) {
                Some(key) => {
                    self.queues.enqueue(key.clone(), command.clone(), invocation.clone(), job).await;
                    DispatchOutcome::Queued { invocation, key: Some(key) }
                }
                None => {
                    self.pool.spawn(job);
                    DispatchOutcome::Queued { invocation, key: None }
                }
            },
        }
    }

    async fn report_failures(&self, failures: Vec<Failure>, event: &ChatEvent) -> DispatchOutcome {
        let report = aggregate(&failures);
        if let Some(report) = &report {
            self.listener.on_parse_failure(event, report);
            if self.config.reply_on_failure {
                self.reply(event, &Replies::failure(report, &self.config.prefix)).await;
            }
        }
        DispatchOutcome::Failed { failures, report }
    }

    /// Gates in order; the cooldown gate starts the cooldown when it lets the call through.
    fn check_gates(&self, invocation: &ParsedInvocation, event: &ChatEvent) -> Result<Option<CooldownTicket>, GateRejection> {
        let command = &invocation.command;

        if command.developer_only && !event.user_id().is_some_and(|id| self.adapter.is_developer(id)) {
            return Err(GateRejection::DeveloperOnly);
        }

        if !self.adapter.has_permission(event, command.permission) {
            return Err(GateRejection::MissingPermission(command.permission));
        }

        if command.nsfw && !self.adapter.is_nsfw_channel(event) {
            return Err(GateRejection::NsfwOnly);
        }

        let Some(cooldown) = command.cooldown else {
            return Ok(None);
        };

        self.cooldowns
            .try_acquire(command.id, cooldown.scope.key(event), cooldown.duration, Instant::now())
            .map(Some)
            .map_err(GateRejection::Cooldown)
    }

    fn execution(&self, invocation: Arc<ParsedInvocation>, event: ChatEvent, ticket: Option<CooldownTicket>) -> BoxFuture<'static, ()> {
        let cooldowns = self.cooldowns.clone();
        let listener = self.listener.clone();
        let adapter = self.adapter.clone();
        let stats = self.stats.clone();

        Box::pin(async move {
            let Some(handler) = invocation.command.handler.clone() else {
                return;
            };
            let path = invocation.command.path.clone();
            let ctx = CommandContext { invocation: invocation.clone(), event, adapter };

            let result = AssertUnwindSafe(async move { handler.execute(ctx).await }).catch_unwind().await;
            let error = match result {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e),
                Err(panic) => Some(EngineError::Handler { command: path.clone(), reason: panic_message(panic) }),
            };

            match error {
                None => {
                    stats.executed.fetch_add(1, Ordering::SeqCst);
                    listener.on_completed(&invocation, invocation.started.elapsed());
                }
                Some(e) => {
                    stats.failed.fetch_add(1, Ordering::SeqCst);
                    if let Some(ticket) = &ticket {
                        if cooldowns.release(ticket) {
                            debug!("Rolled back cooldown of `{}` for {}", path, ticket.key);
                        }
                    }
                    listener.on_command_exception(&invocation, &e);
                }
            }
        })
    }

    async fn reply(&self, event: &ChatEvent, message: &str) {
        if let Err(e) = self.adapter.send_reply(event, message).await {
            warn!("Failed to send reply to {}: {e}", event.channel);
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
