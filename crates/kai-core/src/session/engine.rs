//! Session engine
//!
//! [`Session`] owns one [`SessionContext`] and drives every event through the
//! matcher, the dispatcher and the disclosure loader. Events are handled
//! strictly one at a time in arrival order.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::context::{SessionContext, SessionSnapshot};
use super::log::{ExecutionLog, LogEntry};
use crate::config::SessionConfig;
use crate::error::{KaiError, KaiResult};
use crate::event::{Event, EventKind};
use crate::hooks::{Dispatcher, ExecutionResult, HookInvoker, ProcessInvoker};
use crate::matcher::{Matcher, Plan};
use crate::registry::{Registry, load_registry};
use crate::skills::{
    ComponentLoad, ContentSource, Disclosure, DisclosureLoader, DisclosureState, FsContentSource,
    Tier,
};

/// What happened to one planned skill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillActivationOutcome {
    pub skill_id: String,
    /// Highest tier loaded after activation; `None` if nothing could be loaded
    pub tier: Option<Tier>,
    /// Tiers loaded by this event, lowest first
    #[serde(default)]
    pub newly_loaded: Vec<Tier>,
    /// Content of the highest newly loaded tier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SkillActivationOutcome {
    fn loaded(disclosure: &Disclosure) -> Self {
        let tier = match disclosure.state {
            DisclosureState::Loaded(tier) => Some(tier),
            DisclosureState::NotLoaded => None,
        };
        Self {
            skill_id: disclosure.skill_id.clone(),
            tier,
            newly_loaded: disclosure.loaded.iter().map(|l| l.tier).collect(),
            content: disclosure.loaded.last().map(|l| l.content.to_string()),
            error: None,
        }
    }

    fn failed(skill_id: &str, tier: Option<Tier>, error: &KaiError) -> Self {
        Self {
            skill_id: skill_id.to_string(),
            tier,
            newly_loaded: Vec::new(),
            content: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Everything produced while handling one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventOutcome {
    pub event_kind: EventKind,
    pub session_id: String,
    /// One result per planned hook, in plan order
    pub hook_results: Vec<ExecutionResult>,
    /// One outcome per planned skill, in declaration order
    #[serde(default)]
    pub activations: Vec<SkillActivationOutcome>,
}

impl EventOutcome {
    pub fn all_hooks_succeeded(&self) -> bool {
        self.hook_results.iter().all(ExecutionResult::is_success)
    }

    pub fn activated_skills(&self) -> Vec<&str> {
        self.activations
            .iter()
            .filter(|a| a.is_success())
            .map(|a| a.skill_id.as_str())
            .collect()
    }
}

/// One assistant session
pub struct Session {
    config: SessionConfig,
    matcher: Matcher,
    dispatcher: Dispatcher,
    loader: DisclosureLoader,
    context: SessionContext,
    log: Option<ExecutionLog>,
    /// Held for the whole of each event so events never interleave
    gate: Mutex<()>,
    cancel: CancellationToken,
}

impl Session {
    /// Load declarations for `config` and start a session with process hooks
    /// and file-backed skill content
    pub async fn start(config: SessionConfig) -> KaiResult<Self> {
        let registry = load_registry(&config).await?;
        let invoker = Arc::new(ProcessInvoker::from_config(&config));
        Ok(Self::with_parts(
            config,
            Arc::new(registry),
            invoker,
            Arc::new(FsContentSource),
        ))
    }

    /// Assemble a session from explicit collaborators
    pub fn with_parts(
        config: SessionConfig,
        registry: Arc<Registry>,
        invoker: Arc<dyn HookInvoker>,
        source: Arc<dyn ContentSource>,
    ) -> Self {
        info!(
            "Session {} started with {} hook(s) and {} skill(s)",
            config.session_id,
            registry.hook_count(),
            registry.skill_count()
        );

        Self {
            context: SessionContext::new(config.session_id.clone()),
            log: ExecutionLog::from_config(&config),
            matcher: Matcher::new(registry),
            dispatcher: Dispatcher::new(invoker),
            loader: DisclosureLoader::new(source),
            gate: Mutex::new(()),
            cancel: CancellationToken::new(),
            config,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.config.session_id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        self.matcher.registry()
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// The plan an event would produce, without running it
    pub fn plan(&self, event: &Event) -> Plan {
        self.matcher.plan(event)
    }

    /// Run an event's hooks and activate its skills
    ///
    /// Per-hook and per-skill failures are reported in the outcome; this never
    /// fails. `SessionEnd` clears the session context once its hooks have run.
    pub async fn handle_event(&self, event: Event) -> EventOutcome {
        let _gate = self.gate.lock().await;

        let plan = self.matcher.plan(&event);
        match event.summary() {
            Some(summary) => info!("Handling {}: {}", event.kind, summary),
            None => info!("Handling {}", event.kind),
        }

        let records_before = self.context.activation_count();
        let cancel = self.cancel.child_token();
        let (hook_results, activations) = tokio::join!(
            self.dispatcher
                .dispatch(&event, &plan.hooks, self.session_id(), &cancel),
            self.activate_skills(&plan.skills),
        );

        self.context.append_executions(hook_results.iter().cloned());

        if let Some(log) = &self.log {
            let entries: Vec<LogEntry> = hook_results
                .iter()
                .cloned()
                .map(LogEntry::Execution)
                .chain(
                    self.context
                        .activations_since(records_before)
                        .into_iter()
                        .map(LogEntry::Activation),
                )
                .collect();
            log.record(&entries).await;
        }

        if event.kind == EventKind::SessionEnd {
            info!("Session {} ended; clearing session context", self.session_id());
            self.context.reset();
        }

        EventOutcome {
            event_kind: event.kind,
            session_id: self.session_id().to_string(),
            hook_results,
            activations,
        }
    }

    /// Load a skill up to `tier`, walking through any tiers not yet loaded
    pub async fn expand(&self, skill_id: &str, tier: Tier) -> KaiResult<Disclosure> {
        let _gate = self.gate.lock().await;
        let skill = self
            .registry()
            .skill(skill_id)
            .cloned()
            .ok_or_else(|| KaiError::unknown_skill(skill_id))?;

        let records_before = self.context.activation_count();
        let result = self.loader.expand(&skill, tier, &self.context).await;
        self.log_activations_since(records_before).await;
        result
    }

    /// Load one of a skill's components, expanding the skill to tier 3 first
    pub async fn reference_component(
        &self,
        skill_id: &str,
        component_id: &str,
    ) -> KaiResult<ComponentLoad> {
        let _gate = self.gate.lock().await;
        let skill = self
            .registry()
            .skill(skill_id)
            .cloned()
            .ok_or_else(|| KaiError::unknown_skill(skill_id))?;

        let records_before = self.context.activation_count();
        let result = self
            .loader
            .reference_component(&skill, component_id, &self.context)
            .await;
        self.log_activations_since(records_before).await;
        result
    }

    /// Components of a skill named in some loaded content
    pub fn referenced_components(&self, skill_id: &str, content: &str) -> KaiResult<Vec<String>> {
        let skill = self
            .registry()
            .skill(skill_id)
            .ok_or_else(|| KaiError::unknown_skill(skill_id))?;
        Ok(DisclosureLoader::referenced_components(skill, content))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.context.snapshot()
    }

    /// Abandon in-flight hooks; hooks of later events are skipped
    pub fn cancel(&self) {
        warn!("Session {} cancelled", self.session_id());
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Activate every planned skill; failures stay with their skill
    async fn activate_skills(&self, skill_ids: &[String]) -> Vec<SkillActivationOutcome> {
        let registry = self.registry();
        let activations = skill_ids.iter().map(|id| async move {
            let Some(skill) = registry.skill(id) else {
                let err = KaiError::unknown_skill(id);
                return SkillActivationOutcome::failed(id, None, &err);
            };
            match self.loader.activate(skill, &self.context).await {
                Ok(disclosure) => {
                    if disclosure.is_noop() {
                        debug!("Skill '{}' already active", id);
                    } else {
                        info!("Activated skill '{}'", id);
                    }
                    SkillActivationOutcome::loaded(&disclosure)
                }
                Err(e) => {
                    warn!("Skill '{}' could not be activated: {}", id, e);
                    let tier = self.context.loaded_tier(id);
                    SkillActivationOutcome::failed(id, tier, &e)
                }
            }
        });

        join_all(activations).await
    }

    /// Log records appended since `start`, including those of failed loads
    async fn log_activations_since(&self, start: usize) {
        if let Some(log) = &self.log {
            let entries: Vec<LogEntry> = self
                .context
                .activations_since(start)
                .into_iter()
                .map(LogEntry::Activation)
                .collect();
            log.record(&entries).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::invoker::{InvocationOutcome, MockHookInvoker};
    use crate::hooks::{HookInput, HookRegistration, HookStatus, Invocation};
    use crate::registry::RegistryBuilder;
    use crate::skills::disclosure::MockContentSource;
    use crate::skills::{ContentRef, Skill};
    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;
    use std::io;
    use std::time::Duration;
    use tempfile::TempDir;

    fn registry() -> Arc<Registry> {
        let mut builder = RegistryBuilder::new();
        builder
            .register_hook(HookRegistration::new(
                "load-context",
                EventKind::SessionStart,
                Invocation::new("/hooks/load-context"),
            ))
            .unwrap();
        builder
            .register_hook(HookRegistration::new(
                "save",
                EventKind::SessionEnd,
                Invocation::new("/hooks/save"),
            ))
            .unwrap();
        builder
            .register_skill(
                Skill::new("fabric", "Prompt patterns")
                    .with_triggers(["pattern"])
                    .with_tier(ContentRef::File("/skills/fabric/SKILL.md".into())),
            )
            .unwrap();
        builder
            .register_skill(
                Skill::new("broken", "Broken skill")
                    .with_triggers(["pattern"])
                    .with_tier(ContentRef::File("/skills/broken/SKILL.md".into())),
            )
            .unwrap();
        Arc::new(builder.build())
    }

    fn ok_invoker() -> MockHookInvoker {
        let mut invoker = MockHookInvoker::new();
        invoker
            .expect_invoke()
            .returning(|hook, _| InvocationOutcome::ok(format!("{} ok", hook.id)));
        invoker
    }

    fn source() -> MockContentSource {
        let mut source = MockContentSource::new();
        source.expect_load().returning(|source| match source {
            ContentRef::File(path) if path.starts_with("/skills/broken") => {
                Err(io::Error::new(io::ErrorKind::NotFound, "missing"))
            }
            _ => Ok("Use the pattern library".to_string()),
        });
        source
    }

    fn session(config: SessionConfig) -> Session {
        Session::with_parts(config, registry(), Arc::new(ok_invoker()), Arc::new(source()))
    }

    #[tokio::test]
    async fn test_prompt_activates_skills_and_isolates_failures() {
        let session = session(SessionConfig::new("/srv/pai").with_session_id("s1"));

        let outcome = session
            .handle_event(Event::prompt("apply a pattern to this text"))
            .await;

        assert_eq!(outcome.session_id, "s1");
        assert!(outcome.hook_results.is_empty());
        assert_eq!(outcome.activations.len(), 2);

        let fabric = &outcome.activations[0];
        assert_eq!(fabric.skill_id, "fabric");
        assert_eq!(fabric.tier, Some(Tier::Instructions));
        assert_eq!(fabric.newly_loaded, vec![Tier::Descriptor, Tier::Instructions]);
        assert_eq!(fabric.content.as_deref(), Some("Use the pattern library"));

        let broken = &outcome.activations[1];
        assert_eq!(broken.tier, Some(Tier::Descriptor));
        assert!(broken.error.as_deref().unwrap().contains("tier 1"));
        assert_eq!(outcome.activated_skills(), vec!["fabric"]);
    }

    #[tokio::test]
    async fn test_reactivation_reports_no_new_content() {
        let session = session(SessionConfig::new("/srv/pai"));
        session.handle_event(Event::prompt("pattern")).await;
        let records_before = session.snapshot().activations.len();

        let outcome = session.handle_event(Event::prompt("another PATTERN")).await;
        let fabric = &outcome.activations[0];
        assert!(fabric.newly_loaded.is_empty());
        assert_eq!(fabric.content, None);
        assert_eq!(fabric.tier, Some(Tier::Instructions));
        assert_eq!(session.snapshot().activations.len(), records_before);
    }

    #[tokio::test]
    async fn test_session_end_runs_hooks_then_clears_context() {
        let session = session(SessionConfig::new("/srv/pai"));
        let start = session.handle_event(Event::bare(EventKind::SessionStart)).await;
        assert!(start.all_hooks_succeeded());
        session.handle_event(Event::prompt("pattern")).await;
        assert!(!session.snapshot().executions.is_empty());

        let end = session.handle_event(Event::bare(EventKind::SessionEnd)).await;
        assert_eq!(end.hook_results.len(), 1);
        assert_eq!(end.hook_results[0].hook_id, "save");

        let snapshot = session.snapshot();
        assert!(snapshot.executions.is_empty());
        assert!(snapshot.activations.is_empty());
        assert!(snapshot.loaded_tiers.is_empty());
    }

    #[tokio::test]
    async fn test_expand_and_unknown_skill() {
        let session = session(SessionConfig::new("/srv/pai"));
        let disclosure = session.expand("fabric", Tier::Instructions).await.unwrap();
        assert_eq!(disclosure.loaded.len(), 2);

        let err = session.expand("nope", Tier::Instructions).await.unwrap_err();
        assert!(matches!(err, KaiError::UnknownSkill { .. }));
        let err = session.reference_component("fabric", "x").await.unwrap_err();
        assert!(matches!(err, KaiError::UnknownComponent { .. }));
        assert!(session.referenced_components("nope", "").is_err());
    }

    #[tokio::test]
    async fn test_cancelled_session_skips_hooks() {
        let session = session(SessionConfig::new("/srv/pai"));
        session.cancel();
        assert!(session.is_cancelled());

        let outcome = session.handle_event(Event::bare(EventKind::SessionStart)).await;
        assert_eq!(outcome.hook_results[0].status, HookStatus::Skipped);
    }

    #[tokio::test]
    async fn test_cancelled_resolves_after_cancel() {
        let session = Arc::new(session(SessionConfig::new("/srv/pai")));
        let waiter = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.cancelled().await })
        };
        session.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_execution_log_written() {
        let dir = TempDir::new().unwrap();
        let config = SessionConfig::new("/srv/pai")
            .with_session_id("logged")
            .with_log_dir(dir.path());
        let session = session(config.clone());

        session.handle_event(Event::bare(EventKind::SessionStart)).await;
        session.handle_event(Event::prompt("pattern")).await;

        let entries = ExecutionLog::from_config(&config).unwrap().read().await.unwrap();
        let executions = entries
            .iter()
            .filter(|e| matches!(e, LogEntry::Execution(_)))
            .count();
        let activations = entries
            .iter()
            .filter(|e| matches!(e, LogEntry::Activation(_)))
            .count();
        // broken loads its descriptor before failing on tier 1
        assert_eq!(executions, 1);
        assert_eq!(activations, 3);
    }

    /// Records when each event's hooks start and finish
    struct TracingInvoker {
        trace: Arc<SyncMutex<Vec<String>>>,
    }

    #[async_trait]
    impl HookInvoker for TracingInvoker {
        async fn invoke(&self, hook: &HookRegistration, input: &HookInput) -> InvocationOutcome {
            self.trace.lock().push(format!("start {}", input.event));
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.trace.lock().push(format!("end {}", input.event));
            InvocationOutcome::ok(hook.id.clone())
        }
    }

    #[tokio::test]
    async fn test_events_do_not_interleave() {
        let trace = Arc::new(SyncMutex::new(Vec::new()));
        let session = Session::with_parts(
            SessionConfig::new("/srv/pai"),
            registry(),
            Arc::new(TracingInvoker {
                trace: Arc::clone(&trace),
            }),
            Arc::new(source()),
        );

        tokio::join!(
            session.handle_event(Event::bare(EventKind::SessionStart)),
            session.handle_event(Event::bare(EventKind::SessionEnd)),
        );

        assert_eq!(
            *trace.lock(),
            vec![
                "start SessionStart",
                "end SessionStart",
                "start SessionEnd",
                "end SessionEnd"
            ]
        );
    }
}
