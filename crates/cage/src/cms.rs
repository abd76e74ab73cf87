//! The Cms: every action behind one handle.
//!
//! A [`Cms`] owns the shared, read-only registries (renderers, permission
//! flags, field rules), the store, the audit notifier and the session table.
//! Actions live in the `api` modules as `impl Cms` blocks.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use cage_core::{Clock, ConfigError, FieldRules, PermissionTable, SystemClock, UserId};
use cage_events::{EventKind, EventSink, Notifier, QueuedSink, StoreSink};
use cage_perms::{Actor, AuthorizationGuard, ChallengeVerifier};
use cage_render::{Renderer, RendererRegistry};
use cage_store::{SqliteStore, Store};

use crate::config::CmsConfig;
use crate::error::{ActionError, ActionResult, Result};
use crate::response::Response;
use crate::session::SessionStore;

/// The main Cms struct.
pub struct Cms {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) renderers: Arc<RendererRegistry>,
    pub(crate) permissions: Arc<PermissionTable>,
    pub(crate) rules: FieldRules,
    pub(crate) guard: AuthorizationGuard,
    pub(crate) verifier: ChallengeVerifier,
    pub(crate) notifier: Notifier,
    pub(crate) sessions: SessionStore,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: CmsConfig,
    queue: Mutex<Option<(QueuedSink, JoinHandle<()>)>>,
}

/// Assembles a [`Cms`]. Any wiring error surfaces from [`CmsBuilder::build`].
pub struct CmsBuilder {
    store: Arc<dyn Store>,
    config: CmsConfig,
    renderers: Option<RendererRegistry>,
    permissions: Option<PermissionTable>,
    sink: Option<Arc<dyn EventSink>>,
    clock: Arc<dyn Clock>,
    error: Option<ConfigError>,
}

impl CmsBuilder {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            config: CmsConfig::default(),
            renderers: None,
            permissions: None,
            sink: None,
            clock: Arc::new(SystemClock),
            error: None,
        }
    }

    pub fn config(mut self, config: CmsConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the renderer registry. Defaults to the built-in renderers.
    pub fn renderers(mut self, renderers: RendererRegistry) -> Self {
        self.renderers = Some(renderers);
        self
    }

    /// Register one more renderer on top of the current registry.
    pub fn renderer(
        mut self,
        ext: &str,
        name: &str,
        description: &str,
        renderer: impl Renderer + 'static,
    ) -> Self {
        if self.error.is_some() {
            return self;
        }
        let registry = match self.renderers.take() {
            Some(registry) => Ok(registry),
            None => RendererRegistry::with_builtins(),
        };
        match registry {
            Ok(mut registry) => {
                if let Err(e) = registry.register(ext, name, description, renderer) {
                    self.error = Some(e);
                }
                self.renderers = Some(registry);
            }
            Err(e) => self.error = Some(e),
        }
        self
    }

    /// Replace the permission table. Defaults to the standard table.
    pub fn permissions(mut self, permissions: PermissionTable) -> Self {
        self.permissions = Some(permissions);
        self
    }

    /// Where audit events go. Defaults to the store.
    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Build the Cms.
    ///
    /// With a non-zero `event_queue_capacity` the sink is put behind a
    /// [`QueuedSink`], whose worker is spawned on the current Tokio runtime.
    pub fn build(self) -> Result<Cms> {
        if let Some(e) = self.error {
            return Err(e.into());
        }
        self.config.validate()?;

        let renderers = match self.renderers {
            Some(registry) => registry,
            None => RendererRegistry::with_builtins()?,
        };
        let permissions = match self.permissions {
            Some(table) => table,
            None => PermissionTable::standard()?,
        };
        let rules = self.config.rules()?;

        let sink: Arc<dyn EventSink> = match self.sink {
            Some(sink) => sink,
            None => Arc::new(StoreSink::with_clock(
                Arc::clone(&self.store),
                Arc::clone(&self.clock),
            )),
        };
        let (sink, queue): (Arc<dyn EventSink>, _) = if self.config.event_queue_capacity > 0 {
            let (queued, handle) = QueuedSink::spawn(sink, self.config.event_queue_capacity);
            (Arc::new(queued.clone()), Some((queued, handle)))
        } else {
            (sink, None)
        };

        info!(
            permission_control = self.config.enable_permission_control,
            renderers = renderers.renderers().count(),
            flags = permissions.flags().len(),
            "cms ready"
        );

        Ok(Cms {
            store: self.store,
            renderers: Arc::new(renderers),
            permissions: Arc::new(permissions),
            rules,
            guard: self.config.guard(),
            verifier: self.config.verifier(),
            notifier: Notifier::new(sink),
            sessions: SessionStore::new(),
            clock: self.clock,
            config: self.config,
            queue: Mutex::new(queue),
        })
    }
}

impl Cms {
    pub fn builder(store: Arc<dyn Store>) -> CmsBuilder {
        CmsBuilder::new(store)
    }

    /// Open the SQLite database named in `config` and build a Cms over it.
    pub fn open(config: CmsConfig) -> Result<Self> {
        if let Some(dir) = config.database_path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let store = SqliteStore::open(&config.database_path)?;
        Self::builder(Arc::new(store)).config(config).build()
    }

    pub fn config(&self) -> &CmsConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn renderers(&self) -> &RendererRegistry {
        &self.renderers
    }

    pub fn permissions(&self) -> &PermissionTable {
        &self.permissions
    }

    pub fn verifier(&self) -> &ChallengeVerifier {
        &self.verifier
    }

    pub(crate) fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    pub(crate) async fn notify(&self, kind: EventKind, description: &str, actor: &Actor) {
        self.notifier.notify(kind, description, actor.id.as_ref()).await;
    }

    /// Resolve a session token to the caller.
    ///
    /// Missing or unknown tokens, and sessions whose user is gone or
    /// expired, resolve to the anonymous actor.
    pub async fn actor(&self, token: Option<&str>) -> ActionResult<Actor> {
        let Some(token) = token else {
            return Ok(Actor::anonymous());
        };
        let Some(session) = self.sessions.get(token) else {
            return Ok(Actor::anonymous());
        };

        match self.store.get_user(&session.user).await? {
            Some(user) if !user.expired => Ok(Actor::from(&user)),
            _ => {
                debug!(user = %session.user, "dropping stale session");
                self.sessions.remove(token);
                Ok(Actor::anonymous())
            }
        }
    }

    /// Turn an action result into a response.
    ///
    /// Unexpected failures are logged, audited as `Exception` and reported
    /// with a generic message.
    pub async fn respond<T: Serialize>(&self, actor: &Actor, result: ActionResult<T>) -> Response {
        match result {
            Ok(payload) => Response::from_result(Ok(payload)),
            Err(err) => {
                if let ActionError::Store(cause) = &err {
                    error!(actor = ?actor.id, error = %cause, "action failed");
                    self.notify(EventKind::Exception, &cause.to_string(), actor)
                        .await;
                }
                Response::from_error(&err)
            }
        }
    }

    /// Like [`respond`](Self::respond), with the payload under `key`.
    pub async fn respond_keyed<T: Serialize>(
        &self,
        actor: &Actor,
        key: &str,
        result: ActionResult<T>,
    ) -> Response {
        match result {
            Ok(payload) => Response::ok().with(key, payload),
            Err(err) => self.respond::<()>(actor, Err(err)).await,
        }
    }

    /// Stop the event queue, if any, and wait for it to drain.
    pub async fn shutdown(&self) {
        let queue = match self.queue.lock() {
            Ok(mut queue) => queue.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some((sink, handle)) = queue {
            sink.close();
            if let Err(e) = handle.await {
                error!(error = %e, "event queue worker failed");
            }
        }
    }

    pub(crate) fn end_sessions(&self, user: &UserId) {
        let ended = self.sessions.remove_user(user);
        if ended > 0 {
            debug!(user = %user, ended, "ended sessions");
        }
    }
}
