//! Test fixtures and helpers.
//!
//! A [`TestFixture`] wires a [`Cms`] over an in-memory store with a manual
//! clock and a recording sink, so tests can move time and inspect audit
//! events without a database.

use std::sync::Arc;

use cage::{Cms, CmsConfig, NewArticle};
use cage_core::{ArticleId, CategoryId, Clock, ManualClock, PermissionValue, User, UserId};
use cage_events::MemorySink;
use cage_perms::{Actor, LoginChallenge};
use cage_store::{MemoryStore, Store};

/// The fixture clock's starting time: 2023-11-14T22:13:20Z.
pub const FIXTURE_NOW: i64 = 1_700_000_000_000;

/// Password every fixture account is created with.
pub const FIXTURE_PASSWORD: &str = "password-123";

/// A Cms over a memory store, a manual clock and a recording sink.
pub struct TestFixture {
    pub cms: Cms,
    pub store: Arc<MemoryStore>,
    pub sink: Arc<MemorySink>,
    pub clock: Arc<ManualClock>,
}

impl TestFixture {
    /// Production settings with events recorded inline.
    pub fn new() -> Self {
        Self::with_config(CmsConfig {
            event_queue_capacity: 0,
            ..CmsConfig::production()
        })
    }

    /// Permission control turned off.
    pub fn permissive() -> Self {
        Self::with_config(CmsConfig::testing())
    }

    /// Build over `config`. A non-zero event queue needs a Tokio runtime.
    pub fn with_config(config: CmsConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(MemorySink::new());
        let clock = Arc::new(ManualClock::new(FIXTURE_NOW));

        let cms = Cms::builder(store.clone())
            .config(config)
            .sink(sink.clone())
            .clock(clock.clone())
            .build()
            .expect("fixture config is valid");

        Self {
            cms,
            store,
            sink,
            clock,
        }
    }

    /// An actor holding every flag that is not stored anywhere.
    pub fn root(&self) -> Actor {
        Actor::user(UserId::new("root"), "root", PermissionValue::SUPERUSER)
    }

    /// Insert an account with [`FIXTURE_PASSWORD`] straight into the store.
    pub async fn add_user(&self, id: &str, name: &str, permission: PermissionValue) -> Actor {
        let user = User::new(
            UserId::new(id),
            name,
            self.cms.verifier().hasher().hash_password(FIXTURE_PASSWORD),
            permission,
            self.clock_now(),
        );
        self.store
            .insert_user(&user)
            .await
            .expect("memory store accepts users");
        Actor::from(&user)
    }

    /// A challenge a well-behaved client would send for `id` at `timestamp`.
    pub fn challenge(&self, id: &str, timestamp: i64) -> LoginChallenge {
        let cipher = self.cms.verifier().client_cipher(FIXTURE_PASSWORD, timestamp);
        LoginChallenge::new(id, cipher, timestamp)
    }

    /// Log `id` in at the current fixture time and return the session token.
    pub async fn login(&self, id: &str) -> String {
        let challenge = self.challenge(id, self.clock_now());
        self.cms
            .login(&challenge, false)
            .await
            .expect("fixture login succeeds")
            .token
    }

    /// Create a category whose name is its id in upper case.
    pub async fn category(&self, actor: &Actor, id: &str) -> CategoryId {
        self.cms
            .create_category(actor, id, &id.to_uppercase())
            .await
            .expect("fixture category is valid");
        CategoryId::new(id)
    }

    /// Post a public markdown article into `category`.
    pub async fn article(&self, actor: &Actor, id: &str, category: &CategoryId) {
        self.cms
            .post_article(actor, NewArticle {
                id: id.to_string(),
                title: format!("Title of {id}"),
                text_type: "md".into(),
                source_text: format!("# {id}"),
                category: Some(category.clone()),
                ..NewArticle::default()
            })
            .await
            .expect("fixture article is valid");
    }

    fn clock_now(&self) -> i64 {
        self.clock.now_millis()
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A small blog: two authors, one category, one article by `alice`.
pub struct BlogSeed {
    pub alice: Actor,
    pub bob: Actor,
    pub category: CategoryId,
    pub article: ArticleId,
}

/// Populate `fixture` with a [`BlogSeed`] and clear the recorded events.
pub async fn seed_blog(fixture: &TestFixture) -> BlogSeed {
    let alice = fixture.add_user("alice", "Alice", PermissionValue::AUTHOR).await;
    let bob = fixture.add_user("bobby", "Bob", PermissionValue::AUTHOR).await;
    let category = fixture.category(&alice, "tech").await;
    fixture.article(&alice, "hello", &category).await;
    fixture.sink.clear();

    BlogSeed {
        alice,
        bob,
        category,
        article: ArticleId::new("hello"),
    }
}
