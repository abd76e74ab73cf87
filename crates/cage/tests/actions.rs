//! End-to-end action tests over the in-memory store.

use std::sync::Arc;

use cage::core::{
    flags, ArticleId, CategoryId, CommentId, ManualClock, PermissionValue, User, UserId,
};
use cage::events::{EventKind, MemorySink};
use cage::perms::{Actor, LoginChallenge, DEFAULT_LOGIN_WINDOW_MS};
use cage::render::BoxError;
use cage::store::{CategoryOrder, MemoryStore, Store};
use cage::{
    ActionError, ArticleListQuery, Cms, CmsConfig, CmsError, CommentView, EditArticle, ModifyUser,
    NewArticle, NewCommentInput, NewUser, MAX_REPLY_DEPTH,
};

const NOW: i64 = 1_700_000_000_000;
const PASSWORD: &str = "password-123";

struct Harness {
    cms: Cms,
    store: Arc<MemoryStore>,
    sink: Arc<MemorySink>,
    clock: Arc<ManualClock>,
    root: Actor,
}

fn harness_with(enforce: bool) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let sink = Arc::new(MemorySink::new());
    let clock = Arc::new(ManualClock::new(NOW));

    let mut config = CmsConfig::production();
    config.enable_permission_control = enforce;
    config.event_queue_capacity = 0;

    let cms = Cms::builder(store.clone())
        .config(config)
        .sink(sink.clone())
        .clock(clock.clone())
        .build()
        .unwrap();

    Harness {
        cms,
        store,
        sink,
        clock,
        root: Actor::user(UserId::new("root"), "root", PermissionValue::SUPERUSER),
    }
}

fn harness() -> Harness {
    harness_with(true)
}

impl Harness {
    /// Insert a user directly and return it as an actor.
    async fn user(&self, id: &str, name: &str, permission: PermissionValue) -> Actor {
        let user = User::new(
            UserId::new(id),
            name,
            self.cms.verifier().hasher().hash_password(PASSWORD),
            permission,
            NOW,
        );
        self.store.insert_user(&user).await.unwrap();
        Actor::from(&user)
    }

    fn challenge(&self, id: &str, ts: i64) -> LoginChallenge {
        LoginChallenge::new(id, self.cms.verifier().client_cipher(PASSWORD, ts), ts)
    }

    async fn category(&self, actor: &Actor, id: &str) {
        self.cms.create_category(actor, id, &id.to_uppercase()).await.unwrap();
    }

    async fn article(&self, actor: &Actor, id: &str, category: &str) {
        self.cms
            .post_article(actor, NewArticle {
                id: id.into(),
                title: format!("Title of {id}"),
                text_type: "md".into(),
                source_text: "# hi".into(),
                category: Some(CategoryId::new(category)),
                ..NewArticle::default()
            })
            .await
            .unwrap();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_establishes_session() {
    let h = harness();
    h.user("alice", "Alice", PermissionValue::AUTHOR).await;

    let outcome = h.cms.login(&h.challenge("alice", NOW - 1000), true).await.unwrap();
    assert_eq!(outcome.user.last_login, NOW);

    let actor = h.cms.actor(Some(outcome.token.as_str())).await.unwrap();
    assert!(actor.is(&UserId::new("alice")));
    assert_eq!(actor.permission, PermissionValue::AUTHOR);

    let stored = h.store.get_user(&UserId::new("alice")).await.unwrap().unwrap();
    assert_eq!(stored.last_login, NOW);
    assert_eq!(h.sink.kinds(), vec![EventKind::Login]);
}

#[tokio::test]
async fn test_login_wrong_password_is_audited() {
    let h = harness();
    h.user("alice", "Alice", PermissionValue::AUTHOR).await;

    let challenge = LoginChallenge::new("alice", "00".repeat(20), NOW);
    let err = h.cms.login(&challenge, false).await.unwrap_err();

    assert!(matches!(err, ActionError::InvalidCredentials));
    assert_eq!(err.field(), "password");
    let events = h.sink.events();
    assert_eq!(events.len(), 1);
    assert!(events[0].description.contains("wrong password"));
}

#[tokio::test]
async fn test_login_window_edges() {
    let h = harness();
    h.user("alice", "Alice", PermissionValue::AUTHOR).await;
    let window = DEFAULT_LOGIN_WINDOW_MS as i64;

    for ts in [NOW - window - 1, NOW + window + 1] {
        let err = h.cms.login(&h.challenge("alice", ts), false).await.unwrap_err();
        assert!(matches!(err, ActionError::ChallengeExpired), "ts {ts}");
        assert_eq!(err.field(), "timestamp");
    }
    for ts in [NOW - window, NOW + window] {
        assert!(h.cms.login(&h.challenge("alice", ts), false).await.is_ok(), "ts {ts}");
    }
}

#[tokio::test]
async fn test_login_expired_clock_is_checked_after_digest() {
    let h = harness();
    h.user("alice", "Alice", PermissionValue::AUTHOR).await;
    h.clock.advance(DEFAULT_LOGIN_WINDOW_MS as i64 * 2);

    // Wrong cipher and stale timestamp: the cipher wins.
    let challenge = LoginChallenge::new("alice", "ff".repeat(20), NOW);
    let err = h.cms.login(&challenge, false).await.unwrap_err();
    assert_eq!(err.field(), "password");
}

#[tokio::test]
async fn test_login_unknown_and_expired_accounts() {
    let h = harness();
    let err = h.cms.login(&h.challenge("nobody", NOW), false).await.unwrap_err();
    assert_eq!(err.field(), "id");

    let alice = h.user("alice", "Alice", PermissionValue::AUTHOR).await;
    h.cms
        .modify_user(&alice, None, ModifyUser {
            expired: Some(true),
            ..ModifyUser::default()
        })
        .await
        .unwrap_err(); // AUTHOR lacks MODIFY_USER

    h.cms
        .modify_user(&h.root, Some(&UserId::new("alice")), ModifyUser {
            expired: Some(true),
            ..ModifyUser::default()
        })
        .await
        .unwrap();
    let err = h.cms.login(&h.challenge("alice", NOW), false).await.unwrap_err();
    assert!(matches!(err, ActionError::Invalid { field: "id", .. }));
}

#[tokio::test]
async fn test_logout() {
    let h = harness();
    h.user("alice", "Alice", PermissionValue::AUTHOR).await;
    let outcome = h.cms.login(&h.challenge("alice", NOW), false).await.unwrap();

    h.cms.logout(&outcome.token).await.unwrap();
    h.cms.logout(&outcome.token).await.unwrap();

    assert!(h.cms.actor(Some(outcome.token.as_str())).await.unwrap().is_anonymous());
    assert_eq!(h.sink.count(EventKind::Logout), 1);
}

#[tokio::test]
async fn test_unknown_token_is_anonymous() {
    let h = harness();
    assert!(h.cms.actor(None).await.unwrap().is_anonymous());
    assert!(h.cms.actor(Some("nope")).await.unwrap().is_anonymous());
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

fn new_user(id: &str, name: &str) -> NewUser {
    NewUser {
        id: id.into(),
        name: name.into(),
        password: PASSWORD.into(),
        permission: vec!["READ_ARTICLE".into(), "NOT_A_FLAG".into()],
        expired: false,
    }
}

#[tokio::test]
async fn test_add_user_validates_in_order() {
    let h = harness();

    let err = h.cms.add_user(&h.root, new_user("ab", "Short")).await.unwrap_err();
    assert_eq!(err.field(), "id");

    let err = h
        .cms
        .add_user(&h.root, new_user("valid_id", "a name far too long"))
        .await
        .unwrap_err();
    assert_eq!(err.field(), "name");

    let mut weak = new_user("valid_id", "Valid");
    weak.password = "short".into();
    assert_eq!(h.cms.add_user(&h.root, weak).await.unwrap_err().field(), "password");

    let view = h.cms.add_user(&h.root, new_user("valid_id", "Valid")).await.unwrap();
    assert_eq!(view.permission, Some(vec!["READ_ARTICLE"]));

    let err = h.cms.add_user(&h.root, new_user("valid_id", "Other")).await.unwrap_err();
    assert!(matches!(err, ActionError::Duplicate { field: "id", .. }));
    let err = h.cms.add_user(&h.root, new_user("other_id", "Valid")).await.unwrap_err();
    assert!(matches!(err, ActionError::Duplicate { field: "name", .. }));

    assert_eq!(h.sink.count(EventKind::UserCreate), 1);
}

#[tokio::test]
async fn test_add_user_requires_flag() {
    let h = harness();
    let alice = h.user("alice", "Alice", PermissionValue::AUTHOR).await;

    let err = h.cms.add_user(&alice, new_user("valid_id", "Valid")).await.unwrap_err();
    assert_eq!(err.field(), "permission");
    assert!(h.sink.is_empty());
}

#[tokio::test]
async fn test_list_users_pages_from_one() {
    let h = harness();
    for (i, name) in ["Ann", "Ben", "Cat"].iter().enumerate() {
        h.clock.set(NOW + i as i64);
        h.cms
            .add_user(&h.root, new_user(&format!("user_{i}"), name))
            .await
            .unwrap();
    }

    let names = |users: Vec<cage::UserView>| users.into_iter().map(|u| u.name).collect::<Vec<_>>();
    assert_eq!(names(h.cms.list_users(&h.root, 1, 2).await.unwrap()), vec!["Ann", "Ben"]);
    assert_eq!(names(h.cms.list_users(&h.root, 0, 2).await.unwrap()), vec!["Ann", "Ben"]);
    assert_eq!(names(h.cms.list_users(&h.root, 2, 2).await.unwrap()), vec!["Cat"]);
    assert_eq!(h.cms.list_users(&h.root, 1, 0).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_modify_user_rules() {
    let h = harness();
    let editor = PermissionValue::combine([flags::MODIFY_USER]);
    let alice = h.user("alice", "Alice", editor).await;
    h.user("bobby", "Bob", editor).await;

    // Someone else without MODIFY_OTHER_USER.
    let err = h
        .cms
        .modify_user(&alice, Some(&UserId::new("bobby")), ModifyUser {
            name: Some("Robert".into()),
            ..ModifyUser::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.field(), "permission");

    // Taken name.
    let err = h
        .cms
        .modify_user(&alice, None, ModifyUser {
            name: Some("Bob".into()),
            ..ModifyUser::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::Duplicate { field: "name", .. }));

    // Own current name and `expired: false` change nothing.
    h.cms
        .modify_user(&alice, None, ModifyUser {
            name: Some("Alice".into()),
            expired: Some(false),
            ..ModifyUser::default()
        })
        .await
        .unwrap();
    assert!(h.sink.is_empty());

    let view = h
        .cms
        .modify_user(&alice, None, ModifyUser {
            name: Some("Ally".into()),
            password: Some("another-password".into()),
            ..ModifyUser::default()
        })
        .await
        .unwrap();
    assert_eq!(view.name, "Ally");

    let events = h.sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::UserModify);
    assert_eq!(events[0].description, "modify properties name,password of user(alice).");
}

#[tokio::test]
async fn test_set_permission_and_delete_user() {
    let h = harness();
    let alice = h.user("alice", "Alice", PermissionValue::AUTHOR).await;
    let outcome = h.cms.login(&h.challenge("alice", NOW), false).await.unwrap();

    let err = h
        .cms
        .set_user_permission(&alice, &UserId::new("alice"), &["DELETE_USER".into()])
        .await
        .unwrap_err();
    assert_eq!(err.field(), "permission");

    let view = h
        .cms
        .set_user_permission(&h.root, &UserId::new("alice"), &[
            "READ_USER".into(),
            "REIVEW_OTHERS_COMMENT".into(),
        ])
        .await
        .unwrap();
    assert_eq!(view.permission, Some(vec!["READ_USER", "REVIEW_OTHERS_COMMENT"]));

    h.cms.delete_user(&h.root, &UserId::new("alice")).await.unwrap();
    assert!(h.cms.actor(Some(outcome.token.as_str())).await.unwrap().is_anonymous());

    let err = h.cms.delete_user(&h.root, &UserId::new("alice")).await.unwrap_err();
    assert!(matches!(err, ActionError::NotFound { field: "id", .. }));
}

#[tokio::test]
async fn test_permission_groups_are_listed() {
    let h = harness();
    let groups = h.cms.permission_groups();
    assert_eq!(groups.len(), 5);
    assert_eq!(groups[1].name(), "User Operation");
}

// ─────────────────────────────────────────────────────────────────────────────
// Categories
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_category_lifecycle() {
    let h = harness();
    let alice = h.user("alice", "Alice", PermissionValue::AUTHOR).await;
    let bob = h.user("bobby", "Bob", PermissionValue::AUTHOR).await;

    assert_eq!(h.cms.create_category(&alice, "tech", "  ").await.unwrap_err().field(), "name");
    assert_eq!(h.cms.create_category(&alice, "Tech!", "Tech").await.unwrap_err().field(), "id");

    h.cms.create_category(&alice, "tech", "Tech").await.unwrap();
    let err = h.cms.create_category(&bob, "tech", "Other").await.unwrap_err();
    assert!(matches!(err, ActionError::Duplicate { field: "id", .. }));
    let err = h.cms.create_category(&bob, "other", "Tech").await.unwrap_err();
    assert!(matches!(err, ActionError::Duplicate { field: "name", .. }));

    let tech = CategoryId::new("tech");
    let err = h.cms.edit_category(&bob, &tech, "Mine").await.unwrap_err();
    assert_eq!(err.field(), "permission");
    let err = h.cms.delete_category(&bob, &tech).await.unwrap_err();
    assert_eq!(err.field(), "permission");

    let entry = h.cms.edit_category(&alice, &tech, "Technology").await.unwrap();
    assert_eq!(entry.category.name, "Technology");
    assert!(h
        .sink
        .events()
        .iter()
        .any(|e| e.description == "category(tech) changed from `Tech` to `Technology`."));

    h.cms.delete_category(&h.root, &tech).await.unwrap();
    let err = h.cms.get_category(&alice, &tech).await.unwrap_err();
    assert!(matches!(err, ActionError::NotFound { field: "id", .. }));
}

#[tokio::test]
async fn test_list_categories_by_article_count() {
    let h = harness();
    let alice = h.user("alice", "Alice", PermissionValue::AUTHOR).await;
    h.category(&alice, "aaa").await;
    h.category(&alice, "bbb").await;
    h.article(&alice, "one", "bbb").await;

    let entries = h
        .cms
        .list_categories(&alice, CategoryOrder::ArticleCount, true)
        .await
        .unwrap();
    assert_eq!(entries[0].category.id, CategoryId::new("bbb"));
    assert_eq!(entries[0].article_count, 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Articles
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_post_article_checks() {
    let h = harness();
    let alice = h.user("alice", "Alice", PermissionValue::AUTHOR).await;
    h.category(&alice, "tech").await;

    let base = NewArticle {
        id: "hello".into(),
        title: "Hello".into(),
        text_type: "md".into(),
        source_text: "# hi".into(),
        category: Some(CategoryId::new("tech")),
        ..NewArticle::default()
    };

    let err = h
        .cms
        .post_article(&alice, NewArticle {
            category: None,
            ..base.clone()
        })
        .await
        .unwrap_err();
    assert_eq!(err.field(), "category");

    let err = h
        .cms
        .post_article(&alice, NewArticle {
            category: Some(CategoryId::new("nowhere")),
            ..base.clone()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::NotFound { field: "category", .. }));

    let err = h
        .cms
        .post_article(&alice, NewArticle {
            text_type: "rst".into(),
            ..base.clone()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::UnsupportedFormat(_)));
    assert_eq!(err.field(), "text_type");

    let err = h
        .cms
        .post_article(&alice, NewArticle {
            title: " ".into(),
            ..base.clone()
        })
        .await
        .unwrap_err();
    assert_eq!(err.field(), "title");

    let view = h.cms.post_article(&alice, base.clone()).await.unwrap();
    assert!(view.content.unwrap().contains("<h1>hi</h1>"));
    assert_eq!(view.author.unwrap().name, "Alice");
    assert_eq!(view.category.unwrap().name, "TECH");

    let err = h.cms.post_article(&alice, base).await.unwrap_err();
    assert!(matches!(err, ActionError::Duplicate { field: "id", .. }));
    assert_eq!(h.sink.count(EventKind::ArticlePost), 1);
}

#[tokio::test]
async fn test_private_article_visibility() {
    let h = harness();
    let alice = h.user("alice", "Alice", PermissionValue::AUTHOR).await;
    let bob = h.user("bobby", "Bob", PermissionValue::AUTHOR).await;

    let view = h
        .cms
        .post_article(&alice, NewArticle {
            id: "diary".into(),
            title: "Diary".into(),
            text_type: "md".into(),
            source_text: "secret".into(),
            public: false,
            category: Some(CategoryId::new("ignored")),
            ..NewArticle::default()
        })
        .await
        .unwrap();
    assert!(view.category.is_none());

    let diary = ArticleId::new("diary");
    assert!(h.cms.get_article(&alice, &diary, true, true).await.is_ok());
    let err = h.cms.get_article(&bob, &diary, false, true).await.unwrap_err();
    assert_eq!(err.field(), "permission");

    let listed = h.cms.list_articles(&alice, ArticleListQuery::default()).await.unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn test_reading_source_needs_edit_flag() {
    let h = harness();
    let alice = h.user("alice", "Alice", PermissionValue::AUTHOR).await;
    let reader = h
        .user("reader", "Reader", PermissionValue::combine([flags::READ_ARTICLE]))
        .await;
    h.category(&alice, "tech").await;
    h.article(&alice, "hello", "tech").await;

    let hello = ArticleId::new("hello");
    assert_eq!(
        h.cms.get_article(&reader, &hello, true, true).await.unwrap_err().field(),
        "permission"
    );
    let view = h.cms.get_article(&reader, &hello, false, false).await.unwrap();
    assert!(view.source_text.is_none());
    assert!(view.content.is_none());

    let view = h.cms.get_article(&alice, &hello, true, false).await.unwrap();
    assert_eq!(view.source_text.as_deref(), Some("# hi"));
}

#[tokio::test]
async fn test_edit_article_by_other_author_is_denied() {
    let h = harness();
    let alice = h.user("alice", "Alice", PermissionValue::AUTHOR).await;
    let poster = h
        .user("poster", "Poster", PermissionValue::combine([flags::POST_ARTICLE]))
        .await;
    h.category(&alice, "tech").await;
    h.article(&alice, "hello", "tech").await;
    h.sink.clear();

    let err = h
        .cms
        .edit_article(&poster, &ArticleId::new("hello"), EditArticle {
            title: Some("Mine now".into()),
            ..EditArticle::default()
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ActionError::PermissionDenied { .. }));
    assert_eq!(err.field(), "permission");
    assert_eq!(h.sink.count(EventKind::ArticleEdit), 0);
}

#[tokio::test]
async fn test_edit_article_tracks_changed_fields() {
    let h = harness();
    let alice = h.user("alice", "Alice", PermissionValue::AUTHOR).await;
    h.category(&alice, "tech").await;
    h.category(&alice, "life").await;
    h.article(&alice, "hello", "tech").await;
    h.sink.clear();
    let hello = ArticleId::new("hello");

    let err = h
        .cms
        .edit_article(&alice, &hello, EditArticle {
            text_type: Some("txt".into()),
            ..EditArticle::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::Invalid { field: "text_type", .. }));

    // Empty source is no new source.
    let err = h
        .cms
        .edit_article(&alice, &hello, EditArticle {
            text_type: Some("txt".into()),
            source_text: Some(String::new()),
            ..EditArticle::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::Invalid { field: "text_type", .. }));
    let view = h.cms.get_article(&alice, &hello, true, false).await.unwrap();
    assert_eq!(view.text_type.as_deref(), Some("md"));
    assert_eq!(h.sink.len(), 0);

    h.clock.advance(5_000);
    let view = h
        .cms
        .edit_article(&alice, &hello, EditArticle {
            category: Some(CategoryId::new("life")),
            source_text: Some("## bye".into()),
            is_commentable: Some(false),
            ..EditArticle::default()
        })
        .await
        .unwrap();

    assert_eq!(view.update_time, NOW + 5_000);
    assert!(view.content.unwrap().contains("<h2>bye</h2>"));
    assert!(!view.is_commentable);
    let events = h.sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].description,
        "edit properties category,source_text,content,is_commentable of article(hello)."
    );

    // Absent fields keep their values.
    let view = h
        .cms
        .edit_article(&alice, &hello, EditArticle::default())
        .await
        .unwrap();
    assert!(!view.is_commentable);
    assert_eq!(h.sink.len(), 1);

    // Going private drops the category.
    let view = h
        .cms
        .edit_article(&alice, &hello, EditArticle {
            public: Some(false),
            ..EditArticle::default()
        })
        .await
        .unwrap();
    assert!(view.category.is_none());
    assert!(!view.public);
}

#[tokio::test]
async fn test_render_failure_is_reported_on_source_text() {
    let store = Arc::new(MemoryStore::new());
    let cms = Cms::builder(store)
        .config(CmsConfig::testing())
        .renderer("fail", "Failing", "always fails", |_: &str| -> Result<String, BoxError> {
            Err("unterminated block".into())
        })
        .build()
        .unwrap();
    cms.create_category(&Actor::anonymous(), "tech", "Tech").await.unwrap();

    let err = cms
        .post_article(&Actor::anonymous(), NewArticle {
            id: "broken".into(),
            title: "Broken".into(),
            text_type: "fail".into(),
            source_text: "x".into(),
            category: Some(CategoryId::new("tech")),
            ..NewArticle::default()
        })
        .await
        .unwrap_err();

    assert_eq!(err.field(), "source_text");
    assert!(err.to_string().contains("unterminated block"));
}

#[tokio::test]
async fn test_delete_article_and_types() {
    let h = harness();
    let alice = h.user("alice", "Alice", PermissionValue::AUTHOR).await;
    let bob = h.user("bobby", "Bob", PermissionValue::AUTHOR).await;
    h.category(&alice, "tech").await;
    h.article(&alice, "hello", "tech").await;
    let hello = ArticleId::new("hello");

    assert_eq!(h.cms.delete_article(&bob, &hello).await.unwrap_err().field(), "permission");
    h.cms.delete_article(&alice, &hello).await.unwrap();
    assert_eq!(h.cms.delete_article(&alice, &hello).await.unwrap_err().field(), "id");

    let types = h.cms.article_types(&alice).unwrap();
    assert_eq!(types[0].ext, "md");
    assert!(h.cms.article_types(&Actor::anonymous()).is_err());
}

// ─────────────────────────────────────────────────────────────────────────────
// Comments
// ─────────────────────────────────────────────────────────────────────────────

fn comment(nickname: Option<&str>, content: &str, reply_to: Option<CommentId>) -> NewCommentInput {
    NewCommentInput {
        reply_to,
        nickname: nickname.map(str::to_string),
        content: content.into(),
    }
}

#[tokio::test]
async fn test_comment_review_flow() {
    let h = harness();
    let alice = h.user("alice", "Alice", PermissionValue::AUTHOR).await;
    let bob = h.user("bobby", "Bob", PermissionValue::AUTHOR).await;
    h.category(&alice, "tech").await;
    h.article(&alice, "hello", "tech").await;
    let hello = ArticleId::new("hello");

    assert_eq!(
        h.cms
            .write_comment(&bob, &hello, comment(None, "hi", None))
            .await
            .unwrap_err()
            .field(),
        "nickname"
    );
    assert_eq!(
        h.cms
            .write_comment(&bob, &hello, comment(Some("bob"), "   ", None))
            .await
            .unwrap_err()
            .field(),
        "content"
    );

    let guest = h
        .cms
        .write_comment(&bob, &hello, comment(Some("bob"), "nice post", None))
        .await
        .unwrap();
    assert!(!guest.reviewed);

    let reply = h
        .cms
        .write_comment(&alice, &hello, comment(Some("ignored"), "thanks", Some(guest.comment_id)))
        .await
        .unwrap();
    assert!(reply.reviewed);
    assert_eq!(reply.author, "[Author]Alice");

    // Bob cannot see his own unreviewed comment yet; Alice sees everything.
    let page = h.cms.list_comments(&bob, &hello, 1, 10).await.unwrap();
    assert!(page.comments.is_empty());
    let page = h.cms.list_comments(&alice, &hello, 1, 10).await.unwrap();
    assert_eq!(page.comments.len(), 1);
    assert_eq!(page.comments[0].replies[0].comment_id, reply.comment_id);

    assert_eq!(
        h.cms
            .review_comment(&bob, &hello, guest.comment_id)
            .await
            .unwrap_err()
            .field(),
        "permission"
    );
    h.cms.review_comment(&alice, &hello, guest.comment_id).await.unwrap();

    let page = h.cms.list_comments(&bob, &hello, 1, 10).await.unwrap();
    assert_eq!(page.comments.len(), 1);
    assert_eq!(page.comments[0].size(), 2);
    assert!(h.cms.get_comment(&bob, &hello, reply.comment_id).await.is_ok());

    h.cms.delete_comment(&alice, &hello, guest.comment_id).await.unwrap();
    let err = h.cms.get_comment(&alice, &hello, reply.comment_id).await.unwrap_err();
    assert_eq!(err.field(), "comment_id");

    let kinds = h.sink.kinds();
    assert!(kinds.contains(&EventKind::CommentReview));
    assert!(kinds.contains(&EventKind::CommentDelete));
}

#[tokio::test]
async fn test_comment_paging_and_closed_articles() {
    let h = harness();
    let alice = h.user("alice", "Alice", PermissionValue::AUTHOR).await;
    h.category(&alice, "tech").await;
    h.article(&alice, "hello", "tech").await;
    let hello = ArticleId::new("hello");

    for i in 0..3 {
        h.clock.set(NOW + i);
        h.cms
            .write_comment(&alice, &hello, comment(None, &format!("note {i}"), None))
            .await
            .unwrap();
    }
    let first = h.cms.list_comments(&alice, &hello, 1, 2).await.unwrap();
    assert!(first.is_more);
    assert_eq!(first.comments.len(), 2);
    let second = h.cms.list_comments(&alice, &hello, 2, 2).await.unwrap();
    assert!(!second.is_more);
    assert_eq!(second.comments[0].content, "note 2");

    let err = h
        .cms
        .write_comment(&alice, &hello, comment(None, "x", Some(CommentId(999))))
        .await
        .unwrap_err();
    assert_eq!(err.field(), "comment_id");

    h.cms
        .edit_article(&alice, &hello, EditArticle {
            is_commentable: Some(false),
            ..EditArticle::default()
        })
        .await
        .unwrap();
    let err = h
        .cms
        .write_comment(&alice, &hello, comment(None, "closed?", None))
        .await
        .unwrap_err();
    assert_eq!(err.field(), "article_id");

    let err = h
        .cms
        .list_comments(&alice, &ArticleId::new("gone"), 1, 2)
        .await
        .unwrap_err();
    assert_eq!(err.field(), "article_id");
}

fn tree_depth(view: &CommentView) -> usize {
    let mut deepest = 0;
    let mut work = vec![(view, 0)];
    while let Some((node, depth)) = work.pop() {
        deepest = deepest.max(depth);
        work.extend(node.replies.iter().map(|r| (r, depth + 1)));
    }
    deepest
}

#[tokio::test]
async fn test_deep_reply_chain_lists_without_overflow() {
    const CHAIN: usize = 1_000;
    let h = harness();
    let alice = h.user("alice", "Alice", PermissionValue::AUTHOR).await;
    h.category(&alice, "tech").await;
    h.article(&alice, "hello", "tech").await;
    let hello = ArticleId::new("hello");

    let first = h
        .cms
        .write_comment(&alice, &hello, comment(None, "start", None))
        .await
        .unwrap();
    let mut parent = first.comment_id;
    let mut middle = parent;
    for i in 0..CHAIN {
        parent = h
            .cms
            .write_comment(&alice, &hello, comment(None, &format!("reply {i}"), Some(parent)))
            .await
            .unwrap()
            .comment_id;
        if i == CHAIN / 2 {
            middle = parent;
        }
    }

    let page = h.cms.list_comments(&alice, &hello, 1, 10).await.unwrap();
    assert_eq!(page.comments.len(), 1);
    assert_eq!(page.comments[0].size(), CHAIN + 1);
    assert_eq!(tree_depth(&page.comments[0]), MAX_REPLY_DEPTH);
    assert!(serde_json::to_string(&page).is_ok());

    let below = h.cms.get_comment(&alice, &hello, middle).await.unwrap();
    assert_eq!(below.comment_id, middle);
    assert_eq!(below.size(), CHAIN - CHAIN / 2);
    assert_eq!(tree_depth(&below), MAX_REPLY_DEPTH);
}

// ─────────────────────────────────────────────────────────────────────────────
// Wiring
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_disabled_permission_control_allows_everything() {
    let h = harness_with(false);
    let nobody = Actor::user(UserId::new("nobody"), "Nobody", PermissionValue::EMPTY);

    h.cms.create_category(&nobody, "tech", "Tech").await.unwrap();
    h.cms.edit_category(&nobody, &CategoryId::new("tech"), "Technology").await.unwrap();
    assert!(h.cms.list_users(&Actor::anonymous(), 1, 10).await.is_ok());
}

#[tokio::test]
async fn test_duplicate_renderer_fails_build() {
    let result = Cms::builder(Arc::new(MemoryStore::new()))
        .config(CmsConfig::testing())
        .renderer("md", "Again", "duplicate", |s: &str| -> Result<String, BoxError> {
            Ok(s.to_string())
        })
        .build();
    assert!(matches!(result, Err(CmsError::Config(_))));
}

#[tokio::test]
async fn test_queued_events_reach_store_after_shutdown() {
    let store = Arc::new(MemoryStore::new());
    let mut config = CmsConfig::testing();
    config.event_queue_capacity = 8;
    let cms = Cms::builder(store.clone()).config(config).build().unwrap();

    cms.create_category(&Actor::anonymous(), "tech", "Tech").await.unwrap();
    cms.shutdown().await;

    let events = store.list_events(0, 10).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, "Category: Create");
}

#[tokio::test]
async fn test_respond_shapes_results() {
    let h = harness();
    let alice = h.user("alice", "Alice", PermissionValue::AUTHOR).await;

    let result = h.cms.create_category(&alice, "tech", "Tech").await;
    let response = h.cms.respond_keyed(&alice, "category", result).await;
    let json = response.to_json();
    assert!(json["$errors"].is_null());
    assert_eq!(json["category"]["name"], "Tech");
    assert_eq!(json["category"]["article_count"], 0);

    let result = h.cms.create_category(&alice, "tech", "Tech").await;
    let response = h.cms.respond(&alice, result).await;
    assert!(response.error("id").is_some());
}
