//! Proptest generators for property-based testing.

use proptest::prelude::*;

use cage::{NewUser, NewCommentInput};
use cage_core::{flags, Flag, PermissionValue};

/// Any standard flag.
pub fn flag() -> impl Strategy<Value = Flag> {
    prop::sample::select(flags::STANDARD.to_vec())
}

/// Any subset of the standard flags.
pub fn flag_set() -> impl Strategy<Value = Vec<Flag>> {
    prop::sample::subsequence(flags::STANDARD.to_vec(), 0..=flags::STANDARD.len())
}

/// A permission value built from standard flags only.
pub fn permission_value() -> impl Strategy<Value = PermissionValue> {
    flag_set().prop_map(PermissionValue::combine)
}

/// Any bit pattern a permission column could hold.
pub fn raw_permission() -> impl Strategy<Value = PermissionValue> {
    any::<i64>().prop_map(PermissionValue::from_bits)
}

/// Flag names as a client sends them, mixed with names no table defines.
pub fn flag_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop_oneof![
            3 => flag().prop_map(|f| f.name().to_string()),
            1 => "[A-Z_]{3,12}".prop_map(String::from),
        ],
        0..8,
    )
}

/// A user id the default rules accept.
pub fn user_id() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{4,15}".prop_map(String::from)
}

/// A display name the default rules accept.
pub fn user_name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z ]{0,10}[a-z]".prop_map(String::from)
}

/// A password the default rules accept.
pub fn password() -> impl Strategy<Value = String> {
    "[!-~]{10,32}".prop_map(String::from)
}

/// A password the default rules reject.
pub fn weak_password() -> impl Strategy<Value = String> {
    prop_oneof![
        "[!-~]{0,9}".prop_map(String::from),
        "[!-~]{33,40}".prop_map(String::from),
        "[a-z]{5} [a-z]{5}".prop_map(String::from),
    ]
}

/// A category or article id.
pub fn slug() -> impl Strategy<Value = String> {
    "[a-z0-9][-a-z0-9]{0,23}".prop_map(String::from)
}

/// A client timestamp within two days of `now`, straddling the default
/// login window on both sides.
pub fn timestamp_near(now: i64) -> impl Strategy<Value = i64> {
    const TWO_DAYS: i64 = 2 * 86_400_000;
    (now - TWO_DAYS)..=(now + TWO_DAYS)
}

/// Comment text, sometimes blank.
pub fn comment_content() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[a-zA-Z0-9 .,!?]{1,120}".prop_map(String::from),
        1 => "[ \t\n]{0,4}".prop_map(String::from),
    ]
}

/// Parameters for a valid new account.
#[derive(Debug, Clone)]
pub struct UserParams {
    pub id: String,
    pub name: String,
    pub password: String,
    pub permission: Vec<String>,
}

impl UserParams {
    pub fn new_user(&self) -> NewUser {
        NewUser {
            id: self.id.clone(),
            name: self.name.clone(),
            password: self.password.clone(),
            permission: self.permission.clone(),
            expired: false,
        }
    }
}

impl Arbitrary for UserParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (user_id(), user_name(), password(), flag_names())
            .prop_map(|(id, name, password, permission)| UserParams {
                id,
                name,
                password,
                permission,
            })
            .boxed()
    }
}

/// A top-level comment under `nickname`.
pub fn comment_input(nickname: &'static str) -> impl Strategy<Value = NewCommentInput> {
    comment_content().prop_map(move |content| NewCommentInput {
        reply_to: None,
        nickname: Some(nickname.to_string()),
        content,
    })
}
