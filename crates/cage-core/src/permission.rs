//! Permission flags and bitmask values.
//!
//! A [`Flag`] is a named bit with a description. Flags are plain constants;
//! the [`PermissionTable`] is the registry built at startup that guarantees
//! no two flags share a bit, keeps their definition order for decoding, and
//! groups them for presentation.
//!
//! Groups carry no authorization meaning. Only bits do.

use std::collections::HashMap;
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, BitXor};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Highest bit a flag may occupy. Bit 63 is reserved.
pub const MAX_BIT: u8 = 62;

/// A single named permission bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Flag {
    name: &'static str,
    #[serde(skip)]
    bit: u8,
    description: &'static str,
}

impl Flag {
    /// Declare a flag. It only becomes part of a table via
    /// [`PermissionTable::define_flag`], which enforces bit uniqueness.
    pub const fn new(name: &'static str, bit: u8, description: &'static str) -> Self {
        Self {
            name,
            bit,
            description,
        }
    }

    /// The flag's name as exchanged with clients.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The bit position.
    pub const fn bit(&self) -> u8 {
        self.bit
    }

    /// Human description.
    pub const fn description(&self) -> &'static str {
        self.description
    }

    /// The flag as a raw mask. Zero for bits outside the 64-bit range.
    pub const fn mask(&self) -> i64 {
        match 1i64.checked_shl(self.bit as u32) {
            Some(mask) => mask,
            None => 0,
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// The standard flag set.
pub mod flags {
    use super::Flag;

    pub const CONFIGURE_SYSTEM: Flag =
        Flag::new("CONFIGURE_SYSTEM", 1, "Change system-wide settings");

    pub const READ_USER: Flag = Flag::new("READ_USER", 4, "View user accounts");
    pub const CREATE_USER: Flag = Flag::new("CREATE_USER", 5, "Create user accounts");
    pub const MODIFY_USER: Flag = Flag::new("MODIFY_USER", 6, "Modify your own account");
    pub const MODIFY_OTHER_USER: Flag =
        Flag::new("MODIFY_OTHER_USER", 7, "Modify other users' accounts");
    pub const DELETE_USER: Flag = Flag::new("DELETE_USER", 8, "Delete user accounts");

    pub const READ_ARTICLE: Flag = Flag::new("READ_ARTICLE", 9, "Read articles");
    pub const POST_ARTICLE: Flag = Flag::new("POST_ARTICLE", 10, "Post new articles");
    pub const EDIT_ARTICLE: Flag = Flag::new("EDIT_ARTICLE", 11, "Edit or delete your own articles");
    pub const EDIT_OTHERS_ARTICLE: Flag = Flag::new(
        "EDIT_OTHERS_ARTICLE",
        12,
        "Edit or delete articles posted by other authors",
    );

    pub const READ_CATEGORY: Flag = Flag::new("READ_CATEGORY", 13, "List categories");
    pub const CREATE_CATEGORY: Flag = Flag::new("CREATE_CATEGORY", 14, "Create categories");
    pub const EDIT_CATEGORY: Flag =
        Flag::new("EDIT_CATEGORY", 15, "Rename or delete your own categories");
    pub const EDIT_OTHERS_CATEGORY: Flag = Flag::new(
        "EDIT_OTHERS_CATEGORY",
        16,
        "Rename or delete categories created by others",
    );

    pub const READ_COMMENT: Flag = Flag::new("READ_COMMENT", 17, "Read comments");
    pub const WRITE_COMMENT: Flag = Flag::new("WRITE_COMMENT", 18, "Write comments");
    pub const REVIEW_COMMENT: Flag = Flag::new(
        "REVIEW_COMMENT",
        19,
        "Review or delete comments on your own articles",
    );
    pub const REVIEW_OTHERS_COMMENT: Flag = Flag::new(
        "REVIEW_OTHERS_COMMENT",
        20,
        "Review or delete comments on other authors' articles",
    );

    /// Every standard flag, in definition order.
    pub const STANDARD: [Flag; 18] = [
        CONFIGURE_SYSTEM,
        READ_USER,
        CREATE_USER,
        MODIFY_USER,
        MODIFY_OTHER_USER,
        DELETE_USER,
        READ_ARTICLE,
        POST_ARTICLE,
        EDIT_ARTICLE,
        EDIT_OTHERS_ARTICLE,
        READ_CATEGORY,
        CREATE_CATEGORY,
        EDIT_CATEGORY,
        EDIT_OTHERS_CATEGORY,
        READ_COMMENT,
        WRITE_COMMENT,
        REVIEW_COMMENT,
        REVIEW_OTHERS_COMMENT,
    ];
}

/// A permission bitmask as held by a user.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionValue(i64);

impl PermissionValue {
    /// No permissions.
    pub const EMPTY: Self = Self(0);

    /// Every bit from 0 to 62, covering any flag that can ever be defined.
    pub const SUPERUSER: Self = Self(i64::MAX);

    /// The curated default role for authors.
    pub const AUTHOR: Self = Self(
        flags::READ_ARTICLE.mask()
            | flags::POST_ARTICLE.mask()
            | flags::EDIT_ARTICLE.mask()
            | flags::READ_CATEGORY.mask()
            | flags::CREATE_CATEGORY.mask()
            | flags::EDIT_CATEGORY.mask()
            | flags::READ_COMMENT.mask()
            | flags::WRITE_COMMENT.mask()
            | flags::REVIEW_COMMENT.mask(),
    );

    /// Wrap raw bits, e.g. as read from storage.
    pub const fn from_bits(bits: i64) -> Self {
        Self(bits)
    }

    /// The raw bits.
    pub const fn bits(self) -> i64 {
        self.0
    }

    /// Bitwise AND test against a single flag.
    pub const fn contains(self, flag: Flag) -> bool {
        self.0 & flag.mask() != 0
    }

    /// True when no bit is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Add a flag.
    pub const fn with(self, flag: Flag) -> Self {
        Self(self.0 | flag.mask())
    }

    /// Remove a flag.
    pub const fn without(self, flag: Flag) -> Self {
        Self(self.0 & !flag.mask())
    }

    /// OR together any number of flags.
    pub fn combine<I: IntoIterator<Item = Flag>>(flags: I) -> Self {
        flags.into_iter().fold(Self::EMPTY, |acc, flag| acc.with(flag))
    }
}

impl fmt::Debug for PermissionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PermissionValue({:#x})", self.0)
    }
}

impl From<Flag> for PermissionValue {
    fn from(flag: Flag) -> Self {
        Self(flag.mask())
    }
}

impl FromIterator<Flag> for PermissionValue {
    fn from_iter<I: IntoIterator<Item = Flag>>(iter: I) -> Self {
        Self::combine(iter)
    }
}

impl BitOr for PermissionValue {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOr<Flag> for PermissionValue {
    type Output = Self;

    fn bitor(self, rhs: Flag) -> Self {
        self.with(rhs)
    }
}

impl BitOr for Flag {
    type Output = PermissionValue;

    fn bitor(self, rhs: Flag) -> PermissionValue {
        PermissionValue::from(self).with(rhs)
    }
}

impl BitOrAssign<Flag> for PermissionValue {
    fn bitor_assign(&mut self, rhs: Flag) {
        *self = self.with(rhs);
    }
}

impl BitAnd<Flag> for PermissionValue {
    type Output = Self;

    fn bitand(self, rhs: Flag) -> Self {
        Self(self.0 & rhs.mask())
    }
}

impl BitXor<Flag> for PermissionValue {
    type Output = Self;

    fn bitxor(self, rhs: Flag) -> Self {
        Self(self.0 ^ rhs.mask())
    }
}

/// A named, ordered collection of flags used for listing only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionGroup {
    name: String,
    flags: Vec<Flag>,
}

impl PermissionGroup {
    /// Group name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Flags in the order they were grouped.
    pub fn flags(&self) -> &[Flag] {
        &self.flags
    }
}

/// The flag registry.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct PermissionTable {
    /// Flags in definition order.
    flags: Vec<Flag>,

    /// Index: name (or alias) -> position in `flags`.
    by_name: HashMap<&'static str, usize>,

    /// Index: bit -> position in `flags`.
    by_bit: HashMap<u8, usize>,

    groups: Vec<PermissionGroup>,
}

impl PermissionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard table: every flag in [`flags::STANDARD`], the legacy
    /// `REIVEW_OTHERS_COMMENT` spelling as an alias, and the five groups.
    pub fn standard() -> Result<Self> {
        use flags::*;

        let mut table = Self::new();
        for flag in STANDARD {
            table.define_flag(flag)?;
        }
        table.alias("REIVEW_OTHERS_COMMENT", REVIEW_OTHERS_COMMENT)?;

        table.group("System Configuration", &[CONFIGURE_SYSTEM])?;
        table.group(
            "User Operation",
            &[READ_USER, CREATE_USER, MODIFY_USER, MODIFY_OTHER_USER, DELETE_USER],
        )?;
        table.group(
            "Article Operation",
            &[READ_ARTICLE, POST_ARTICLE, EDIT_ARTICLE, EDIT_OTHERS_ARTICLE],
        )?;
        table.group(
            "Category Operation",
            &[READ_CATEGORY, CREATE_CATEGORY, EDIT_CATEGORY, EDIT_OTHERS_CATEGORY],
        )?;
        table.group(
            "Comment Operation",
            &[READ_COMMENT, WRITE_COMMENT, REVIEW_COMMENT, REVIEW_OTHERS_COMMENT],
        )?;

        Ok(table)
    }

    /// Define a new flag at a fixed bit.
    pub fn define(
        &mut self,
        name: &'static str,
        bit: u8,
        description: &'static str,
    ) -> Result<Flag> {
        self.define_flag(Flag::new(name, bit, description))
    }

    /// Register a declared flag.
    ///
    /// Fails if the bit is out of range, the bit is taken, or the name is taken.
    pub fn define_flag(&mut self, flag: Flag) -> Result<Flag> {
        if flag.bit > MAX_BIT {
            return Err(ConfigError::BitOutOfRange { bit: flag.bit });
        }

        if let Some(&existing) = self.by_bit.get(&flag.bit) {
            return Err(ConfigError::DuplicateBit {
                bit: flag.bit,
                existing: self.flags[existing].name,
            });
        }

        if self.by_name.contains_key(flag.name) {
            return Err(ConfigError::DuplicateFlag(flag.name.to_string()));
        }

        let index = self.flags.len();
        self.flags.push(flag);
        self.by_name.insert(flag.name, index);
        self.by_bit.insert(flag.bit, index);

        Ok(flag)
    }

    /// Accept another name for an already defined flag when parsing.
    pub fn alias(&mut self, alias: &'static str, flag: Flag) -> Result<()> {
        let index = self.index_of(flag)?;
        if self.by_name.contains_key(alias) {
            return Err(ConfigError::DuplicateFlag(alias.to_string()));
        }
        self.by_name.insert(alias, index);
        Ok(())
    }

    /// Group defined flags under a name. Re-using a name replaces the group.
    pub fn group(&mut self, name: impl Into<String>, flags: &[Flag]) -> Result<()> {
        for flag in flags {
            self.index_of(*flag)?;
        }

        let name = name.into();
        match self.groups.iter_mut().find(|g| g.name == name) {
            Some(group) => group.flags = flags.to_vec(),
            None => self.groups.push(PermissionGroup {
                name,
                flags: flags.to_vec(),
            }),
        }
        Ok(())
    }

    fn index_of(&self, flag: Flag) -> Result<usize> {
        self.by_bit
            .get(&flag.bit)
            .copied()
            .filter(|&index| self.flags[index] == flag)
            .ok_or_else(|| ConfigError::UnknownFlag(flag.name.to_string()))
    }

    /// All defined flags in definition order.
    pub fn flags(&self) -> &[Flag] {
        &self.flags
    }

    /// All groups in registration order.
    pub fn groups(&self) -> &[PermissionGroup] {
        &self.groups
    }

    /// Find a flag by name or alias.
    pub fn lookup(&self, name: &str) -> Option<Flag> {
        self.by_name.get(name).map(|&index| self.flags[index])
    }

    /// Combine flag names from untrusted input. Unknown names are ignored.
    pub fn parse<I, S>(&self, names: I) -> PermissionValue
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .filter_map(|name| self.lookup(name.as_ref()))
            .collect()
    }

    /// Every defined flag set in `value`, in definition order.
    pub fn decode(&self, value: PermissionValue) -> Vec<Flag> {
        self.flags
            .iter()
            .copied()
            .filter(|flag| value.contains(*flag))
            .collect()
    }

    /// Names of every defined flag set in `value`, in definition order.
    pub fn names(&self, value: PermissionValue) -> Vec<&'static str> {
        self.decode(value).into_iter().map(|flag| flag.name).collect()
    }

    /// Bitwise AND test.
    pub fn test(value: PermissionValue, flag: Flag) -> bool {
        value.contains(flag)
    }

    /// The OR of exactly the defined flags.
    pub fn defined_mask(&self) -> PermissionValue {
        self.flags.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::flags::*;
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_standard_table_bits_match_legacy_layout() {
        let table = PermissionTable::standard().unwrap();
        assert_eq!(table.flags().len(), 18);
        assert_eq!(table.lookup("CONFIGURE_SYSTEM").unwrap().bit(), 1);
        assert_eq!(table.lookup("DELETE_USER").unwrap().bit(), 8);
        assert_eq!(table.lookup("READ_ARTICLE").unwrap().bit(), 9);
        assert_eq!(table.lookup("EDIT_OTHERS_CATEGORY").unwrap().bit(), 16);
        assert_eq!(table.lookup("REVIEW_OTHERS_COMMENT").unwrap().bit(), 20);
    }

    #[test]
    fn test_define_rejects_reused_bit() {
        let mut table = PermissionTable::new();
        table.define("A", 3, "first").unwrap();

        let err = table.define("B", 3, "second").unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateBit { bit: 3, existing: "A" }));
    }

    #[test]
    fn test_define_rejects_reused_name_and_reserved_bit() {
        let mut table = PermissionTable::new();
        table.define("A", 3, "first").unwrap();

        assert!(matches!(
            table.define("A", 4, "again"),
            Err(ConfigError::DuplicateFlag(_))
        ));
        assert!(matches!(
            table.define("TOP", 63, "reserved"),
            Err(ConfigError::BitOutOfRange { bit: 63 })
        ));
    }

    #[test]
    fn test_group_requires_defined_flags() {
        let mut table = PermissionTable::new();
        let a = table.define("A", 0, "").unwrap();
        table.group("Letters", &[a]).unwrap();

        let stranger = Flag::new("Z", 9, "");
        assert!(matches!(
            table.group("Others", &[stranger]),
            Err(ConfigError::UnknownFlag(_))
        ));
        assert_eq!(table.groups().len(), 1);
    }

    #[test]
    fn test_groups_do_not_affect_tests() {
        let table = PermissionTable::standard().unwrap();
        let value = PermissionValue::from(READ_USER);
        let user_group = &table.groups()[1];
        assert_eq!(user_group.name(), "User Operation");
        assert!(!PermissionTable::test(value, CREATE_USER));
        assert!(user_group.flags().contains(&CREATE_USER));
    }

    #[test]
    fn test_parse_ignores_unknown_names() {
        let table = PermissionTable::standard().unwrap();
        let value = table.parse(["READ_ARTICLE", "FLY_TO_MOON", "POST_ARTICLE"]);
        assert_eq!(value, READ_ARTICLE | POST_ARTICLE);
        assert_eq!(table.parse(Vec::<String>::new()), PermissionValue::EMPTY);
    }

    #[test]
    fn test_parse_accepts_legacy_spelling() {
        let table = PermissionTable::standard().unwrap();
        let value = table.parse(["REIVEW_OTHERS_COMMENT"]);
        assert!(value.contains(REVIEW_OTHERS_COMMENT));
        assert_eq!(table.names(value), vec!["REVIEW_OTHERS_COMMENT"]);
    }

    #[test]
    fn test_decode_uses_definition_order() {
        let table = PermissionTable::standard().unwrap();
        let value = PermissionValue::combine([WRITE_COMMENT, READ_USER, POST_ARTICLE]);
        assert_eq!(
            table.names(value),
            vec!["READ_USER", "POST_ARTICLE", "WRITE_COMMENT"]
        );
    }

    #[test]
    #[allow(arithmetic_overflow)]
    fn test_superuser_covers_every_flag() {
        let table = PermissionTable::standard().unwrap();
        for flag in table.flags() {
            assert!(PermissionValue::SUPERUSER.contains(*flag), "{}", flag);
        }
        assert_eq!(PermissionValue::SUPERUSER.bits(), (1i64 << 63) - 1);
        assert!(PermissionValue::SUPERUSER.bits() > 0);
    }

    #[test]
    fn test_author_preset() {
        let table = PermissionTable::standard().unwrap();
        assert_eq!(
            table.names(PermissionValue::AUTHOR),
            vec![
                "READ_ARTICLE",
                "POST_ARTICLE",
                "EDIT_ARTICLE",
                "READ_CATEGORY",
                "CREATE_CATEGORY",
                "EDIT_CATEGORY",
                "READ_COMMENT",
                "WRITE_COMMENT",
                "REVIEW_COMMENT",
            ]
        );
        assert!(!PermissionValue::AUTHOR.contains(EDIT_OTHERS_ARTICLE));
    }

    #[test]
    fn test_operators() {
        let mut value = READ_USER | CREATE_USER;
        value |= DELETE_USER;
        assert!(value.contains(DELETE_USER));
        assert_eq!((value & CREATE_USER).bits(), CREATE_USER.mask());
        assert!(!(value ^ CREATE_USER).contains(CREATE_USER));
        assert!(!value.without(READ_USER).contains(READ_USER));
    }

    #[test]
    fn test_defined_mask_is_exact() {
        let table = PermissionTable::standard().unwrap();
        let mask = table.defined_mask();
        assert_eq!(table.decode(mask).len(), 18);
        assert!(!mask.contains(Flag::new("UNUSED", 0, "")));
    }

    fn any_flags() -> impl Strategy<Value = Vec<Flag>> {
        prop::collection::vec(prop::sample::select(STANDARD.to_vec()), 0..32)
    }

    proptest! {
        #[test]
        fn prop_single_flag_combines_and_tests(flag in prop::sample::select(STANDARD.to_vec())) {
            prop_assert!(PermissionTable::test(PermissionValue::combine([flag]), flag));
            prop_assert!(!PermissionTable::test(PermissionValue::combine([]), flag));
        }

        #[test]
        fn prop_decode_inverts_combine(fs in any_flags()) {
            let table = PermissionTable::standard().unwrap();
            let decoded = table.decode(PermissionValue::combine(fs.clone()));

            let expected: Vec<Flag> = STANDARD
                .iter()
                .copied()
                .filter(|flag| fs.contains(flag))
                .collect();
            prop_assert_eq!(decoded, expected);
        }

        #[test]
        fn prop_parse_matches_combine(fs in any_flags()) {
            let table = PermissionTable::standard().unwrap();
            let names: Vec<&str> = fs.iter().map(|flag| flag.name()).collect();
            prop_assert_eq!(table.parse(names), PermissionValue::combine(fs));
        }
    }
}
