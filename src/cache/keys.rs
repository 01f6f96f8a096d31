//! Cache keyspace.
//!
//! # Grammar
//! ```text
//! <prefix>:<part>[:<part>...]
//!
//! user:{user_id}                              profile
//! user:{user_id}:session:{session_id}         auth artifact
//! entry:{user_id}:{entry_id}                  single nutrition entry
//! workout:{user_id}:{workout_id}              single workout
//! list:{entries|workouts}:{user_id}[:{date}]  lists
//! paginated:{entries|workouts}:{user_id}:{page}:{limit}
//! stats:{daily|weekly|monthly|yearly}:{user_id}[:{date}]  aggregates
//! ```
//!
//! Invalidation patterns are globs over this grammar. Id parts are escaped so
//! glob metacharacters in ids match literally. Glob `*` also matches `:`, so
//! every slot before the user id is spelled out; a wildcard there could line
//! another user's id up with a later part of their key.

use std::fmt;

use glob::Pattern;

/// Recognized key prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPrefix {
    User,
    Entry,
    Workout,
    List,
    Stats,
    Paginated,
}

impl KeyPrefix {
    pub const ALL: [KeyPrefix; 6] = [
        KeyPrefix::User,
        KeyPrefix::Entry,
        KeyPrefix::Workout,
        KeyPrefix::List,
        KeyPrefix::Stats,
        KeyPrefix::Paginated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyPrefix::User => "user",
            KeyPrefix::Entry => "entry",
            KeyPrefix::Workout => "workout",
            KeyPrefix::List => "list",
            KeyPrefix::Stats => "stats",
            KeyPrefix::Paginated => "paginated",
        }
    }

    /// Prefix of an existing key, if it is one of ours.
    pub fn of_key(key: &str) -> Option<KeyPrefix> {
        let head = key.split(':').next()?;
        Self::ALL.into_iter().find(|p| p.as_str() == head)
    }
}

impl fmt::Display for KeyPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collection kinds that have list and paginated views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    Entries,
    Workouts,
}

impl ListKind {
    pub const ALL: [ListKind; 2] = [ListKind::Entries, ListKind::Workouts];

    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::Entries => "entries",
            ListKind::Workouts => "workouts",
        }
    }
}

/// Aggregation windows for `stats` keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatsPeriod {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl StatsPeriod {
    pub const ALL: [StatsPeriod; 4] = [
        StatsPeriod::Daily,
        StatsPeriod::Weekly,
        StatsPeriod::Monthly,
        StatsPeriod::Yearly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatsPeriod::Daily => "daily",
            StatsPeriod::Weekly => "weekly",
            StatsPeriod::Monthly => "monthly",
            StatsPeriod::Yearly => "yearly",
        }
    }
}

/// Join `prefix` and every present part with `:`.
pub fn build_key<'a, I>(prefix: KeyPrefix, parts: I) -> String
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut key = String::from(prefix.as_str());
    for part in parts.into_iter().flatten() {
        key.push(':');
        key.push_str(part);
    }
    key
}

pub fn user(user_id: &str) -> String {
    build_key(KeyPrefix::User, [Some(user_id)])
}

pub fn user_session(user_id: &str, session_id: &str) -> String {
    build_key(KeyPrefix::User, [Some(user_id), Some("session"), Some(session_id)])
}

pub fn entry(user_id: &str, entry_id: &str) -> String {
    build_key(KeyPrefix::Entry, [Some(user_id), Some(entry_id)])
}

pub fn workout(user_id: &str, workout_id: &str) -> String {
    build_key(KeyPrefix::Workout, [Some(user_id), Some(workout_id)])
}

pub fn list(kind: ListKind, user_id: &str, date: Option<&str>) -> String {
    build_key(KeyPrefix::List, [Some(kind.as_str()), Some(user_id), date])
}

pub fn paginated(kind: ListKind, user_id: &str, page: u32, limit: u32) -> String {
    let page = page.to_string();
    let limit = limit.to_string();
    build_key(
        KeyPrefix::Paginated,
        [Some(kind.as_str()), Some(user_id), Some(page.as_str()), Some(limit.as_str())],
    )
}

pub fn stats(period: StatsPeriod, user_id: &str, date: Option<&str>) -> String {
    build_key(KeyPrefix::Stats, [Some(period.as_str()), Some(user_id), date])
}

/// Patterns covering everything cached for a user.
pub fn user_patterns(user_id: &str) -> Vec<String> {
    let uid = Pattern::escape(user_id);
    let mut patterns = vec![
        format!("user:{uid}"),
        format!("user:{uid}:*"),
        format!("entry:{uid}:*"),
        format!("workout:{uid}:*"),
    ];
    for kind in ListKind::ALL {
        patterns.extend(view_patterns(kind, &uid));
    }
    patterns.extend(stats_patterns(&uid));
    patterns
}

/// Patterns touched by a nutrition entry write.
pub fn entry_patterns(user_id: &str, entry_id: Option<&str>) -> Vec<String> {
    collection_patterns(KeyPrefix::Entry, ListKind::Entries, user_id, entry_id)
}

/// Patterns touched by a workout write.
pub fn workout_patterns(user_id: &str, workout_id: Option<&str>) -> Vec<String> {
    collection_patterns(KeyPrefix::Workout, ListKind::Workouts, user_id, workout_id)
}

fn collection_patterns(
    prefix: KeyPrefix,
    kind: ListKind,
    user_id: &str,
    resource_id: Option<&str>,
) -> Vec<String> {
    let uid = Pattern::escape(user_id);
    let resource = match resource_id {
        Some(id) => format!("{prefix}:{uid}:{}", Pattern::escape(id)),
        None => format!("{prefix}:{uid}:*"),
    };

    // Aggregates mix entries and workouts, so both kinds drop every stats key.
    let mut patterns = vec![resource];
    patterns.extend(view_patterns(kind, &uid));
    patterns.extend(stats_patterns(&uid));
    patterns
}

/// List and paginated views of one kind. `uid` must already be escaped.
fn view_patterns(kind: ListKind, uid: &str) -> [String; 3] {
    let kind = kind.as_str();
    [
        format!("list:{kind}:{uid}"),
        format!("list:{kind}:{uid}:*"),
        format!("paginated:{kind}:{uid}:*"),
    ]
}

/// Every stats window for one user. `uid` must already be escaped.
fn stats_patterns(uid: &str) -> Vec<String> {
    StatsPeriod::ALL
        .into_iter()
        .flat_map(|period| {
            let period = period.as_str();
            [format!("stats:{period}:{uid}"), format!("stats:{period}:{uid}:*")]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, key: &str) -> bool {
        Pattern::new(pattern).unwrap().matches(key)
    }

    #[test]
    fn test_build_key_skips_missing_parts() {
        assert_eq!(build_key(KeyPrefix::Stats, [Some("daily"), Some("u1"), Some("2024-01-20")]), "stats:daily:u1:2024-01-20");
        assert_eq!(build_key(KeyPrefix::List, [Some("entries"), None, Some("u1")]), "list:entries:u1");
        assert_eq!(build_key(KeyPrefix::User, [None]), "user");
    }

    #[test]
    fn test_key_helpers() {
        assert_eq!(user("u1"), "user:u1");
        assert_eq!(user_session("u1", "s9"), "user:u1:session:s9");
        assert_eq!(entry("u1", "e1"), "entry:u1:e1");
        assert_eq!(workout("u1", "w1"), "workout:u1:w1");
        assert_eq!(list(ListKind::Entries, "u1", Some("2024-01-20")), "list:entries:u1:2024-01-20");
        assert_eq!(list(ListKind::Workouts, "u1", None), "list:workouts:u1");
        assert_eq!(paginated(ListKind::Entries, "u1", 2, 20), "paginated:entries:u1:2:20");
        assert_eq!(stats(StatsPeriod::Daily, "u1", Some("2024-01-20")), "stats:daily:u1:2024-01-20");
    }

    #[test]
    fn test_prefix_of_key() {
        assert_eq!(KeyPrefix::of_key("paginated:entries:u1:1:10"), Some(KeyPrefix::Paginated));
        assert_eq!(KeyPrefix::of_key("user:u1"), Some(KeyPrefix::User));
        assert_eq!(KeyPrefix::of_key("session:u1"), None);
    }

    #[test]
    fn test_entry_patterns_are_scoped() {
        let patterns = entry_patterns("u1", Some("e1"));
        let hits = |key: &str| patterns.iter().any(|p| matches(p, key));

        assert!(hits(&entry("u1", "e1")));
        assert!(hits(&list(ListKind::Entries, "u1", Some("2024-01-20"))));
        assert!(hits(&list(ListKind::Entries, "u1", None)));
        assert!(hits(&paginated(ListKind::Entries, "u1", 1, 10)));
        assert!(hits(&stats(StatsPeriod::Daily, "u1", Some("2024-01-20"))));
        assert!(hits(&stats(StatsPeriod::Weekly, "u1", None)));

        assert!(!hits(&entry("u1", "e2")));
        assert!(!hits(&entry("u2", "e1")));
        assert!(!hits(&list(ListKind::Workouts, "u1", None)));
        assert!(!hits(&stats(StatsPeriod::Daily, "u10", Some("2024-01-20"))));
        assert!(!hits(&user("u1")));
    }

    #[test]
    fn test_workout_patterns_without_id_cover_all_workouts() {
        let patterns = workout_patterns("u1", None);
        let hits = |key: &str| patterns.iter().any(|p| matches(p, key));

        assert!(hits(&workout("u1", "w1")));
        assert!(hits(&workout("u1", "w2")));
        assert!(!hits(&workout("u2", "w1")));
        assert!(!hits(&entry("u1", "e1")));
    }

    #[test]
    fn test_user_patterns_cover_every_prefix() {
        let patterns = user_patterns("u1");
        let hits = |key: &str| patterns.iter().any(|p| matches(p, key));

        assert!(hits(&user("u1")));
        assert!(hits(&user_session("u1", "s1")));
        assert!(hits(&entry("u1", "e1")));
        assert!(hits(&workout("u1", "w1")));
        assert!(hits(&list(ListKind::Workouts, "u1", Some("2024-01-20"))));
        assert!(hits(&paginated(ListKind::Workouts, "u1", 3, 50)));
        assert!(hits(&stats(StatsPeriod::Monthly, "u1", None)));
        assert!(!hits(&user("u2")));
    }

    #[test]
    fn test_numeric_ids_stay_within_owner() {
        let user_one = user_patterns("1");
        let entries_one = entry_patterns("1", None);
        let workouts_one = workout_patterns("1", Some("1"));
        let hits = |patterns: &[String], key: &str| patterns.iter().any(|p| matches(p, key));

        let foreign = [
            paginated(ListKind::Entries, "7", 1, 20),
            paginated(ListKind::Workouts, "7", 2, 1),
            list(ListKind::Entries, "7", Some("1")),
            stats(StatsPeriod::Daily, "7", Some("1")),
            stats(StatsPeriod::Weekly, "7", Some("1:1")),
            user_session("7", "1"),
            entry("7", "1"),
        ];
        for key in &foreign {
            assert!(!hits(&user_one, key), "user 1 patterns matched {key}");
            assert!(!hits(&entries_one, key), "entry patterns matched {key}");
            assert!(!hits(&workouts_one, key), "workout patterns matched {key}");
        }

        assert!(hits(&user_one, &paginated(ListKind::Entries, "1", 7, 20)));
        assert!(hits(&user_one, &stats(StatsPeriod::Yearly, "1", Some("2024"))));
        assert!(hits(&entries_one, &list(ListKind::Entries, "1", None)));
        assert!(hits(&workouts_one, &workout("1", "1")));
    }

    #[test]
    fn test_ids_are_escaped() {
        let patterns = entry_patterns("u*", Some("e?"));
        assert!(matches(&patterns[0], "entry:u*:e?"));
        assert!(!matches(&patterns[0], "entry:u1:e1"));
    }
}
