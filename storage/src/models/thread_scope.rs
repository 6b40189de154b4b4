//! Thread scope: the sub-thread half of a partition key.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which sub-thread of a chat a message belongs to.
///
/// `Root` is a partition of its own. It never matches messages posted in a
/// topic, and a `Topic` never matches root messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<i64>", into = "Option<i64>")]
pub enum ThreadScope {
    /// The chat's main context (no thread id).
    #[default]
    Root,
    /// A forum topic or reply thread.
    Topic(i64),
}

impl ThreadScope {
    /// Column value for `thread_id`; `None` for the root context.
    pub fn thread_id(self) -> Option<i64> {
        match self {
            ThreadScope::Root => None,
            ThreadScope::Topic(id) => Some(id),
        }
    }

    pub fn is_root(self) -> bool {
        matches!(self, ThreadScope::Root)
    }
}

impl From<Option<i64>> for ThreadScope {
    fn from(thread_id: Option<i64>) -> Self {
        match thread_id {
            Some(id) => ThreadScope::Topic(id),
            None => ThreadScope::Root,
        }
    }
}

impl From<ThreadScope> for Option<i64> {
    fn from(scope: ThreadScope) -> Self {
        scope.thread_id()
    }
}

impl fmt::Display for ThreadScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadScope::Root => write!(f, "root"),
            ThreadScope::Topic(id) => write!(f, "topic:{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_scope_from_option() {
        assert_eq!(ThreadScope::from(None), ThreadScope::Root);
        assert_eq!(ThreadScope::from(Some(10)), ThreadScope::Topic(10));
        assert_eq!(ThreadScope::Topic(10).thread_id(), Some(10));
        assert_eq!(ThreadScope::Root.thread_id(), None);
    }

    #[test]
    fn test_thread_scope_display() {
        assert_eq!(ThreadScope::Root.to_string(), "root");
        assert_eq!(ThreadScope::Topic(-3).to_string(), "topic:-3");
    }

    #[test]
    fn test_thread_scope_serde_as_nullable_id() {
        assert_eq!(serde_json::to_string(&ThreadScope::Topic(7)).unwrap(), "7");
        assert_eq!(serde_json::to_string(&ThreadScope::Root).unwrap(), "null");
        let scope: ThreadScope = serde_json::from_str("null").unwrap();
        assert!(scope.is_root());
    }
}
