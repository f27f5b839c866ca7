//! Hierarchical element addressing
//!
//! A position is the dot-separated path of 1-based sibling ordinals from the
//! root down to an element (`1.2.3`). Ancestry is a string-prefix test with a
//! trailing separator so `1.2` contains `1.2.3` but not `1.20`.

use crate::core::error::{Error, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const SEPARATOR: char = '.';

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreePosition {
    value: String,
}

impl TreePosition {
    /// Position of a root element
    pub fn root(ordinal: u32) -> Self {
        debug_assert!(ordinal > 0, "ordinals are 1-based");
        Self {
            value: ordinal.to_string(),
        }
    }

    /// Position of the `ordinal`th child of `parent`
    pub fn child(parent: &TreePosition, ordinal: u32) -> Self {
        debug_assert!(ordinal > 0, "ordinals are 1-based");
        Self {
            value: format!("{}{}{}", parent.value, SEPARATOR, ordinal),
        }
    }

    /// `position` re-rooted below a new top-level `ordinal`
    pub fn parent(ordinal: u32, position: &TreePosition) -> Self {
        debug_assert!(ordinal > 0, "ordinals are 1-based");
        Self {
            value: format!("{}{}{}", ordinal, SEPARATOR, position.value),
        }
    }

    /// Ordinal among siblings (last segment)
    ///
    /// Every constructor yields valid segments, so the `0` fallback is never
    /// taken.
    pub fn ordinal(&self) -> u32 {
        self.value
            .rsplit(SEPARATOR)
            .next()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }

    /// Number of segments; the root has depth 1
    pub fn depth(&self) -> usize {
        self.value.split(SEPARATOR).count()
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn is_ancestor_of(&self, other: &TreePosition) -> bool {
        other.value.len() > self.value.len() + 1
            && other.value.starts_with(self.value.as_str())
            && other.value[self.value.len()..].starts_with(SEPARATOR)
    }

    pub fn is_descendant_of(&self, other: &TreePosition) -> bool {
        other.is_ancestor_of(self)
    }

    pub fn is_parent_of(&self, other: &TreePosition) -> bool {
        self.is_ancestor_of(other) && other.depth() == self.depth() + 1
    }

    pub fn is_child_of(&self, other: &TreePosition) -> bool {
        other.is_parent_of(self)
    }
}

impl FromStr for TreePosition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let valid = !s.is_empty()
            && s.split(SEPARATOR).all(|segment| {
                !segment.is_empty()
                    && segment.bytes().all(|b| b.is_ascii_digit())
                    && !segment.starts_with('0')
                    && segment.parse::<u32>().is_ok()
            });

        if !valid {
            return Err(Error::InvalidTreePosition {
                value: s.to_string(),
            });
        }

        Ok(Self {
            value: s.to_string(),
        })
    }
}

impl fmt::Display for TreePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl Serialize for TreePosition {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(s: &str) -> TreePosition {
        s.parse().unwrap()
    }

    #[test]
    fn test_child_and_ordinal() {
        let root = TreePosition::root(1);
        let child = TreePosition::child(&root, 3);
        let grandchild = TreePosition::child(&child, 12);

        assert_eq!(grandchild.as_str(), "1.3.12");
        assert_eq!(grandchild.ordinal(), 12);
        assert_eq!(grandchild.depth(), 3);
        assert!(grandchild.is_descendant_of(&root));
        assert!(child.is_parent_of(&grandchild));
        assert!(grandchild.is_child_of(&child));
        assert!(!root.is_parent_of(&grandchild));
    }

    #[test]
    fn test_prefix_needs_separator() {
        assert!(pos("1.2").is_ancestor_of(&pos("1.2.3")));
        assert!(!pos("1.2").is_ancestor_of(&pos("1.20")));
        assert!(!pos("1.2").is_ancestor_of(&pos("1.20.1")));
        assert!(!pos("1.2").is_ancestor_of(&pos("1.2")));
    }

    #[test]
    fn test_ancestor_descendant_symmetry() {
        let all = ["1", "1.1", "1.2", "1.2.1", "1.20", "1.2.1.4", "2", "2.1"];
        for a in all {
            for b in all {
                let (p, q) = (pos(a), pos(b));
                assert_eq!(p.is_ancestor_of(&q), q.is_descendant_of(&p), "{a} vs {b}");
            }
        }
        for a in all {
            for n in [1, 2, 10] {
                let p = pos(a);
                let c = TreePosition::child(&p, n);
                assert!(c.is_descendant_of(&p));
                assert_eq!(c.ordinal(), n);
            }
        }
    }

    #[test]
    fn test_parent_prepends() {
        let p = TreePosition::parent(1, &pos("2.3"));
        assert_eq!(p.as_str(), "1.2.3");
        assert_eq!(p.ordinal(), 3);
    }

    #[test]
    fn test_equality_on_string_form() {
        let built = TreePosition::child(&TreePosition::root(1), 2);
        assert_eq!(built, pos("1.2"));
        let mut set = std::collections::HashSet::new();
        set.insert(built);
        assert!(set.contains(&pos("1.2")));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "1-based")]
    fn test_zero_ordinal_child_panics() {
        TreePosition::child(&TreePosition::root(1), 0);
    }

    #[test]
    fn test_malformed_rejected() {
        for bad in ["", ".", "1.", ".1", "1..2", "a.1", "0", "1.01", "1.-2", "1 .2"] {
            assert!(
                matches!(bad.parse::<TreePosition>(), Err(Error::InvalidTreePosition { .. })),
                "{bad:?} should be rejected"
            );
        }
    }
}
