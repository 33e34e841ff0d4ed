//! Collection wrapper types for displaying groups of records.
//!
//! Each wrapper prints its items one after another and a short message when
//! the collection is empty.

use std::fmt;

use crate::models::{Activity, Invite, Membership, ProjectSummary};

macro_rules! collection {
    ($(#[$meta:meta])* $name:ident, $item:ty, $empty:literal) => {
        $(#[$meta])*
        pub struct $name(pub Vec<$item>);

        impl $name {
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            pub fn len(&self) -> usize {
                self.0.len()
            }

            pub fn iter(&self) -> std::slice::Iter<'_, $item> {
                self.0.iter()
            }
        }

        impl IntoIterator for $name {
            type Item = $item;
            type IntoIter = std::vec::IntoIter<Self::Item>;

            fn into_iter(self) -> Self::IntoIter {
                self.0.into_iter()
            }
        }

        impl<'a> IntoIterator for &'a $name {
            type Item = &'a $item;
            type IntoIter = std::slice::Iter<'a, $item>;

            fn into_iter(self) -> Self::IntoIter {
                self.0.iter()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.0.is_empty() {
                    writeln!(f, $empty)
                } else {
                    for item in &self.0 {
                        write!(f, "{item}")?;
                    }
                    Ok(())
                }
            }
        }
    };
}

collection!(
    /// Projects the acting user belongs to.
    ProjectSummaries,
    ProjectSummary,
    "No projects found."
);

collection!(
    /// Active members of a project.
    Members,
    Membership,
    "No members."
);

collection!(
    /// Pending invites of a project.
    Invites,
    Invite,
    "No pending invites."
);

collection!(
    /// A project's activity log, newest first.
    ActivityFeed,
    Activity,
    "No activity yet."
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_collections() {
        assert_eq!(ProjectSummaries(vec![]).to_string(), "No projects found.\n");
        assert_eq!(ActivityFeed(vec![]).to_string(), "No activity yet.\n");
        assert!(Members(vec![]).is_empty());
    }
}
