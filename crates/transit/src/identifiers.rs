//! Type-safe identifiers for transit entities.
//!
//! All identifiers use Arc<str> for cheap cloning and minimal memory overhead.
//! Identifiers loaded from a feed are namespaced as `<feed>:<original id>` so
//! several feeds can be merged without collisions.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Separator between the feed namespace and the original GTFS identifier
pub const NAMESPACE_SEPARATOR: char = ':';

macro_rules! impl_identifier {
    ($name:ident) => {
        #[derive(Clone, Debug)]
        pub struct $name(Arc<str>);

        impl $name {
            pub fn new(s: impl AsRef<str>) -> Self {
                Self(s.as_ref().into())
            }

            /// Build the globally unique form of an identifier from one feed
            pub fn namespaced(namespace: &FeedNamespace, raw: impl AsRef<str>) -> Self {
                Self::new(format!(
                    "{}{}{}",
                    namespace.as_str(),
                    NAMESPACE_SEPARATOR,
                    raw.as_ref()
                ))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
            }
        }

        impl Eq for $name {}

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> Ordering {
                self.0.cmp(&other.0)
            }
        }

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.0.hash(state);
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

/// Name of one loaded feed; prefixes every identifier that feed contributes
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeedNamespace(Arc<str>);

impl FeedNamespace {
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(s.as_ref().into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeedNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl_identifier!(StopIdentifier);
impl_identifier!(RouteIdentifier);
impl_identifier!(TripIdentifier);
impl_identifier!(ServiceIdentifier);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_equality() {
        let id1 = StopIdentifier::new("stop_123");
        let id2 = StopIdentifier::new("stop_123");
        let id3 = id1.clone();

        assert_eq!(id1, id2);
        assert_eq!(id1, id3);
        assert!(Arc::ptr_eq(&id1.0, &id3.0)); // Clone shares Arc
    }

    #[test]
    fn test_identifier_hash() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(StopIdentifier::new("test"), 42);

        assert_eq!(map.get(&StopIdentifier::new("test")), Some(&42));
    }

    #[test]
    fn test_namespaced_identifiers_do_not_collide() {
        let north = FeedNamespace::new("north");
        let south = FeedNamespace::new("south");

        let a = TripIdentifier::namespaced(&north, "t1");
        let b = TripIdentifier::namespaced(&south, "t1");

        assert_ne!(a, b);
        assert_eq!(a.as_str(), "north:t1");
        assert_eq!(format!("{}", b), "south:t1");
    }

    #[test]
    fn test_identifier_ordering() {
        let mut ids = vec![
            StopIdentifier::new("b"),
            StopIdentifier::new("c"),
            StopIdentifier::new("a"),
        ];
        ids.sort();
        let names: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_identifier_conversions() {
        let _id1: TripIdentifier = "trip_1".into();
        let _id2: TripIdentifier = String::from("trip_2").into();
    }
}
