//! Code for handling IDs and the small-integer indices used to address regions and periods
use serde::{Deserialize, Serialize};

macro_rules! define_id_type {
    ($name:ident) => {
        #[derive(
            Clone,
            std::hash::Hash,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            serde::Deserialize,
            Debug,
            serde::Serialize,
        )]
        /// An ID type (e.g. `RegionID`)
        pub struct $name(pub std::sync::Arc<str>);

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(std::sync::Arc::from(s))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(std::sync::Arc::from(s))
            }
        }

        impl $name {
            /// Create a new ID from a string slice
            pub fn new(id: &str) -> Self {
                $name(std::sync::Arc::from(id))
            }
        }
    };
}

define_id_type!(RegionID);

macro_rules! define_index_type {
    ($name:ident, $what:literal) => {
        #[doc = concat!("Position of a ", $what, " in a [`PlanningIndex`](crate::index::PlanningIndex)")]
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub usize);

        impl $name {
            /// The index as a `usize`
            pub fn get(self) -> usize {
                self.0
            }
        }
    };
}

define_index_type!(RegionIdx, "region");
define_index_type!(PeriodIdx, "period");

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_region_id_ordering() {
        let ids: BTreeSet<RegionID> = ["TH", "MY", "SG"].into_iter().map(RegionID::from).collect();
        let ordered: Vec<_> = ids.iter().map(ToString::to_string).collect();
        assert_eq!(ordered, ["MY", "SG", "TH"]);
    }

    #[test]
    fn test_region_id_borrow() {
        let id = RegionID::new("VN");
        let s: &str = std::borrow::Borrow::borrow(&id);
        assert_eq!(s, "VN");
        assert_eq!(id, RegionID::from("VN".to_string()));
    }
}
