//! Hash maps and sets for the render arena and contexts. `hashbrown` backs
//! them unless the `std-hash` feature switches to `std::collections`.

#[cfg(feature = "std-hash")]
pub mod map {
    pub use std::collections::{HashMap, HashSet};
}

#[cfg(not(feature = "std-hash"))]
pub mod map {
    pub use hashbrown::{HashMap, HashSet};
}

/// Render node ids already visited by a tree walk.
pub type NodeSet = map::HashSet<crate::NodeId>;
