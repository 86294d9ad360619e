//! Update resolution core: version ordering, rollout bucketing and
//! candidate selection. Pure functions, no I/O.

pub mod resolver;
pub mod rollout;
pub mod version;

pub use resolver::resolve;
