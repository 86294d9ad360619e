pub mod release;

pub use release::{Channel, Platform};
