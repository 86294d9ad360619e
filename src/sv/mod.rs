pub mod release;
pub mod updates;

pub use release::Release;
pub use updates::Updates;
