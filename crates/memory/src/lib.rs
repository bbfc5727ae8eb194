pub mod layout;
pub mod store;

pub use layout::StorageLayout;
pub use store::{JsonStore, MemoryError};
