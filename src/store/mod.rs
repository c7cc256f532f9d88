pub mod collections;
pub mod region;

pub use collections::CollectionStore;
pub use region::{JsonFileRegion, KeyValueRegion, MemoryRegion, WriteOp};
