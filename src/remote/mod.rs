pub(crate) mod atlas_provider;
pub(crate) mod memory_store;
pub(crate) mod remote_store;

pub use atlas_provider::{AtlasConfig, AtlasProvider};
pub use memory_store::MemoryStore;
pub use remote_store::RemoteInstrumentStore;
