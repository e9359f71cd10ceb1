pub mod db;

pub mod errors;
pub mod instruments;
pub mod remote;
pub mod schema;

pub use instruments::*;
pub use remote::{AtlasConfig, AtlasProvider, MemoryStore, RemoteInstrumentStore};
