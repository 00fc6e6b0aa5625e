pub mod config;
pub mod objects;

pub use objects::SyncOptions;
