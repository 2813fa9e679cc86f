mod manager;

pub use manager::SchemaCodecManager;
