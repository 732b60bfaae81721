pub mod db;
pub mod probe;
pub mod storage;

pub use db::DbAdapter;
pub use probe::WavProbeAdapter;
pub use storage::FsStorageAdapter;
