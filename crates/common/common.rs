pub use bytes::Bytes;
pub use ethereum_types::*;
pub mod constants;
pub mod hash_chain;
pub mod serde_utils;
pub mod types;
pub mod utils;
