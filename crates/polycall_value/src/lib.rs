//! Tagged value representation shared by the call cache, the batch queue and
//! every bridge that talks to the performance engine.

pub mod hash;
pub mod value;

pub use hash::{call_hash, hash_bytes, hash_value};
pub use value::{FfiValue, OpaqueHandle, ValueKind};
