// The infra module contains implementations of core traits.

#[path = "storage/kv_storage.rs"]
pub mod storage;
