pub mod kv;
pub mod local_identity;
pub mod sqlite_store;
