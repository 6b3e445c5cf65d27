pub mod collection;
pub mod error;
pub mod identity;
pub mod store;
pub mod task;
pub mod view;

#[cfg(test)]
mod view_tests;
