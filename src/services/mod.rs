pub mod collector;
pub mod quotes;
pub mod sample_store;
