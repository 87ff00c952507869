pub mod config;
pub mod cup_handle;
pub mod detector;
pub mod error;
pub mod extrema;
