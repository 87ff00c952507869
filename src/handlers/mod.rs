pub mod health;
pub mod pattern;
