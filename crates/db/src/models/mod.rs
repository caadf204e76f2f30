pub mod asset;
pub mod job;
