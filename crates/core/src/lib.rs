//! Domain logic for the Espelho Meu try-on pipeline.
//!
//! Everything in this crate is pure (no I/O): status machines, prompt
//! construction, error taxonomy, image dimension math, and wizard rules.
//! Persistence lives in `espelho-db`, provider wire calls in
//! `espelho-providers`, orchestration in `espelho-studio`.

pub mod error;
pub mod generation;
pub mod image_ops;
pub mod job;
pub mod prompt;
pub mod storage;
pub mod style;
pub mod types;
pub mod wizard;
