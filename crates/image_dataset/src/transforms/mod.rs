pub mod core;
pub mod vision;

pub use core::{from_fn, Chain, FromFn, Transform};
