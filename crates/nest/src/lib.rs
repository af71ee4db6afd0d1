#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod error;
mod generator;
pub mod layout;
mod time;

pub use crate::error::*;
pub use crate::generator::*;
pub use crate::time::*;
