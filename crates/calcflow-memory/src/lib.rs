#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod dataset;
mod graph;
mod process;
mod store;

pub use store::{MemoryStore, StoreStats};
