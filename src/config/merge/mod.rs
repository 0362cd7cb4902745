//! Config composition: default layer plus ordered sources.

pub mod merge_policy;
pub mod service;
