//! Small shared helpers: collection constructors, id generation, and JSON
//! merging.

pub mod collections;
pub mod id_generator;
pub mod json_merge;
