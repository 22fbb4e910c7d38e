// Allow dead code for items that are part of the public API but only used in tests
#![allow(dead_code)]

pub mod error;
pub mod generate;
pub mod schema;
pub mod sink;
pub mod value;
