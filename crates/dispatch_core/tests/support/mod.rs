#![allow(dead_code)]

pub mod fleet;
pub mod stores;
