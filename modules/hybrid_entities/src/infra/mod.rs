//! Infrastructure layer - persistence and lookup sources

pub mod lookup;
pub mod storage;
