//! Shared helpers for tessel tests.

pub mod data_gen;
