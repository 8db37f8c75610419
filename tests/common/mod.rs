//! Shared test fixtures (used by unit, functional, and proptest)

#![allow(dead_code)]

pub mod fixtures;
