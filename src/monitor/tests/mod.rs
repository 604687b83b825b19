//! Tests for the polling loop

pub mod helpers;
