//! Tests for the bundled stores
