//! Tests for the registry client
