//! Tests for the notification dispatchers
