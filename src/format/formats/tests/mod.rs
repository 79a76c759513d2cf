//! Unit tests for detector image format implementations.
//!
//! Fixtures are synthesized in memory so every test is self-contained.

mod raxis_tests;
