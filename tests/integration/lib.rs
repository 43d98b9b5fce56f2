//! Cross-crate integration tests for infichat. See `tests/`.
