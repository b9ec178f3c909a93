//! Workspace end-to-end tests live in `tests/`; this crate body is empty.
