//! Snapshot test target
