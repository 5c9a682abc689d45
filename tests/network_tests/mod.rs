//! Network test target
