//! Engine test target

mod durability_tests;
