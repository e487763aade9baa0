//! Test suites shared by every [`OrderedSet`](crate::OrderedSet) strategy.
//!
//! Instantiated per strategy from the integration tests.

pub mod ordered_set_stress_tests;
