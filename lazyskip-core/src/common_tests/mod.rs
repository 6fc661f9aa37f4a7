//! Test suites shared by every guard backend.
//!
//! Each function is generic over the reclamation guard and is invoked from the
//! `tests/` directories of the crates that provide a backend.

pub mod set_stress_tests;
