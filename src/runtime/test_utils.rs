//! Test utilities for runtime testing
//!
//! [`test::ExecutorTest`] assembles a one-module program around a list of
//! instructions, instantiates it in a fresh store and invokes function 0.
