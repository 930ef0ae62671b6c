//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises the reader pipeline
//! against mock links and a hand-driven clock. All tests run on the host
//! with no real hardware required.

mod link_contention_tests;
mod mock_link;
mod pipeline_tests;
