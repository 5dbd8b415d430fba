//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that drives a whole [`NodeLoop`] against
//! mock or simulated adapters.  All tests run on the host (x86_64) with no real
//! hardware or broker required.
//!
//! [`NodeLoop`]: vtms_node::app::node::NodeLoop

mod mock_net;
mod node_scenario_tests;
mod startup_tests;
