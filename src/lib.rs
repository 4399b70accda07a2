pub mod app_peer;
pub mod collector;
pub mod config;
pub mod goroutine;
pub mod ids;
pub mod log_peer;
pub mod logger;
pub mod registry;
pub mod ring;
pub mod runtime_stats;
pub mod search;
pub mod time_align;
pub mod timestamp;
pub mod versioned_map;
pub mod watch;

// tests
#[path = "../src/tests/ring_test.rs"]
mod ring_test;

#[path = "../src/tests/time_align_test.rs"]
mod time_align_test;

#[path = "../src/tests/versioned_map_test.rs"]
mod versioned_map_test;

#[path = "../src/tests/search_test.rs"]
mod search_test;

#[path = "../src/tests/search_manager_test.rs"]
mod search_manager_test;

#[path = "../src/tests/log_peer_test.rs"]
mod log_peer_test;

#[path = "../src/tests/goroutine_test.rs"]
mod goroutine_test;

#[path = "../src/tests/stack_parser_test.rs"]
mod stack_parser_test;

#[path = "../src/tests/app_peer_test.rs"]
mod app_peer_test;

#[path = "../src/tests/registry_test.rs"]
mod registry_test;
