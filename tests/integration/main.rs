//! Integration test suite

mod crawl_tests;
mod scheduler_tests;
