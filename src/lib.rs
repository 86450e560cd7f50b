//! kitroom: rental equipment inventory engine
//!
//! Tracks devices, assigns them to jobs with one-job-per-device exclusivity,
//! groups them into cases, serves cached list and category-tree views, and
//! frees devices once their job is paid.

pub mod cli;
pub mod core;
