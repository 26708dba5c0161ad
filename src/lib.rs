extern crate markup5ever_rcdom as rcdom;

pub mod args;
pub mod client;
pub mod config;
pub mod errors;
pub mod filter;
pub mod htmlworker;
pub mod results;
pub mod robots;
pub mod scan;
pub mod task;
pub mod util;
pub mod worker;
pub mod workqueue;
