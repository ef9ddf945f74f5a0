// Path Planning algorithms module

pub mod cc_rrt;

pub use cc_rrt::*;
