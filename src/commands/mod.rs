//! Command handlers for meshctl

pub mod configure;
mod select;

pub use configure::*;
pub use select::*;
