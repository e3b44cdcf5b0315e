pub mod budget;
pub mod common;
pub mod config;
pub mod domain;
pub mod emissions;
pub mod grid;
pub mod io;
pub mod output;
pub mod pipeline;
pub mod regrid;
pub mod temporal;
pub mod units;
