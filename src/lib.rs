//! Sizing and dispatch optimisation for behind-the-meter energy systems.
//!
//! Given a known consumption profile, the crate sizes a grid connection, optional
//! battery storage and optional photovoltaic generation to minimise the total
//! annualised cost of serving the load, trading peak-demand charges against
//! investment in flexibility assets ("peak shaving"). The whole pipeline is an
//! in-memory computation: a validated [`config::Config`] goes in, a named
//! [`results::OptimizationResults`] record comes out.
#![warn(missing_docs)]
pub mod analysis;
pub mod config;
pub mod error;
pub mod finance;
pub mod horizon;
pub mod log;
pub mod optimisation;
pub mod results;
pub mod solver;
pub mod units;
