//! gunlayer: artillery firing-solution library.
//!
//! Exposes config, model, ballistics, weapon, tables, solver, geometry,
//! report and util for use by the CLI and tests.

pub mod ballistics;
pub mod config;
pub mod geometry;
pub mod model;
pub mod report;
pub mod solver;
pub mod tables;
pub mod util;
pub mod weapon;
