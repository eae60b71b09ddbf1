//! Domain models for the Farm Management Platform

mod batch;
mod farm;
mod health;
mod inventory;
mod log;
mod sale;
mod task;

pub use batch::*;
pub use farm::*;
pub use health::*;
pub use inventory::*;
pub use log::*;
pub use sale::*;
pub use task::*;
