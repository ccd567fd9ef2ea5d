//! Solar financing backend: homeowners finance installations through contracts that
//! investors buy into, and monthly payments are disbursed across those investments.

pub mod config;
pub mod error;
pub mod financing;
pub mod telemetry;
