//! Registration progress: staged onboarding engine for the delivery
//! marketplace's driver and restaurant wizards.

pub mod config;
pub mod error;
pub mod registration;
pub mod store;
