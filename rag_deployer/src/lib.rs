pub mod configuration;
pub mod domain;
pub mod ports;
pub mod repositories;
pub mod services;
pub mod startup;
