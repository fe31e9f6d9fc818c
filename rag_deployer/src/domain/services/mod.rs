pub mod data_loader;
pub mod deployer;
pub mod evaluation;
