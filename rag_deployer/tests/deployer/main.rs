mod collection;
mod data_loader;
mod evaluation;
mod pipeline;
