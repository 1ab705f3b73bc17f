pub mod analyzers;
pub mod config;
pub mod dataset;
pub mod db;
pub mod error;
pub mod fetch;
pub mod loaders;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod publish;
pub mod reports;
