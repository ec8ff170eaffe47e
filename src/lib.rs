pub mod config;
pub mod db;
pub mod environment;
pub mod errors;
pub mod gear;
pub mod log;
pub mod repository;
pub mod routes;
