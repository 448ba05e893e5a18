pub mod controller;
pub mod operations;
pub mod service;
