pub mod gateway;
pub mod handlers;
pub mod models;
pub mod mutators;
pub mod view;
