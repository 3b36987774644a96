// Core domain types: errors, route keys, canonical events

pub mod errors;
pub mod event;
pub mod route;
