// Declarative route definitions

pub mod event_loader;
