// Domain layer: core models and ports (interfaces) for the recipient pipeline.

pub mod model;
pub mod ports;
