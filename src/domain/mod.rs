// Domain layer: claim/outcome models and the ports the workflow talks through.

pub mod model;
pub mod ports;
