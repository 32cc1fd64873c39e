// Domain layer: value types and the ports the sequencers drive.

pub mod model;
pub mod ports;
