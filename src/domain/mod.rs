// Domain layer: DTOs mirrored from the API and the ports the client depends on.

pub mod model;
pub mod ports;
