pub mod flight;
pub mod resource;

pub use flight::{Category, Flight, FlightId, Phase};
pub use resource::ResourceKind;
