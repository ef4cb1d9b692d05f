pub mod places;
pub mod routing;
