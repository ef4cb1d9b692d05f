pub mod session;
pub mod share;
pub mod stop;
pub mod trip;
pub mod user;
