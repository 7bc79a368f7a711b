pub mod clean;
pub mod cross;
pub mod handlers;
pub mod middleware;
pub mod request;
pub mod routes;
pub mod session;
pub mod unregistered;
pub mod upgrade;

pub use routes::create_router;
