mod form;
pub mod handlers;
pub mod response;
mod routes;

pub use form::EventForm;
pub use routes::create_router;
