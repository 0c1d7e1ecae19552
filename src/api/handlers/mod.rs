mod events;
mod system;
mod uploads;

pub use events::{
    create_event, delete_event, query_events, update_event, CreatedResponse, DeletedResponse,
    EventResponse, UpdatedResponse,
};
pub use system::{health, root, HealthResponse, RootResponse};
pub use uploads::serve_upload;
