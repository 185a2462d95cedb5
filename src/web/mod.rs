pub mod responses;
pub mod router;
pub mod state;
pub mod uploads;

pub use responses::{ApiMessage, json_error, service_error};
pub use state::AppState;
pub use uploads::read_upload_form;
