//! Request handlers.

pub mod health;
pub mod progress;
pub mod render;
pub mod stream;
pub mod upload;

pub use health::health;
pub use progress::job_progress;
pub use render::start_render;
pub use stream::stream_output;
pub use upload::upload_chunk;
