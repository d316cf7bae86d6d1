pub mod content_worker;
pub mod display_sink;
pub mod events;
pub mod reward_worker;
pub mod scheduler_worker;
pub mod wiring;
pub mod worker;
pub mod worker_inputs;

pub use content_worker::*;
pub use display_sink::*;
pub use events::*;
pub use reward_worker::*;
pub use scheduler_worker::*;
pub use wiring::*;
pub use worker::*;
pub use worker_inputs::*;
