//! Request pipeline
//!
//! Every scrape or search call flows through the same stages:
//! admission → proxy resolution → extraction → metrics. A denied call stops
//! at the first stage without touching the others.

mod caller;
mod coordinator;

pub use caller::CallContext;
pub use coordinator::Coordinator;
