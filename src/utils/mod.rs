pub mod constants;
mod timeout;

pub use timeout::{validate_interaction_timeout, validate_navigation_timeout};
