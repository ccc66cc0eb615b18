// Storefront HTTP server: the shop front, the back office and their wiring

pub mod api; // HTTP handlers
pub mod error; // Error to response mapping
pub mod middleware; // HTTP middleware
pub mod model; // Configuration, state and response types
pub mod secured; // Staff authorization guard
pub mod startup; // Logging and server start-up

pub use model::{AppState, Configuration};
pub use secured::Secured;
