//! HTTP front end of the render server.
//!
//! `POST /render` accepts a component's source, renders it through the
//! configured engine and answers with a URL under `/videos`, where the
//! rendered files are served from.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use config::Config;
pub use router::app;
pub use state::AppContext;
