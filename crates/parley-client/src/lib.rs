pub mod attribution;
pub mod boundary;
pub mod config;
pub mod events;
pub mod runtime;
pub mod session;
pub mod state;
pub mod terminal;

use tracing_subscriber::{fmt, EnvFilter};

pub use boundary::{AuthProvider, Renderer, StaticAuthProvider};
pub use config::ClientConfig;
pub use events::SessionEvent;
pub use runtime::{Intent, SessionRuntime};
pub use session::Session;
pub use state::SessionSnapshot;

/// Install the global tracing subscriber. Respects `RUST_LOG`.
///
/// Logs go to stderr so they do not interleave with the chat transcript on
/// stdout.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("parley_client=info,parley_net=info,parley_store=warn,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
