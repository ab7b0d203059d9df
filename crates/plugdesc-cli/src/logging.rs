//! Tracing setup for the binary

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const CRATES: &[&str] = &[
    "plugdesc",
    "plugdesc_ast",
    "plugdesc_config",
    "plugdesc_descriptor",
    "plugdesc_processor",
];

/// Filter directives for a verbosity level
pub fn filter_directives(verbosity: u8) -> String {
    let level = match verbosity {
        0 => return "plugdesc=warn".to_string(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    CRATES
        .iter()
        .map(|krate| format!("{}={}", krate, level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber; `RUST_LOG` takes precedence over `-v`
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(verbosity)));
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init();
    if installed.is_err() {
        tracing::debug!("Subscriber already installed");
    }
}
