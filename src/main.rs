//! envinit CLI
//!
//! Provisions the project's pipenv environment and runs the given command in it.

use envinit::{app, cli};

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    std::process::exit(real_main());
}

/// Parses arguments and runs the pipeline, turning every outcome into an
/// exit code.
fn real_main() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let invocation = match cli::parse(&args) {
        Ok(invocation) => invocation,
        Err(e) => return app::report_usage(&e),
    };

    match app::run(invocation) {
        Ok(code) => code,
        Err(e) => app::report_error(&e),
    }
}
