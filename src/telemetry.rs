use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

static INIT: OnceCell<()> = OnceCell::new();

/// Install the global subscriber once; logs go to stderr so stdout stays JSON.
///
/// `RUST_LOG` takes precedence over `level`.
pub fn init_tracing(level: &str, json: bool) {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        let plain = (!json).then(|| {
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(std::io::stderr)
        });
        let structured = json.then(|| fmt::layer().json().with_writer(std::io::stderr));
        let subscriber = Registry::default().with(filter).with(plain).with(structured);
        if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
            eprintln!("waypoint: logging disabled, a global subscriber is already installed: {err}");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing("debug", false);
        init_tracing("info", true);
        tracing::info!("within test");
    }
}
