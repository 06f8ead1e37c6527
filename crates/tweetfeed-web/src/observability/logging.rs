use tracing::error;
use tracing_subscriber::prelude::*;

/// Installs the tracing subscriber and the panic hook. Constructed once,
/// explicitly, at the top of `main` rather than implicitly somewhere in
/// library code.
pub fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_env("TWEETFEED_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let fmt = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(std::env::var("COLORS").as_deref() != Ok("0"));

    tracing_subscriber::registry()
        .with(fmt)
        .with(env_filter)
        .init();

    init_panic_hook();
}

fn init_panic_hook() {
    let current_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        // The default hook must run first: a panic inside the tracing stack
        // itself would otherwise never be seen anywhere.
        current_hook(panic_info);

        let location = panic_info.location().map(|location| {
            format!(
                "{}:{}:{}",
                location.file(),
                location.line(),
                location.column()
            )
        });

        // A panic message formatted with interpolated values is a `String`,
        // a literal one is a `&str`
        let payload = panic_info.payload();
        let message = payload
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| payload.downcast_ref::<&str>().copied())
            .unwrap_or("<unknown>");

        let backtrace = std::backtrace::Backtrace::capture();

        error!(
            target: "panic",
            thread = std::thread::current().name(),
            location,
            backtrace = format_args!("\n{backtrace}"),
            "{message}"
        );
    }));
}
