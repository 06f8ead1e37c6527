use display_error_chain::DisplayErrorChain;
use futures::prelude::*;
use std::panic::AssertUnwindSafe;
use std::process::ExitCode;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    if dotenvy::dotenv().is_err() {
        eprintln!("Dotenv config was not found, ignoring this...")
    }

    tweetfeed_web::init_logging();

    let main_fut = AssertUnwindSafe(async {
        let result = try_main().await;

        result.map(|()| ExitCode::SUCCESS).unwrap_or_else(|err| {
            error!(err = %DisplayErrorChain::new(&err), "Exiting with an error...");
            ExitCode::FAILURE
        })
    })
    .catch_unwind()
    .unwrap_or_else(|_| {
        error!("Exiting due to a panic...");
        ExitCode::FAILURE
    });

    tokio::select! {
        exit_code = main_fut => exit_code,
        () = abort_signal() => {
            info!("Shutting down...");
            ExitCode::SUCCESS
        }
    }
}

async fn try_main() -> tweetfeed_web::Result {
    let config = tweetfeed_web::Config::load_or_panic();
    tweetfeed_web::run(config).await
}

async fn abort_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(
            err = %DisplayErrorChain::new(&err),
            "Failed to wait for Ctrl+C, exiting..."
        );
    } else {
        info!("Ctrl+C received, exiting...");
    }
}
