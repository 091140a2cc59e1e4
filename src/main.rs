use {
    anyhow::Result,
    clap::Parser,
    coin_pacer::{Cli, log_builder, run_poller},
    std::panic,
};

fn init_log() {
    let my_code_level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    log_builder(my_code_level)
        .parse_default_env() // RUST_LOG wins
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        log::error!("CRITICAL PANIC:\n{}\nStack Trace:\n{}", info, backtrace);
    }));

    init_log();

    let args = Cli::parse();

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Could not listen for Ctrl-C: {}", e);
            // Without a signal handler the loop only stops at --max-calls
            std::future::pending::<()>().await;
        }
    };

    let summary = run_poller(args, shutdown).await?;

    println!(
        "{} calls ({} ok, {} failed), {} records stored, {} calls left this month.",
        summary.attempts,
        summary.successes,
        summary.failures,
        summary.records_stored,
        summary.remaining_calls
    );

    Ok(())
}
