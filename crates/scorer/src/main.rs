use std::process::ExitCode;

mod export;
mod forest;
mod loader;
mod metrics;
mod pipeline;
mod render;
mod report;
mod scaler;
mod wallet_features;
mod wallet_scoring;

fn main() -> ExitCode {
    let config = match common::config::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let dispatch = common::observability::build_dispatch(&config.general.log_level);
    if let Err(e) = tracing::dispatcher::set_global_default(dispatch) {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }
    let _service = common::observability::service_span("scorer").entered();

    tracing::info!(input = %config.paths.input, "wallet scorer starting");

    // Everything runs under the local recorder so ERROR events are counted too.
    let recorder = metrics::build_recorder();
    let handle = recorder.handle();
    ::metrics::with_local_recorder(&recorder, || {
        metrics::describe();
        match pipeline::run(&config, Some(&handle)) {
            Ok(summary) => {
                tracing::info!(
                    transactions = summary.transactions,
                    wallets = summary.wallets,
                    low_cohort = summary.low_cohort,
                    high_cohort = summary.high_cohort,
                    "wallet scorer finished"
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!(error = %format!("{e:#}"), "wallet scorer failed");
                match e.downcast_ref::<loader::InputError>() {
                    Some(input) => eprintln!("error: invalid input: {input}"),
                    None => eprintln!("error: {e:#}"),
                }
                ExitCode::FAILURE
            }
        }
    })
}
