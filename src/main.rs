//! Student dropout predictor - main entry point

use clap::Parser;
use student_dropout::cli::{
    cmd_form, cmd_info, cmd_predict, cmd_prepare, cmd_serve, cmd_train, resolve_config, show_help, Cli, Commands,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "student_dropout=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Prepare { data, output }) => {
            cmd_prepare(&data, &output)?;
        }
        Some(Commands::Train { config, data, output, seed, folds, n_jobs }) => {
            let config = resolve_config(config.as_deref(), data, output, seed, folds, n_jobs)?;
            // Training is CPU bound and runs on its own rayon pool
            tokio::task::spawn_blocking(move || cmd_train(config)).await??;
        }
        Some(Commands::Predict { model, reference, input, set, json }) => {
            cmd_predict(&model, &reference, input.as_deref(), &set, json)?;
        }
        Some(Commands::Form { reference }) => {
            cmd_form(&reference)?;
        }
        Some(Commands::Info { model }) => {
            cmd_info(&model)?;
        }
        Some(Commands::Serve { port, host, model, reference }) => {
            cmd_serve(host, port, model, reference).await?;
        }
        None => {
            show_help();
        }
    }

    Ok(())
}
