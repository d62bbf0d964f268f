use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use env_logger::Env;

use paperforge::config::AppConfig;
use paperforge::core::finetune::FineTuneClient;
use paperforge::core::harvest::Harvester;
use paperforge::core::pipeline::Pipeline;
use paperforge::core::question::QuestionDeriver;

#[derive(Parser, Debug)]
#[command(name = "paperforge", version, about = "Assemble literature-review fine-tuning datasets from academic PDFs")]
struct Cli {
    /// Path to a config file (defaults to ~/.config/paperforge/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the fine-tuning dataset from PDFs and their metadata side-files
    Prepare {
        /// Directory of source papers (*.pdf with matching *.csv side-files)
        #[arg(long)]
        input_dir: Option<PathBuf>,

        /// Output path for the JSONL dataset
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Fetch reference metadata side-files from the academic graph service
    Harvest {
        /// Directory of source papers (file stem = corpus id)
        #[arg(long)]
        input_dir: Option<PathBuf>,

        /// Delay between per-reference lookups, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Upload a dataset file and create a fine-tuning job
    Submit {
        /// Dataset file to upload (defaults to the configured output path)
        #[arg(long)]
        file: Option<PathBuf>,

        /// Base model to fine-tune
        #[arg(long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    log::info!("{} v{} starting", paperforge::NAME, paperforge::VERSION);

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };

    match cli.command {
        Command::Prepare { input_dir, output } => {
            if let Some(dir) = input_dir {
                config.pipeline.input_dir = dir;
            }
            if let Some(path) = output {
                config.pipeline.output_file = path;
            }

            let api_key = config.llm.api_key()?;
            let deriver = QuestionDeriver::new(
                &config.llm.endpoint,
                api_key,
                &config.llm.model,
                config.llm.retry_policy(),
                config.llm.timeout(),
            );

            let summary = Pipeline::new(config.pipeline.clone(), deriver)
                .run()
                .await
                .context("dataset preparation failed")?;

            println!(
                "Dataset written to {}: {} examples, {} papers skipped",
                config.pipeline.output_file.display(),
                summary.examples,
                summary.skipped
            );
            if summary.skipped > 0 {
                // Make partial failure visible to automation.
                std::process::exit(1);
            }
        }

        Command::Harvest { input_dir, delay_ms } => {
            if let Some(dir) = input_dir {
                config.pipeline.input_dir = dir;
            }
            if let Some(delay) = delay_ms {
                config.harvest.delay_ms = delay;
            }

            let harvester = Harvester::new(
                &config.harvest.endpoint,
                config.harvest.delay(),
                config.llm.retry_policy(),
            );
            let summary = harvester
                .run(&config.pipeline.input_dir)
                .await
                .context("metadata harvest failed")?;

            println!(
                "Harvested side-files for {} papers, {} skipped",
                summary.papers, summary.skipped
            );
            if summary.skipped > 0 {
                std::process::exit(1);
            }
        }

        Command::Submit { file, model } => {
            let dataset_file = file.unwrap_or_else(|| config.pipeline.output_file.clone());
            let model = model.unwrap_or_else(|| config.finetune.model.clone());

            let api_key = config.llm.api_key()?;
            let client = FineTuneClient::new(
                &config.llm.endpoint,
                api_key,
                config.llm.retry_policy(),
                config.llm.timeout(),
            );

            let file_id = client
                .upload_file(&dataset_file)
                .await
                .context("dataset upload failed")?;
            log::info!("uploaded {} as {file_id}", dataset_file.display());

            let job = client
                .create_job(&file_id, &model)
                .await
                .context("fine-tune job creation failed")?;
            println!(
                "Created fine-tuning job {} (model {}, status {})",
                job.id, job.model, job.status
            );
        }
    }

    Ok(())
}
