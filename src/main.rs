use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use pipewright_config::{ExecutionMode, PipelineDef, TaskDef};
use pipewright_engine::{ExecutorRegistry, Pipeline, PipelineConfig, PipelineEvent};
use pipewright_task::TextGenerationConfig;

/// Largest product id served by the sample products API.
const SAMPLE_MAX_ID: i64 = 194;
const SAMPLE_PRODUCTS_URL: &str = "https://dummyjson.com/products";

/// Pipewright - run pipelines of compute, HTTP and text-generation tasks
#[derive(Parser)]
#[command(name = "pipewright")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Increase log verbosity (-v info, -vv debug)
  #[arg(short, long, global = true, action = clap::ArgAction::Count)]
  verbose: u8,

  #[command(flatten)]
  llm: LlmArgs,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Args)]
struct LlmArgs {
  /// API key for the text-generation service
  #[arg(long, global = true, env = "PIPEWRIGHT_LLM_API_KEY", hide_env_values = true)]
  llm_api_key: Option<String>,

  /// Base URL of the text-generation service
  #[arg(long, global = true, env = "PIPEWRIGHT_LLM_BASE_URL")]
  llm_base_url: Option<String>,

  /// Default text-generation model
  #[arg(long, global = true, env = "PIPEWRIGHT_LLM_MODEL")]
  llm_model: Option<String>,
}

#[derive(Args)]
struct RunArgs {
  /// Execution mode, overriding the pipeline file
  #[arg(long)]
  mode: Option<ExecutionMode>,

  /// Maximum number of tasks running at once in parallel mode
  #[arg(long)]
  max_concurrency: Option<usize>,

  /// Fail any task that runs longer than this many milliseconds
  #[arg(long)]
  task_timeout_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a pipeline file
  Run {
    /// Path to the pipeline file (JSON)
    pipeline_file: PathBuf,

    #[command(flatten)]
    args: RunArgs,
  },

  /// Run the built-in compute → products → poem pipeline
  Sample {
    /// Operation applied to x and y
    #[arg(long, value_enum, default_value_t = Operation::Multiply)]
    operation: Operation,

    /// First operand, between 1 and 194
    #[arg(short, default_value_t = 2)]
    x: i64,

    /// Second operand, between 1 and 194 / x
    #[arg(short, default_value_t = 3)]
    y: i64,

    #[command(flatten)]
    args: RunArgs,
  },
}

#[derive(Clone, Copy, ValueEnum)]
enum Operation {
  Multiply,
  Add,
}

impl Operation {
  fn function(self) -> &'static str {
    match self {
      Operation::Multiply => "multiply",
      Operation::Add => "add",
    }
  }
}

fn init_tracing(verbose: u8) {
  let filter = match verbose {
    0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    1 => EnvFilter::new("info"),
    _ => EnvFilter::new("debug"),
  };

  tracing_subscriber::registry()
    .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
    .with(filter)
    .init();
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let text_generation = text_generation_config(cli.llm);

  match cli.command {
    Some(Commands::Run {
      pipeline_file,
      args,
    }) => {
      let content = std::fs::read_to_string(&pipeline_file).with_context(|| {
        format!("failed to read pipeline file: {}", pipeline_file.display())
      })?;
      let def = PipelineDef::from_json(&content).with_context(|| {
        format!("failed to parse pipeline file: {}", pipeline_file.display())
      })?;

      info!(
        pipeline = %def.name,
        tasks = def.tasks.len(),
        "pipeline_loaded"
      );
      let mode = args.mode.unwrap_or(def.mode);
      run_pipeline(def.tasks, mode, &args, text_generation)?;
    }
    Some(Commands::Sample {
      operation,
      x,
      y,
      args,
    }) => {
      let tasks = sample_tasks(operation, x, y)?;
      let mode = args.mode.unwrap_or_default();
      run_pipeline(tasks, mode, &args, text_generation)?;
    }
    None => {
      println!("pipewright - use --help to see available commands");
    }
  }

  Ok(())
}

fn text_generation_config(args: LlmArgs) -> TextGenerationConfig {
  let mut config = TextGenerationConfig {
    api_key: args.llm_api_key,
    ..TextGenerationConfig::default()
  };
  if let Some(base_url) = args.llm_base_url {
    config.base_url = base_url;
  }
  if let Some(model) = args.llm_model {
    config.model = model;
  }
  config
}

fn run_pipeline(
  tasks: Vec<TaskDef>,
  mode: ExecutionMode,
  args: &RunArgs,
  text_generation: TextGenerationConfig,
) -> Result<()> {
  let mut config = PipelineConfig {
    mode,
    ..PipelineConfig::default()
  };
  if let Some(limit) = args.max_concurrency {
    config = config.with_max_concurrency(limit);
  }
  if let Some(ms) = args.task_timeout_ms {
    config = config.with_task_timeout(Duration::from_millis(ms));
  }

  let registry = ExecutorRegistry::with_builtins(text_generation);
  let pipeline = Pipeline::new(registry, config);

  let rt = tokio::runtime::Runtime::new()?;
  let result = rt.block_on(async {
    pipeline
      .run(&tasks, Arc::new(print_event))
      .await
  });

  match result {
    Ok(result) => {
      info!(run_id = %result.run_id, "run_completed");
      println!("{}", serde_json::to_string_pretty(&result.outputs)?);
      Ok(())
    }
    Err(err) => {
      eprintln!(
        "Partial outputs: {}",
        serde_json::to_string_pretty(&err.outputs)?
      );
      Err(err).context("pipeline run failed")
    }
  }
}

fn print_event(event: PipelineEvent) {
  println!(
    "task {} - {}: {}",
    event.task_id(),
    event.status(),
    event.payload()
  );
}

/// Build the three-task sample: combine x and y, fetch the product with that
/// id, then write a poem about its title.
fn sample_tasks(operation: Operation, x: i64, y: i64) -> Result<Vec<TaskDef>> {
  if !(1..=SAMPLE_MAX_ID).contains(&x) {
    bail!("x must be between 1 and {}, got {}", SAMPLE_MAX_ID, x);
  }
  let max_y = SAMPLE_MAX_ID / x;
  if !(1..=max_y).contains(&y) {
    bail!("y must be between 1 and {} when x is {}, got {}", max_y, x, y);
  }

  let params = json!({ "x": x, "y": y });
  let params = params
    .as_object()
    .cloned()
    .context("sample parameters must be an object")?;

  Ok(vec![
    TaskDef::new("task1", "python", params).with("function", operation.function()),
    TaskDef::new("task2", "api", "task1")
      .with("endpoint", SAMPLE_PRODUCTS_URL)
      .with("pick", "products"),
    TaskDef::new("task3", "llm", "task2"),
  ])
}
