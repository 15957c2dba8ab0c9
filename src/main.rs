use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use agentflow_artifact::FsArtifactSink;
use agentflow_behavior::memory::{MemoryPublisher, StaticGenerationProvider, StaticTextModel};
use agentflow_behavior::{GenerationProvider, Publisher, TextModel};
use agentflow_behaviors::{BehaviorDeps, standard_registry};
use agentflow_config::{FailurePolicy, TriggerKind, WorkflowDef};
use agentflow_host_http::{
  HttpFeedSource, HttpPolicy, OpenAiConfig, OpenAiTextModel, PredictionConfig,
  PredictionProvider, WebhookPublisher,
};
use agentflow_runtime::{
  RunDelivery, RunEvent, RunRequest, Runtime, RuntimeConfig, ScheduleRunner, schedule_all,
};
use agentflow_store::{DefinitionStore, FsDefinitionStore, Scheduler};
use agentflow_workflow::Workflow;

/// Agentflow - run AI content workflows as trees of behaviors
#[derive(Parser)]
#[command(name = "agentflow")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.agentflow)
  #[arg(long, global = true, env = "AGENTFLOW_DATA_DIR")]
  data_dir: Option<PathBuf>,

  #[command(flatten)]
  services: ServiceArgs,

  #[command(subcommand)]
  command: Option<Commands>,
}

/// External services. Anything left unset falls back to an offline stand-in.
#[derive(Args)]
struct ServiceArgs {
  #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
  openai_api_key: Option<String>,

  #[arg(long, global = true, env = "OPENAI_BASE_URL")]
  openai_base_url: Option<String>,

  #[arg(long, global = true, env = "AGENTFLOW_TEXT_MODEL")]
  text_model: Option<String>,

  /// Base URL of a prediction-style generation API
  #[arg(long, global = true, env = "AGENTFLOW_GENERATION_URL")]
  generation_url: Option<String>,

  #[arg(long, global = true, env = "AGENTFLOW_GENERATION_TOKEN", hide_env_values = true)]
  generation_token: Option<String>,

  /// Webhook that receives social posts
  #[arg(long, global = true, env = "AGENTFLOW_PUBLISH_URL")]
  publish_url: Option<String>,

  /// Hosts feeds may be fetched from (repeatable, `*.example.com` allowed)
  #[arg(long = "allow-host", global = true, value_delimiter = ',')]
  allowed_hosts: Vec<String>,

  /// Cancel every remaining branch when one step fails
  #[arg(long, global = true)]
  abort_on_failure: bool,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a stored workflow once
  Run {
    workflow_id: String,

    /// How the run is invoked: api or schedule
    #[arg(long, default_value = "api")]
    trigger: TriggerKind,

    /// Seed payload as JSON (default: read from stdin)
    #[arg(long)]
    payload: Option<String>,

    /// Print node events as they happen
    #[arg(long)]
    stream: bool,

    /// Deadline for the run in seconds
    #[arg(long)]
    timeout: Option<u64>,
  },

  /// Validate a stored workflow, or a definition file before importing it
  Validate {
    workflow: String,
  },

  /// Validate a definition file and save it to the store
  Import { workflow_file: PathBuf },

  /// List stored workflows
  List,

  /// Run scheduled workflows until interrupted
  Serve,
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing()?;

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".agentflow"),
  };

  let Some(command) = cli.command else {
    println!("agentflow - use --help to see available commands");
    return Ok(());
  };

  let services = cli.services;
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async move {
    let store: Arc<dyn DefinitionStore> = Arc::new(FsDefinitionStore::new(data_dir.join("workflows")));

    match command {
      Commands::Run {
        workflow_id,
        trigger,
        payload,
        stream,
        timeout,
      } => {
        let runtime = build_runtime(&services, &data_dir, store)?;
        let payload = match payload {
          Some(payload) => serde_json::from_str(&payload).context("failed to parse --payload JSON")?,
          None => read_payload_from_stdin()?,
        };

        let mut request = RunRequest::new(workflow_id, trigger, payload);
        if stream {
          request = request.streaming();
        }
        if let Some(secs) = timeout {
          request = request.with_timeout(Duration::from_secs(secs));
        }
        run_workflow(&runtime, request).await
      }
      Commands::Validate { workflow } => validate(&services, &data_dir, store, &workflow).await,
      Commands::Import { workflow_file } => import(&services, &data_dir, store, &workflow_file).await,
      Commands::List => list(store.as_ref()).await,
      Commands::Serve => serve(&services, &data_dir, store).await,
    }
  })
}

fn init_tracing() -> Result<()> {
  let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .try_init()
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {}", e))
}

fn build_runtime(
  args: &ServiceArgs,
  data_dir: &Path,
  store: Arc<dyn DefinitionStore>,
) -> Result<Runtime> {
  let client = reqwest::Client::builder()
    .user_agent(concat!("agentflow/", env!("CARGO_PKG_VERSION")))
    .timeout(Duration::from_secs(120))
    .build()
    .context("failed to build http client")?;

  let policy = if args.allowed_hosts.is_empty() {
    HttpPolicy::allow_all()
  } else {
    HttpPolicy::allowed_hosts(args.allowed_hosts.iter().cloned())
  };

  let text_model: Arc<dyn TextModel> = match &args.openai_api_key {
    Some(key) => {
      let mut config = OpenAiConfig::new(key.clone());
      if let Some(base_url) = &args.openai_base_url {
        config.base_url = base_url.clone();
      }
      if let Some(model) = &args.text_model {
        config.model = model.clone();
      }
      Arc::new(OpenAiTextModel::new(client.clone(), config))
    }
    None => {
      warn!("OPENAI_API_KEY not set, text model answers are empty");
      Arc::new(StaticTextModel::default())
    }
  };

  let generator: Arc<dyn GenerationProvider> = match &args.generation_url {
    Some(url) => {
      let mut config = PredictionConfig::new(url.clone());
      config.api_token = args.generation_token.clone();
      Arc::new(PredictionProvider::new(client.clone(), config))
    }
    None => {
      warn!("AGENTFLOW_GENERATION_URL not set, media urls are placeholders");
      Arc::new(StaticGenerationProvider::new("https://placeholder.invalid", "png"))
    }
  };

  let publisher: Arc<dyn Publisher> = match &args.publish_url {
    Some(url) => Arc::new(WebhookPublisher::new(client.clone(), url.clone())),
    None => {
      warn!("AGENTFLOW_PUBLISH_URL not set, posts are kept in memory");
      Arc::new(MemoryPublisher::new())
    }
  };

  let deps = BehaviorDeps {
    feeds: Arc::new(HttpFeedSource::new(client, policy)),
    generator,
    artifacts: Arc::new(FsArtifactSink::new(data_dir.join("artifacts"))),
    publisher,
  };
  let registry = standard_registry(&deps).context("failed to build behavior registry")?;

  let config = RuntimeConfig {
    failure_policy: if args.abort_on_failure {
      FailurePolicy::AbortRun
    } else {
      FailurePolicy::Isolate
    },
    ..RuntimeConfig::default()
  };

  Ok(Runtime::new(store, Arc::new(registry), text_model).with_config(config))
}

async fn run_workflow(runtime: &Runtime, request: RunRequest) -> Result<()> {
  let workflow_id = request.workflow_id.clone();
  let delivery = runtime
    .run(request)
    .await
    .with_context(|| format!("workflow '{}' failed", workflow_id))?;

  match delivery {
    RunDelivery::Result(result) => {
      println!("{}", serde_json::to_string_pretty(&result)?);
    }
    RunDelivery::Stream(mut events) => {
      while let Some(event) = events.next().await {
        match event {
          RunEvent::Node(node) => println!("{}", serde_json::to_string(&node)?),
          RunEvent::Finished(result) => {
            let result = result.with_context(|| format!("workflow '{}' failed", workflow_id))?;
            println!("{}", serde_json::to_string(&result)?);
          }
        }
      }
    }
  }

  Ok(())
}

async fn validate(
  args: &ServiceArgs,
  data_dir: &Path,
  store: Arc<dyn DefinitionStore>,
  workflow: &str,
) -> Result<()> {
  let path = Path::new(workflow);
  let locked = if path.extension().is_some_and(|ext| ext == "json") {
    let def = read_definition(path).await?;
    check_definition(args, data_dir, store, &def)?
  } else {
    build_runtime(args, data_dir, store)?
      .validate(workflow)
      .await
      .with_context(|| format!("workflow '{}' is invalid", workflow))?
  };

  eprintln!(
    "Workflow '{}' is valid: {} steps, depth {}",
    locked.workflow_id,
    locked.tree.len(),
    locked.tree.depth()
  );
  Ok(())
}

async fn import(
  args: &ServiceArgs,
  data_dir: &Path,
  store: Arc<dyn DefinitionStore>,
  workflow_file: &Path,
) -> Result<()> {
  let def = read_definition(workflow_file).await?;
  check_definition(args, data_dir, store.clone(), &def)?;

  store
    .save_workflow(&def)
    .await
    .with_context(|| format!("failed to save workflow '{}'", def.id))?;
  eprintln!("Imported workflow '{}'", def.id);
  Ok(())
}

async fn list(store: &dyn DefinitionStore) -> Result<()> {
  for def in store.list_workflows().await.context("failed to list workflows")? {
    let trigger = def
      .root_step()
      .map(|step| step.behavior_id.as_str())
      .unwrap_or("-");
    let status = if def.active { "active" } else { "inactive" };
    println!("{}\t{}\t{}\t{}", def.id, trigger, status, def.name.as_deref().unwrap_or(""));
  }
  Ok(())
}

async fn serve(args: &ServiceArgs, data_dir: &Path, store: Arc<dyn DefinitionStore>) -> Result<()> {
  let runtime = Arc::new(build_runtime(args, data_dir, store.clone())?);
  let (scheduler, receiver) = Scheduler::channel(100);

  let started = schedule_all(store.as_ref(), &scheduler)
    .await
    .context("failed to start schedules")?;
  if started == 0 {
    bail!("no active scheduled workflows in {}", data_dir.display());
  }
  info!(schedules = started, "serving scheduled workflows");

  let cancel = CancellationToken::new();
  let runner = tokio::spawn(ScheduleRunner::new(runtime, receiver).start(cancel.clone()));

  tokio::signal::ctrl_c()
    .await
    .context("failed to listen for ctrl-c")?;
  info!("shutting down");

  scheduler.shutdown();
  cancel.cancel();
  runner.await.context("schedule runner panicked")?;
  Ok(())
}

async fn read_definition(path: &Path) -> Result<WorkflowDef> {
  let content = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read workflow file: {}", path.display()))?;
  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse workflow file: {}", path.display()))
}

/// Lock a definition and bind its behaviors without touching the store.
fn check_definition(
  args: &ServiceArgs,
  data_dir: &Path,
  store: Arc<dyn DefinitionStore>,
  def: &WorkflowDef,
) -> Result<Workflow> {
  let workflow =
    Workflow::lock(def).with_context(|| format!("workflow '{}' is invalid", def.id))?;
  build_runtime(args, data_dir, store)?
    .registry()
    .resolve_all(&workflow.tree)
    .with_context(|| format!("workflow '{}' references unusable behaviors", def.id))?;
  Ok(workflow)
}

fn read_payload_from_stdin() -> Result<serde_json::Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    return Ok(serde_json::json!({}));
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read payload from stdin")?;

  if input.trim().is_empty() {
    Ok(serde_json::json!({}))
  } else {
    serde_json::from_str(&input).context("failed to parse payload JSON from stdin")
  }
}
