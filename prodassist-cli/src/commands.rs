//! CLI subcommand handlers.

use crate::{Commands, ConfigAction};
use prodassist_core::config::{AssistantConfig, ToolServerConfig, load_config};
use prodassist_core::embeddings::LocalEmbedder;
use prodassist_core::providers::create_provider;
use prodassist_core::retrieval::{FilteredRetriever, InMemoryIndex};
use prodassist_core::{
    AgenticRag, AssistantReply, Evaluator, LinearPipeline, LlmEvaluator, LlmProvider,
    PromptLibrary,
};
use prodassist_mcp::transport::StdioTransport;
use prodassist_mcp::{McpServer, RoutedContext, ToolSession, route_query, spawn_session};
use prodassist_tools::registry::ToolRegistry;
use prodassist_tools::{DuckDuckGoSearcher, register_product_tools};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tracing::{info, warn};

/// Global flags shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Options {
    pub workspace: PathBuf,
    pub model: Option<String>,
    pub evaluate: bool,
    pub quiet: bool,
}

/// Handle a CLI subcommand.
pub async fn handle_command(command: Commands, options: &Options) -> anyhow::Result<()> {
    match command {
        Commands::Config { action } => handle_config(action, &options.workspace),
        Commands::Serve { catalog } => handle_serve(catalog, options).await,
        Commands::Ask { query, thread } => handle_ask(&query, thread.as_deref(), options).await,
        Commands::Pipeline { query } => handle_pipeline(&query, options).await,
        Commands::Lookup { query } => handle_lookup(&query, options).await,
        Commands::Chat { thread } => handle_chat(thread, options).await,
    }
}

fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_dir = workspace.join(".prodassist");
            std::fs::create_dir_all(&config_dir)?;

            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            let toml_str = toml::to_string_pretty(&AssistantConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_config(Some(workspace), None)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

/// Effective configuration with command-line overrides applied.
fn resolve_config(options: &Options) -> anyhow::Result<AssistantConfig> {
    let mut config = load_config(Some(&options.workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    if let Some(model) = &options.model {
        config.llm.model = model.clone();
    }
    if !options.evaluate {
        config.evaluation.enabled = false;
    }
    Ok(config)
}

// ---------------------------------------------------------------------------
// Server side
// ---------------------------------------------------------------------------

async fn handle_serve(catalog: Option<PathBuf>, options: &Options) -> anyhow::Result<()> {
    let mut config = resolve_config(options)?;
    if catalog.is_some() {
        config.retrieval.catalog_path = catalog;
    }
    if config.retrieval.catalog_path.is_none() {
        warn!("No product catalog configured; lookups will be empty");
    }

    let index = Arc::new(InMemoryIndex::load(&config.retrieval)?);
    let searcher = Arc::new(DuckDuckGoSearcher::new(&config.web)?);

    let mut registry = ToolRegistry::new();
    register_product_tools(&mut registry, index, searcher, &config.web)?;
    info!(tools = ?registry.list_names(), "Tool server ready");

    let mut server = McpServer::new(Arc::new(registry));
    server.run(&mut StdioTransport::stdio()).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Client side
// ---------------------------------------------------------------------------

/// How to launch the tool server from this process. When no server command
/// is configured, the child is this executable pointed at the same workspace.
fn tool_server_config(config: &AssistantConfig, workspace: &Path) -> ToolServerConfig {
    let mut server = config.server.clone();
    if server.command.is_none() {
        let mut args = vec![
            "--workspace".to_string(),
            workspace.display().to_string(),
        ];
        args.append(&mut server.args);
        server.args = args;
    }
    server
}

fn build_llm(config: &AssistantConfig) -> anyhow::Result<Arc<dyn LlmProvider>> {
    for warning in config.llm.validate() {
        warn!("{}", warning);
    }
    Ok(create_provider(&config.llm)?)
}

fn build_evaluator(
    config: &AssistantConfig,
    llm: &Arc<dyn LlmProvider>,
    prompts: &Arc<PromptLibrary>,
) -> Option<Arc<dyn Evaluator>> {
    if !config.evaluation.enabled {
        return None;
    }
    let evaluator = LlmEvaluator::new(
        llm.clone(),
        Arc::new(LocalEmbedder::new(config.retrieval.vector_dimensions)),
        prompts.clone(),
    )
    .with_questions_per_answer(config.evaluation.questions_per_answer);
    Some(Arc::new(evaluator))
}

/// The graph wired to a freshly spawned tool server.
async fn build_graph(
    config: &AssistantConfig,
    options: &Options,
) -> anyhow::Result<(AgenticRag, Arc<ToolSession>)> {
    let server = tool_server_config(config, &options.workspace);
    let session = Arc::new(spawn_session(&server).await?);
    let llm = build_llm(config)?;
    let prompts = Arc::new(PromptLibrary::new()?);

    let mut rag = AgenticRag::new(
        llm.clone(),
        Arc::new(RoutedContext::new(session.clone())),
        prompts.clone(),
        config.graph.clone(),
    );
    if let Some(evaluator) = build_evaluator(config, &llm, &prompts) {
        rag = rag.with_evaluator(evaluator);
    }
    Ok((rag, session))
}

fn print_reply(reply: &AssistantReply, config: &AssistantConfig, options: &Options) {
    println!("{}", reply.render(config.evaluation.show_footer));
    if !options.quiet {
        eprintln!(
            "[route: {} | rewrites: {}{}]",
            reply.route,
            reply.rewrites,
            reply
                .thread_id
                .as_deref()
                .map(|t| format!(" | thread: {t}"))
                .unwrap_or_default()
        );
    }
}

async fn handle_ask(query: &str, thread: Option<&str>, options: &Options) -> anyhow::Result<()> {
    let config = resolve_config(options)?;
    let (rag, session) = build_graph(&config, options).await?;

    let result = rag.run(query, thread).await;
    session.shutdown().await?;

    print_reply(&result?, &config, options);
    Ok(())
}

async fn handle_pipeline(query: &str, options: &Options) -> anyhow::Result<()> {
    let config = resolve_config(options)?;
    let index = InMemoryIndex::load(&config.retrieval)?;
    let llm = build_llm(&config)?;
    let prompts = Arc::new(PromptLibrary::new()?);

    let mut pipeline = LinearPipeline::new(
        llm.clone(),
        Arc::new(FilteredRetriever::new(index)),
        prompts.clone(),
    );
    if let Some(evaluator) = build_evaluator(&config, &llm, &prompts) {
        pipeline = pipeline.with_evaluator(evaluator);
    }

    let reply = pipeline.run(query).await?;
    print_reply(&reply, &config, options);
    Ok(())
}

async fn handle_lookup(query: &str, options: &Options) -> anyhow::Result<()> {
    let config = resolve_config(options)?;
    let session = spawn_session(&tool_server_config(&config, &options.workspace)).await?;

    let routed = route_query(&session, query).await;
    session.shutdown().await?;

    if !options.quiet {
        eprintln!("[source: {}]", routed.source);
    }
    println!("{}", routed.text);
    Ok(())
}

async fn handle_chat(thread: Option<String>, options: &Options) -> anyhow::Result<()> {
    let config = resolve_config(options)?;
    let (rag, session) = build_graph(&config, options).await?;
    let mut thread = thread;

    println!("Ask about a product. Type 'exit' to quit.");
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question, "exit" | "quit") {
            break;
        }

        match rag.run(question, thread.as_deref()).await {
            Ok(reply) => {
                thread = reply.thread_id.clone();
                print_reply(&reply, &config, options);
            }
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    session.shutdown().await?;
    Ok(())
}
