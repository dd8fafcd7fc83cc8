//! Launching the tool server and connecting a session to it.

use crate::error::McpError;
use crate::session::ToolSession;
use crate::transport::spawn_process;
use prodassist_core::config::ToolServerConfig;
use std::path::PathBuf;
use tracing::info;

/// Subcommand that starts the server when it is our own executable.
pub const SERVE_SUBCOMMAND: &str = "serve";

/// The command line used to start the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ServerCommand {
    /// A configured command is used as-is; otherwise the current executable is
    /// re-run with `serve` followed by any configured arguments.
    pub fn resolve(config: &ToolServerConfig) -> Result<Self, McpError> {
        match &config.command {
            Some(program) => Ok(Self {
                program: program.clone(),
                args: config.args.clone(),
            }),
            None => {
                let program = std::env::current_exe()?;
                let mut args = vec![SERVE_SUBCOMMAND.to_string()];
                args.extend(config.args.iter().cloned());
                Ok(Self { program, args })
            }
        }
    }
}

/// Spawn the tool server and complete the handshake over its pipes.
pub async fn spawn_session(config: &ToolServerConfig) -> Result<ToolSession, McpError> {
    let command = ServerCommand::resolve(config)?;
    info!(
        program = %command.program.display(),
        args = ?command.args,
        "Starting tool server"
    );
    let (transport, child) = spawn_process(&command.program, &command.args, &config.env)?;
    let session = ToolSession::connect(Box::new(transport)).await?;
    Ok(session.with_child(child))
}
