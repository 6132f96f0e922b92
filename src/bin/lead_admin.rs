use anyhow::Result;
use clap::Parser;
use lead_analyzer::admin_cli::{handle_admin_command, AdminCli};
use lead_analyzer::logging::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("lead_analyzer=info");
    handle_admin_command(AdminCli::parse()).await
}
