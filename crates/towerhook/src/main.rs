use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let parsed = cli::Cli::parse();

    match parsed.dispatch().await {
        Ok(()) => Ok(()),
        Err(err) => {
            // A pre-update hook exiting with EX_TEMPFAIL asks the caller to skip the update
            if let Some(hook_error) = err.downcast_ref::<towerhook_core::HookError>() {
                if hook_error.skip_update_requested() {
                    eprintln!("Error: {}", hook_error);
                    std::process::exit(towerhook_core::errors::EX_TEMPFAIL);
                }
            }

            Err(err)
        }
    }
}
