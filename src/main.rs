//! Cliquest file service - Entry Point
//!
//! Bootstraps the system folders of a project and reports its storage use.
//! Documents are held in memory, so each run starts from an empty store;
//! blobs are written under the configured blob root.
//!
//! Usage: `cliquest-files <project-id> <user-id> <user-name>`

use log::{error, info};
use std::process::ExitCode;

use cliquest_files::FileService;
use cliquest_files::auth::{Principal, ProjectAccess};
use cliquest_files::config::ServiceConfig;
use cliquest_files::error::handlers::{handle_error, user_message};
use cliquest_files::model::Creator;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize the logger (env_logger picks up RUST_LOG environment variable)
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [project_id, user_id, user_name] = args.as_slice() else {
        eprintln!("Usage: cliquest-files <project-id> <user-id> <user-name>");
        return ExitCode::from(2);
    };

    let config = match ServiceConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!("Starting file service for project {project_id}...");
    let service = FileService::from_config(&config);
    let principal = Principal::signed_in(user_id.as_str());
    let project = ProjectAccess::new(project_id.as_str(), user_id.as_str());
    let creator = Creator::new(user_id.as_str(), user_name.as_str());

    let created = match service.bootstrap(&principal, &project, &creator).await {
        Ok(created) => created,
        Err(e) => {
            handle_error(&e);
            eprintln!("{}", user_message(&e));
            return ExitCode::FAILURE;
        }
    };

    println!("Created system folders: {}", created.join(", "));

    match service.storage_used(&principal, &project).await {
        Ok(bytes) => {
            println!("Storage used: {bytes} bytes");
            ExitCode::SUCCESS
        }
        Err(e) => {
            handle_error(&e);
            eprintln!("{}", user_message(&e));
            ExitCode::FAILURE
        }
    }
}
