// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use mempool_cli::{
    DEFAULT_ENDPOINT, DEFAULT_USER_OP_FILE, add_user_operation, list_user_operations,
    read_user_operation,
};

#[derive(Debug, Parser)]
#[command(
    name = "mempool-cli",
    about = "submit and list pending user operations",
    version,
    after_help = "Examples:\n  mempool-cli submit userop.json\n  mempool-cli --endpoint http://127.0.0.1:50051 list"
)]
struct Args {
    #[arg(long, global = true, visible_alias = "url", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,
    #[arg(long, global = true, default_value_t = 5_000_u64)]
    timeout_ms: u64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Submit a user operation read from a JSON file, then list the pool.
    Submit {
        #[arg(default_value = DEFAULT_USER_OP_FILE)]
        file: PathBuf,
    },
    /// List every pending user operation.
    List,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let timeout = Duration::from_millis(args.timeout_ms.max(1));

    if let Command::Submit { file } = &args.command {
        let user_operation = read_user_operation(file)?;
        let added = add_user_operation(&args.endpoint, &user_operation, timeout).await?;
        println!("added: {}", added.ok);
        println!("sender: {}", added.user_operation.sender);
    }

    let listed = list_user_operations(&args.endpoint, timeout).await?;
    println!("pending user operations: {}", listed.user_operations.len());
    for user_operation in &listed.user_operations {
        println!("{}", serde_json::to_string(user_operation)?);
    }

    Ok(())
}
