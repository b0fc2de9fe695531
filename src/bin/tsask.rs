use std::process;

use clap::Parser;
use tubestrat::commands::ask::{self, AskArgs};

#[derive(Debug, Parser)]
#[command(
    name = "tsask",
    about = "Ask the YouTube strategist a question",
    disable_version_flag = true
)]
struct Cli {
    #[command(flatten)]
    ask: AskArgs,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = ask::run(cli.ask).await {
        eprintln!("{err}");
        process::exit(1);
    }
}
