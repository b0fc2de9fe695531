use std::io;
use std::process;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, shells};
use tubestrat::commands::ask::{self, AskArgs};
use tubestrat::commands::audit::{self, AuditArgs};
use tubestrat::commands::channel::{self, ChannelArgs};
use tubestrat::commands::config::{self, ConfigArgs};
use tubestrat::commands::engage::{self, EngageArgs};

const ROOT_HELP_EXAMPLES: &str = "Examples:\n  tubestrat ask \"How do I title a derby reaction video?\"\n  tubestrat audit --url https://www.youtube.com/watch?v=dQw4w9WgXcQ\n  tubestrat channel SomeChannel --report\n  tubestrat config check\n  tubestrat completion bash > ~/.local/share/bash-completion/completions/tubestrat";

const ASK_HELP_EXAMPLES: &str = "Examples:\n  tubestrat ask \"Why did my Shorts velocity drop?\"\n  echo \"Pitch me three title variants\" | tubestrat ask\n  tubestrat ask --model models/gemini-1.5-flash --dry-run --json \"Explain retries\"";

const AUDIT_HELP_EXAMPLES: &str = "Examples:\n  tubestrat audit --url https://www.youtube.com/watch?v=dQw4w9WgXcQ\n  tubestrat audit --image thumb.png --json";

#[derive(Debug, Parser)]
#[command(
    name = "tubestrat",
    about = "YouTube strategist CLI tools",
    after_help = ROOT_HELP_EXAMPLES
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Ask the strategist a question", after_help = ASK_HELP_EXAMPLES)]
    Ask(AskArgs),
    #[command(about = "Audit a thumbnail with a five-metric scorecard", after_help = AUDIT_HELP_EXAMPLES)]
    Audit(AuditArgs),
    #[command(about = "Scan recent uploads of one or more channels")]
    Channel(ChannelArgs),
    #[command(about = "Read the room: comment sentiment and summary")]
    Engage(EngageArgs),
    #[command(about = "Manage local config")]
    Config(ConfigArgs),
    #[command(about = "Generate shell completion script")]
    Completion {
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

fn print_completion(shell: CompletionShell) {
    let mut cmd = Cli::command();
    match shell {
        CompletionShell::Bash => generate(shells::Bash, &mut cmd, "tubestrat", &mut io::stdout()),
        CompletionShell::Zsh => generate(shells::Zsh, &mut cmd, "tubestrat", &mut io::stdout()),
        CompletionShell::Fish => generate(shells::Fish, &mut cmd, "tubestrat", &mut io::stdout()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Ask(args) => ask::run(args).await,
        Commands::Audit(args) => audit::run(args).await,
        Commands::Channel(args) => channel::run(args).await,
        Commands::Engage(args) => engage::run(args).await,
        Commands::Config(args) => config::run(args),
        Commands::Completion { shell } => {
            print_completion(shell);
            Ok(())
        }
    };

    if let Err(err) = result {
        eprintln!("{err}");
        process::exit(1);
    }
}
