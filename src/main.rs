use clap::Parser;
use commands::checkout::CheckoutPr;
use commands::submit::Submit;
use errors::Result;
use git::Git;
use github::GitHubCliImpl;

mod commands;
mod config;
mod errors;
mod git;
mod github;
mod lint;
mod pipeline;

#[derive(Debug, Parser)] // requires `derive` feature
#[command(name = "prflow")]
#[command(about = "Lint, squash, commit, push and open a pull request", long_about = None)]
struct Cli {
    /// Check out the head branch of an existing pull request and exit
    #[arg(short = 'p', long = "pr-checkout", value_name = "NUMBER")]
    pr_checkout: Option<u64>,

    #[command(flatten)]
    submit: Submit,
}

fn main() {
    env_logger::init();

    let args = Cli::parse();

    let result = run(args);

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn run(args: Cli) -> Result<()> {
    let git = Git::open(".")?;
    let github = GitHubCliImpl::new();

    // -p short-circuits the pipeline entirely.
    match args.pr_checkout {
        Some(number) => CheckoutPr { number }.execute(git, github),
        None => args.submit.execute(git, github),
    }
}
