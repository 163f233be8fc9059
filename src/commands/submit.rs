use crate::{
    config::{ConfigOverrides, Properties, RunConfig, PROPERTIES_FILE},
    errors::Result,
    git::Git,
    github::GitHubCli,
    pipeline::{self, Mode, WorkflowContext},
};
use clap::Args;

#[derive(Debug, Args)]
pub struct Submit {
    /// Update the existing pull request instead of creating one
    #[arg(short = 'u', long = "update")]
    pub update: bool,

    /// Skip the lint pass
    #[arg(short = 'l', long = "no-lint")]
    pub no_lint: bool,

    /// Skip squashing work-in-progress commits
    #[arg(short = 's', long = "no-squash")]
    pub no_squash: bool,

    /// Keep the local branch after the pull request is opened
    #[arg(short = 'k', long = "keep-branch")]
    pub keep_branch: bool,

    /// Base branch the pull request targets
    #[arg(short = 'b', long = "base", value_name = "BRANCH")]
    pub base_branch: Option<String>,
}

impl Submit {
    pub fn execute<T: GitHubCli>(&self, git: Git, github: T) -> Result<()> {
        let properties = Properties::load(&git.workdir()?.join(PROPERTIES_FILE))?;
        let config = RunConfig::resolve(&self.overrides(), &properties)?;
        log::debug!("Resolved configuration: {:?}", config);

        let mode = if self.update { Mode::Update } else { Mode::Create };
        let ctx = WorkflowContext::new(&git, mode, config)?;

        pipeline::run(&git, &github, &ctx)
    }

    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            base_branch: self.base_branch.clone(),
            skip_lint: self.no_lint,
            skip_squash: self.no_squash,
            keep_branch: self.keep_branch,
        }
    }
}
