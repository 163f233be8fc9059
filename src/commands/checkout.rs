use crate::{
    config::DEFAULT_REMOTE,
    errors::{Result, WorkflowError},
    git::Git,
    github::GitHubCli,
};

/// Check out the head branch of an existing pull request: fetch, resolve the
/// branch name through the hosting CLI, create a local tracking branch, pull.
#[derive(Debug)]
pub struct CheckoutPr {
    pub number: u64,
}

impl CheckoutPr {
    pub fn execute<T: GitHubCli>(&self, git: Git, github: T) -> Result<()> {
        if !github.is_available()? {
            return Err(WorkflowError::GitHubCliNotFound);
        }

        log::info!("Fetching {}", DEFAULT_REMOTE);
        git.fetch(DEFAULT_REMOTE)?;

        let branch = github.pr_head_branch(self.number)?;
        log::info!("PR #{} head branch is {}", self.number, branch);

        git.create_tracking_branch(DEFAULT_REMOTE, &branch)?;
        git.checkout_branch(DEFAULT_REMOTE, &branch)?;
        git.pull_fast_forward(DEFAULT_REMOTE, &branch)?;

        println!("Checked out {} for PR #{}", branch, self.number);
        Ok(())
    }
}
