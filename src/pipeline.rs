use crate::config::{is_restricted, RunConfig, DEFAULT_REMOTE, REVIEWERS};
use crate::errors::{Result, WorkflowError};
use crate::git::Git;
use crate::github::GitHubCli;
use crate::lint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Open a new pull request against the base branch.
    Create,
    /// Update the branch behind an existing pull request; the push alone
    /// refreshes the PR, so creation is skipped.
    Update,
}

/// State threaded through the steps. The current branch is captured once at
/// run start; squash and commit do not move HEAD off the branch, and cleanup
/// is the last step, so no step needs to re-query it.
#[derive(Debug)]
pub struct WorkflowContext {
    pub mode: Mode,
    pub config: RunConfig,
    pub current_branch: String,
}

impl WorkflowContext {
    pub fn new(git: &Git, mode: Mode, config: RunConfig) -> Result<Self> {
        Ok(Self {
            mode,
            config,
            current_branch: git.current_branch()?,
        })
    }
}

/// Run the pipeline: guard → lint → squash → commit → push → create PR →
/// cleanup. Every step is a gate; the first failure aborts the run.
pub fn run<T: GitHubCli>(git: &Git, github: &T, ctx: &WorkflowContext) -> Result<()> {
    guard(&ctx.current_branch)?;

    if ctx.config.lint_check {
        lint::run(&git.workdir()?)?;
    } else {
        log::info!("Skipping lint");
    }

    if ctx.config.squash_commits {
        squash(git, ctx)?;
    } else {
        log::info!("Skipping squash");
    }

    commit(git, &ctx.current_branch)?;
    push(git, &ctx.current_branch)?;

    match ctx.mode {
        Mode::Create => create_pr(github, ctx)?,
        Mode::Update => log::info!("Existing PR is updated by the push, skipping creation"),
    }

    cleanup(git, ctx)
}

fn guard(current_branch: &str) -> Result<()> {
    if is_restricted(current_branch) {
        return Err(WorkflowError::RestrictedBranch(current_branch.to_string()));
    }
    Ok(())
}

/// The ref the merge-base is computed against: the base branch when creating
/// a PR, the branch's own remote tracking ref when updating one.
pub(crate) fn squash_target(mode: Mode, base_branch: &str, current_branch: &str) -> String {
    match mode {
        Mode::Create => base_branch.to_string(),
        Mode::Update => format!("{}/{}", DEFAULT_REMOTE, current_branch),
    }
}

fn squash(git: &Git, ctx: &WorkflowContext) -> Result<()> {
    let target = squash_target(ctx.mode, &ctx.config.base_branch, &ctx.current_branch);
    let merge_base = git.merge_base_with(&target, DEFAULT_REMOTE).map_err(|e| match e {
        WorkflowError::BranchNotFound(_) if ctx.mode == Mode::Update => {
            WorkflowError::NoUpstream(ctx.current_branch.clone())
        }
        e => e,
    })?;

    if merge_base == git.head_oid()? {
        log::info!("No commits to squash on {}", ctx.current_branch);
        return Ok(());
    }

    git.reset_keep_worktree(merge_base)?;
    log::info!("Squashed {} to its merge-base with {}", ctx.current_branch, target);
    Ok(())
}

fn commit(git: &Git, branch: &str) -> Result<()> {
    if !git.stage_all()? {
        // Re-runs after a partial failure land here: the work is already
        // committed, so continue towards push and PR.
        log::info!("Nothing to commit on {}", branch);
        return Ok(());
    }
    let template = git.commit_template(branch)?;
    let message = git.edit_commit_message(&template)?;
    let oid = git.commit(&message)?;
    log::info!("Created commit {}", oid);
    Ok(())
}

fn push(git: &Git, branch: &str) -> Result<()> {
    if git.remote_head(DEFAULT_REMOTE, branch) == Some(git.head_oid()?) {
        println!("{}:{} is up to date", DEFAULT_REMOTE, branch);
        return Ok(());
    }
    println!("pushing {}:{}", DEFAULT_REMOTE, branch);
    git.push(DEFAULT_REMOTE, branch)?;
    println!("\r{}:{} pushed", DEFAULT_REMOTE, branch);
    Ok(())
}

fn create_pr<T: GitHubCli>(github: &T, ctx: &WorkflowContext) -> Result<()> {
    if !github.is_available()? {
        return Err(WorkflowError::GitHubCliNotFound);
    }

    match github.create_pr(&ctx.current_branch, &ctx.config.base_branch, REVIEWERS) {
        Ok(result) => {
            log::info!("✅ {}", result);
            Ok(())
        }
        Err(WorkflowError::GitHubCli { ref message, .. }) if message.contains("already exists") => {
            log::info!("ℹ️  PR for {} already exists", ctx.current_branch);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Cleanup must never touch the base branch itself or a restricted branch.
pub(crate) fn should_delete_branch(current_branch: &str, base_branch: &str, keep: bool) -> bool {
    current_branch != base_branch && !is_restricted(current_branch) && !keep
}

fn cleanup(git: &Git, ctx: &WorkflowContext) -> Result<()> {
    if !should_delete_branch(
        &ctx.current_branch,
        &ctx.config.base_branch,
        ctx.config.keep_branch_after_pr,
    ) {
        log::info!("Keeping branch {}", ctx.current_branch);
        return Ok(());
    }

    git.checkout_branch(DEFAULT_REMOTE, &ctx.config.base_branch)?;
    git.delete_branch(&ctx.current_branch)?;
    log::info!(
        "Checked out {} and deleted {}",
        ctx.config.base_branch,
        ctx.current_branch
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigOverrides;
    use crate::config::Properties;
    use crate::git::tests::{commit_all, scratch_repo, set_remote_ref, write_file};
    use crate::github::cli::MockGitHubCli;

    fn default_config() -> RunConfig {
        RunConfig::resolve(&ConfigOverrides::default(), &Properties::default()).unwrap()
    }

    fn config_with_base(base_branch: &str) -> RunConfig {
        RunConfig {
            base_branch: base_branch.to_string(),
            ..default_config()
        }
    }

    #[test]
    fn restricted_branch_aborts_before_any_step() {
        let (_dir, git) = scratch_repo();
        write_file(&git, "a.txt", "a");
        let head = commit_all(&git, "initial");

        git.create_branch("develop").unwrap();
        git.checkout_branch("origin", "develop").unwrap();

        let github_cli = MockGitHubCli::new();
        let ctx = WorkflowContext::new(&git, Mode::Create, default_config()).unwrap();
        let result = run(&git, &github_cli, &ctx);

        assert!(matches!(
            result,
            Err(WorkflowError::RestrictedBranch(ref branch)) if branch == "develop"
        ));
        // Nothing ran: no commit was made, no PR was opened.
        assert_eq!(git.head_oid().unwrap(), head);
        assert!(github_cli.get_created_prs().is_empty());
    }

    #[test]
    fn squash_target_create_uses_base_branch() {
        assert_eq!(squash_target(Mode::Create, "develop", "feature/x"), "develop");
    }

    #[test]
    fn squash_target_update_uses_remote_tracking_branch() {
        assert_eq!(
            squash_target(Mode::Update, "develop", "feature/x"),
            "origin/feature/x"
        );
    }

    #[test]
    fn create_mode_squashes_to_merge_base_with_base_branch() {
        let (_dir, git) = scratch_repo();
        write_file(&git, "a.txt", "a");
        let fork_point = commit_all(&git, "initial");
        let base = git.current_branch().unwrap();

        git.create_branch("feature/x").unwrap();
        git.checkout_branch("origin", "feature/x").unwrap();
        write_file(&git, "a.txt", "wip 1");
        commit_all(&git, "wip 1");
        write_file(&git, "a.txt", "wip 2");
        commit_all(&git, "wip 2");

        let ctx = WorkflowContext::new(&git, Mode::Create, config_with_base(&base)).unwrap();
        squash(&git, &ctx).unwrap();

        assert_eq!(git.head_oid().unwrap(), fork_point);
        let content = std::fs::read_to_string(git.workdir().unwrap().join("a.txt")).unwrap();
        assert_eq!(content, "wip 2");
    }

    #[test]
    fn update_mode_squashes_to_merge_base_with_remote_tracking_branch() {
        let (_dir, git) = scratch_repo();
        write_file(&git, "a.txt", "a");
        commit_all(&git, "initial");

        git.create_branch("feature/x").unwrap();
        git.checkout_branch("origin", "feature/x").unwrap();
        write_file(&git, "a.txt", "pushed");
        let pushed = commit_all(&git, "pushed work");

        // The remote tracking ref sits at the already-pushed commit.
        set_remote_ref(&git, "origin", "feature/x", pushed);

        write_file(&git, "a.txt", "followup");
        commit_all(&git, "followup");

        let ctx = WorkflowContext::new(&git, Mode::Update, default_config()).unwrap();
        squash(&git, &ctx).unwrap();

        // Reset lands on the pushed commit, not the fork point with develop.
        assert_eq!(git.head_oid().unwrap(), pushed);
    }

    #[test]
    fn update_mode_without_remote_tracking_branch_fails() {
        let (_dir, git) = scratch_repo();
        write_file(&git, "a.txt", "a");
        commit_all(&git, "initial");

        git.create_branch("feature/x").unwrap();
        git.checkout_branch("origin", "feature/x").unwrap();
        write_file(&git, "a.txt", "wip");
        commit_all(&git, "wip");

        let ctx = WorkflowContext::new(&git, Mode::Update, default_config()).unwrap();
        let result = squash(&git, &ctx);

        assert!(matches!(
            result,
            Err(WorkflowError::NoUpstream(ref branch)) if branch == "feature/x"
        ));
    }

    #[test]
    fn squash_skips_when_already_at_merge_base() {
        let (_dir, git) = scratch_repo();
        write_file(&git, "a.txt", "a");
        let head = commit_all(&git, "initial");
        let base = git.current_branch().unwrap();

        git.create_branch("feature/x").unwrap();
        git.checkout_branch("origin", "feature/x").unwrap();

        let ctx = WorkflowContext::new(&git, Mode::Create, config_with_base(&base)).unwrap();
        squash(&git, &ctx).unwrap();

        assert_eq!(git.head_oid().unwrap(), head);
    }

    #[test]
    fn cleanup_decision_spares_base_restricted_and_kept_branches() {
        // The base branch itself is never deleted.
        assert!(!should_delete_branch("develop", "develop", false));
        // Restricted branches are never deleted, whatever the base is.
        assert!(!should_delete_branch("master", "release/2.0", false));
        assert!(!should_delete_branch("main", "release/2.0", false));
        // The keep flag wins.
        assert!(!should_delete_branch("feature/x", "develop", true));
        // A plain feature branch goes.
        assert!(should_delete_branch("feature/x", "develop", false));
    }

    #[test]
    fn cleanup_checks_out_base_and_deletes_branch() {
        let (_dir, git) = scratch_repo();
        write_file(&git, "a.txt", "a");
        commit_all(&git, "initial");
        let base = git.current_branch().unwrap();

        git.create_branch("feature/x").unwrap();
        git.checkout_branch("origin", "feature/x").unwrap();

        let ctx = WorkflowContext::new(&git, Mode::Create, config_with_base(&base)).unwrap();
        cleanup(&git, &ctx).unwrap();

        assert_eq!(git.current_branch().unwrap(), base);
        assert!(matches!(
            git.delete_branch("feature/x"),
            Err(WorkflowError::BranchNotFound(_))
        ));
    }

    #[test]
    fn cleanup_keeps_branch_when_configured() {
        let (_dir, git) = scratch_repo();
        write_file(&git, "a.txt", "a");
        commit_all(&git, "initial");
        let base = git.current_branch().unwrap();

        git.create_branch("feature/x").unwrap();
        git.checkout_branch("origin", "feature/x").unwrap();

        let config = RunConfig {
            keep_branch_after_pr: true,
            ..config_with_base(&base)
        };
        let ctx = WorkflowContext::new(&git, Mode::Create, config).unwrap();
        cleanup(&git, &ctx).unwrap();

        assert_eq!(git.current_branch().unwrap(), "feature/x");
    }

    #[test]
    fn create_pr_attaches_fixed_reviewers() {
        let github_cli = MockGitHubCli::new();
        let ctx = WorkflowContext {
            mode: Mode::Create,
            config: default_config(),
            current_branch: "feature/x".to_string(),
        };

        create_pr(&github_cli, &ctx).unwrap();

        let created = github_cli.get_created_prs();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].0, "feature/x");
        assert_eq!(created[0].1, "develop");
        assert_eq!(created[0].2, REVIEWERS);
    }

    #[test]
    fn create_pr_tolerates_existing_pr() {
        let github_cli =
            MockGitHubCli::new().failing_create("a pull request for branch already exists", 1);
        let ctx = WorkflowContext {
            mode: Mode::Create,
            config: default_config(),
            current_branch: "feature/x".to_string(),
        };

        assert!(create_pr(&github_cli, &ctx).is_ok());
    }

    #[test]
    fn create_pr_propagates_other_failures() {
        let github_cli = MockGitHubCli::new().failing_create("API rate limit exceeded", 4);
        let ctx = WorkflowContext {
            mode: Mode::Create,
            config: default_config(),
            current_branch: "feature/x".to_string(),
        };

        let result = create_pr(&github_cli, &ctx);
        match result {
            Err(err @ WorkflowError::GitHubCli { .. }) => assert_eq!(err.exit_code(), 4),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn create_pr_requires_the_cli() {
        let github_cli = MockGitHubCli::new().set_available(false);
        let ctx = WorkflowContext {
            mode: Mode::Create,
            config: default_config(),
            current_branch: "feature/x".to_string(),
        };

        assert!(matches!(
            create_pr(&github_cli, &ctx),
            Err(WorkflowError::GitHubCliNotFound)
        ));
    }
}
