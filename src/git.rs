use crate::errors::{Result, WorkflowError};
use auth_git2::GitAuthenticator;
use git2::build::CheckoutBuilder;
use git2::{BranchType, IndexAddOption, ObjectType, Oid, Repository, ResetType, Status};
use std::path::PathBuf;
use std::process::Command;

const EDITMSG_FILE: &str = "PR_EDITMSG";

pub struct Git {
    repository: Repository,
}

impl Git {
    pub fn open(path: &str) -> Result<Self> {
        let repository = Repository::discover(path)?;
        Ok(Self { repository })
    }

    pub fn workdir(&self) -> Result<PathBuf> {
        self.repository
            .workdir()
            .map(PathBuf::from)
            .ok_or_else(|| WorkflowError::Git(git2::Error::from_str("repository has no work directory")))
    }

    /// Name of the branch HEAD points to.
    pub fn current_branch(&self) -> Result<String> {
        let head = self.repository.head()?;
        if !head.is_branch() {
            return Err(WorkflowError::DetachedHead);
        }
        head.shorthand()
            .map(str::to_string)
            .ok_or(WorkflowError::DetachedHead)
    }

    pub fn head_oid(&self) -> Result<Oid> {
        Ok(self.repository.head()?.peel_to_commit()?.id())
    }

    /// Resolve a branch name or rev to a commit, falling back to the remote
    /// tracking ref when no local ref matches.
    fn resolve_commit(&self, name: &str, remote: &str) -> Result<git2::Commit> {
        let object = match self.repository.revparse_single(name) {
            Ok(object) => object,
            Err(_) if !name.contains('/') => self
                .repository
                .revparse_single(&format!("{}/{}", remote, name))
                .map_err(|_| WorkflowError::BranchNotFound(name.to_string()))?,
            Err(_) => return Err(WorkflowError::BranchNotFound(name.to_string())),
        };
        let commit = object
            .peel(ObjectType::Commit)?
            .into_commit()
            .map_err(|_| WorkflowError::Git(git2::Error::from_str("not a commit")))?;
        Ok(commit)
    }

    /// Merge-base of HEAD and the given branch or rev.
    pub fn merge_base_with(&self, name: &str, remote: &str) -> Result<Oid> {
        let theirs = self.resolve_commit(name, remote)?.id();
        let head = self.head_oid()?;
        Ok(self.repository.merge_base(head, theirs)?)
    }

    /// Move the branch pointer back to `oid`, keeping the working tree: the
    /// commits since that point become uncommitted changes.
    pub fn reset_keep_worktree(&self, oid: Oid) -> Result<()> {
        let object = self.repository.find_object(oid, None)?;
        self.repository.reset(&object, ResetType::Mixed, None)?;
        Ok(())
    }

    /// Stage every working-tree change, `git add -A` style.
    ///
    /// Returns false when the staged tree is identical to HEAD's tree.
    pub fn stage_all(&self) -> Result<bool> {
        let mut index = self.repository.index()?;
        index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
        index.write()?;
        let tree_id = index.write_tree()?;
        let head_tree = match self.repository.head() {
            Ok(head) => Some(head.peel_to_tree()?.id()),
            Err(_) => None,
        };
        Ok(head_tree != Some(tree_id))
    }

    /// Commit the staged tree on HEAD.
    pub fn commit(&self, message: &str) -> Result<Oid> {
        let signature = self.repository.signature()?;
        let mut index = self.repository.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.repository.find_tree(tree_id)?;
        let parents = match self.repository.head() {
            Ok(head) => vec![head.peel_to_commit()?],
            Err(_) => vec![],
        };
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        let oid = self.repository.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parent_refs,
        )?;
        Ok(oid)
    }

    /// Commit-message template listing the staged paths.
    pub fn commit_template(&self, branch: &str) -> Result<String> {
        let mut template = String::from("\n");
        template.push_str("# Please enter the commit message for your changes.\n");
        template.push_str("# Lines starting with '#' are ignored; an empty message aborts the commit.\n");
        template.push_str(&format!("# On branch {}\n", branch));
        template.push_str("# Changes to be committed:\n");
        for path in self.staged_paths()? {
            template.push_str(&format!("#\t{}\n", path));
        }
        Ok(template)
    }

    fn staged_paths(&self) -> Result<Vec<String>> {
        let staged = Status::INDEX_NEW
            | Status::INDEX_MODIFIED
            | Status::INDEX_DELETED
            | Status::INDEX_RENAMED
            | Status::INDEX_TYPECHANGE;
        let statuses = self.repository.statuses(None)?;
        let mut paths = Vec::new();
        for entry in statuses.iter() {
            if entry.status().intersects(staged) {
                if let Some(path) = entry.path() {
                    paths.push(path.to_string());
                }
            }
        }
        Ok(paths)
    }

    /// Open the operator's editor on the template and return the message
    /// with comment lines stripped.
    pub fn edit_commit_message(&self, template: &str) -> Result<String> {
        let path = self.repository.path().join(EDITMSG_FILE);
        std::fs::write(&path, template)?;

        let editor = self.editor();
        let status = Command::new("sh")
            .arg("-c")
            .arg(format!("{} '{}'", editor, path.display()))
            .status()?;
        if !status.success() {
            return Err(WorkflowError::Editor(status.code().unwrap_or(1)));
        }

        let content = std::fs::read_to_string(&path)?;
        let message = strip_comment_lines(&content);
        if message.is_empty() {
            return Err(WorkflowError::CommitAborted("empty commit message".to_string()));
        }
        Ok(message)
    }

    fn editor(&self) -> String {
        if let Ok(editor) = std::env::var("GIT_EDITOR") {
            return editor;
        }
        if let Ok(config) = self.repository.config() {
            if let Ok(editor) = config.get_string("core.editor") {
                return editor;
            }
        }
        std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string())
    }

    /// Head of the remote tracking branch, if one is known locally.
    pub fn remote_head(&self, remote: &str, branch: &str) -> Option<Oid> {
        self.repository
            .find_branch(&format!("{}/{}", remote, branch), BranchType::Remote)
            .ok()
            .and_then(|branch| branch.get().target())
    }

    /// Push the branch to the remote, establishing upstream tracking if absent.
    pub fn push(&self, remote_name: &str, branch: &str) -> Result<()> {
        let mut remote = self.repository.find_remote(remote_name)?;
        let auth = GitAuthenticator::default();
        let refspec = format!("refs/heads/{}:refs/heads/{}", branch, branch);
        auth.push(&self.repository, &mut remote, &[refspec.as_str()])?;

        let mut local = self.repository.find_branch(branch, BranchType::Local)?;
        if local.upstream().is_err() {
            local.set_upstream(Some(&format!("{}/{}", remote_name, branch)))?;
            log::debug!("Set upstream of {} to {}/{}", branch, remote_name, branch);
        }
        Ok(())
    }

    /// Fetch the remote's default refspecs.
    pub fn fetch(&self, remote_name: &str) -> Result<()> {
        let mut remote = self.repository.find_remote(remote_name)?;
        let auth = GitAuthenticator::default();
        auth.fetch(&self.repository, &mut remote, &[], None)?;
        Ok(())
    }

    /// Create a local branch tracking `remote/name`. An existing local
    /// branch is left as it is.
    pub fn create_tracking_branch(&self, remote: &str, name: &str) -> Result<()> {
        if self.repository.find_branch(name, BranchType::Local).is_ok() {
            log::debug!("Branch {} already exists locally", name);
            return Ok(());
        }
        let remote_ref = format!("{}/{}", remote, name);
        let remote_branch = self
            .repository
            .find_branch(&remote_ref, BranchType::Remote)
            .map_err(|_| WorkflowError::BranchNotFound(remote_ref.clone()))?;
        let commit = remote_branch.get().peel_to_commit()?;
        let mut local = self.repository.branch(name, &commit, false)?;
        local.set_upstream(Some(&remote_ref))?;
        Ok(())
    }

    /// Check out a local branch, creating it from the remote tracking ref
    /// when no local one exists.
    pub fn checkout_branch(&self, remote: &str, name: &str) -> Result<()> {
        if self.repository.find_branch(name, BranchType::Local).is_err() {
            self.create_tracking_branch(remote, name)?;
        }
        let branch = self.repository.find_branch(name, BranchType::Local)?;
        let commit = branch.get().peel_to_commit()?;
        self.repository
            .checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().safe()))?;
        self.repository.set_head(&format!("refs/heads/{}", name))?;
        Ok(())
    }

    /// Force-delete a local branch.
    pub fn delete_branch(&self, name: &str) -> Result<()> {
        let mut branch = self
            .repository
            .find_branch(name, BranchType::Local)
            .map_err(|_| WorkflowError::BranchNotFound(name.to_string()))?;
        branch.delete()?;
        Ok(())
    }

    /// Fetch the branch and fast-forward the local ref to it. A diverged
    /// branch is an error, there is no merge here.
    pub fn pull_fast_forward(&self, remote_name: &str, branch: &str) -> Result<()> {
        let mut remote = self.repository.find_remote(remote_name)?;
        let auth = GitAuthenticator::default();
        let refspec = format!("refs/heads/{}:refs/remotes/{}/{}", branch, remote_name, branch);
        auth.fetch(&self.repository, &mut remote, &[refspec.as_str()], None)?;

        let remote_ref = format!("{}/{}", remote_name, branch);
        let remote_branch = self
            .repository
            .find_branch(&remote_ref, BranchType::Remote)
            .map_err(|_| WorkflowError::BranchNotFound(remote_ref))?;
        let annotated = self
            .repository
            .reference_to_annotated_commit(remote_branch.get())?;

        let (analysis, _) = self.repository.merge_analysis(&[&annotated])?;
        if analysis.is_up_to_date() {
            log::debug!("{} is up to date", branch);
            return Ok(());
        }
        if !analysis.is_fast_forward() {
            return Err(WorkflowError::Diverged(branch.to_string()));
        }

        let refname = format!("refs/heads/{}", branch);
        let mut reference = self.repository.find_reference(&refname)?;
        reference.set_target(annotated.id(), "pull: fast-forward")?;
        self.repository.set_head(&refname)?;
        self.repository
            .checkout_head(Some(CheckoutBuilder::new().force()))?;
        Ok(())
    }

    /// Create a local branch at HEAD without checking it out.
    pub fn create_branch(&self, name: &str) -> Result<()> {
        let commit = self.repository.head()?.peel_to_commit()?;
        self.repository.branch(name, &commit, false)?;
        Ok(())
    }
}

fn strip_comment_lines(content: &str) -> String {
    content
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
