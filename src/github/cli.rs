use crate::errors::{Result, WorkflowError};
use crate::github::types::PrView;
use std::collections::HashMap;
use std::process::Command;

pub trait GitHubCli {
    fn is_available(&self) -> Result<bool>;
    fn pr_head_branch(&self, number: u64) -> Result<String>;
    fn create_pr(&self, branch: &str, base: &str, reviewers: &[&str]) -> Result<String>;
}

pub struct GitHubCliImpl;

impl GitHubCliImpl {
    pub fn new() -> Self {
        Self
    }

    fn run_command(&self, args: &[&str]) -> Result<std::process::Output> {
        let output = Command::new("gh").args(args).output().map_err(|e| {
            WorkflowError::GitHubCli {
                message: format!("Failed to execute gh command: {}", e),
                code: 1,
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WorkflowError::GitHubCli {
                message: stderr.trim().to_string(),
                code: output.status.code().unwrap_or(1),
            });
        }

        Ok(output)
    }
}

impl GitHubCli for GitHubCliImpl {
    fn is_available(&self) -> Result<bool> {
        match Command::new("gh").arg("--version").output() {
            Ok(output) => Ok(output.status.success()),
            Err(_) => Ok(false),
        }
    }

    fn pr_head_branch(&self, number: u64) -> Result<String> {
        log::debug!("Resolving head branch of PR #{}", number);

        let output = self.run_command(&[
            "pr",
            "view",
            &number.to_string(),
            "--json",
            "headRefName",
        ])?;
        let view: PrView = serde_json::from_slice(&output.stdout)?;

        log::debug!("PR #{} head branch: {}", number, view.head_ref_name);
        Ok(view.head_ref_name)
    }

    fn create_pr(&self, branch: &str, base: &str, reviewers: &[&str]) -> Result<String> {
        log::info!("Creating PR: {} → {}", branch, base);

        let mut args = vec!["pr", "create", "--head", branch, "--base", base, "--fill"];
        for &reviewer in reviewers {
            args.push("--reviewer");
            args.push(reviewer);
        }

        let output = self.run_command(&args)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let result = if !stdout.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            format!("Created PR for {}", branch)
        };

        Ok(result)
    }
}

pub struct MockGitHubCli {
    pub available: bool,
    pub head_branches: HashMap<u64, String>,
    pub create_failure: Option<(String, i32)>,
    pub created_prs: std::sync::Mutex<Vec<(String, String, Vec<String>)>>,
}

impl MockGitHubCli {
    pub fn new() -> Self {
        Self {
            available: true,
            head_branches: HashMap::new(),
            create_failure: None,
            created_prs: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn with_pr(mut self, number: u64, head_branch: &str) -> Self {
        self.head_branches.insert(number, head_branch.to_string());
        self
    }

    pub fn set_available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    pub fn failing_create(mut self, message: &str, code: i32) -> Self {
        self.create_failure = Some((message.to_string(), code));
        self
    }

    pub fn get_created_prs(&self) -> Vec<(String, String, Vec<String>)> {
        self.created_prs.lock().unwrap().clone()
    }
}

impl GitHubCli for MockGitHubCli {
    fn is_available(&self) -> Result<bool> {
        Ok(self.available)
    }

    fn pr_head_branch(&self, number: u64) -> Result<String> {
        self.head_branches
            .get(&number)
            .cloned()
            .ok_or_else(|| WorkflowError::GitHubCli {
                message: format!("no pull requests found for #{}", number),
                code: 1,
            })
    }

    fn create_pr(&self, branch: &str, base: &str, reviewers: &[&str]) -> Result<String> {
        if let Some((message, code)) = &self.create_failure {
            return Err(WorkflowError::GitHubCli {
                message: message.clone(),
                code: *code,
            });
        }
        self.created_prs.lock().unwrap().push((
            branch.to_string(),
            base.to_string(),
            reviewers.iter().map(|r| r.to_string()).collect(),
        ));
        Ok(format!("Mock PR created for {}", branch))
    }
}
