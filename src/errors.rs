use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("GitHub CLI operation failed: {message}")]
    GitHubCli { message: String, code: i32 },

    #[error("GitHub CLI not found")]
    GitHubCliNotFound,

    #[error("Lint run failed with exit code {0}")]
    Lint(i32),

    #[error("Editor exited with code {0}")]
    Editor(i32),

    #[error("Branch '{0}' is restricted, refusing to run")]
    RestrictedBranch(String),

    #[error("Branch '{0}' not found")]
    BranchNotFound(String),

    #[error("Branch '{0}' has no remote tracking branch")]
    NoUpstream(String),

    #[error("Branch '{0}' has diverged from its remote tracking branch")]
    Diverged(String),

    #[error("HEAD is detached, check out a branch first")]
    DetachedHead,

    #[error("Commit aborted: {0}")]
    CommitAborted(String),

    #[error("Invalid value '{value}' for property '{key}'")]
    Property { key: String, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkflowError {
    /// Exit status for the process: failed external tools propagate their own code.
    pub fn exit_code(&self) -> i32 {
        match self {
            WorkflowError::Lint(code) | WorkflowError::Editor(code) => *code,
            WorkflowError::GitHubCli { code, .. } => *code,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
