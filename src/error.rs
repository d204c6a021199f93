pub type Result<T> = std::result::Result<T, FlowError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FlowError {
    #[error("flow contains a cycle through node `{node}`; sankey layout requires acyclic data")]
    CyclicGraph { node: String },

    #[error("layout exceeded its budget ({elapsed_ms}ms > {budget_ms}ms)")]
    LayoutTimeout { elapsed_ms: u64, budget_ms: u64 },

    #[error("step `{referenced_by}` sends output to unknown step `{step}`")]
    UnknownStep { step: String, referenced_by: String },

    #[error("layout backend failed: {message}")]
    Backend { message: String },
}

impl FlowError {
    /// Failures the session reports without retrying on its own.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            FlowError::CyclicGraph { .. } | FlowError::LayoutTimeout { .. }
        )
    }
}
