use crate::JstError;

/// Window and lookahead parameters of a traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TraversalConfig {
    /// Number of trailing symbols in every reported context window.
    pub context_size: usize,
    /// Symbols a branch keeps walking past the end of its delta before its
    /// samples rejoin the reference branch, plus one.
    pub branch_length: usize,
}

impl TraversalConfig {
    /// Configuration with `branch_length == context_size`.
    pub fn new(context_size: usize) -> Result<Self, JstError> {
        if context_size == 0 {
            return Err(JstError::InvalidConfiguration(
                "context size must be > 0".to_string(),
            ));
        }
        Ok(Self {
            context_size,
            branch_length: context_size,
        })
    }

    /// Set a longer branch lookahead.
    ///
    /// Must be at least the context size, otherwise windows reported on the
    /// reference branch could straddle a delta.
    pub fn with_branch_length(mut self, branch_length: usize) -> Result<Self, JstError> {
        if branch_length < self.context_size {
            return Err(JstError::InvalidConfiguration(format!(
                "branch length {branch_length} shorter than context size {}",
                self.context_size
            )));
        }
        self.branch_length = branch_length;
        Ok(self)
    }
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            context_size: 1,
            branch_length: 1,
        }
    }
}
