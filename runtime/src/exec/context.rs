use uuid::Uuid;

/// State threaded through nested evaluation calls
///
/// Never inspected by the primitives themselves; it identifies the request
/// in logs and tracks how deep into the operation graph a call sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalContext {
    request_id: Uuid,
    depth: usize,
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new()
    }
}

impl EvalContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            depth: 0,
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Context for an operand one level further down
    pub fn child(&self) -> Self {
        Self {
            request_id: self.request_id,
            depth: self.depth + 1,
        }
    }
}
