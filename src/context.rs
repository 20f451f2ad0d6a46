use uuid::Uuid;

/// Per-invocation context threaded through every pipeline stage
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub file_name: String,
}

impl RequestContext {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            file_name: file_name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_context_gets_its_own_id() {
        let a = RequestContext::new("label.png");
        let b = RequestContext::new("label.png");
        assert_ne!(a.request_id, b.request_id);
        assert_eq!(a.file_name, "label.png");
    }
}
