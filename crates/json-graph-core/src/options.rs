/// Settings shared by the encoder and decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodecOptions {
    /// Maximum container nesting. `None` leaves depth bounded only by the
    /// call stack.
    pub max_depth: Option<usize>,
}

impl CodecOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// The configured limit, if entering one more level from `depth`
    /// would exceed it.
    pub(crate) fn exceeded_at(&self, depth: usize) -> Option<usize> {
        self.max_depth.filter(|&max| depth >= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_by_default() {
        assert_eq!(CodecOptions::new().exceeded_at(usize::MAX - 1), None);
    }

    #[test]
    fn limit_applies_at_depth() {
        let options = CodecOptions::new().with_max_depth(2);
        assert_eq!(options.exceeded_at(1), None);
        assert_eq!(options.exceeded_at(2), Some(2));
    }
}
