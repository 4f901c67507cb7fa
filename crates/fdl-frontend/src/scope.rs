//! Indentation scope tracking for the parser

/// Monotonic stack of indentation depths.
///
/// Each entry is strictly deeper than the one below it. The base entry is the
/// scope of the first real token of the file and is never popped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeStack {
    levels: Vec<usize>,
}

impl ScopeStack {
    pub fn new(base: usize) -> Self {
        Self { levels: vec![base] }
    }

    /// Push `scope` if it is strictly deeper than the current one
    pub fn push(&mut self, scope: usize) -> bool {
        if scope > self.current() {
            self.levels.push(scope);
            log::trace!("enter scope {scope}");
            true
        } else {
            false
        }
    }

    pub fn pop(&mut self) -> Option<usize> {
        if self.levels.len() > 1 {
            self.levels.pop()
        } else {
            None
        }
    }

    /// Scope of the innermost open block
    pub fn current(&self) -> usize {
        self.levels[self.levels.len() - 1]
    }

    pub fn base(&self) -> usize {
        self.levels[0]
    }

    /// Number of blocks opened above the base
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_requires_deeper_scope() {
        let mut stack = ScopeStack::new(0);
        assert!(stack.push(2));
        assert!(!stack.push(2));
        assert!(!stack.push(1));
        assert!(stack.push(4));
        assert_eq!(stack.current(), 4);
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn test_base_is_never_popped() {
        let mut stack = ScopeStack::new(3);
        assert!(stack.push(5));
        assert_eq!(stack.pop(), Some(5));
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.current(), 3);
        assert_eq!(stack.base(), 3);
    }
}
