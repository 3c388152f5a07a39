//! Control flow labels

/// One active structured construct (or the function body itself).
///
/// `continuation` is the instruction index execution resumes *after* when the
/// label is targeted: the matching `end` for `block`/`if`, the `loop`
/// instruction itself for loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label {
    pub arity: usize,
    pub continuation: usize,
}

impl Label {
    pub fn new(arity: usize, continuation: usize) -> Self {
        Label { arity, continuation }
    }

    /// A branch from `pc` to this label re-enters a loop.
    pub fn is_backward(&self, pc: usize) -> bool {
        self.continuation < pc
    }
}
