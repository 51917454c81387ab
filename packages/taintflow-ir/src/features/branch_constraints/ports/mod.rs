//! Constraint delivery port

/// Receives the rendered constraint of every tainted branch
pub trait ConstraintSink {
    fn on_branch_constraint(&mut self, constraint: &str);
}

impl<F> ConstraintSink for F
where
    F: FnMut(&str),
{
    fn on_branch_constraint(&mut self, constraint: &str) {
        self(constraint)
    }
}
