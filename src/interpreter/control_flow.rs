use crate::value::Value;

/// Outcome of running one statement. Blocks stop at the first non-`Normal`
/// signal; loops consume `Break`/`Continue`, calls consume `Return`.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Normal,
    Return(Value),
    Break,
    Continue,
}

impl Signal {
    pub fn is_normal(&self) -> bool {
        matches!(self, Signal::Normal)
    }
}
