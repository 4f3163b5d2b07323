use std::fmt;

use crate::canvas::Canvas;

/// Binary set operators of the drawing grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetOperator {
    Union,
    Intersection,
    Difference,
}

impl SetOperator {
    pub const ALL: [SetOperator; 3] = [
        SetOperator::Union,
        SetOperator::Intersection,
        SetOperator::Difference,
    ];

    pub fn symbol(self) -> char {
        match self {
            SetOperator::Union => '+',
            SetOperator::Intersection => '*',
            SetOperator::Difference => '-',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.symbol() == symbol)
    }

    /// Number of canvases consumed from the stack.
    pub fn arity(self) -> usize {
        2
    }

    #[inline]
    pub fn combine(self, a: bool, b: bool) -> bool {
        match self {
            SetOperator::Union => a || b,
            SetOperator::Intersection => a && b,
            SetOperator::Difference => a && !b,
        }
    }

    /// Applies the operator elementwise, writing the result into `lhs`.
    ///
    /// Panics when the canvases have different shapes.
    pub fn apply_in_place(self, lhs: &mut Canvas, rhs: &Canvas) {
        assert_eq!(lhs.shape(), rhs.shape(), "set operands must share a grid shape");
        for (a, &b) in lhs.cells_mut().iter_mut().zip(rhs.cells()) {
            *a = self.combine(*a, b);
        }
    }
}

impl fmt::Display for SetOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Cells occupied by either operand.
pub fn union(a: &Canvas, b: &Canvas) -> Canvas {
    apply(SetOperator::Union, a, b)
}

/// Cells occupied by both operands.
pub fn intersection(a: &Canvas, b: &Canvas) -> Canvas {
    apply(SetOperator::Intersection, a, b)
}

/// Cells occupied by `a` but not by `b`.
pub fn difference(a: &Canvas, b: &Canvas) -> Canvas {
    apply(SetOperator::Difference, a, b)
}

fn apply(op: SetOperator, a: &Canvas, b: &Canvas) -> Canvas {
    let mut out = a.clone();
    op.apply_in_place(&mut out, b);
    out
}
