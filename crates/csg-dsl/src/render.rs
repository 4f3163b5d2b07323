use csg_core::{Canvas, GridShape, SetOperator, rasterize_into};

use crate::program::{Expression, Token};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StackError {
    #[error(
        "stack underflow: operator '{operator}' at token {index} needs {needed} operands, stack holds {available}"
    )]
    Underflow {
        index: usize,
        operator: SetOperator,
        needed: usize,
        available: usize,
    },
    #[error("malformed program: {depth} canvases left on the stack, expected exactly 1")]
    Malformed { depth: usize },
    #[error("stack overflow: depth {depth} at token {index} exceeds bound {bound}")]
    Overflow {
        index: usize,
        depth: usize,
        bound: usize,
    },
    #[error("token {index} is a rank-{found} primitive, grid has rank {expected}")]
    RankMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },
}

/// Replays the stack discipline of a token sequence without drawing anything.
pub fn check_structure(tokens: &[Token], bound: Option<usize>) -> Result<(), StackError> {
    let mut depth = 0usize;
    for (index, token) in tokens.iter().enumerate() {
        match token {
            Token::Primitive(_) => {
                depth += 1;
                check_bound(index, depth, bound)?;
            }
            Token::Operator(operator) => {
                let needed = operator.arity();
                if depth < needed {
                    return Err(StackError::Underflow {
                        index,
                        operator: *operator,
                        needed,
                        available: depth,
                    });
                }
                depth -= needed - 1;
            }
        }
    }
    if depth != 1 {
        return Err(StackError::Malformed { depth });
    }
    Ok(())
}

fn check_bound(index: usize, depth: usize, bound: Option<usize>) -> Result<(), StackError> {
    match bound {
        Some(bound) if depth > bound => Err(StackError::Overflow {
            index,
            depth,
            bound,
        }),
        _ => Ok(()),
    }
}

/// Stack machine that draws expressions onto canvases of one grid shape.
///
/// Each renderer owns its scratch canvases, so workers never share state.
#[derive(Debug, Clone)]
pub struct Renderer {
    shape: GridShape,
    stack_bound: Option<usize>,
    stack: Vec<Canvas>,
    spare: Vec<Canvas>,
}

impl Renderer {
    pub fn new(shape: GridShape) -> Self {
        Self {
            shape,
            stack_bound: None,
            stack: Vec::new(),
            spare: Vec::new(),
        }
    }

    /// Rejects programs whose stack ever grows beyond `bound` canvases.
    pub fn with_stack_bound(mut self, bound: usize) -> Self {
        self.stack_bound = Some(bound);
        self
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn render(&mut self, expression: &Expression) -> Result<Canvas, StackError> {
        let result = self.run(expression);
        self.spare.append(&mut self.stack);
        result
    }

    fn run(&mut self, expression: &Expression) -> Result<Canvas, StackError> {
        for (index, token) in expression.tokens().iter().enumerate() {
            match token {
                Token::Primitive(primitive) => {
                    let found = primitive.kind().rank();
                    if found != self.shape.rank() {
                        return Err(StackError::RankMismatch {
                            index,
                            expected: self.shape.rank(),
                            found,
                        });
                    }
                    check_bound(index, self.stack.len() + 1, self.stack_bound)?;
                    let mut canvas = self.take_canvas();
                    rasterize_into(primitive, &mut canvas);
                    self.stack.push(canvas);
                }
                Token::Operator(operator) => {
                    let needed = operator.arity();
                    if self.stack.len() < needed {
                        return Err(StackError::Underflow {
                            index,
                            operator: *operator,
                            needed,
                            available: self.stack.len(),
                        });
                    }
                    let (Some(rhs), Some(mut lhs)) = (self.stack.pop(), self.stack.pop()) else {
                        unreachable!("stack depth checked above");
                    };
                    operator.apply_in_place(&mut lhs, &rhs);
                    self.stack.push(lhs);
                    self.spare.push(rhs);
                }
            }
        }

        if self.stack.len() != 1 {
            return Err(StackError::Malformed {
                depth: self.stack.len(),
            });
        }
        match self.stack.pop() {
            Some(canvas) => Ok(canvas),
            None => Err(StackError::Malformed { depth: 0 }),
        }
    }

    fn take_canvas(&mut self) -> Canvas {
        self.spare
            .pop()
            .unwrap_or_else(|| Canvas::empty(self.shape))
    }
}

/// Renders onto an explicit grid shape.
pub fn render(expression: &Expression, shape: GridShape) -> Result<Canvas, StackError> {
    Renderer::new(shape).render(expression)
}

/// Renders onto a square (2-D) or cubic (3-D) grid matching the expression's rank.
pub fn render_at(expression: &Expression, resolution: usize) -> Result<Canvas, StackError> {
    let rank = expression.rank().unwrap_or(2);
    render(expression, GridShape::for_rank(rank, resolution))
}
