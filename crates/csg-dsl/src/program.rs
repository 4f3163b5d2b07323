use std::fmt;

use csg_core::{Primitive, SetOperator};

/// One grammar token of a program.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Primitive(Primitive),
    Operator(SetOperator),
}

impl Token {
    pub fn as_primitive(&self) -> Option<&Primitive> {
        match self {
            Token::Primitive(primitive) => Some(primitive),
            Token::Operator(_) => None,
        }
    }

    /// Structural identity: same primitive kind or same operator, ignoring parameters.
    pub fn same_symbol(&self, other: &Token) -> bool {
        match (self, other) {
            (Token::Primitive(a), Token::Primitive(b)) => a.kind() == b.kind(),
            (Token::Operator(a), Token::Operator(b)) => a == b,
            _ => false,
        }
    }
}

/// Address of one numeric leaf: token position and parameter position within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamSlot {
    pub token: usize,
    pub param: usize,
}

/// Postfix program over primitives and set operators.
///
/// Values are immutable in practice: every edit returns a new expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    tokens: Vec<Token>,
}

impl Expression {
    /// Wraps a token sequence without checking its stack structure.
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn primitives(&self) -> impl Iterator<Item = &Primitive> {
        self.tokens.iter().filter_map(Token::as_primitive)
    }

    /// Rank (2 or 3) of the first primitive, if there is one.
    pub fn rank(&self) -> Option<usize> {
        self.primitives().next().map(|primitive| primitive.kind().rank())
    }

    /// Every numeric leaf in token order.
    pub fn parameter_slots(&self) -> Vec<ParamSlot> {
        let mut slots = Vec::new();
        for (token, entry) in self.tokens.iter().enumerate() {
            if let Token::Primitive(primitive) = entry {
                slots.extend((0..primitive.params().len()).map(|param| ParamSlot { token, param }));
            }
        }
        slots
    }

    pub fn param(&self, slot: ParamSlot) -> Option<f64> {
        self.tokens
            .get(slot.token)
            .and_then(Token::as_primitive)
            .and_then(|primitive| primitive.params().get(slot.param).copied())
    }

    /// New expression with a single leaf replaced. `None` for an invalid slot.
    pub fn with_param(&self, slot: ParamSlot, value: f64) -> Option<Expression> {
        let primitive = self.tokens.get(slot.token)?.as_primitive()?;
        if slot.param >= primitive.params().len() {
            return None;
        }
        let mut tokens = self.tokens.clone();
        tokens[slot.token] = Token::Primitive(primitive.with_param(slot.param, value));
        Some(Expression { tokens })
    }

    /// True when both expressions share the token sequence, ignoring numeric leaves.
    pub fn same_topology(&self, other: &Expression) -> bool {
        self.tokens.len() == other.tokens.len()
            && self
                .tokens
                .iter()
                .zip(&other.tokens)
                .all(|(a, b)| a.same_symbol(b))
    }

    /// Canonical text: tokens concatenated, no whitespace, no terminator.
    pub fn to_canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "{token}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Operator(op) => write!(f, "{op}"),
            Token::Primitive(primitive) => {
                write!(f, "{}(", primitive.kind())?;
                for (index, value) in primitive.params().iter().enumerate() {
                    if index > 0 {
                        f.write_str(",")?;
                    }
                    write_number(f, *value)?;
                }
                f.write_str(")")
            }
        }
    }
}

fn write_number(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        write!(f, "{}", value as i64)
    } else {
        write!(f, "{value}")
    }
}

#[cfg(test)]
mod tests {
    use csg_core::{Primitive, PrimitiveKind, SetOperator};

    use super::{Expression, ParamSlot, Token};

    fn circle(x: f64, y: f64, r: f64) -> Token {
        Token::Primitive(Primitive::new(PrimitiveKind::Circle, vec![x, y, r]).expect("arity"))
    }

    fn sample() -> Expression {
        Expression::from_tokens(vec![
            circle(8.0, 8.0, 4.0),
            circle(12.5, 8.0, -0.0),
            Token::Operator(SetOperator::Union),
        ])
    }

    #[test]
    fn displays_canonical_numbers() {
        assert_eq!(sample().to_canonical(), "c(8,8,4)c(12.5,8,0)+");
    }

    #[test]
    fn parameter_slots_skip_operators() {
        let slots = sample().parameter_slots();
        assert_eq!(slots.len(), 6);
        assert_eq!(slots[3], ParamSlot { token: 1, param: 0 });
        assert_eq!(sample().param(slots[3]), Some(12.5));
        assert_eq!(sample().param(ParamSlot { token: 2, param: 0 }), None);
    }

    #[test]
    fn with_param_returns_new_value_with_same_topology() {
        let original = sample();
        let edited = original
            .with_param(ParamSlot { token: 0, param: 2 }, 6.0)
            .expect("slot exists");
        assert_eq!(original.to_canonical(), "c(8,8,4)c(12.5,8,0)+");
        assert_eq!(edited.to_canonical(), "c(8,8,6)c(12.5,8,0)+");
        assert!(edited.same_topology(&original));
        assert!(
            original
                .with_param(ParamSlot { token: 2, param: 0 }, 1.0)
                .is_none()
        );
    }

    #[test]
    fn topology_detects_operator_changes() {
        let other = Expression::from_tokens(vec![
            circle(1.0, 1.0, 1.0),
            circle(2.0, 2.0, 2.0),
            Token::Operator(SetOperator::Difference),
        ]);
        assert!(!sample().same_topology(&other));
        assert_eq!(sample().rank(), Some(2));
    }
}
