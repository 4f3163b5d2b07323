use std::collections::BTreeMap;

use csg_core::{PrimitiveKind, SetOperator};

/// Symbol that ends a program; anything after it is ignored.
pub const STOP_SYMBOL: char = '$';

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GrammarError {
    #[error("terminal {line}: unknown symbol '{terminal}'")]
    UnknownSymbol { line: usize, terminal: String },
    #[error(
        "terminal {line}: primitive '{symbol}' listed with {found} parameters, grammar expects {expected}"
    )]
    Arity {
        line: usize,
        symbol: String,
        expected: usize,
        found: usize,
    },
    #[error("terminal list does not contain any primitive")]
    NoPrimitives,
}

/// Immutable symbol table of the drawing grammar.
///
/// Built once per run and handed to the parser explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct Grammar {
    primitives: BTreeMap<String, PrimitiveKind>,
    operators: Vec<SetOperator>,
    terminals: Vec<String>,
}

impl Grammar {
    /// Every primitive in 2-D and 3-D plus all set operators.
    pub fn builtin() -> Self {
        let primitives = PrimitiveKind::ALL
            .into_iter()
            .map(|kind| (kind.symbol().to_string(), kind))
            .collect();
        let operators = SetOperator::ALL.to_vec();
        let mut terminals = PrimitiveKind::ALL
            .into_iter()
            .map(|kind| kind.symbol().to_string())
            .collect::<Vec<_>>();
        terminals.extend(operators.iter().map(|op| op.symbol().to_string()));
        terminals.push(STOP_SYMBOL.to_string());
        Self {
            primitives,
            operators,
            terminals,
        }
    }

    /// Builds a grammar restricted to the listed terminals.
    ///
    /// Primitive terminals look like `c(8,8,12)`; operators are single symbols.
    /// Blank lines are skipped.
    pub fn from_terminals<'a, I>(lines: I) -> Result<Self, GrammarError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut primitives = BTreeMap::new();
        let mut operators = Vec::new();
        let mut terminals = Vec::new();

        for (index, raw) in lines.into_iter().enumerate() {
            let line = index + 1;
            let terminal = raw.trim();
            if terminal.is_empty() {
                continue;
            }
            terminals.push(terminal.to_string());

            let mut chars = terminal.chars();
            if let (Some(ch), None) = (chars.next(), chars.next()) {
                if ch == STOP_SYMBOL {
                    continue;
                }
                if let Some(op) = SetOperator::from_symbol(ch) {
                    if !operators.contains(&op) {
                        operators.push(op);
                    }
                    continue;
                }
            }

            let (symbol, arity) = split_terminal(terminal).ok_or_else(|| {
                GrammarError::UnknownSymbol {
                    line,
                    terminal: terminal.to_string(),
                }
            })?;
            let kind =
                PrimitiveKind::from_symbol(symbol).ok_or_else(|| GrammarError::UnknownSymbol {
                    line,
                    terminal: terminal.to_string(),
                })?;
            if arity != kind.arity() {
                return Err(GrammarError::Arity {
                    line,
                    symbol: symbol.to_string(),
                    expected: kind.arity(),
                    found: arity,
                });
            }
            primitives.insert(symbol.to_string(), kind);
        }

        if primitives.is_empty() {
            return Err(GrammarError::NoPrimitives);
        }

        Ok(Self {
            primitives,
            operators,
            terminals,
        })
    }

    /// Parses the contents of a terminals file (one terminal per line).
    pub fn from_terminals_text(text: &str) -> Result<Self, GrammarError> {
        Self::from_terminals(text.lines())
    }

    pub fn primitive(&self, symbol: &str) -> Option<PrimitiveKind> {
        self.primitives.get(symbol).copied()
    }

    pub fn accepts_operator(&self, op: SetOperator) -> bool {
        self.operators.contains(&op)
    }

    pub fn stop_symbol(&self) -> char {
        STOP_SYMBOL
    }

    /// Terminal vocabulary in load order.
    pub fn terminals(&self) -> &[String] {
        &self.terminals
    }
}

impl Default for Grammar {
    fn default() -> Self {
        Self::builtin()
    }
}

fn split_terminal(terminal: &str) -> Option<(&str, usize)> {
    let open = terminal.find('(')?;
    let inner = terminal[open + 1..].strip_suffix(')')?;
    let symbol = &terminal[..open];
    let arity = if inner.trim().is_empty() {
        0
    } else {
        inner.split(',').count()
    };
    Some((symbol, arity))
}
