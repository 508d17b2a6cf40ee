//! Syntax tree produced by the parser

use crate::types::ExpressionValue;
use std::fmt;

/// Record an expression path starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Root {
    /// The triggering event, always bound
    Event,
    /// The candidate event, bound only when two events are correlated
    Async,
}

impl Root {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "event" => Some(Self::Event),
            "async" => Some(Self::Async),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Async => "async",
        }
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Dotted traversal into a bound record, e.g. `event.data.orderId`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    pub root: Root,
    pub segments: Vec<String>,
}

impl FieldPath {
    pub fn new(root: Root, segments: Vec<String>) -> Self {
        Self { root, segments }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)?;
        for segment in &self.segments {
            write!(f, ".{segment}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(ExpressionValue),
    Path(FieldPath),
    Not(Box<Expr>),
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `&&` or `||` over two or more operands; chains stay flat so a long
    /// chain never deepens the tree
    Logical { op: LogicalOp, operands: Vec<Expr> },
    Conditional {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
}

impl Expr {
    /// Number of nodes in the tree
    pub fn node_count(&self) -> u32 {
        1 + self.children().iter().map(|child| child.node_count()).sum::<u32>()
    }

    /// Height of the tree, a lone literal has depth 1
    pub fn depth(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(|child| child.depth())
            .max()
            .unwrap_or(0)
    }

    /// Collect every field path in evaluation order
    pub fn collect_paths<'a>(&'a self, paths: &mut Vec<&'a FieldPath>) {
        if let Expr::Path(path) = self {
            paths.push(path);
        }
        for child in self.children() {
            child.collect_paths(paths);
        }
    }

    fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Literal(_) | Expr::Path(_) => Vec::new(),
            Expr::Not(operand) => vec![operand.as_ref()],
            Expr::Compare { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Expr::Logical { operands, .. } => operands.iter().collect(),
            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => vec![
                condition.as_ref(),
                then_branch.as_ref(),
                else_branch.as_ref(),
            ],
        }
    }
}

/// Fully parenthesised rendering, used in logs and to make precedence visible
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write!(f, "{value}"),
            Expr::Path(path) => write!(f, "{path}"),
            Expr::Not(operand) => write!(f, "!{operand}"),
            Expr::Compare { op, left, right } => write!(f, "({left} {} {right})", op.symbol()),
            Expr::Logical { op, operands } => {
                f.write_str("(")?;
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", op.symbol())?;
                    }
                    write!(f, "{operand}")?;
                }
                f.write_str(")")
            }
            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => write!(f, "({condition} ? {then_branch} : {else_branch})"),
        }
    }
}
