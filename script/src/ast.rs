use smol_str::SmolStr;
use std::ops::Range;

pub type Span = Range<usize>;

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// A whole script: the top-level items of one unit, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub items: Vec<Spanned<Item>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Let(LetDecl),
    Fn(FnDecl),
}

impl Item {
    pub fn name(&self) -> &Spanned<SmolStr> {
        match self {
            Item::Let(decl) => &decl.name,
            Item::Fn(decl) => &decl.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LetDecl {
    pub name: Spanned<SmolStr>,
    pub value: Spanned<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FnDecl {
    pub name: Spanned<SmolStr>,
    pub params: Vec<Spanned<SmolStr>>,
    pub body: Spanned<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Eq,
    Ne,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Spanned<Expr>>),
    Map(Vec<(Spanned<String>, Spanned<Expr>)>),
    Var(SmolStr),
    Call {
        callee: Box<Spanned<Expr>>,
        args: Vec<Spanned<Expr>>,
    },
    Field {
        target: Box<Spanned<Expr>>,
        name: Spanned<SmolStr>,
    },
    Not(Box<Spanned<Expr>>),
    Binary {
        op: BinaryOp,
        left: Box<Spanned<Expr>>,
        right: Box<Spanned<Expr>>,
    },
    If {
        condition: Box<Spanned<Expr>>,
        then_expr: Box<Spanned<Expr>>,
        else_expr: Box<Spanned<Expr>>,
    },
}
