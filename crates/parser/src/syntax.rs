//! Pest grammar for pointcut signatures and a cursor for lowering its pairs.
use std::ops::Range;

use pest::iterators::Pair;

#[derive(pest_derive::Parser)]
#[grammar = "signature.pest"]
pub struct Parser;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Span(pub u32, pub u32);

impl Span {
    pub fn from_range(r: Range<usize>) -> Self {
        Self(r.start as u32, r.end as u32)
    }

    pub fn as_range(&self) -> Range<usize> {
        self.0 as usize..self.1 as usize
    }
}

#[derive(Debug, Clone)]
pub struct Spanned<T> {
    pub span: Span,
    pub inner: T,
}

impl<T: FromSyntax> FromSyntax for Spanned<T> {
    fn from_syntax(node: &mut Node) -> Self {
        let inner = T::from_syntax(node);
        Self {
            span: node.span,
            inner,
        }
    }
}

pub trait FromSyntax {
    fn from_syntax(node: &mut Node) -> Self;
}

/// The children of one pest pair, taken by rule as the AST is built.
///
/// Every child is lowered at most once. Children nobody asks for, such as `EOI`, are dropped
/// with the node.
pub struct Node<'i> {
    pub txt: &'i str,
    pub span: Span,
    children: Vec<Pair<'i, Rule>>,
}

impl<'i> Node<'i> {
    pub fn new(pair: Pair<'i, Rule>) -> Self {
        let s = pair.as_span();
        Self {
            txt: pair.as_str(),
            span: Span::from_range(s.start()..s.end()),
            children: pair.into_inner().collect(),
        }
    }

    fn take(&mut self, rule: Rule) -> Option<Pair<'i, Rule>> {
        let pos = self.children.iter().position(|p| p.as_rule() == rule)?;
        Some(self.children.remove(pos))
    }

    /// Lowers the child matching `rule`. The grammar makes the child mandatory.
    pub fn single<T: FromSyntax>(&mut self, rule: Rule) -> T {
        match self.take(rule) {
            Some(pair) => T::from_syntax(&mut Node::new(pair)),
            None => panic!("`{rule:?}` missing from `{}`", self.txt),
        }
    }

    pub fn optional<T, F>(&mut self, rule: Rule, f: F) -> Option<T>
    where
        F: FnOnce(&mut Node<'i>) -> T,
    {
        self.take(rule).map(|pair| f(&mut Node::new(pair)))
    }

    /// Lowers every child matching `rule`, in source order.
    pub fn multi<T: FromSyntax>(&mut self, rule: Rule) -> Vec<T> {
        let (matched, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.children)
            .into_iter()
            .partition(|p| p.as_rule() == rule);
        self.children = rest;
        matched
            .into_iter()
            .map(|pair| T::from_syntax(&mut Node::new(pair)))
            .collect()
    }
}
