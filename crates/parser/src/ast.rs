use pest::Parser as _;
use smol_str::SmolStr;

use super::Error;
use crate::{
    syntax::{FromSyntax, Node, Parser, Rule, Spanned},
    Span,
};

/// Parses `input` into its AST. Only grammar violations are reported here.
pub fn parse(input: &str) -> Result<Pointcut, Error> {
    let mut pairs = Parser::parse(Rule::pointcut, input).map_err(Error::SyntaxError)?;
    let pair = pairs.next().ok_or_else(|| {
        Error::SyntaxError(pest::error::Error::new_from_pos(
            pest::error::ErrorVariant::CustomError {
                message: "empty pointcut".into(),
            },
            pest::Position::from_start(input),
        ))
    })?;
    Ok(Pointcut::from_syntax(&mut Node::new(pair)))
}

#[derive(Debug)]
pub struct Pointcut {
    /// Span of the `static` modifier, if present.
    pub static_kw: Option<Span>,
    pub ret_ty: Spanned<TypeName>,
    pub owner: Spanned<SmolStr>,
    pub name: Spanned<SmolStr>,
    pub params: Vec<Spanned<TypeName>>,
}

impl FromSyntax for Pointcut {
    fn from_syntax(node: &mut Node) -> Self {
        let static_kw = node.optional(Rule::static_kw, |n| n.span);
        let ret_ty = node.single(Rule::type_name);
        let Member { owner, name } = node.single(Rule::member);
        let params = node
            .optional(Rule::params, |n| n.multi(Rule::type_name))
            .unwrap_or_default();

        Self {
            static_kw,
            ret_ty,
            owner,
            name,
            params,
        }
    }
}

struct Member {
    owner: Spanned<SmolStr>,
    name: Spanned<SmolStr>,
}

impl FromSyntax for Member {
    fn from_syntax(node: &mut Node) -> Self {
        Self {
            owner: node.single(Rule::owner),
            name: node.single(Rule::method_name),
        }
    }
}

/// A type as spelled in source: a keyword or binary class name plus array dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName {
    pub base: SmolStr,
    pub dims: usize,
}

impl FromSyntax for TypeName {
    fn from_syntax(node: &mut Node) -> Self {
        let base = node.single(Rule::base_type);
        let dims = node.multi::<SmolStr>(Rule::array_suffix).len();
        Self { base, dims }
    }
}

impl FromSyntax for SmolStr {
    fn from_syntax(node: &mut Node) -> Self {
        node.txt.into()
    }
}
