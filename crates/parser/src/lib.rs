//! Parser for pointcut signatures of the form
//! `[static] <return type> <owner>.<method>(<param type>, ...)`.
use ir::{MethodDescriptor, MethodFlags, PointcutParseError, PointcutParser, Type};
use syntax::Spanned;

pub mod ast;
mod error;
pub mod syntax;
pub use error::Error;
pub use syntax::Span;

/// Path shown in rendered snippets of pointcut errors.
const SNIPPET_PATH: &str = "<pointcut>";

pub fn parse_pointcut(input: &str) -> Result<MethodDescriptor, Vec<Error>> {
    let ast = ast::parse(input).map_err(|err| vec![err])?;
    let mut errors = vec![];

    let owner = ast.owner.inner.as_str();
    if Type::from_keyword(owner).is_some() {
        errors.push(Error::PrimitiveOwner(ast.owner.inner.clone(), ast.owner.span));
    }
    let owner = Type::object(owner);

    let is_constructor = ast.name.inner == ir::CONSTRUCTOR_NAME;
    if let (true, Some(span)) = (is_constructor, ast.static_kw) {
        errors.push(Error::StaticConstructor(span));
    }

    let ret_ty = lower_type(&ast.ret_ty, &mut errors);
    let params: Vec<_> = ast
        .params
        .iter()
        .map(|param| {
            let ty = lower_type(param, &mut errors);
            if ty.is_void() {
                errors.push(Error::VoidParameter(param.span));
            }
            ty
        })
        .collect();

    if !errors.is_empty() {
        return Err(errors);
    }

    let flags = MethodFlags {
        is_static: ast.static_kw.is_some(),
        // Only public methods can be intercepted from foreign call sites.
        is_public: true,
    };
    Ok(MethodDescriptor::new(owner, ast.name.inner, &params, ret_ty).with_flags(flags))
}

fn lower_type(ty: &Spanned<ast::TypeName>, errors: &mut Vec<Error>) -> Type {
    let name = &ty.inner;
    let base = Type::from_keyword(&name.base).unwrap_or_else(|| Type::object(name.base.clone()));
    if base.is_void() && name.dims > 0 {
        errors.push(Error::VoidArray(ty.span));
    }
    (0..name.dims).fold(base, |elem, _| Type::array(elem))
}

/// [`PointcutParser`] backed by [`parse_pointcut`]; errors carry a rendered snippet.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignatureParser {
    pub colors: bool,
}

impl SignatureParser {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PointcutParser for SignatureParser {
    fn parse_pointcut(&self, signature: &str) -> Result<MethodDescriptor, PointcutParseError> {
        parse_pointcut(signature).map_err(|errors| {
            let mut rendered = String::new();
            for err in &errors {
                rendered.push_str(&err.render(SNIPPET_PATH, signature, self.colors));
                rendered.push('\n');
            }
            let message = errors
                .iter()
                .map(Error::label)
                .collect::<Vec<_>>()
                .join("; ");
            let err = PointcutParseError::new(signature, message).with_rendered(rendered);
            match errors.first() {
                Some(first) => err.with_span(first.span().as_range()),
                None => err,
            }
        })
    }
}
