use annotate_snippets::{AnnotationKind, Level, Renderer, Snippet};
use smol_str::SmolStr;

use crate::{syntax::Rule, Span};

#[derive(Debug)]
#[allow(clippy::large_enum_variant)]
pub enum Error {
    SyntaxError(pest::error::Error<Rule>),
    VoidParameter(Span),
    VoidArray(Span),
    PrimitiveOwner(SmolStr, Span),
    StaticConstructor(Span),
}

impl Error {
    pub fn span(&self) -> Span {
        match self {
            Error::SyntaxError(err) => match err.location {
                pest::error::InputLocation::Pos(p) => Span(p as u32, p as u32),
                pest::error::InputLocation::Span((s, e)) => Span(s as u32, e as u32),
            },
            Error::VoidParameter(span) => *span,
            Error::VoidArray(span) => *span,
            Error::PrimitiveOwner(_, span) => *span,
            Error::StaticConstructor(span) => *span,
        }
    }

    /// One-line description, used as the snippet label.
    pub fn label(&self) -> String {
        match self {
            Error::SyntaxError(err) => match &err.variant {
                pest::error::ErrorVariant::ParsingError { positives, .. } if !positives.is_empty() => {
                    let expected: Vec<_> = positives.iter().map(rule_name).collect();
                    format!("expected {}", expected.join(" or "))
                }
                _ => err.variant.message().into_owned(),
            },
            Error::VoidParameter(_) => "`void` is not a valid parameter type".into(),
            Error::VoidArray(_) => "arrays of `void` are not allowed".into(),
            Error::PrimitiveOwner(name, _) => {
                format!("primitive type `{name}` cannot declare methods")
            }
            Error::StaticConstructor(_) => "constructors cannot be `static`".into(),
        }
    }

    pub fn render(&self, path: &str, content: &str, colors: bool) -> String {
        let label = self.label();
        let snippet = Level::ERROR.primary_title("invalid pointcut").element(
            Snippet::source(content)
                .line_start(1)
                .path(path)
                .fold(true)
                .annotation(
                    AnnotationKind::Primary
                        .span(self.span().as_range())
                        .label(&label),
                ),
        );
        let rend = if colors {
            Renderer::styled()
        } else {
            Renderer::plain()
        };
        rend.render(&[snippet])
    }
}

fn rule_name(rule: &Rule) -> &'static str {
    match rule {
        Rule::static_kw => "`static`",
        Rule::type_name | Rule::base_type => "type",
        Rule::member => "member",
        Rule::owner => "owner type",
        Rule::method_name | Rule::identifier => "identifier",
        Rule::params => "`(`",
        Rule::array_suffix => "`[]`",
        Rule::EOI => "end of input",
        _ => "token",
    }
}
