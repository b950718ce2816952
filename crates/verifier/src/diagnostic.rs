use std::{any::Any, fmt};

use csi_ir::{AdviceRef, Type};
use smol_str::SmolStr;

/// Broad class of a [`DiagnosticCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Structural,
    TypeIncompatibility,
    Resolution,
    StackUnsolvable,
    Uncaught,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    AdviceParameterNotAnnotated,
    ParameterBeyondArity,
    ThisDuplicated,
    ThisShouldBeFirst,
    ThisOnStaticMethod,
    ReturnDuplicated,
    ReturnShouldBeLast,
    ArgumentOutOfBounds,
    ArgumentDuplicated,
    ArgumentShouldBeInOrder,
    MethodNotStaticAndPublic,
    BeforeShouldReturnVoid,
    BeforeShouldNotContainReturn,
    BeforeCtorShouldNotContainThis,
    AroundShouldNotReturnVoid,
    AroundShouldNotContainReturn,
    AroundPointcutCtor,
    AfterShouldNotReturnVoid,
    AfterCtorFirstArgShouldBeThis,
    AfterLastArgShouldBeReturn,
    PointcutSignatureInvalid,
    PointcutConstructorNotVoid,
    SpiShouldBeAnInterface,
    SpiShouldBeEmpty,
    ShouldHaveAdviceMethods,
    ReturnNotCompatible,
    ParameterNotCompatible,
    UnresolvedType,
    UnresolvedMethod,
    StackUnsolvable,
    UncaughtError,
}

impl DiagnosticCode {
    pub const fn as_u16(self) -> u16 {
        match self {
            Self::AdviceParameterNotAnnotated => 100,
            Self::ParameterBeyondArity => 101,
            Self::ThisDuplicated => 102,
            Self::ThisShouldBeFirst => 103,
            Self::ThisOnStaticMethod => 104,
            Self::ReturnDuplicated => 105,
            Self::ReturnShouldBeLast => 106,
            Self::ArgumentOutOfBounds => 107,
            Self::ArgumentDuplicated => 108,
            Self::ArgumentShouldBeInOrder => 109,
            Self::MethodNotStaticAndPublic => 110,
            Self::BeforeShouldReturnVoid => 200,
            Self::BeforeShouldNotContainReturn => 201,
            Self::BeforeCtorShouldNotContainThis => 202,
            Self::AroundShouldNotReturnVoid => 210,
            Self::AroundShouldNotContainReturn => 211,
            Self::AroundPointcutCtor => 212,
            Self::AfterShouldNotReturnVoid => 220,
            Self::AfterCtorFirstArgShouldBeThis => 221,
            Self::AfterLastArgShouldBeReturn => 222,
            Self::PointcutSignatureInvalid => 300,
            Self::PointcutConstructorNotVoid => 301,
            Self::SpiShouldBeAnInterface => 400,
            Self::SpiShouldBeEmpty => 401,
            Self::ShouldHaveAdviceMethods => 402,
            Self::ReturnNotCompatible => 500,
            Self::ParameterNotCompatible => 501,
            Self::UnresolvedType => 600,
            Self::UnresolvedMethod => 601,
            Self::StackUnsolvable => 700,
            Self::UncaughtError => 900,
        }
    }

    pub fn as_str(self) -> String {
        format!("CSI{:04}", self.as_u16())
    }

    pub const fn kind(self) -> ErrorKind {
        match self.as_u16() {
            500..=599 => ErrorKind::TypeIncompatibility,
            600..=699 => ErrorKind::Resolution,
            700..=799 => ErrorKind::StackUnsolvable,
            900..=u16::MAX => ErrorKind::Uncaught,
            _ => ErrorKind::Structural,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    CallSite {
        owner: Type,
    },
    Spi {
        ty: Type,
    },
    Advice {
        advice: AdviceRef,
        method: SmolStr,
    },
    Parameter {
        advice: AdviceRef,
        method: SmolStr,
        position: usize,
    },
    Pointcut {
        advice: AdviceRef,
        signature: SmolStr,
    },
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CallSite { owner } => write!(f, "callsite {owner}"),
            Self::Spi { ty } => write!(f, "spi {ty}"),
            Self::Advice { advice, method } => write!(f, "{advice}:{method}"),
            Self::Parameter {
                advice,
                method,
                position,
            } => write!(f, "{advice}:{method}:param{position}"),
            Self::Pointcut { advice, signature } => write!(f, "{advice}:pointcut `{signature}`"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticContext {
    pub call_site: Option<String>,
    pub advice: Option<String>,
    pub pointcut: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub message: String,
    pub primary: Location,
    pub notes: Vec<Note>,
    pub context: Option<DiagnosticContext>,
    pub snippet: Option<String>,
}

impl Diagnostic {
    /// Diagnostics are always errors.
    pub fn error(code: DiagnosticCode, message: impl Into<String>, primary: Location) -> Self {
        Self {
            code,
            message: message.into(),
            primary,
            notes: Vec::new(),
            context: None,
            snippet: None,
        }
    }

    /// Wraps a panic payload caught while checking or compiling a single advice.
    pub fn uncaught(payload: &(dyn Any + Send), primary: Location) -> Self {
        let reason = payload
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("unknown panic payload");
        Self::error(
            DiagnosticCode::UncaughtError,
            format!("unexpected failure: {reason}"),
            primary,
        )
    }

    pub fn with_note(mut self, message: impl Into<String>) -> Self {
        self.notes.push(Note {
            message: message.into(),
        });
        self
    }

    pub fn with_context(mut self, context: DiagnosticContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error [{}] {} @ {}",
            self.code, self.message, self.primary
        )?;

        if let Some(context) = &self.context {
            let parts: Vec<&str> = [&context.call_site, &context.advice, &context.pointcut]
                .into_iter()
                .flatten()
                .map(String::as_str)
                .collect();
            if !parts.is_empty() {
                write!(f, " ({})", parts.join(", "))?;
            }
        }

        writeln!(f)?;

        for note in &self.notes {
            writeln!(f, "  note: {}", note.message)?;
        }

        if let Some(snippet) = &self.snippet {
            writeln!(f, "{snippet}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_render_with_prefix_and_kind() {
        assert_eq!(DiagnosticCode::ThisShouldBeFirst.as_str(), "CSI0103");
        assert_eq!(DiagnosticCode::UncaughtError.to_string(), "CSI0900");
        assert_eq!(
            DiagnosticCode::AfterLastArgShouldBeReturn.kind(),
            ErrorKind::Structural
        );
        assert_eq!(
            DiagnosticCode::ParameterNotCompatible.kind(),
            ErrorKind::TypeIncompatibility
        );
        assert_eq!(DiagnosticCode::UnresolvedMethod.kind(), ErrorKind::Resolution);
        assert_eq!(DiagnosticCode::StackUnsolvable.kind(), ErrorKind::StackUnsolvable);
        assert_eq!(DiagnosticCode::UncaughtError.kind(), ErrorKind::Uncaught);
    }

    #[test]
    fn uncaught_payloads() {
        let location = Location::CallSite {
            owner: Type::object("a.B"),
        };
        let payload: Box<dyn Any + Send> = Box::new("boom");
        let diag = Diagnostic::uncaught(payload.as_ref(), location.clone());
        assert_eq!(diag.message, "unexpected failure: boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        let diag = Diagnostic::uncaught(payload.as_ref(), location);
        assert_eq!(diag.message, "unexpected failure: bang");
        assert_eq!(diag.kind(), ErrorKind::Uncaught);
    }

    #[test]
    fn display_with_context_and_notes() {
        let diag = Diagnostic::error(
            DiagnosticCode::ArgumentOutOfBounds,
            "argument index 3 is out of bounds",
            Location::Parameter {
                advice: AdviceRef(0),
                method: "before".into(),
                position: 1,
            },
        )
        .with_note("pointcut declares 1 parameter")
        .with_context(DiagnosticContext {
            call_site: Some("foo.Advices".into()),
            advice: None,
            pointcut: Some("void a.B.c(int)".into()),
        });
        assert_eq!(
            diag.to_string(),
            "error [CSI0107] argument index 3 is out of bounds @ advice0:before:param1 \
             (foo.Advices, void a.B.c(int))\n  note: pointcut declares 1 parameter\n"
        );
    }
}
