#[macro_use]
extern crate tracing;

mod config;
mod diagnostic;
mod report;
pub mod resolve;
mod verify;

pub use config::{VerificationLevel, VerifierConfig};
pub use diagnostic::{Diagnostic, DiagnosticCode, DiagnosticContext, ErrorKind, Location, Note};
pub use report::VerificationReport;
pub use resolve::{ClassDef, ClassPath, MethodInfo, ResolutionError, TypeInfo, TypeResolver};
pub use verify::{
    advice_location, resolution_diagnostic, verify_advice, verify_all, verify_call_site,
};
