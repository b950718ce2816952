//! Batch driver: parses, verifies, solves and emits every advice of a call site.
use std::panic::{catch_unwind, AssertUnwindSafe};

use csi_ir::{
    AdviceRef, AdviceSpecification, CallSiteSpecification, MethodDescriptor, PointcutParseError,
    PointcutParser, Type,
};
use csi_verifier::{
    advice_location, verify_advice, verify_call_site, Diagnostic, DiagnosticCode,
    DiagnosticContext, Note, TypeResolver, VerificationReport, VerifierConfig,
};
use indexmap::IndexMap;
use rayon::prelude::*;
use smol_str::SmolStr;

use crate::{
    emit::{emit, EmissionRecord, EmitError},
    stackify::{MemoizedSolver, SolverConfig, StackHandler},
};

#[derive(Debug, Clone, Default)]
pub struct CompilerConfig {
    pub verifier: VerifierConfig,
    pub solver: SolverConfig,
}

/// Outcome of compiling one call site: the units that made it, and every diagnostic.
#[derive(Debug, Clone)]
pub struct CallSiteResult {
    pub owner: Type,
    pub units: Vec<EmissionRecord>,
    pub report: VerificationReport,
}

impl CallSiteResult {
    pub fn is_success(&self) -> bool {
        self.report.is_success()
    }

    pub fn has_errors(&self) -> bool {
        self.report.has_errors()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.report.errors()
    }

    pub fn unit(&self, name: &str) -> Option<&EmissionRecord> {
        self.units.iter().find(|unit| unit.name == name)
    }
}

pub struct Compiler<P, R, H = MemoizedSolver> {
    parser: P,
    resolver: R,
    solver: H,
    cfg: CompilerConfig,
}

impl<P, R> Compiler<P, R>
where
    P: PointcutParser,
    R: TypeResolver,
{
    pub fn new(parser: P, resolver: R, cfg: CompilerConfig) -> Self {
        let solver = MemoizedSolver::new(cfg.solver);
        Self::with_solver(parser, resolver, solver, cfg)
    }
}

impl<P, R, H> Compiler<P, R, H>
where
    P: PointcutParser,
    R: TypeResolver,
    H: StackHandler,
{
    pub fn with_solver(parser: P, resolver: R, solver: H, cfg: CompilerConfig) -> Self {
        Self {
            parser,
            resolver,
            solver,
            cfg,
        }
    }

    pub fn solver(&self) -> &H {
        &self.solver
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.cfg
    }

    /// Compiles every advice of `call_site`. Call-site level errors reject the whole call
    /// site; an advice that fails only drops its own unit.
    #[instrument(level = "debug", skip_all, fields(owner = %call_site.owner()))]
    pub fn compile(&self, call_site: &CallSiteSpecification) -> CallSiteResult {
        let max_diagnostics = self.cfg.verifier.max_diagnostics;
        let mut report = verify_call_site(call_site, &self.resolver, &self.cfg.verifier);
        let mut units = Vec::new();

        if report.has_errors() {
            debug!(diagnostics = report.diagnostics.len(), "call site rejected");
            return CallSiteResult {
                owner: call_site.owner().clone(),
                units,
                report,
            };
        }

        let helpers: Vec<Type> = call_site.helpers().iter().cloned().collect();
        for (advice, name) in unit_names(call_site) {
            let compiled = catch_unwind(AssertUnwindSafe(|| {
                self.compile_advice(call_site, advice, name, &helpers)
            }))
            .unwrap_or_else(|payload| {
                let diag = Diagnostic::uncaught(payload.as_ref(), advice_location(call_site, advice))
                    .with_context(advice_context(call_site, call_site.advice(advice)));
                let mut report = VerificationReport::with_limit(max_diagnostics);
                report.push(diag);
                Err(report)
            });

            match compiled {
                Ok(unit) => units.push(unit),
                Err(advice_report) => report.absorb(advice_report),
            }
        }

        debug!(
            units = units.len(),
            diagnostics = report.diagnostics.len(),
            "compiled call site"
        );
        CallSiteResult {
            owner: call_site.owner().clone(),
            units,
            report,
        }
    }

    /// Compiles independent call sites in parallel. Results keep the input order.
    pub fn compile_all(&self, call_sites: &[CallSiteSpecification]) -> Vec<CallSiteResult> {
        call_sites
            .par_iter()
            .map(|call_site| self.compile(call_site))
            .collect()
    }

    #[instrument(level = "debug", skip_all, fields(unit = %name))]
    fn compile_advice(
        &self,
        call_site: &CallSiteSpecification,
        advice_ref: AdviceRef,
        name: SmolStr,
        helpers: &[Type],
    ) -> Result<EmissionRecord, VerificationReport> {
        let advice = call_site.advice(advice_ref);
        let parse_error = self.parse_pointcut(advice).err();

        let mut report = verify_advice(call_site, advice_ref, &self.resolver, &self.cfg.verifier);
        if let Some(err) = parse_error {
            attach_parse_error(&mut report, err);
        }
        if report.has_errors() {
            return Err(report);
        }

        let Some(pointcut) = advice.pointcut() else {
            return Err(report);
        };
        let pointcut_static = self.pointcut_static(pointcut);

        emit(
            call_site.spi(),
            helpers,
            advice,
            name,
            pointcut_static,
            &self.solver,
        )
        .map_err(|err| {
            let mut diag = Diagnostic::error(
                err.code(),
                err.to_string(),
                advice_location(call_site, advice_ref),
            )
            .with_context(advice_context(call_site, advice));
            if matches!(err, EmitError::Unsolvable { .. }) {
                diag = diag.with_note(format!(
                    "searched sequences of up to {} instructions",
                    self.cfg.solver.max_depth
                ));
            }
            report.push(diag);
            report
        })
    }

    /// Parses the advice's signature unless a pointcut is already recorded.
    fn parse_pointcut(&self, advice: &AdviceSpecification) -> Result<(), PointcutParseError> {
        if advice.pointcut().is_some() {
            return Ok(());
        }

        let pointcut = self.parser.parse_pointcut(advice.signature())?;
        if advice.set_pointcut(pointcut).is_err() {
            trace!(signature = advice.signature(), "pointcut already set");
        }
        Ok(())
    }

    fn pointcut_static(&self, pointcut: &MethodDescriptor) -> bool {
        if pointcut.is_constructor() {
            return false;
        }
        if self.cfg.verifier.should_resolve() {
            if let Ok(info) = self.resolver.resolve_method(pointcut) {
                return info.is_static;
            }
        }
        pointcut.is_static()
    }
}

fn advice_context(
    call_site: &CallSiteSpecification,
    advice: &AdviceSpecification,
) -> DiagnosticContext {
    DiagnosticContext {
        call_site: Some(call_site.owner().to_string()),
        advice: Some(advice.advice().to_string()),
        pointcut: Some(advice.signature().to_string()),
    }
}

/// The verifier only knows the signature did not parse; add the parser's reason and snippet.
fn attach_parse_error(report: &mut VerificationReport, err: PointcutParseError) {
    for diag in report
        .diagnostics
        .iter_mut()
        .filter(|diag| diag.code == DiagnosticCode::PointcutSignatureInvalid)
    {
        diag.notes.push(Note {
            message: err.message.clone(),
        });
        diag.snippet = err.rendered.clone();
    }
}

/// Unit names in declaration order: `<owner><Method>`, with an ordinal suffix when several
/// advices of the call site share a method name.
fn unit_names(call_site: &CallSiteSpecification) -> Vec<(AdviceRef, SmolStr)> {
    let mut groups: IndexMap<&str, Vec<AdviceRef>> = IndexMap::new();
    for (advice, spec) in call_site.advices() {
        groups.entry(spec.advice().name()).or_default().push(advice);
    }

    let owner = call_site.owner().class_name();
    let owner = owner.as_str();
    let mut names: Vec<_> = groups
        .iter()
        .flat_map(|(method, advices)| {
            let unique = advices.len() == 1;
            advices.iter().enumerate().map(move |(ordinal, advice)| {
                let suffix = if unique {
                    String::new()
                } else {
                    ordinal.to_string()
                };
                let name = format!("{owner}{}{suffix}", capitalize(method));
                (*advice, SmolStr::from(name))
            })
        })
        .collect();
    names.sort_by_key(|(advice, _)| *advice);
    names
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
