use std::panic::{catch_unwind, AssertUnwindSafe};

use csi_ir::{
    AdviceKind, AdviceRef, AdviceSpecification, CallSiteSpecification, MethodDescriptor,
    ParameterSpecification,
};
use rayon::prelude::*;
use rustc_hash::FxHashSet;

use crate::{
    diagnostic::{Diagnostic, DiagnosticCode, DiagnosticContext, Location},
    report::VerificationReport,
    resolve::{ResolutionError, TypeResolver},
    VerifierConfig,
};

/// Checks the call-site level invariants: at least one advice, and a valid SPI marker.
#[instrument(level = "debug", skip_all, fields(owner = %call_site.owner()))]
pub fn verify_call_site(
    call_site: &CallSiteSpecification,
    resolver: &dyn TypeResolver,
    cfg: &VerifierConfig,
) -> VerificationReport {
    let mut report = VerificationReport::with_limit(cfg.max_diagnostics);
    let context = DiagnosticContext {
        call_site: Some(call_site.owner().to_string()),
        advice: None,
        pointcut: None,
    };
    let mut emit = |diag: Diagnostic| {
        report.push(diag.with_context(context.clone()));
    };

    if call_site.advice_count() == 0 {
        emit(Diagnostic::error(
            DiagnosticCode::ShouldHaveAdviceMethods,
            "call site declares no advice methods",
            Location::CallSite {
                owner: call_site.owner().clone(),
            },
        ));
    }

    if !call_site.has_default_spi() && cfg.should_check_spi() {
        let spi = call_site.spi();
        let location = Location::Spi { ty: spi.clone() };
        match resolver.resolve_type(spi) {
            Ok(info) if !info.is_interface => emit(Diagnostic::error(
                DiagnosticCode::SpiShouldBeAnInterface,
                format!("SPI `{spi}` must be an interface"),
                location,
            )),
            Ok(info) if info.declared_methods > 0 => emit(
                Diagnostic::error(
                    DiagnosticCode::SpiShouldBeEmpty,
                    format!("SPI `{spi}` must not declare methods"),
                    location,
                )
                .with_note(format!("found {} declared methods", info.declared_methods)),
            ),
            Ok(_) => {}
            Err(err) => emit(resolution_diagnostic(&err, location)),
        }
    }

    debug!(diagnostics = report.diagnostics.len());
    report
}

/// Runs every advice-level rule for `advice`. Independent checks all run; checks that need
/// the parsed or resolved pointcut are skipped when it is unavailable.
#[instrument(level = "debug", skip_all, fields(advice = %advice))]
pub fn verify_advice(
    call_site: &CallSiteSpecification,
    advice: AdviceRef,
    resolver: &dyn TypeResolver,
    cfg: &VerifierConfig,
) -> VerificationReport {
    let mut verifier = AdviceVerifier::new(call_site, advice, resolver, cfg);
    verifier.run();
    debug!(diagnostics = verifier.report.diagnostics.len());
    verifier.report
}

/// Verifies the call site and all of its advices, in parallel. Diagnostics keep
/// declaration order. A panic while checking one advice becomes an `Uncaught` diagnostic.
pub fn verify_all(
    call_site: &CallSiteSpecification,
    resolver: &dyn TypeResolver,
    cfg: &VerifierConfig,
) -> VerificationReport {
    let mut report = verify_call_site(call_site, resolver, cfg);

    let advices: Vec<_> = call_site.advices().map(|(advice, _)| advice).collect();
    let advice_reports: Vec<_> = advices
        .into_par_iter()
        .map(|advice| {
            catch_unwind(AssertUnwindSafe(|| {
                verify_advice(call_site, advice, resolver, cfg)
            }))
            .unwrap_or_else(|payload| {
                let mut report = VerificationReport::with_limit(cfg.max_diagnostics);
                report.push(Diagnostic::uncaught(
                    payload.as_ref(),
                    advice_location(call_site, advice),
                ));
                report
            })
        })
        .collect();

    for advice_report in advice_reports {
        report.absorb(advice_report);
    }

    report
}

pub fn advice_location(call_site: &CallSiteSpecification, advice: AdviceRef) -> Location {
    Location::Advice {
        advice,
        method: call_site.advice(advice).advice().name().into(),
    }
}

/// Turns a (possibly nested) resolution failure into one diagnostic with a note per cause.
pub fn resolution_diagnostic(err: &ResolutionError, location: Location) -> Diagnostic {
    let causes = err.causes();
    let code = match causes.first() {
        Some(ResolutionError::UnresolvedType(_)) => DiagnosticCode::UnresolvedType,
        _ => DiagnosticCode::UnresolvedMethod,
    };
    let mut diag = Diagnostic::error(code, err.to_string(), location);
    if causes.len() > 1 {
        for cause in causes {
            diag = diag.with_note(cause.to_string());
        }
    }
    diag
}

/// One row of a per-kind rule table: the rule is broken when `violated` holds.
struct KindRule {
    violated: fn(&AdviceSpecification, &MethodDescriptor) -> bool,
    code: DiagnosticCode,
    message: &'static str,
}

const BEFORE_RULES: &[KindRule] = &[
    KindRule {
        violated: |advice, _| !advice.advice().ret_ty().is_void(),
        code: DiagnosticCode::BeforeShouldReturnVoid,
        message: "before advice must return void",
    },
    KindRule {
        violated: |advice, _| advice.has_return(),
        code: DiagnosticCode::BeforeShouldNotContainReturn,
        message: "before advice cannot bind @Return",
    },
    KindRule {
        violated: |advice, pointcut| pointcut.is_constructor() && advice.has_this(),
        code: DiagnosticCode::BeforeCtorShouldNotContainThis,
        message: "before advice on a constructor cannot bind @This",
    },
];

const AROUND_RULES: &[KindRule] = &[
    KindRule {
        violated: |advice, _| advice.advice().ret_ty().is_void(),
        code: DiagnosticCode::AroundShouldNotReturnVoid,
        message: "around advice must not return void",
    },
    KindRule {
        violated: |advice, _| advice.has_return(),
        code: DiagnosticCode::AroundShouldNotContainReturn,
        message: "around advice cannot bind @Return",
    },
    KindRule {
        violated: |_, pointcut| pointcut.is_constructor(),
        code: DiagnosticCode::AroundPointcutCtor,
        message: "around advice cannot target a constructor",
    },
];

const AFTER_RULES: &[KindRule] = &[
    KindRule {
        violated: |advice, _| advice.advice().ret_ty().is_void(),
        code: DiagnosticCode::AfterShouldNotReturnVoid,
        message: "after advice must not return void",
    },
    KindRule {
        violated: |advice, pointcut| {
            pointcut.is_constructor()
                && advice.first_param() != Some(ParameterSpecification::This)
        },
        code: DiagnosticCode::AfterCtorFirstArgShouldBeThis,
        message: "after advice on a constructor must bind @This first",
    },
    KindRule {
        violated: |advice, pointcut| {
            !pointcut.is_constructor()
                && advice.last_param() != Some(ParameterSpecification::Return)
        },
        code: DiagnosticCode::AfterLastArgShouldBeReturn,
        message: "after advice must bind @Return last",
    },
];

fn kind_rules(kind: AdviceKind) -> &'static [KindRule] {
    match kind {
        AdviceKind::Before => BEFORE_RULES,
        AdviceKind::Around => AROUND_RULES,
        AdviceKind::After => AFTER_RULES,
    }
}

struct AdviceVerifier<'a> {
    call_site: &'a CallSiteSpecification,
    advice_ref: AdviceRef,
    advice: &'a AdviceSpecification,
    resolver: &'a dyn TypeResolver,
    cfg: &'a VerifierConfig,
    report: VerificationReport,
    context: DiagnosticContext,
    /// Whether the pointcut is static, if anything told us.
    pointcut_static: Option<bool>,
    resolved: bool,
}

impl<'a> AdviceVerifier<'a> {
    fn new(
        call_site: &'a CallSiteSpecification,
        advice_ref: AdviceRef,
        resolver: &'a dyn TypeResolver,
        cfg: &'a VerifierConfig,
    ) -> Self {
        let advice = call_site.advice(advice_ref);
        let context = DiagnosticContext {
            call_site: Some(call_site.owner().to_string()),
            advice: Some(advice.advice().to_string()),
            pointcut: Some(advice.signature().to_string()),
        };
        Self {
            call_site,
            advice_ref,
            advice,
            resolver,
            cfg,
            report: VerificationReport::with_limit(cfg.max_diagnostics),
            context,
            pointcut_static: None,
            resolved: false,
        }
    }

    fn run(&mut self) {
        let pointcut = self.check_pointcut();
        self.check_method_flags();
        self.check_bindings(pointcut);

        let Some(pointcut) = pointcut else {
            return;
        };
        self.check_kind_rules(pointcut);
        if self.resolved && self.cfg.should_check_compatibility() {
            self.check_compatibility(pointcut);
        }
    }

    fn emit(&mut self, diagnostic: Diagnostic) {
        self.report.push(diagnostic.with_context(self.context.clone()));
    }

    fn advice_location(&self) -> Location {
        advice_location(self.call_site, self.advice_ref)
    }

    fn param_location(&self, position: usize) -> Location {
        Location::Parameter {
            advice: self.advice_ref,
            method: self.advice.advice().name().into(),
            position,
        }
    }

    fn pointcut_location(&self) -> Location {
        Location::Pointcut {
            advice: self.advice_ref,
            signature: self.advice.signature().into(),
        }
    }

    fn check_pointcut(&mut self) -> Option<&'a MethodDescriptor> {
        let advice = self.advice;
        let Some(pointcut) = advice.pointcut() else {
            self.emit(Diagnostic::error(
                DiagnosticCode::PointcutSignatureInvalid,
                format!("pointcut `{}` could not be parsed", advice.signature()),
                self.pointcut_location(),
            ));
            return None;
        };

        if pointcut.is_constructor() {
            self.pointcut_static = Some(false);
            if !pointcut.ret_ty().is_void() {
                self.emit(Diagnostic::error(
                    DiagnosticCode::PointcutConstructorNotVoid,
                    format!(
                        "constructor pointcut must return void, found `{}`",
                        pointcut.ret_ty()
                    ),
                    self.pointcut_location(),
                ));
            }
        } else if pointcut.is_static() {
            self.pointcut_static = Some(true);
        }

        if self.cfg.should_resolve() {
            match self.resolver.resolve_method(pointcut) {
                Ok(info) => {
                    self.pointcut_static = Some(info.is_static);
                    self.resolved = true;
                }
                Err(err) => {
                    let diag = resolution_diagnostic(&err, self.pointcut_location());
                    self.emit(diag);
                }
            }
        }

        Some(pointcut)
    }

    fn check_method_flags(&mut self) {
        let method = self.advice.advice();
        if !(method.is_public() && method.is_static()) {
            self.emit(Diagnostic::error(
                DiagnosticCode::MethodNotStaticAndPublic,
                format!("advice method `{}` must be public and static", method.name()),
                self.advice_location(),
            ));
        }
    }

    fn check_bindings(&mut self, pointcut: Option<&MethodDescriptor>) {
        let advice = self.advice;
        let arity = advice.advice().params().len();

        for position in 0..arity {
            if advice.binding(position).is_none() {
                self.emit(Diagnostic::error(
                    DiagnosticCode::AdviceParameterNotAnnotated,
                    format!("advice parameter {position} has no binding"),
                    self.param_location(position),
                ));
            }
        }

        let mut this_seen = false;
        let mut return_seen = false;
        let mut args_seen = FxHashSet::default();
        let mut max_arg = None;

        for (position, param) in advice.params() {
            let location = self.param_location(position);
            if position >= arity {
                self.emit(Diagnostic::error(
                    DiagnosticCode::ParameterBeyondArity,
                    format!(
                        "{param} is bound at position {position}, \
                         but the advice takes {arity} parameters"
                    ),
                    location,
                ));
                continue;
            }

            match param {
                ParameterSpecification::This => {
                    if this_seen {
                        self.emit(Diagnostic::error(
                            DiagnosticCode::ThisDuplicated,
                            "@This is bound more than once",
                            location.clone(),
                        ));
                    } else if position != 0 {
                        self.emit(Diagnostic::error(
                            DiagnosticCode::ThisShouldBeFirst,
                            "@This must be the first advice parameter",
                            location.clone(),
                        ));
                    }
                    this_seen = true;

                    if self.pointcut_static == Some(true) {
                        self.emit(Diagnostic::error(
                            DiagnosticCode::ThisOnStaticMethod,
                            "@This cannot be bound for a static pointcut",
                            location,
                        ));
                    }
                }

                ParameterSpecification::Return => {
                    if return_seen {
                        self.emit(Diagnostic::error(
                            DiagnosticCode::ReturnDuplicated,
                            "@Return is bound more than once",
                            location,
                        ));
                    } else if position + 1 != arity {
                        self.emit(Diagnostic::error(
                            DiagnosticCode::ReturnShouldBeLast,
                            "@Return must be the last advice parameter",
                            location,
                        ));
                    }
                    return_seen = true;
                }

                ParameterSpecification::Argument(idx) => {
                    if let Some(pointcut) = pointcut {
                        let count = pointcut.params().len();
                        if idx >= count {
                            self.emit(
                                Diagnostic::error(
                                    DiagnosticCode::ArgumentOutOfBounds,
                                    format!("argument index {idx} is out of bounds"),
                                    location.clone(),
                                )
                                .with_note(format!("pointcut declares {count} parameters")),
                            );
                        }
                    }

                    if !args_seen.insert(idx) {
                        self.emit(Diagnostic::error(
                            DiagnosticCode::ArgumentDuplicated,
                            format!("argument {idx} is bound more than once"),
                            location.clone(),
                        ));
                    }
                    // Compared against every earlier argument, so a repeat is also out of order.
                    if let Some(max) = max_arg.filter(|max| idx <= *max) {
                        self.emit(Diagnostic::error(
                            DiagnosticCode::ArgumentShouldBeInOrder,
                            format!("argument {idx} is bound after argument {max}"),
                            location,
                        ));
                    }
                    max_arg = max_arg.max(Some(idx));
                }
            }
        }
    }

    fn check_kind_rules(&mut self, pointcut: &MethodDescriptor) {
        for rule in kind_rules(self.advice.kind()) {
            if (rule.violated)(self.advice, pointcut) {
                self.emit(Diagnostic::error(rule.code, rule.message, self.advice_location()));
            }
        }
    }

    fn check_compatibility(&mut self, pointcut: &MethodDescriptor) {
        let advice = self.advice;
        let method = advice.advice();

        for (position, param) in advice.params() {
            let Some(advice_ty) = method.param(position) else {
                continue;
            };
            let pointcut_ty = match param {
                ParameterSpecification::This => Some(pointcut.owner()),
                ParameterSpecification::Argument(idx) => pointcut.param(idx),
                ParameterSpecification::Return => Some(pointcut.produced_ty()),
            };
            let Some(pointcut_ty) = pointcut_ty else {
                continue;
            };

            match self.resolver.is_assignable(advice_ty, pointcut_ty) {
                Ok(true) => {}
                Ok(false) => self.emit(Diagnostic::error(
                    DiagnosticCode::ParameterNotCompatible,
                    format!(
                        "advice parameter of type `{advice_ty}` cannot accept {param} \
                         of type `{pointcut_ty}`"
                    ),
                    self.param_location(position),
                )),
                Err(err) => {
                    let diag = resolution_diagnostic(&err, self.param_location(position));
                    self.emit(diag);
                }
            }
        }

        let ret_ty = method.ret_ty();
        if ret_ty.is_void() || advice.kind() == AdviceKind::Before {
            return;
        }
        let produced = pointcut.produced_ty();
        match self.resolver.is_assignable(ret_ty, produced) {
            Ok(true) => {}
            Ok(false) => self.emit(Diagnostic::error(
                DiagnosticCode::ReturnNotCompatible,
                format!("advice return type `{ret_ty}` is not compatible with `{produced}`"),
                self.advice_location(),
            )),
            Err(err) => {
                let diag = resolution_diagnostic(&err, self.advice_location());
                self.emit(diag);
            }
        }
    }
}
