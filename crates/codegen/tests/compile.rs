mod common;

use common::{advice, class_path, string, url};
use csi_codegen::{CallSiteResult, Compiler, CompilerConfig, Memoized, Operation, StackHandler};
use csi_ir::{
    AdviceKind, CallSiteSpecification, Category, MethodDescriptor, ParameterSpecification::*,
    Slot, StackInst, StackInsts, StackLayout, Type,
};
use csi_parser::SignatureParser;
use csi_verifier::{ClassPath, ErrorKind, MethodInfo, ResolutionError, TypeInfo, TypeResolver};

const CONCAT: &str = "java.lang.String java.lang.String.concat(java.lang.String)";
const URL_INIT: &str = "void java.net.URL.<init>(java.lang.String)";

fn compiler() -> Compiler<SignatureParser, ClassPath> {
    Compiler::new(SignatureParser::new(), class_path(), CompilerConfig::default())
}

fn codes(result: &CallSiteResult) -> Vec<String> {
    result.errors().map(|diag| diag.code.as_str()).collect()
}

/// The non-stack operations of a unit, by shape.
fn calls(ops: &[Operation]) -> Vec<&'static str> {
    ops.iter()
        .filter_map(|op| match op {
            Operation::Stack(_) => None,
            Operation::InvokeAdvice(_) => Some("advice"),
            Operation::InvokeOriginal => Some("original"),
            Operation::CheckCast(_) => Some("checkcast"),
        })
        .collect()
}

#[test]
fn before_without_stack_shuffle() {
    let mut call_site = CallSiteSpecification::new(Type::object("foo.StringCallSite"));
    call_site.push_advice(advice(
        AdviceKind::Before,
        "foo.StringCallSite",
        "beforeValueOf",
        &[],
        Type::Void,
        "java.lang.String java.lang.String.valueOf(long)",
        &[],
    ));

    let result = compiler().compile(&call_site);
    assert!(result.is_success(), "{}", result.report);
    let unit = result.unit("foo.StringCallSiteBeforeValueOf").unwrap();
    assert_eq!(unit.stack_insts().count(), 0);
    assert_eq!(calls(&unit.ops), ["advice", "original"]);
}

#[test]
fn before_copies_bound_argument() {
    let mut call_site = CallSiteSpecification::new(Type::object("foo.StringCallSite"));
    call_site.push_advice(advice(
        AdviceKind::Before,
        "foo.StringCallSite",
        "beforeConcat",
        &[string()],
        Type::Void,
        CONCAT,
        &[(0, Argument(0))],
    ));

    let result = compiler().compile(&call_site);
    assert!(result.is_success(), "{}", result.report);
    let unit = &result.units[0];
    assert_eq!(unit.ops[0], Operation::Stack(StackInst::Dup));
    assert_eq!(unit.stack_insts().collect::<Vec<_>>(), [StackInst::Dup]);
    assert_eq!(calls(&unit.ops), ["advice", "original"]);
}

#[test]
fn before_binding_the_only_argument_still_copies_it() {
    // The original call consumes its argument, so the advice needs its own copy even when
    // nothing else is on the stack.
    let mut call_site = CallSiteSpecification::new(Type::object("foo.StringCallSite"));
    call_site.push_advice(advice(
        AdviceKind::Before,
        "foo.StringCallSite",
        "beforeValueOf",
        &[Type::Int],
        Type::Void,
        "static java.lang.String java.lang.String.valueOf(int)",
        &[(0, Argument(0))],
    ));

    let result = compiler().compile(&call_site);
    assert!(result.is_success(), "{}", result.report);
    let unit = result.unit("foo.StringCallSiteBeforeValueOf").unwrap();
    assert_eq!(unit.stack_insts().collect::<Vec<_>>(), [StackInst::Dup]);
    assert_eq!(
        unit.ops.iter().map(ToString::to_string).collect::<Vec<_>>(),
        [
            "DUP",
            "INVOKESTATIC foo/StringCallSite.beforeValueOf(I)V",
            "INVOKE <original>",
        ]
    );
}

#[test]
fn after_constructor() {
    let mut call_site = CallSiteSpecification::new(Type::object("foo.UrlCallSite"));
    call_site.push_advice(advice(
        AdviceKind::After,
        "foo.UrlCallSite",
        "afterCtor",
        &[url(), string()],
        url(),
        URL_INIT,
        &[(0, This), (1, Argument(0))],
    ));

    let result = compiler().compile(&call_site);
    assert!(result.is_success(), "{}", result.report);
    assert_eq!(result.units.len(), 1);
    insta::assert_snapshot!(result.units[0].to_string(), @r"
    unit foo.UrlCallSiteAfterCtor implements csi.CallSiteAdvice
      helpers: foo.UrlCallSite
      After java/net/URL.<init>(Ljava/lang/String;)V
        DUP_X1
        INVOKE <original>
        INVOKESTATIC foo/UrlCallSite.afterCtor(Ljava/net/URL;Ljava/lang/String;)Ljava/net/URL;
    ");
}

#[test]
fn after_and_around_cast_to_the_produced_type() {
    let mut call_site = CallSiteSpecification::new(Type::object("foo.StringCallSite"));
    call_site.push_advice(advice(
        AdviceKind::After,
        "foo.StringCallSite",
        "afterConcat",
        &[string(), string(), string()],
        Type::java_lang_object(),
        CONCAT,
        &[(0, This), (1, Argument(0)), (2, Return)],
    ));
    call_site.push_advice(advice(
        AdviceKind::Around,
        "foo.StringCallSite",
        "aroundConcat",
        &[string(), string()],
        string(),
        CONCAT,
        &[(0, This), (1, Argument(0))],
    ));

    let result = compiler().compile(&call_site);
    assert!(result.is_success(), "{}", result.report);

    let after = result.unit("foo.StringCallSiteAfterConcat").unwrap();
    assert_eq!(
        after.stack_insts().collect::<Vec<_>>(),
        [StackInst::Dup2]
    );
    assert_eq!(calls(&after.ops), ["original", "advice", "checkcast"]);
    assert_eq!(
        after.ops.last(),
        Some(&Operation::CheckCast(string()))
    );

    let around = result.unit("foo.StringCallSiteAroundConcat").unwrap();
    assert_eq!(calls(&around.ops), ["advice"]);
    assert_eq!(around.stack_insts().count(), 0);
}

#[test]
fn shared_method_names_get_ordinals() {
    let mut call_site = CallSiteSpecification::new(Type::object("foo.StringCallSite"));
    for signature in [CONCAT, "java.lang.String java.lang.String.valueOf(int)"] {
        call_site.push_advice(advice(
            AdviceKind::Before,
            "foo.StringCallSite",
            "onCall",
            &[],
            Type::Void,
            signature,
            &[],
        ));
    }

    let result = compiler().compile(&call_site);
    assert!(result.is_success(), "{}", result.report);
    let names: Vec<_> = result.units.iter().map(|unit| unit.name.as_str()).collect();
    assert_eq!(names, ["foo.StringCallSiteOnCall0", "foo.StringCallSiteOnCall1"]);
    assert_ne!(result.units[0].pointcut, result.units[1].pointcut);
}

/// Solves nothing but the identity.
struct Stubborn;

impl StackHandler for Stubborn {
    fn solve(&self, current: &StackLayout, target: &StackLayout) -> Option<StackInsts> {
        (current == target).then(StackInsts::new)
    }
}

#[test]
fn unsolvable_stack_drops_only_that_unit() {
    let mut call_site = CallSiteSpecification::new(Type::object("foo.StringCallSite"));
    call_site.push_advice(advice(
        AdviceKind::Before,
        "foo.StringCallSite",
        "beforeConcat",
        &[string()],
        Type::Void,
        CONCAT,
        &[(0, Argument(0))],
    ));
    call_site.push_advice(advice(
        AdviceKind::Around,
        "foo.StringCallSite",
        "aroundConcat",
        &[string(), string()],
        string(),
        CONCAT,
        &[(0, This), (1, Argument(0))],
    ));

    let compiler = Compiler::with_solver(
        SignatureParser::new(),
        class_path(),
        Stubborn,
        CompilerConfig::default(),
    );
    let result = compiler.compile(&call_site);

    assert_eq!(codes(&result), ["CSI0700"]);
    assert!(result.report.has_kind(ErrorKind::StackUnsolvable));
    let diag = result.errors().next().unwrap();
    assert_eq!(diag.message, "no stack transform from [s0 s1] to [s0 s1 s1]");
    assert_eq!(diag.notes.len(), 1);

    assert_eq!(result.units.len(), 1);
    assert_eq!(result.units[0].name, "foo.StringCallSiteAroundConcat");
}

#[test]
fn unparsable_pointcut_carries_parser_output() {
    let mut call_site = CallSiteSpecification::new(Type::object("foo.StringCallSite"));
    call_site.push_advice(advice(
        AdviceKind::Before,
        "foo.StringCallSite",
        "broken",
        &[],
        Type::Void,
        "void java.lang.String.concat(void)",
        &[],
    ));
    call_site.push_advice(advice(
        AdviceKind::Before,
        "foo.StringCallSite",
        "fine",
        &[],
        Type::Void,
        CONCAT,
        &[],
    ));

    let result = compiler().compile(&call_site);
    assert_eq!(codes(&result), ["CSI0300"]);
    let diag = result.errors().next().unwrap();
    assert_eq!(diag.notes.len(), 1);
    assert!(diag.snippet.as_deref().is_some_and(|s| s.contains("invalid pointcut")));
    assert!(call_site.advices().next().unwrap().1.pointcut().is_none());

    assert_eq!(result.units.len(), 1);
    assert_eq!(result.units[0].name, "foo.StringCallSiteFine");
}

#[test]
fn verification_failure_drops_only_that_unit() {
    let mut call_site = CallSiteSpecification::new(Type::object("foo.StringCallSite"));
    call_site.push_advice(advice(
        AdviceKind::Before,
        "foo.StringCallSite",
        "bad",
        &[string()],
        string(),
        CONCAT,
        &[(0, Argument(0))],
    ));
    call_site.push_advice(advice(
        AdviceKind::Before,
        "foo.StringCallSite",
        "good",
        &[string()],
        Type::Void,
        CONCAT,
        &[(0, Argument(0))],
    ));

    let result = compiler().compile(&call_site);
    assert_eq!(codes(&result), ["CSI0200"]);
    assert_eq!(result.units.len(), 1);
    assert_eq!(result.units[0].name, "foo.StringCallSiteGood");
}

#[test]
fn call_site_errors_reject_every_advice() {
    let mut call_site = CallSiteSpecification::new(Type::object("foo.StringCallSite"))
        .with_spi(Type::object("csi.NotAnInterface"));
    call_site.push_advice(advice(
        AdviceKind::Before,
        "foo.StringCallSite",
        "good",
        &[],
        Type::Void,
        CONCAT,
        &[],
    ));

    let result = compiler().compile(&call_site);
    assert_eq!(codes(&result), ["CSI0400"]);
    assert!(result.units.is_empty());

    let empty = CallSiteSpecification::new(Type::object("foo.Empty"));
    let result = compiler().compile(&empty);
    assert_eq!(codes(&result), ["CSI0402"]);
}

/// Delegates to a class path, but blows up on one owner.
struct Exploding(ClassPath);

impl TypeResolver for Exploding {
    fn resolve_type(&self, ty: &Type) -> Result<TypeInfo, ResolutionError> {
        self.0.resolve_type(ty)
    }

    fn resolve_method(&self, method: &MethodDescriptor) -> Result<MethodInfo, ResolutionError> {
        if method.owner() == &Type::object("boom.Exploding") {
            panic!("resolver exploded");
        }
        self.0.resolve_method(method)
    }

    fn is_assignable(&self, to: &Type, from: &Type) -> Result<bool, ResolutionError> {
        self.0.is_assignable(to, from)
    }
}

#[test]
fn panics_are_contained_per_advice() {
    let mut call_site = CallSiteSpecification::new(Type::object("foo.StringCallSite"));
    call_site.push_advice(advice(
        AdviceKind::Before,
        "foo.StringCallSite",
        "explode",
        &[],
        Type::Void,
        "void boom.Exploding.run()",
        &[],
    ));
    call_site.push_advice(advice(
        AdviceKind::Before,
        "foo.StringCallSite",
        "good",
        &[],
        Type::Void,
        CONCAT,
        &[],
    ));

    let compiler = Compiler::new(
        SignatureParser::new(),
        Exploding(class_path()),
        CompilerConfig::default(),
    );
    let result = compiler.compile(&call_site);

    assert_eq!(codes(&result), ["CSI0900"]);
    let diag = result.errors().next().unwrap();
    assert_eq!(diag.kind(), ErrorKind::Uncaught);
    assert_eq!(diag.message, "unexpected failure: resolver exploded");
    assert_eq!(result.units.len(), 1);
}

#[test]
fn compile_all_keeps_input_order() {
    let call_sites: Vec<_> = (0..8)
        .map(|i| {
            let owner = format!("foo.Site{i}");
            let mut call_site = CallSiteSpecification::new(Type::object(owner.as_str()));
            call_site.push_advice(advice(
                AdviceKind::Before,
                &owner,
                "beforeConcat",
                &[string()],
                Type::Void,
                CONCAT,
                &[(0, Argument(0))],
            ));
            call_site
        })
        .collect();

    let compiler = compiler();
    let results = compiler.compile_all(&call_sites);
    let owners: Vec<_> = results.iter().map(|result| result.owner.to_string()).collect();
    let expected: Vec<_> = (0..8).map(|i| format!("foo.Site{i}")).collect();
    assert_eq!(owners, expected);
    assert!(results.iter().all(CallSiteResult::is_success));

    // Every call site needs the same shuffle up to slot names: one memo entry serves all.
    let unit = &results[0].units[0];
    assert_eq!(unit.stack_insts().collect::<Vec<_>>(), [StackInst::Dup]);
    let (a, b) = (Slot::new(5, Category::One), Slot::new(9, Category::One));
    assert_eq!(
        compiler
            .solver()
            .cached(&StackLayout::from_iter([a, b]), &StackLayout::from_iter([a, b, b])),
        Some(Memoized::Solved(StackInsts::from_slice(&[StackInst::Dup])))
    );
}
