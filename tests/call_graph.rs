mod support;

use cha_pointer_analysis::build_cha;
use cha_pointer_analysis::config::{AnalysisConfig, CancellationToken};
use cha_pointer_analysis::hierarchy::ClassHierarchy;
use cha_pointer_analysis::ir::*;
use support::*;

/// S5 — `class A { m() } class B extends A { m() } class C extends A { m() }`,
/// a virtual call on a static receiver type `A` resolves to all three
/// overrides: `A.m`, `B.m`, `C.m`.
#[test]
fn virtual_call_resolves_to_every_override() {
    let a = ClassBuilder::new("A").method("m()").build();
    let b = ClassBuilder::new("B").extends("A").method("m()").build();
    let c = ClassBuilder::new("C").extends("A").method("m()").build();

    let a_m = MethodBuilder::new("A", "m()").stmt(Stmt::Return(Vec::new())).build();
    let b_m = MethodBuilder::new("B", "m()").stmt(Stmt::Return(Vec::new())).build();
    let c_m = MethodBuilder::new("C", "m()").stmt(Stmt::Return(Vec::new())).build();

    let main_id = method_id(&class_id("Main"), "main()");
    let main_mb = MethodBuilder::new("Main", "main()").int_local("recv");
    let recv = main_mb.var("recv");
    let main = main_mb
        .stmt(Stmt::New { lhs: recv.clone(), class: class_id("A"), site: stmt_id(&main_id, 0) })
        .stmt(Stmt::Invoke(CallSite {
            kind: CallKind::Virtual,
            method_ref: method_id(&class_id("A"), "m()"),
            receiver: Some(recv.clone()),
            args: Vec::new(),
            result: None,
        }))
        .stmt(Stmt::Return(Vec::new()))
        .build();
    let main_class = ClassBuilder::new("Main").method("main()").build();

    let program = ProgramBuilder::new()
        .class(a)
        .class(b)
        .class(c)
        .class(main_class)
        .method(a_m)
        .method(b_m)
        .method(c_m)
        .method(main)
        .build(main_id.clone());

    let hierarchy = ClassHierarchy::build(&program);
    let cg = build_cha(&program, &hierarchy, &main_id, &AnalysisConfig::default()).unwrap();

    let call_site = stmt_id(&main_id, 1);
    let callees: std::collections::BTreeSet<&MethodId> = cg.callees_of_site(&call_site).collect();
    assert_eq!(callees.len(), 3, "expected A.m, B.m and C.m as callees: {callees:?}");
    assert!(callees.contains(&method_id(&class_id("A"), "m()")));
    assert!(callees.contains(&method_id(&class_id("B"), "m()")));
    assert!(callees.contains(&method_id(&class_id("C"), "m()")));
}

/// A call whose declaring class has no override anywhere in the hierarchy
/// resolves to an empty set (partial dispatch), not an error.
#[test]
fn virtual_call_on_unrelated_subsig_resolves_to_nothing() {
    let a = ClassBuilder::new("A").build();
    let main_id = method_id(&class_id("Main"), "main()");
    let main = MethodBuilder::new("Main", "main()")
        .stmt(Stmt::Invoke(CallSite {
            kind: CallKind::Virtual,
            method_ref: method_id(&class_id("A"), "missing()"),
            receiver: None,
            args: Vec::new(),
            result: None,
        }))
        .stmt(Stmt::Return(Vec::new()))
        .build();
    let main_class = ClassBuilder::new("Main").method("main()").build();

    let program = ProgramBuilder::new().class(a).class(main_class).method(main).build(main_id.clone());
    let hierarchy = ClassHierarchy::build(&program);
    let cg = build_cha(&program, &hierarchy, &main_id, &AnalysisConfig::default()).unwrap();

    let call_site = stmt_id(&main_id, 0);
    assert_eq!(cg.callees_of_site(&call_site).count(), 0);
}

/// `A`, `B extends A`, `D extends B`, each overriding `m()`: a virtual
/// call on static receiver type `A` includes `D.m` only under the
/// transitive-closure policy, not the direct-subtypes-only default.
#[test]
fn direct_vs_transitive_closure_policy_disagree_on_three_level_hierarchy() {
    let a = ClassBuilder::new("A").method("m()").build();
    let b = ClassBuilder::new("B").extends("A").method("m()").build();
    let d = ClassBuilder::new("D").extends("B").method("m()").build();

    let a_m = MethodBuilder::new("A", "m()").stmt(Stmt::Return(Vec::new())).build();
    let b_m = MethodBuilder::new("B", "m()").stmt(Stmt::Return(Vec::new())).build();
    let d_m = MethodBuilder::new("D", "m()").stmt(Stmt::Return(Vec::new())).build();

    let main_id = method_id(&class_id("Main"), "main()");
    let main_mb = MethodBuilder::new("Main", "main()").int_local("recv");
    let recv = main_mb.var("recv");
    let main = main_mb
        .stmt(Stmt::New { lhs: recv.clone(), class: class_id("A"), site: stmt_id(&main_id, 0) })
        .stmt(Stmt::Invoke(CallSite {
            kind: CallKind::Virtual,
            method_ref: method_id(&class_id("A"), "m()"),
            receiver: Some(recv.clone()),
            args: Vec::new(),
            result: None,
        }))
        .stmt(Stmt::Return(Vec::new()))
        .build();
    let main_class = ClassBuilder::new("Main").method("main()").build();

    let program = ProgramBuilder::new()
        .class(a)
        .class(b)
        .class(d)
        .class(main_class)
        .method(a_m)
        .method(b_m)
        .method(d_m)
        .method(main)
        .build(main_id.clone());
    let hierarchy = ClassHierarchy::build(&program);
    let call_site = stmt_id(&main_id, 1);

    let direct_only = AnalysisConfig { direct_subtypes_only: true, ..AnalysisConfig::default() };
    let cg_direct = build_cha(&program, &hierarchy, &main_id, &direct_only).unwrap();
    let direct_callees: std::collections::BTreeSet<&MethodId> = cg_direct.callees_of_site(&call_site).collect();
    assert_eq!(direct_callees.len(), 2, "direct-only sees A.m and B.m, not D.m: {direct_callees:?}");
    assert!(!direct_callees.contains(&method_id(&class_id("D"), "m()")));

    let transitive = AnalysisConfig { direct_subtypes_only: false, ..AnalysisConfig::default() };
    let cg_transitive = build_cha(&program, &hierarchy, &main_id, &transitive).unwrap();
    let transitive_callees: std::collections::BTreeSet<&MethodId> = cg_transitive.callees_of_site(&call_site).collect();
    assert_eq!(transitive_callees.len(), 3, "transitive closure also reaches D.m: {transitive_callees:?}");
    assert!(transitive_callees.contains(&method_id(&class_id("D"), "m()")));
}

/// CHA soundness (property 5): a call on an interface type, where two
/// unrelated classes each implement it and override the method, must
/// resolve to both implementors — every concrete override reachable via
/// the subtype relation has to appear in `resolve`.
#[test]
fn interface_call_resolves_to_every_implementor_override() {
    let iface = ClassBuilder::new("Shape").interface().abstract_class().method("area()").build();
    let circle = ClassBuilder::new("Circle").implements("Shape").method("area()").build();
    let square = ClassBuilder::new("Square").implements("Shape").method("area()").build();

    let circle_area = MethodBuilder::new("Circle", "area()").stmt(Stmt::Return(Vec::new())).build();
    let square_area = MethodBuilder::new("Square", "area()").stmt(Stmt::Return(Vec::new())).build();

    let main_id = method_id(&class_id("Main"), "main()");
    let main_mb = MethodBuilder::new("Main", "main()").int_local("recv");
    let recv = main_mb.var("recv");
    let main = main_mb
        .stmt(Stmt::New { lhs: recv.clone(), class: class_id("Circle"), site: stmt_id(&main_id, 0) })
        .stmt(Stmt::Invoke(CallSite {
            kind: CallKind::Interface,
            method_ref: method_id(&class_id("Shape"), "area()"),
            receiver: Some(recv.clone()),
            args: Vec::new(),
            result: None,
        }))
        .stmt(Stmt::Return(Vec::new()))
        .build();
    let main_class = ClassBuilder::new("Main").method("main()").build();

    let program = ProgramBuilder::new()
        .class(iface)
        .class(circle)
        .class(square)
        .class(main_class)
        .method(circle_area)
        .method(square_area)
        .method(main)
        .build(main_id.clone());
    let hierarchy = ClassHierarchy::build(&program);
    let cg = build_cha(&program, &hierarchy, &main_id, &AnalysisConfig::default()).unwrap();

    let call_site = stmt_id(&main_id, 1);
    let callees: std::collections::BTreeSet<&MethodId> = cg.callees_of_site(&call_site).collect();
    assert!(callees.contains(&method_id(&class_id("Circle"), "area()")), "the statically-allocated receiver's own override must resolve");
    assert!(callees.contains(&method_id(&class_id("Square"), "area()")), "every other implementor reachable through the interface's subtype relation must also resolve, even though no Square is ever allocated here");
}

/// A cancellation token tripped before `build_cha` ever pops from its
/// worklist stops the build immediately and flags the graph incomplete,
/// rather than silently returning as if it had run to completion.
#[test]
fn cancellation_before_first_pop_yields_incomplete_graph() {
    let a = ClassBuilder::new("A").method("m()").build();
    let a_m = MethodBuilder::new("A", "m()").stmt(Stmt::Return(Vec::new())).build();
    let main_id = method_id(&class_id("A"), "m()");

    let program = ProgramBuilder::new().class(a).method(a_m).build(main_id.clone());
    let hierarchy = ClassHierarchy::build(&program);

    let cancellation = CancellationToken::new();
    cancellation.cancel();
    let config = AnalysisConfig { cancellation, ..AnalysisConfig::default() };

    let cg = build_cha(&program, &hierarchy, &main_id, &config).unwrap();
    assert!(!cg.complete, "a cancelled build must flag its result as partial");
    assert!(!cg.is_reachable(&main_id), "cancellation before the first pop must not even mark the entry method reachable");
}
