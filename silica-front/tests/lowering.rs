//! Control-flow lowering and elaboration-fallback scenarios.

use silica_front::prelude::*;

use pretty_assertions::assert_eq;

fn cond_max(m: &mut ModuleCtx<'_>, p: &Params) -> Result<BuilderOut, Error> {
    let width = p.u32("width")?;
    let x = m.input("x", width)?;
    let y = m.input("y", width)?;
    let r = m.var("r", x)?;
    let lt = m.ult(x, y)?;
    m.if_(lt, |m| m.assign(r, y))?;
    let out = m.read(r)?;
    m.output("out", out)?;
    Ok(BuilderOut::Unit)
}

fn cond_max_comp() -> Component {
    Component::new("cond_max", cond_max).param_default("width", 8)
}

#[test]
fn conditional_assignment_lowers_to_one_select() {
    let design = compile_design(&cond_max_comp(), "Max", Params::new()).unwrap();
    let ir = design.emit_ir();
    assert_eq!(ir.matches("hw.cmp ult, %x, %y").count(), 1);
    assert_eq!(ir.matches("hw.select").count(), 1);
    // select(ult(x, y), y, x) reaches the output.
    assert!(ir.contains("hw.select %0, %y, %x : i8"));
    assert!(ir.contains("return %1 : i8"));
}

#[test]
fn repeated_builds_share_no_duplicate_comparison_nodes() {
    let first = compile_design(&cond_max_comp(), "Max", Params::new()).unwrap();
    let second = compile_design(&cond_max_comp(), "Max", Params::new()).unwrap();
    assert_eq!(first.emit_ir(), second.emit_ir());
    assert_eq!(first.emit_ir().matches("hw.cmp ult").count(), 1);
}

#[test]
fn if_else_merges_in_branch_order() {
    fn pick(m: &mut ModuleCtx<'_>, _p: &Params) -> Result<BuilderOut, Error> {
        let sel = m.input("sel", 1)?;
        let a = m.input("a", 8)?;
        let b = m.input("b", 8)?;
        let r = m.var("r", a)?;
        m.if_else(sel, |m| m.assign(r, b), |m| m.assign(r, a))?;
        let out = m.read(r)?;
        m.output("out", out)?;
        Ok(BuilderOut::Unit)
    }
    let comp = Component::new("pick", pick);
    let ir = compile_design(&comp, "Pick", Params::new())
        .unwrap()
        .emit_ir();
    assert!(ir.contains("hw.select %sel, %b, %a : i8"));
}

#[test]
fn nested_conditions_stack_their_selects() {
    fn nested(m: &mut ModuleCtx<'_>, _p: &Params) -> Result<BuilderOut, Error> {
        let c0 = m.input("c0", 1)?;
        let c1 = m.input("c1", 1)?;
        let a = m.input("a", 8)?;
        let b = m.input("b", 8)?;
        let r = m.var("r", a)?;
        m.if_(c0, |m| {
            m.assign(r, b)?;
            m.if_(c1, |m| m.assign(r, a))
        })?;
        let out = m.read(r)?;
        m.output("out", out)?;
        Ok(BuilderOut::Unit)
    }
    let comp = Component::new("nested", nested);
    let ir = compile_design(&comp, "Nested", Params::new())
        .unwrap()
        .emit_ir();
    // Inner merge keyed on c1, outer merge keyed on c0.
    assert_eq!(ir.matches("hw.select").count(), 2);
}

#[test]
fn partially_assigned_variables_keep_their_prior_value() {
    fn partial(m: &mut ModuleCtx<'_>, _p: &Params) -> Result<BuilderOut, Error> {
        let sel = m.input("sel", 1)?;
        let a = m.input("a", 8)?;
        let b = m.input("b", 8)?;
        let r = m.var("r", a)?;
        let s = m.var("s", b)?;
        m.if_else(
            sel,
            |m| m.assign(r, b),
            |m| m.assign(s, a),
        )?;
        let r_out = m.read(r)?;
        let s_out = m.read(s)?;
        m.output("r", r_out)?;
        m.output("s", s_out)?;
        Ok(BuilderOut::Unit)
    }
    let comp = Component::new("partial", partial);
    let ir = compile_design(&comp, "Partial", Params::new())
        .unwrap()
        .emit_ir();
    // r keeps a when sel is low, s keeps b when sel is high; both merges
    // describe the same function and intern to one node.
    assert_eq!(ir.matches("hw.select %sel, %b, %a : i8").count(), 1);
}

#[test]
fn register_writes_under_conditions_pick_up_the_path() {
    fn gated(m: &mut ModuleCtx<'_>, _p: &Params) -> Result<BuilderOut, Error> {
        let clk = m.clock("clk")?;
        let rst = m.reset("rst")?;
        let d = m.input("d", 8)?;
        let en = m.input("en", 1)?;
        let r = m.register(
            "r",
            RegSpec {
                clock: clk,
                reset: rst,
                width: 8,
                init: 0,
                enable: None,
            },
        )?;
        m.if_(en, |m| m.reg_set(r, d))?;
        m.output("q", r.q())?;
        Ok(BuilderOut::Unit)
    }
    let comp = Component::new("gated", gated);
    let ir = compile_design(&comp, "Gated", Params::new())
        .unwrap()
        .emit_ir();
    // The unconditional set under if_(en) folds to a select keyed on en.
    assert!(ir.contains("hw.reg \"r\""));
    assert!(ir.contains("hw.select %en"));
}

#[test]
fn register_priority_chain_emits_the_fold() {
    fn priorities(m: &mut ModuleCtx<'_>, _p: &Params) -> Result<BuilderOut, Error> {
        let clk = m.clock("clk")?;
        let rst = m.reset("rst")?;
        let a = m.input("a", 8)?;
        let b = m.input("b", 8)?;
        let c = m.input("c", 8)?;
        let cond_b = m.input("cond_b", 1)?;
        let cond_c = m.input("cond_c", 1)?;
        let r = m.register(
            "r",
            RegSpec {
                clock: clk,
                reset: rst,
                width: 8,
                init: 0,
                enable: None,
            },
        )?;
        m.reg_set(r, a)?;
        m.reg_set_when(r, b, cond_b)?;
        m.reg_set_when(r, c, cond_c)?;
        m.output("q", r.q())?;
        Ok(BuilderOut::Unit)
    }
    let comp = Component::new("priorities", priorities);
    let design = compile_design(&comp, "Prio", Params::new()).unwrap();
    let ir = design.emit_ir();
    assert!(ir.contains("hw.select %cond_b, %b, %a : i8"));
    assert!(ir.contains("init 0 : i8"));
    let top = design.lookup("Prio").unwrap();
    assert_eq!(top.results()[0].1.width(), 8);
}

#[test]
fn dynamic_loops_fail_through_the_fallback_as_builder_errors() {
    fn dynamic(m: &mut ModuleCtx<'_>, _p: &Params) -> Result<BuilderOut, Error> {
        let x = m.input("x", 8)?;
        let zero = m.lit(0, 8)?;
        let busy = m.ne(x, zero)?;
        m.while_signal(busy, |_| Ok(()))?;
        Ok(BuilderOut::Unit)
    }
    let comp = Component::new("dynamic", dynamic);
    let err = compile_design(&comp, "Dyn", Params::new()).unwrap_err();
    match err {
        Error::Builder(message) => assert!(message.contains("dynamic iteration")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn failed_child_compilations_roll_back_their_symbol() {
    fn bad_child(m: &mut ModuleCtx<'_>, _p: &Params) -> Result<BuilderOut, Error> {
        let x = m.input("x", 8)?;
        let zero = m.lit(0, 8)?;
        let busy = m.ne(x, zero)?;
        m.while_signal(busy, |_| Ok(()))?;
        Ok(BuilderOut::Unit)
    }
    fn good_child(m: &mut ModuleCtx<'_>, _p: &Params) -> Result<BuilderOut, Error> {
        let x = m.input("x", 8)?;
        let out = m.not(x)?;
        m.output("y", out)?;
        Ok(BuilderOut::Unit)
    }
    fn parent(m: &mut ModuleCtx<'_>, _p: &Params) -> Result<BuilderOut, Error> {
        let bad = Component::new("bad_child", bad_child);
        let good = Component::new("good_child", good_child);
        let x = m.input("x", 8)?;
        if m.instance_as(&bad, "Foo", Params::new(), &[("x", x)]).is_ok() {
            return Err(Error::Builder("expected the bad child to fail".to_string()));
        }
        // The rollback freed the symbol; a different builder may take it.
        let outs = m.instance_as(&good, "Foo", Params::new(), &[("x", x)])?;
        m.output("y", outs.get("y")?)?;
        Ok(BuilderOut::Unit)
    }
    let comp = Component::new("parent", parent);
    let design = compile_design(&comp, "Top", Params::new()).unwrap();
    assert_eq!(design.len(), 2);
    assert_eq!(design.lookup("Foo").unwrap().base_name(), "good_child");
}

#[test]
fn escaped_bindings_surface_through_the_fallback() {
    fn escape(m: &mut ModuleCtx<'_>, _p: &Params) -> Result<BuilderOut, Error> {
        let x = m.input("x", 8)?;
        let c = m.bit(x, 0)?;
        let mut leaked = None;
        m.if_(c, |m| {
            leaked = Some(m.var("t", x)?);
            Ok(())
        })?;
        let out = m.read(leaked.expect("assigned in branch"))?;
        m.output("out", out)?;
        Ok(BuilderOut::Unit)
    }
    let comp = Component::new("escape", escape);
    let err = compile_design(&comp, "Esc", Params::new()).unwrap_err();
    // The lowerer rejects the escape; the fallback then rejects the
    // conditional region itself.
    assert!(matches!(err, Error::Builder(_)));
}

#[test]
fn elaborate_only_builders_compile_through_the_fallback() {
    fn plain(m: &mut ModuleCtx<'_>, _p: &Params) -> Result<BuilderOut, Error> {
        let a = m.input("a", 8)?;
        let b = m.input("b", 8)?;
        let sum = m.add(a, b)?;
        Ok(BuilderOut::Wire(sum))
    }
    let comp = Component::new("plain", plain).elaborate_only();
    let design = compile_design(&comp, "Plain", Params::new()).unwrap();
    let top = design.lookup("Plain").unwrap();
    // The returned wire binds to the default output name.
    assert_eq!(top.results()[0].0, "out");
}

#[test]
fn elaborate_only_builders_cannot_branch_on_signals() {
    fn branchy(m: &mut ModuleCtx<'_>, _p: &Params) -> Result<BuilderOut, Error> {
        let a = m.input("a", 8)?;
        let c = m.bit(a, 0)?;
        let r = m.var("r", a)?;
        m.if_(c, |m| m.assign(r, a))?;
        Ok(BuilderOut::Unit)
    }
    let comp = Component::new("branchy", branchy).elaborate_only();
    let err = compile_design(&comp, "Branchy", Params::new()).unwrap_err();
    assert!(matches!(err, Error::Builder(_)));
}

#[test]
fn returned_wire_tuples_bind_to_numbered_outputs() {
    fn pair(m: &mut ModuleCtx<'_>, _p: &Params) -> Result<BuilderOut, Error> {
        let a = m.input("a", 8)?;
        let b = m.input("b", 8)?;
        let lo = m.and(a, b)?;
        let hi = m.or(a, b)?;
        Ok(BuilderOut::Wires(vec![lo, hi]))
    }
    let comp = Component::new("pair", pair);
    let design = compile_design(&comp, "Pair", Params::new()).unwrap();
    let top = design.lookup("Pair").unwrap();
    let names: Vec<&str> = top.results().iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["out0", "out1"]);
}

#[test]
fn declared_outputs_win_over_returned_wires() {
    fn both(m: &mut ModuleCtx<'_>, _p: &Params) -> Result<BuilderOut, Error> {
        let a = m.input("a", 8)?;
        let b = m.input("b", 8)?;
        let named = m.and(a, b)?;
        let returned = m.or(a, b)?;
        m.output("named", named)?;
        Ok(BuilderOut::Wire(returned))
    }
    let comp = Component::new("both", both);
    let design = compile_design(&comp, "Both", Params::new()).unwrap();
    let top = design.lookup("Both").unwrap();
    assert_eq!(top.results().len(), 1);
    assert_eq!(top.results()[0].0, "named");
}

#[test]
fn scopes_qualify_register_names() {
    fn scoped(m: &mut ModuleCtx<'_>, _p: &Params) -> Result<BuilderOut, Error> {
        let clk = m.clock("clk")?;
        let rst = m.reset("rst")?;
        let d = m.input("d", 4)?;
        m.scoped("core", |m| {
            m.scoped("fe", |m| {
                let r = m.register(
                    "pc",
                    RegSpec {
                        clock: clk,
                        reset: rst,
                        width: 4,
                        init: 0,
                        enable: None,
                    },
                )?;
                m.reg_set(r, d)?;
                m.output("q", r.q())
            })
        })?;
        Ok(BuilderOut::Unit)
    }
    let comp = Component::new("scoped", scoped);
    let ir = compile_design(&comp, "Scoped", Params::new())
        .unwrap()
        .emit_ir();
    assert!(ir.contains("hw.reg_q \"core.fe.pc\" : i4"));
    assert!(ir.contains("hw.reg \"core.fe.pc\""));
}

#[test]
fn byte_memories_emit_their_port_header() {
    fn mem(m: &mut ModuleCtx<'_>, _p: &Params) -> Result<BuilderOut, Error> {
        let clk = m.clock("clk")?;
        let rst = m.reset("rst")?;
        let raddr = m.input("raddr", 64)?;
        let wvalid = m.input("wvalid", 1)?;
        let waddr = m.input("waddr", 64)?;
        let wdata = m.input("wdata", 64)?;
        let wstrb = m.input("wstrb", 8)?;
        let rdata = m.byte_mem(
            "scratch",
            MemSpec {
                clock: clk,
                reset: rst,
                raddr,
                wvalid,
                waddr,
                wdata,
                wstrb,
                depth: 1 << 20,
            },
        )?;
        m.output("rdata", rdata)?;
        Ok(BuilderOut::Unit)
    }
    let comp = Component::new("mem", mem);
    let ir = compile_design(&comp, "Mem", Params::new()).unwrap().emit_ir();
    assert!(ir.contains("hw.mem_read \"scratch\" : i64"));
    assert!(ir.contains("depth 1048576 : i64"));
}

#[test]
fn variable_shifts_desugar_to_constant_shift_ladders() {
    fn shifter(m: &mut ModuleCtx<'_>, _p: &Params) -> Result<BuilderOut, Error> {
        let x = m.input("x", 8)?;
        let amount = m.input("amount", 8)?;
        let out = m.lshr_by(x, amount)?;
        m.output("out", out)?;
        Ok(BuilderOut::Unit)
    }
    let comp = Component::new("shifter", shifter);
    let ir = compile_design(&comp, "Shifter", Params::new())
        .unwrap()
        .emit_ir();
    // Three ladder stages for an 8-bit value, plus the past-the-width
    // guard over the amount's high bits.
    assert_eq!(ir.matches("hw.lshr").count(), 3);
    assert!(ir.contains("hw.slice %amount, 3, 8"));
    assert!(ir.contains("hw.cmp ne"));
}

#[test]
fn constant_shift_amounts_collapse_the_ladder() {
    fn fixed(m: &mut ModuleCtx<'_>, _p: &Params) -> Result<BuilderOut, Error> {
        let x = m.input("x", 8)?;
        let amount = m.lit(3, 8)?;
        let out = m.shl_by(x, amount)?;
        m.output("out", out)?;
        Ok(BuilderOut::Unit)
    }
    let comp = Component::new("fixed", fixed);
    let ir = compile_design(&comp, "Fixed", Params::new())
        .unwrap()
        .emit_ir();
    // Every select condition is a folded constant bit, so no muxes remain
    // in the ladder.
    assert!(!ir.contains("hw.select"));
    assert!(!ir.contains("hw.cmp"));
}

#[test]
fn instance_results_belong_to_the_parent_module() {
    fn child(m: &mut ModuleCtx<'_>, _p: &Params) -> Result<BuilderOut, Error> {
        let y = m.input("y", 8)?;
        Ok(BuilderOut::Wire(y))
    }
    fn parent(m: &mut ModuleCtx<'_>, _p: &Params) -> Result<BuilderOut, Error> {
        let child_comp = Component::new("child", child);
        let x = m.input("x", 8)?;
        let outs = m.instance(&child_comp, Params::new(), &[("y", x)])?;
        // The child's wires never leak; the parent works with its own
        // instance-result wires.
        let through = outs.get("out")?;
        let doubled = m.add(through, through)?;
        m.output("y", doubled)?;
        Ok(BuilderOut::Unit)
    }
    let comp = Component::new("parent", parent);
    let design = compile_design(&comp, "Top", Params::new()).unwrap();
    let ir = design.emit_ir();
    assert!(ir.contains("hw.instance @child__p"));
    assert!(ir.contains("hw.add"));
}
