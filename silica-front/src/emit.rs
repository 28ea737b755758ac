//! Textual IR emission
//!
//! One design emits as a single outer `module` whose attributes carry the
//! top symbol, containing one `func` per compiled module in insertion
//! order. Interior values are numbered in node-creation order and ports
//! print under their names, so identical designs emit byte-identical
//! text.

use crate::design::{CompiledModule, Design};
use crate::module::InstRecord;

use itertools::Itertools;
use silica_ir::{Node, Op};

/// Render the whole design.
pub(crate) fn emit_design(design: &Design) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "module attributes {{top = @{}}} {{\n",
        design.top()
    ));
    for compiled in design.modules() {
        emit_func(&mut out, compiled);
    }
    out.push_str("}\n");
    out
}

fn quoted(text: &str) -> String {
    serde_json::Value::from(text).to_string()
}

fn emit_func(out: &mut String, compiled: &CompiledModule) {
    let core = &compiled.core;
    let graph = &core.graph;

    // Value naming: ports print under their names, interior nodes number
    // in creation order.
    let mut names: Vec<String> = Vec::with_capacity(graph.len());
    let mut counter = 0usize;
    for (_, node) in graph.iter() {
        match &node.op {
            Op::Input { name } | Op::Clock { name } | Op::Reset { name } => {
                names.push(format!("%{name}"));
            }
            _ => {
                names.push(format!("%{counter}"));
                counter += 1;
            }
        }
    }

    let args = core
        .args
        .iter()
        .map(|port| format!("%{}: {}", port.name, port.ty))
        .join(", ");
    let results = core
        .results
        .iter()
        .map(|(_, sig)| graph.ty(*sig).to_string())
        .join(", ");
    let attrs = core
        .attrs
        .iter()
        .map(|(key, value)| format!("{key} = {}", quoted(value)))
        .join(", ");

    out.push_str(&format!("  func @{}({args})", core.symbol));
    if !core.results.is_empty() {
        out.push_str(&format!(" -> ({results})"));
    }
    if !attrs.is_empty() {
        out.push_str(&format!(" attributes {{{attrs}}}"));
    }
    out.push_str(" {\n");

    let mut inst_printed = vec![false; core.insts.len()];
    for (id, node) in graph.iter() {
        match &node.op {
            Op::Input { .. } | Op::Clock { .. } | Op::Reset { .. } => {}
            Op::InstOut { inst, .. } => {
                let index = inst.index();
                if !inst_printed[index] {
                    inst_printed[index] = true;
                    emit_instance(out, compiled, &names, &core.insts[index]);
                }
            }
            _ => {
                out.push_str(&format!(
                    "    {} = {}\n",
                    names[id.index()],
                    body_line(compiled, &names, node)
                ));
            }
        }
    }
    // Instances without result ports never trigger through a node.
    for (index, printed) in inst_printed.into_iter().enumerate() {
        if !printed {
            emit_instance(out, compiled, &names, &core.insts[index]);
        }
    }

    for reg in &core.regs {
        let next = reg.next.unwrap_or(reg.q);
        out.push_str(&format!(
            "    hw.reg {} q {} next {} clock {} reset {} init {} : {}\n",
            quoted(&reg.name),
            names[reg.q.index()],
            names[next.index()],
            names[reg.clock.index()],
            names[reg.reset.index()],
            reg.init,
            reg.ty,
        ));
    }
    for mem in &core.mems {
        out.push_str(&format!(
            "    hw.mem {} read {} raddr {} wvalid {} waddr {} wdata {} wstrb {} clock {} reset {} depth {} : {}\n",
            quoted(&mem.name),
            names[mem.rdata.index()],
            names[mem.raddr.index()],
            names[mem.wvalid.index()],
            names[mem.waddr.index()],
            names[mem.wdata.index()],
            names[mem.wstrb.index()],
            names[mem.clock.index()],
            names[mem.reset.index()],
            mem.depth,
            mem.data_ty,
        ));
    }

    if core.results.is_empty() {
        out.push_str("    return\n");
    } else {
        let values = core
            .results
            .iter()
            .map(|(_, sig)| names[sig.index()].clone())
            .join(", ");
        out.push_str(&format!("    return {values} : {results}\n"));
    }
    out.push_str("  }\n");
}

fn emit_instance(
    out: &mut String,
    compiled: &CompiledModule,
    names: &[String],
    inst: &InstRecord,
) {
    let graph = &compiled.core.graph;
    let operands = inst.args.iter().map(|sig| names[sig.index()].clone()).join(", ");
    let operand_tys = inst.args.iter().map(|sig| graph.ty(*sig).to_string()).join(", ");
    let result_tys = inst.results.iter().map(|(_, ty, _)| ty.to_string()).join(", ");
    if inst.results.is_empty() {
        out.push_str(&format!(
            "    hw.instance @{}({operands}) : ({operand_tys}) -> ()\n",
            inst.symbol
        ));
    } else {
        let result_names = inst
            .results
            .iter()
            .map(|(_, _, sig)| names[sig.index()].clone())
            .join(", ");
        out.push_str(&format!(
            "    {result_names} = hw.instance @{}({operands}) : ({operand_tys}) -> ({result_tys})\n",
            inst.symbol
        ));
    }
}

fn body_line(compiled: &CompiledModule, names: &[String], node: &Node) -> String {
    let core = &compiled.core;
    let name = |sig: silica_ir::SigId| names[sig.index()].as_str();
    let ty = node.ty;
    match &node.op {
        Op::Const { value } => format!("hw.const {value} : {ty}"),
        Op::RegQ { reg } => {
            format!("hw.reg_q {} : {ty}", quoted(&core.regs[reg.index()].name))
        }
        Op::MemRead { mem } => {
            format!("hw.mem_read {} : {ty}", quoted(&core.mems[mem.index()].name))
        }
        Op::Not(a) => format!("hw.not {} : {ty}", name(*a)),
        Op::And(a, b) => format!("hw.and {}, {} : {ty}", name(*a), name(*b)),
        Op::Or(a, b) => format!("hw.or {}, {} : {ty}", name(*a), name(*b)),
        Op::Xor(a, b) => format!("hw.xor {}, {} : {ty}", name(*a), name(*b)),
        Op::Add(a, b) => format!("hw.add {}, {} : {ty}", name(*a), name(*b)),
        Op::Sub(a, b) => format!("hw.sub {}, {} : {ty}", name(*a), name(*b)),
        Op::Mul(a, b) => format!("hw.mul {}, {} : {ty}", name(*a), name(*b)),
        Op::Udiv(a, b) => format!("hw.udiv {}, {} : {ty}", name(*a), name(*b)),
        Op::Urem(a, b) => format!("hw.urem {}, {} : {ty}", name(*a), name(*b)),
        Op::Sdiv(a, b) => format!("hw.sdiv {}, {} : {ty}", name(*a), name(*b)),
        Op::Srem(a, b) => format!("hw.srem {}, {} : {ty}", name(*a), name(*b)),
        Op::ShlConst { value, amount } => {
            format!("hw.shl {}, {amount} : {ty}", name(*value))
        }
        Op::LshrConst { value, amount } => {
            format!("hw.lshr {}, {amount} : {ty}", name(*value))
        }
        Op::AshrConst { value, amount } => {
            format!("hw.ashr {}, {amount} : {ty}", name(*value))
        }
        Op::Cmp { variant, lhs, rhs } => {
            format!("hw.cmp {}, {}, {} : {ty}", variant.as_ref(), name(*lhs), name(*rhs))
        }
        Op::Slice { value, lo, hi } => {
            format!("hw.slice {}, {lo}, {hi} : {ty}", name(*value))
        }
        Op::Concat { hi, lo } => format!("hw.concat {}, {} : {ty}", name(*hi), name(*lo)),
        Op::Zext { value, width } => {
            format!("hw.zext {} : {} to i{width}", name(*value), core.graph.ty(*value))
        }
        Op::Sext { value, width } => {
            format!("hw.sext {} : {} to i{width}", name(*value), core.graph.ty(*value))
        }
        Op::Select {
            cond,
            on_true,
            on_false,
        } => format!(
            "hw.select {}, {}, {} : {ty}",
            name(*cond),
            name(*on_true),
            name(*on_false)
        ),
        Op::Input { .. } | Op::Clock { .. } | Op::Reset { .. } | Op::InstOut { .. } => {
            String::new()
        }
    }
}
