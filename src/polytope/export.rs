// This module renders polytopes to the textual form consumed downstream.
// Field names, quoting and the optional-field bracket layout are load-bearing:
// scripts parse this output verbatim, so the format must stay bit-for-bit
// stable. Optional fields (induction_reg, stop_bound_reg, start_bound_reg)
// are appended each on its own continuation line only when present.

//! Textual export of polytope records.

use std::fmt::Write;

use crate::arch::Arch;
use crate::ir::{Function, RegId};
use crate::polytope::{Polytope, PolytopeSet};

fn reg_str(func: &Function, arch: &dyn Arch, reg: RegId) -> String {
    arch.reg_name(func.reg(reg).phys).to_string()
}

fn namer<'f>(func: &'f Function, arch: &'f dyn Arch) -> impl Fn(RegId) -> String + 'f {
    move |r| format!("{}_{}", arch.reg_name(func.reg(r).phys), func.reg(r).version)
}

/// Render one polytope record.
pub fn render(p: &Polytope<'_>, func: &Function, arch: &dyn Arch) -> String {
    let name = namer(func, arch);
    let mut out = String::new();
    let _ = writeln!(out, "[{:#x}] = {{", p.address);
    let _ = writeln!(out, "  expression = \"{}\",", p.text);
    let _ = writeln!(
        out,
        "  computed = {},",
        if p.computed { "TRUE" } else { "FALSE" }
    );
    let _ = writeln!(out, "  expression_code = \"{}\",", p.expr.to_code(&name));

    let regs = p
        .referenced
        .iter()
        .map(|&r| {
            format!(
                "{{reg=\"{}\", address=\"{:#x}\", str=\"{}\", id=\"{}\"}}",
                name(r),
                func.def_address(r),
                reg_str(func, arch, r),
                func.reg(r).version
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(out, "  registers = {{ {} }},", regs);
    let _ = writeln!(out, "  level = \"{}\"", p.level);

    if let Some((reg, triple)) = &p.induction {
        let _ = writeln!(
            out,
            "  , induction_reg = {{str=\"{}\", id=\"{}\", val=\"{}\"}}",
            reg_str(func, arch, *reg),
            func.reg(*reg).version,
            triple.add.render(&name)
        );
    }
    if let Some(stop) = &p.stop_bound {
        let _ = writeln!(
            out,
            "  , stop_bound_reg = {{str=\"{}\", id=\"{}\", val=\"{:#x}\"}}",
            reg_str(func, arch, stop.reg),
            func.reg(stop.reg).version,
            stop.imm
        );
    }
    if let Some(start) = &p.start_bound {
        let _ = writeln!(
            out,
            "  , start_bound_reg = {{str=\"{}\", id=\"{}\", val=\"{}\"}}",
            reg_str(func, arch, start.reg),
            func.reg(start.reg).version,
            start.value.render(&name)
        );
    }
    out.push_str("}\n");
    out
}

impl<'a> PolytopeSet<'a> {
    /// Render every polytope, loops in ascending id order, records in
    /// interpreter visit order within each loop.
    pub fn export(&self, func: &Function, arch: &dyn Arch) -> String {
        let mut out = String::new();
        for lp in self.loop_ids() {
            for p in self.for_loop(lp) {
                out.push_str(&render(p, func, arch));
            }
        }
        out
    }
}
