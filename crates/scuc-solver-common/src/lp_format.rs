//! CPLEX LP text writer.
//!
//! Output depends only on the model's row/column order, so two identical
//! models serialize to identical bytes. Names are sanitized to the LP
//! character set: `[`/`]` become `(`/`)` and anything else outside the
//! allowed set becomes `_`.

use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

use crate::{ConstraintSense, LinearExpr, Model, SolverError, VarDomain};

const TERMS_PER_LINE: usize = 8;

/// Map a model name onto the LP identifier alphabet.
pub fn sanitize_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| match c {
            '[' => '(',
            ']' => ')',
            c if c.is_ascii_alphanumeric() => c,
            '!' | '"' | '#' | '$' | '%' | '&' | '(' | ')' | '/' | ',' | '.' | ';' | '?' | '@'
            | '_' | '`' | '\'' | '{' | '}' | '|' | '~' => c,
            _ => '_',
        })
        .collect();
    // identifiers may not start with a digit or a period
    if out.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        out.insert(0, '_');
    }
    out
}

fn format_number(value: f64) -> String {
    if value == f64::INFINITY {
        "+inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else if value == 0.0 {
        "0".to_string()
    } else {
        format!("{}", value)
    }
}

fn write_expr(out: &mut String, model: &Model, expr: &LinearExpr) {
    if expr.is_empty() {
        out.push_str(" 0 ");
        let first = model.variables().first().map(|v| v.name.as_str());
        out.push_str(&sanitize_name(first.unwrap_or("x")));
        return;
    }
    for (k, &(var, coef)) in expr.terms().iter().enumerate() {
        if k > 0 && k % TERMS_PER_LINE == 0 {
            out.push_str("\n   ");
        }
        let sign = if coef < 0.0 { '-' } else { '+' };
        if k == 0 && sign == '+' {
            let _ = write!(out, " {} {}", format_number(coef), sanitize_name(&model.variable(var).name));
        } else {
            let _ = write!(
                out,
                " {} {} {}",
                sign,
                format_number(coef.abs()),
                sanitize_name(&model.variable(var).name)
            );
        }
    }
}

/// Render `model` as CPLEX LP text.
pub fn to_lp_string(model: &Model) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\\ Model: {}", model.name);
    let objective = model.canonical_objective();
    if objective.constant_term() != 0.0 {
        let _ = writeln!(out, "\\ Objective constant: {}", format_number(objective.constant_term()));
    }

    out.push_str("Minimize\n obj:");
    write_expr(&mut out, model, &objective);
    out.push('\n');

    out.push_str("Subject To\n");
    for row in model.constraints() {
        let _ = write!(out, " {}:", sanitize_name(&row.name));
        write_expr(&mut out, model, &row.expr);
        let sense = match row.sense {
            ConstraintSense::LessEqual => "<=",
            ConstraintSense::GreaterEqual => ">=",
            ConstraintSense::Equal => "=",
        };
        let _ = writeln!(out, " {} {}", sense, format_number(row.rhs));
    }

    out.push_str("Bounds\n");
    for var in model.variables() {
        if var.domain == VarDomain::Binary {
            continue;
        }
        let name = sanitize_name(&var.name);
        match (var.lower.is_finite(), var.upper.is_finite()) {
            (false, false) => {
                let _ = writeln!(out, " {} free", name);
            }
            _ => {
                let _ = writeln!(
                    out,
                    " {} <= {} <= {}",
                    format_number(var.lower),
                    name,
                    format_number(var.upper)
                );
            }
        }
    }

    let binaries: Vec<String> = model
        .variables()
        .iter()
        .filter(|v| v.domain == VarDomain::Binary)
        .map(|v| sanitize_name(&v.name))
        .collect();
    if !binaries.is_empty() {
        out.push_str("Binaries\n");
        for chunk in binaries.chunks(TERMS_PER_LINE) {
            let _ = writeln!(out, " {}", chunk.join(" "));
        }
    }

    let generals: Vec<String> = model
        .variables()
        .iter()
        .filter(|v| v.domain == VarDomain::Integer)
        .map(|v| sanitize_name(&v.name))
        .collect();
    if !generals.is_empty() {
        out.push_str("Generals\n");
        for chunk in generals.chunks(TERMS_PER_LINE) {
            let _ = writeln!(out, " {}", chunk.join(" "));
        }
    }

    out.push_str("End\n");
    out
}

/// Write the LP text of `model` to `path`.
pub fn write_lp_file(model: &Model, path: &Path) -> Result<(), SolverError> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(to_lp_string(model).as_bytes())?;
    Ok(())
}
