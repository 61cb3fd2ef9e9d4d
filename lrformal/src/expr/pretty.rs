//! RcDoc-based pretty-printer with termcolor annotations for terms and formulas.
//!
//! Role
//! - Convert a [`Term`] or [`Formula`] into an annotated document suitable for width-aware
//!   rendering.
//! - Provide colored output for terminals (TTY-aware) and plain strings for logs/tests.
//!
//! Syntax
//! - Connectives print as `/\`, `\/`, `=>`, `<=>` and `!`; if-then-else as
//!   `if c then a else b`; division and remainder as `div` and `mod`.
//! - Sums print negated summands and negative constants with a binary minus.

use crate::expr::{Formula, Term};
use crate::variable::Variable;
use num_bigint::BigInt;
use num_traits::Signed;
use pretty::{FmtWrite, RcDoc, RenderAnnotated};
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Styles used to annotate parts of the pretty-printed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Parentheses are colored by nesting depth so matching pairs share a color.
    Paren(u8),
    Keyword,  // if, then, else, true, false, div, mod
    Operator, // +, *, /\, \/, =>, <=>, comparisons
    Ident,    // variables
    Literal,  // integer constants
}

impl Style {
    fn to_color_spec(self) -> ColorSpec {
        let mut s = ColorSpec::new();
        match self {
            Style::Paren(depth) => {
                let fg = match depth % 6 {
                    0 => Color::Blue,
                    1 => Color::Green,
                    2 => Color::White,
                    3 => Color::Yellow,
                    4 => Color::Red,
                    5 => Color::Magenta,
                    _ => unreachable!(),
                };
                s.set_fg(Some(fg)).set_dimmed(true);
            }
            Style::Keyword => {
                s.set_fg(Some(Color::Cyan)).set_bold(true);
            }
            Style::Operator => {
                s.set_fg(Some(Color::Yellow)).set_bold(true);
            }
            Style::Ident => {
                s.set_fg(Some(Color::Green)).set_bold(true);
            }
            Style::Literal => {
                s.set_fg(Some(Color::Magenta));
            }
        }
        s
    }
}

type Doc = RcDoc<'static, Style>;

#[inline]
fn lparen(depth: u8) -> Doc {
    RcDoc::as_string("(").annotate(Style::Paren(depth))
}

#[inline]
fn rparen(depth: u8) -> Doc {
    RcDoc::as_string(")").annotate(Style::Paren(depth))
}

fn kw(s: &'static str) -> Doc {
    RcDoc::as_string(s).annotate(Style::Keyword)
}

fn op(s: &'static str) -> Doc {
    RcDoc::as_string(s).annotate(Style::Operator)
}

fn ident(v: &Variable) -> Doc {
    RcDoc::as_string(v).annotate(Style::Ident)
}

fn literal(value: &BigInt) -> Doc {
    RcDoc::as_string(value).annotate(Style::Literal)
}

/// Binding strength; larger binds tighter. Atoms use 255.
fn formula_precedence(f: &Formula) -> u8 {
    match f {
        Formula::Ite(..) => 1,
        Formula::Implies(..) | Formula::Iff(..) => 2,
        Formula::Or(..) => 3,
        Formula::And(..) => 4,
        Formula::Not(..) => 5,
        Formula::Cmp(..) => 6,
        Formula::True | Formula::False => 255,
    }
}

fn term_precedence(t: &Term) -> u8 {
    match t {
        Term::Ite(..) => 1,
        Term::Add(..) => 7,
        Term::Mul(..) | Term::Div(..) | Term::Mod(..) => 8,
        Term::Neg(..) => 9,
        Term::Const(value) if value.is_negative() => 9,
        Term::Var(_) | Term::Const(_) => 255,
    }
}

fn wrap(doc: Doc, needs_parens: bool, depth: u8) -> Doc {
    if needs_parens {
        lparen(depth).append(doc).append(rparen(depth)).group()
    } else {
        doc
    }
}

/// Child formula of a node with precedence `parent`; ties get parentheses.
fn formula_child(f: &Formula, parent: u8, depth: u8) -> Doc {
    let need = formula_precedence(f) <= parent;
    let inner_depth = if need { depth + 1 } else { depth };
    wrap(formula_doc(f, inner_depth), need, depth)
}

/// Child term of a node with precedence `parent`; ties get parentheses when `strict`.
fn term_child(t: &Term, parent: u8, strict: bool, depth: u8) -> Doc {
    let prec = term_precedence(t);
    let need = prec < parent || (strict && prec == parent);
    let inner_depth = if need { depth + 1 } else { depth };
    wrap(term_doc(t, inner_depth), need, depth)
}

fn infix(lhs: Doc, symbol: &'static str, rhs: Doc) -> Doc {
    lhs.append(RcDoc::space())
        .append(op(symbol))
        .append(RcDoc::space())
        .append(rhs)
        .group()
}

fn nary<'a>(args: impl Iterator<Item = &'a Formula>, symbol: &'static str, prec: u8, depth: u8) -> Doc {
    let mut doc: Option<Doc> = None;
    for arg in args {
        let child = formula_child(arg, prec, depth);
        doc = Some(match doc {
            None => child,
            Some(acc) => acc
                .append(RcDoc::line())
                .append(op(symbol))
                .append(RcDoc::space())
                .append(child),
        });
    }
    doc.unwrap_or_else(RcDoc::nil).group()
}

fn term_doc(t: &Term, depth: u8) -> Doc {
    match t {
        Term::Var(v) => ident(v),
        Term::Const(value) if value.is_negative() => op("-").append(literal(&-value)),
        Term::Const(value) => literal(value),
        Term::Add(args) => {
            let mut doc: Option<Doc> = None;
            for arg in args {
                let (negated, shown) = match arg {
                    Term::Neg(inner) => (true, inner.as_ref().clone()),
                    Term::Const(value) if value.is_negative() => (true, Term::Const(-value)),
                    other => (false, other.clone()),
                };
                doc = Some(match doc {
                    None => term_child(arg, 7, false, depth),
                    Some(acc) => acc
                        .append(RcDoc::space())
                        .append(op(if negated { "-" } else { "+" }))
                        .append(RcDoc::space())
                        .append(term_child(&shown, 7, negated, depth)),
                });
            }
            doc.unwrap_or_else(|| literal(&BigInt::from(0))).group()
        }
        Term::Mul(lhs, rhs) => infix(
            term_child(lhs, 8, false, depth),
            "*",
            term_child(rhs, 8, true, depth),
        ),
        Term::Neg(inner) => op("-").append(term_child(inner, 9, false, depth)),
        Term::Div(lhs, rhs) => term_child(lhs, 8, false, depth)
            .append(RcDoc::space())
            .append(kw("div"))
            .append(RcDoc::space())
            .append(term_child(rhs, 8, true, depth))
            .group(),
        Term::Mod(lhs, rhs) => term_child(lhs, 8, false, depth)
            .append(RcDoc::space())
            .append(kw("mod"))
            .append(RcDoc::space())
            .append(term_child(rhs, 8, true, depth))
            .group(),
        Term::Ite(condition, then_branch, else_branch) => kw("if")
            .append(RcDoc::space())
            .append(formula_child(condition, 1, depth))
            .append(RcDoc::line())
            .append(kw("then"))
            .append(RcDoc::space())
            .append(term_child(then_branch, 1, true, depth))
            .append(RcDoc::line())
            .append(kw("else"))
            .append(RcDoc::space())
            .append(term_child(else_branch, 1, true, depth))
            .group()
            .nest(2),
    }
}

fn formula_doc(f: &Formula, depth: u8) -> Doc {
    match f {
        Formula::True => kw("true"),
        Formula::False => kw("false"),
        Formula::Cmp(cmp, lhs, rhs) => infix(
            term_child(lhs, 7, false, depth),
            cmp.to_str(),
            term_child(rhs, 7, false, depth),
        ),
        Formula::Not(inner) => op("!").append(formula_child(inner, 6, depth)),
        Formula::And(args) => nary(args.iter(), "/\\", 4, depth),
        Formula::Or(args) => nary(args.iter(), "\\/", 3, depth),
        Formula::Implies(lhs, rhs) => infix(
            formula_child(lhs, 2, depth),
            "=>",
            formula_child(rhs, 2, depth),
        ),
        Formula::Iff(lhs, rhs) => infix(
            formula_child(lhs, 2, depth),
            "<=>",
            formula_child(rhs, 2, depth),
        ),
        Formula::Ite(condition, then_branch, else_branch) => kw("if")
            .append(RcDoc::space())
            .append(formula_child(condition, 1, depth))
            .append(RcDoc::line())
            .append(kw("then"))
            .append(RcDoc::space())
            .append(formula_child(then_branch, 1, depth))
            .append(RcDoc::line())
            .append(kw("else"))
            .append(RcDoc::space())
            .append(formula_child(else_branch, 1, depth))
            .group()
            .nest(2),
    }
}

// A writer that maps Style annotations to termcolor ColorSpec on a WriteColor sink.
struct ColorWriter<'w, W: WriteColor + Write> {
    out: &'w mut W,
}

impl<'a, 'w, W: WriteColor + Write> RenderAnnotated<'a, Style> for ColorWriter<'w, W> {
    fn push_annotation(&mut self, ann: &'a Style) -> io::Result<()> {
        self.out.set_color(&ann.to_color_spec())
    }
    fn pop_annotation(&mut self) -> io::Result<()> {
        self.out.reset()
    }
}

impl<'w, W: WriteColor + Write> pretty::Render for ColorWriter<'w, W> {
    type Error = io::Error;
    fn write_str(&mut self, s: &str) -> io::Result<usize> {
        self.out.write_all(s.as_bytes())?;
        Ok(s.len())
    }
    fn write_str_all(&mut self, s: &str) -> io::Result<()> {
        self.out.write_all(s.as_bytes())
    }
    fn fail_doc(&self) -> Self::Error {
        io::Error::other("render failed")
    }
}

/// Render a document to a `termcolor::WriteColor` with width-aware layout.
fn render_to<W: WriteColor + Write>(doc: &Doc, width: usize, out: &mut W) -> io::Result<()> {
    let mut cw = ColorWriter { out };
    doc.render_raw(width, &mut cw)
}

/// Retrieve the width of the terminal, or 80 if it cannot be determined.
fn terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(80)
}

/// Pretty-printing conveniences for terms and formulas.
pub trait PrettyFormula {
    /// Build an RcDoc representation with style annotations.
    fn pretty_doc(&self) -> Doc;

    /// Render with colors to any termcolor writer at the given width.
    fn pretty_render_to<W: WriteColor + Write>(&self, width: usize, out: &mut W) -> io::Result<()> {
        render_to(&self.pretty_doc(), width, out)
    }

    /// Print to stdout with colors (TTY-aware) at the terminal width.
    fn pretty_print(&self) -> io::Result<()> {
        let stdout = StandardStream::stdout(ColorChoice::Auto);
        let mut stdout = stdout.lock();
        self.pretty_render_to(terminal_width(), &mut stdout)
    }

    /// Format into a plain string (no colors) at the given width.
    fn pretty_string(&self, width: usize) -> String {
        let mut buf = String::new();
        let _ = self.pretty_doc().render_fmt(width, &mut buf);
        buf
    }
}

impl PrettyFormula for Formula {
    fn pretty_doc(&self) -> Doc {
        formula_doc(self, 0)
    }
}

impl PrettyFormula for Term {
    fn pretty_doc(&self) -> Doc {
        term_doc(self, 0)
    }
}

macro_rules! impl_display_via_pretty {
    ($($t:ty),*) => {
        $(
            impl std::fmt::Display for $t {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    let mut w = FmtWrite::new(f);
                    self.pretty_doc().render_raw(usize::MAX, &mut w)
                }
            }
        )*
    };
}

impl_display_via_pretty!(Formula, Term);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ops::*;

    #[test]
    fn sums_use_binary_minus() {
        let t = Term::var("x") - 1 + Term::var("y") * 2;
        assert_eq!(t.to_string(), "x - 1 + y * 2");
        let u = Term::Add(vec![Term::var("x"), Term::int(-3)]);
        assert_eq!(u.to_string(), "x - 3");
    }

    #[test]
    fn connectives_are_parenthesized_by_precedence() {
        let x = Term::var("x");
        let f = (gt(x.clone(), 0) | lt(x.clone(), -5)) & !eq(x.clone(), 2);
        assert_eq!(f.to_string(), "(x > 0 \\/ x < -5) /\\ !(x = 2)");
    }

    #[test]
    fn colored_rendering_writes_escape_codes_only_when_asked() {
        let f = le(Term::var("y") * 2, Term::var("z").modulo(3));
        let mut plain = termcolor::NoColor::new(Vec::new());
        f.pretty_render_to(80, &mut plain).unwrap();
        assert_eq!(String::from_utf8(plain.into_inner()).unwrap(), "y * 2 <= z mod 3");

        let mut colored = termcolor::Ansi::new(Vec::new());
        f.pretty_render_to(80, &mut colored).unwrap();
        assert!(colored.into_inner().len() > "y * 2 <= z mod 3".len());
    }
}
