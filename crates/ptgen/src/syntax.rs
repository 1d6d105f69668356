//! The line-oriented grammar description format.
//!
//! ```text
//! # comments and blank lines are ignored
//! .Functions->print format
//!
//! S->Statement S
//! S->eps
//! Statement->.Functions ( Expr ) @.Functions
//! Expr->id @PUSH
//! ```
//!
//! Each line is a production `Lhs->sym sym ...`. Names that begin with an
//! uppercase letter are nonterminals, `@NAME` is a semantic action marker,
//! `eps` is the empty string and anything else is a terminal. The left-hand
//! side of the first production is the start symbol.
//!
//! A line starting with a dot defines a class of terminals. A production
//! that refers to the class (`.Name`) stands for one production per element
//! of the class, with `@.Name` replaced by the uppercased element as the
//! action marker (`@PRINT` for `print`).

use crate::{
    grammar::{GrammarError, ProductionDesc, Symbol},
    types::Map,
};

/// A token of a right-hand side before class expansion.
#[derive(Debug, Clone, PartialEq)]
enum Elem<'s> {
    Symbol(Symbol),
    Class(&'s str),
    ClassAction(&'s str),
}

/// Parse the grammar description and expand the class references.
pub fn parse(source: &str) -> Result<Vec<ProductionDesc>, GrammarError> {
    let mut classes = Map::<&str, Vec<&str>>::default();
    let mut productions = vec![];

    for (i, line) in source.lines().enumerate() {
        let lineno = i + 1;
        let error = |msg: String| GrammarError::Syntax { line: lineno, msg };

        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (left, right) = line
            .split_once("->")
            .ok_or_else(|| error("missing `->'".into()))?;
        let left = left.trim();

        if let Some(name) = left.strip_prefix('.') {
            if name.is_empty() {
                return Err(error("missing class name".into()));
            }
            let elements: Vec<_> = right.split_whitespace().collect();
            if elements.is_empty() {
                return Err(error(format!("the class `.{}' has no elements", name)));
            }
            classes.entry(name).or_default().extend(elements);
            continue;
        }

        if !left.starts_with(char::is_uppercase) {
            return Err(error(format!(
                "the left-hand side `{}' is not a nonterminal",
                left
            )));
        }

        let mut elems = vec![];
        for token in right.split_whitespace() {
            elems.push(classify(token).map_err(error)?);
        }
        if elems.is_empty() {
            return Err(error("empty right-hand side; use `eps' instead".into()));
        }

        let mut class = None;
        for elem in &elems {
            if let Elem::Class(name) = elem {
                match class {
                    Some(other) if other != *name => {
                        return Err(error(format!(
                            "multiple classes `.{}' and `.{}' in a production",
                            other, name
                        )));
                    }
                    _ => class = Some(*name),
                }
            }
        }
        for elem in &elems {
            if let Elem::ClassAction(name) = elem {
                if class != Some(*name) {
                    return Err(error(format!(
                        "the marker `@.{}' does not refer to a class of this production",
                        name
                    )));
                }
            }
        }

        let Some(class) = class else {
            productions.push(ProductionDesc {
                left: left.to_owned(),
                right: elems
                    .into_iter()
                    .filter_map(|elem| match elem {
                        Elem::Symbol(symbol) => Some(symbol),
                        _ => None,
                    })
                    .collect(),
            });
            continue;
        };

        let elements = classes
            .get(class)
            .ok_or_else(|| error(format!("unknown class `.{}'", class)))?;
        for element in elements {
            productions.push(ProductionDesc {
                left: left.to_owned(),
                right: elems
                    .iter()
                    .map(|elem| match elem {
                        Elem::Symbol(symbol) => symbol.clone(),
                        Elem::Class(..) => Symbol::Terminal(element.to_string()),
                        Elem::ClassAction(..) => Symbol::Action(element.to_uppercase()),
                    })
                    .collect(),
            });
        }
    }

    tracing::debug!(
        "{} productions, {} classes",
        productions.len(),
        classes.len()
    );

    Ok(productions)
}

fn classify(token: &str) -> Result<Elem<'_>, String> {
    if token == "eps" {
        return Ok(Elem::Symbol(Symbol::Epsilon));
    }
    if token == "$" {
        return Err("the end of input `$' cannot appear in a production".into());
    }
    if let Some(name) = token.strip_prefix("@.") {
        if name.is_empty() {
            return Err("missing class name after `@.'".into());
        }
        return Ok(Elem::ClassAction(name));
    }
    if let Some(name) = token.strip_prefix('@') {
        if name.is_empty() {
            return Err("missing action name after `@'".into());
        }
        return Ok(Elem::Symbol(Symbol::Action(name.to_owned())));
    }
    if let Some(name) = token.strip_prefix('.').filter(|name| !name.is_empty()) {
        return Ok(Elem::Class(name));
    }
    if token.starts_with(char::is_uppercase) {
        return Ok(Elem::Symbol(Symbol::Nonterminal(token.to_owned())));
    }
    Ok(Elem::Symbol(Symbol::Terminal(token.to_owned())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(name: &str) -> Symbol {
        Symbol::Terminal(name.into())
    }
    fn n(name: &str) -> Symbol {
        Symbol::Nonterminal(name.into())
    }
    fn a(name: &str) -> Symbol {
        Symbol::Action(name.into())
    }

    #[test]
    fn productions() {
        let productions = parse(
            "# expression\n\
             \n\
             E->T E'\n\
             E'->+ T @ADD E'\n\
             E'->eps\n\
             T->id @PUSH\n",
        )
        .unwrap();
        assert_eq!(
            productions,
            vec![
                ProductionDesc {
                    left: "E".into(),
                    right: vec![n("T"), n("E'")],
                },
                ProductionDesc {
                    left: "E'".into(),
                    right: vec![t("+"), n("T"), a("ADD"), n("E'")],
                },
                ProductionDesc {
                    left: "E'".into(),
                    right: vec![Symbol::Epsilon],
                },
                ProductionDesc {
                    left: "T".into(),
                    right: vec![t("id"), a("PUSH")],
                },
            ]
        );
    }

    #[test]
    fn class_expansion() {
        let productions = parse(
            ".Functions->print format\n\
             Call->.Functions ( id ) @.Functions\n",
        )
        .unwrap();
        assert_eq!(
            productions,
            vec![
                ProductionDesc {
                    left: "Call".into(),
                    right: vec![t("print"), t("("), t("id"), t(")"), a("PRINT")],
                },
                ProductionDesc {
                    left: "Call".into(),
                    right: vec![t("format"), t("("), t("id"), t(")"), a("FORMAT")],
                },
            ]
        );
    }

    #[test]
    fn errors_carry_line_numbers() {
        let cases = [
            ("S->a\nS a\n", 2),
            ("S->a $\n", 1),
            ("# c\ns->a\n", 2),
            ("S->\n", 1),
            ("S->.Unknown\n", 1),
            (".A->x\n.B->y\nS->.A .B\n", 3),
            (".A->x\nS->a @.A\n", 2),
            ("S->@\n", 1),
        ];
        for (source, expected) in cases {
            match parse(source) {
                Err(GrammarError::Syntax { line, .. }) => assert_eq!(line, expected, "{:?}", source),
                other => panic!("unexpected result for {:?}: {:?}", source, other),
            }
        }
    }

    #[test]
    fn lone_dot_is_a_terminal() {
        let productions = parse("S->a . b\n").unwrap();
        assert_eq!(productions[0].right, vec![t("a"), t("."), t("b")]);
    }
}
