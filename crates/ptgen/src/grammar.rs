//! Grammar types.

use crate::{
    first_sets::{First, FirstSets},
    types::Map,
    util::display_fn,
};
use std::{fmt, fs, io, path::Path};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TerminalID(u16);
impl TerminalID {
    /// Reserved symbol used as a terminal symbol that means the end of input.
    pub const EOI: Self = Self(0);

    pub const fn into_raw(self) -> u16 {
        self.0
    }
}
impl fmt::Debug for TerminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            &Self::EOI => write!(f, "T#End"),
            _ => write!(f, "T#{:03}", self.0),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct TerminalSet {
    inner: bit_set::BitSet,
}
impl TerminalSet {
    pub fn contains(&self, id: TerminalID) -> bool {
        self.inner.contains(id.0.into())
    }
    pub fn insert(&mut self, id: TerminalID) -> bool {
        self.inner.insert(id.0.into())
    }
    /// Add every element of `other`, and return whether this set has grown.
    pub fn union_with(&mut self, other: &Self) -> bool {
        let before = self.inner.len();
        self.inner.union_with(&other.inner);
        self.inner.len() != before
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
    pub fn len(&self) -> usize {
        self.inner.len()
    }
    pub fn iter(&self) -> impl Iterator<Item = TerminalID> + '_ {
        // Only `u16` values are ever inserted.
        self.inner.iter().map(|raw| TerminalID(raw as u16))
    }
}
impl FromIterator<TerminalID> for TerminalSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        Self {
            inner: iter.into_iter().map(|t| t.0.into()).collect(),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonterminalID(u16);
impl NonterminalID {
    /// The start symbol of the augmented grammar.
    pub const START: Self = Self(0);

    pub const fn into_raw(self) -> u16 {
        self.0
    }
}
impl fmt::Debug for NonterminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            &Self::START => write!(f, "N#Start"),
            _ => write!(f, "N#{:03}", self.0),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionID(u16);
impl fmt::Debug for ActionID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A#{:03}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
    A(ActionID),
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleID(u16);
impl RuleID {
    /// The augmented rule `START -> start`. Reducing it means accepting the input.
    pub const ACCEPT: Self = Self(0);

    pub const fn into_raw(self) -> u16 {
        self.0
    }
}
impl fmt::Debug for RuleID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R#{:03}", self.0)
    }
}

/// The type that represents a production rule in grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Rule {
    pub left: NonterminalID,
    /// The right-hand side, semantic action markers included.
    pub right: Vec<SymbolID>,
    /// The grammar symbols of the right-hand side.
    ///
    /// These are the positions an LR item can point to.
    pub body: Vec<SymbolID>,
}

impl Rule {
    fn new(left: NonterminalID, right: Vec<SymbolID>) -> Self {
        let body = right
            .iter()
            .copied()
            .filter(|s| !matches!(s, SymbolID::A(..)))
            .collect();
        Self { left, right, body }
    }

    /// The semantic action executed when this rule is reduced.
    pub fn trailing_action(&self) -> Option<ActionID> {
        match self.right.last() {
            Some(SymbolID::A(a)) => Some(*a),
            _ => None,
        }
    }

    // `"LHS -> R1 R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(f, "{} ->", g.nonterminal_name(self.left))?;
            if self.right.is_empty() {
                return f.write_str(" ε");
            }
            for symbol in &self.right {
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            Ok(())
        })
    }
}

/// A symbol in the description of a production handed to
/// [`Grammar::from_productions`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Symbol {
    Terminal(String),
    Nonterminal(String),
    /// A semantic action marker. It occupies no position of the production.
    Action(String),
    /// The empty string. It contributes nothing to the production.
    Epsilon,
    /// The end of input, which is never allowed inside a production.
    EndOfInput,
}

/// A production rule described by names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductionDesc {
    pub left: String,
    pub right: Vec<Symbol>,
}

/// The grammar definition used to derive the parser tables.
#[derive(Debug)]
#[non_exhaustive]
pub struct Grammar {
    pub terminals: Map<TerminalID, String>,
    pub nonterminals: Map<NonterminalID, String>,
    pub actions: Map<ActionID, String>,
    pub rules: Map<RuleID, Rule>,
    pub start_symbol: NonterminalID,
    names: Map<String, SymbolID>,
    rules_of: Map<NonterminalID, Vec<RuleID>>,
    first_sets: FirstSets,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## terminals:")?;
        for (&id, name) in &self.terminals {
            if id != TerminalID::EOI {
                writeln!(f, "{}", name)?;
            }
        }

        writeln!(f, "\n## nonterminals:")?;
        for (&id, name) in &self.nonterminals {
            if id == NonterminalID::START {
                continue;
            }
            write!(f, "{}", name)?;
            if id == self.start_symbol {
                write!(f, " (start)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## rules:")?;
        for (id, rule) in &self.rules {
            writeln!(f, "{:<5}{}", id.0, rule.display(self))?;
        }

        Ok(())
    }
}

impl Grammar {
    /// Read a grammar description file. See [`crate::syntax`] for the format.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Grammar, GrammarError> {
        let source = fs::read_to_string(path)?;
        Self::from_str(&source)
    }

    pub fn from_str(source: &str) -> Result<Grammar, GrammarError> {
        let productions = crate::syntax::parse(source)?;
        Self::from_productions(&productions, None)
    }

    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarError>,
    {
        let mut def = GrammarDef::default();
        f(&mut def)?;
        def.end()
    }

    /// Build a grammar from an ordered list of productions.
    ///
    /// Without an explicit `start`, the left-hand side of the first
    /// production is the start symbol.
    pub fn from_productions(
        productions: &[ProductionDesc],
        start: Option<&str>,
    ) -> Result<Self, GrammarError> {
        Self::define(|g| {
            for production in productions {
                let left = g.nonterminal(&production.left)?;
                let mut right = Vec::with_capacity(production.right.len());
                for symbol in &production.right {
                    match symbol {
                        Symbol::Terminal(name) => right.push(SymbolID::T(g.terminal(name)?)),
                        Symbol::Nonterminal(name) => {
                            right.push(SymbolID::N(g.nonterminal(name)?));
                        }
                        Symbol::Action(name) => right.push(SymbolID::A(g.action(name)?)),
                        Symbol::Epsilon => (),
                        Symbol::EndOfInput => {
                            return Err(format!(
                                "the end of input appears in a production of `{}'",
                                production.left
                            )
                            .into());
                        }
                    }
                }
                g.rule(left, right)?;
            }
            if let Some(start) = start {
                let start = g.nonterminal(start)?;
                g.start_symbol(start);
            }
            Ok(())
        })
    }

    pub fn rule(&self, id: RuleID) -> &Rule {
        &self.rules[&id]
    }

    /// Return the rules of `nonterminal`, in the order they were defined.
    pub fn productions_of(
        &self,
        nonterminal: NonterminalID,
    ) -> impl Iterator<Item = (RuleID, &Rule)> + '_ {
        self.rules_of
            .get(&nonterminal)
            .map_or(&[][..], Vec::as_slice)
            .iter()
            .map(move |id| (*id, &self.rules[id]))
    }

    /// `FIRST` of a string of symbols. Semantic action markers are skipped.
    pub fn first(&self, symbols: &[SymbolID]) -> First {
        self.first_sets.first(symbols)
    }

    pub fn is_nullable(&self, nonterminal: NonterminalID) -> bool {
        self.first_sets.is_nullable(nonterminal)
    }

    /// Look up a terminal by name. The end of input has no name to look up.
    pub fn terminal(&self, name: &str) -> Option<TerminalID> {
        match self.names.get(name)? {
            SymbolID::T(t) => Some(*t),
            _ => None,
        }
    }

    pub fn nonterminal(&self, name: &str) -> Option<NonterminalID> {
        match self.names.get(name)? {
            SymbolID::N(n) => Some(*n),
            _ => None,
        }
    }

    pub fn terminal_name(&self, id: TerminalID) -> &str {
        &self.terminals[&id]
    }

    pub fn nonterminal_name(&self, id: NonterminalID) -> &str {
        &self.nonterminals[&id]
    }

    pub fn action_name(&self, id: ActionID) -> &str {
        &self.actions[&id]
    }

    /// The display name of a symbol. Action markers carry their `@` prefix.
    pub fn symbol_name(&self, symbol: SymbolID) -> impl fmt::Display + '_ {
        display_fn(move |f| match symbol {
            SymbolID::T(t) => f.write_str(self.terminal_name(t)),
            SymbolID::N(n) => f.write_str(self.nonterminal_name(n)),
            SymbolID::A(a) => write!(f, "@{}", self.action_name(a)),
        })
    }
}

/// The contextural values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef {
    terminals: Map<TerminalID, String>,
    nonterminals: Map<NonterminalID, String>,
    actions: Map<ActionID, String>,
    names: Map<String, SymbolID>,
    rules: Vec<Rule>,
    start: Option<NonterminalID>,
}

impl Default for GrammarDef {
    fn default() -> Self {
        let mut def = Self {
            terminals: Map::default(),
            nonterminals: Map::default(),
            actions: Map::default(),
            names: Map::default(),
            rules: vec![],
            start: None,
        };
        def.terminals.insert(TerminalID::EOI, "$".into());
        def.nonterminals.insert(NonterminalID::START, "$start".into());
        def
    }
}

impl GrammarDef {
    /// Declare a terminal symbol, or return the one already declared with
    /// the same name.
    pub fn terminal(&mut self, name: &str) -> Result<TerminalID, GrammarError> {
        if name.is_empty() || name == "$" || name.contains(char::is_whitespace) {
            return Err(format!("incorrect terminal name: `{}'", name).into());
        }
        match self.names.get(name) {
            Some(SymbolID::T(t)) => return Ok(*t),
            Some(other) => return Err(self.collision(name, *other)),
            None => (),
        }
        let id = TerminalID(next_raw(self.terminals.len(), "terminal")?);
        self.terminals.insert(id, name.to_owned());
        self.names.insert(name.to_owned(), SymbolID::T(id));
        Ok(id)
    }

    /// Declare a nonterminal symbol, or return the one already declared
    /// with the same name.
    pub fn nonterminal(&mut self, name: &str) -> Result<NonterminalID, GrammarError> {
        if !verify_ident(name) {
            return Err(format!("incorrect nonterminal name: `{}'", name).into());
        }
        match self.names.get(name) {
            Some(SymbolID::N(n)) => return Ok(*n),
            Some(other) => return Err(self.collision(name, *other)),
            None => (),
        }
        let id = NonterminalID(next_raw(self.nonterminals.len(), "nonterminal")?);
        self.nonterminals.insert(id, name.to_owned());
        self.names.insert(name.to_owned(), SymbolID::N(id));
        Ok(id)
    }

    /// Declare a semantic action marker, or return the one already declared
    /// with the same name. The name does not include the `@` prefix.
    pub fn action(&mut self, name: &str) -> Result<ActionID, GrammarError> {
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(format!("incorrect action name: `{}'", name).into());
        }
        // Markers live in a namespace of their own since they are always
        // spelled with the `@` prefix.
        if let Some((id, _)) = self.actions.iter().find(|(_, n)| n.as_str() == name) {
            return Ok(*id);
        }
        let id = ActionID(next_raw(self.actions.len(), "action")?);
        self.actions.insert(id, name.to_owned());
        Ok(id)
    }

    /// Specify a production rule into this grammer.
    pub fn rule<I>(&mut self, left: NonterminalID, right: I) -> Result<RuleID, GrammarError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        let rule = Rule::new(left, right.into_iter().collect());
        if self
            .rules
            .iter()
            .any(|r| r.left == rule.left && r.right == rule.right)
        {
            // Kept as is so that the LL(1) construction reports the clash.
            tracing::warn!(
                "duplicate production rule of `{}'",
                self.nonterminals[&left]
            );
        }
        let id = RuleID(next_raw(self.rules.len() + 1, "rule")?);
        self.rules.push(rule);
        Ok(id)
    }

    /// Specify the start symbol for this grammar.
    pub fn start_symbol(&mut self, symbol: NonterminalID) {
        self.start.replace(symbol);
    }

    fn collision(&self, name: &str, existing: SymbolID) -> GrammarError {
        let kind = match existing {
            SymbolID::T(..) => "terminal",
            SymbolID::N(..) => "nonterminal",
            SymbolID::A(..) => "action",
        };
        format!("the name `{}' has already been used by a {} symbol", name, kind).into()
    }

    fn end(mut self) -> Result<Grammar, GrammarError> {
        // 指定されていない場合は最初の構文規則の左辺を用いる
        let start = match self.start.take() {
            Some(start) => start,
            None => self
                .rules
                .first()
                .map(|rule| rule.left)
                .ok_or_else(|| GrammarError::from("empty production rules"))?,
        };

        let mut defined: Map<NonterminalID, bool> =
            self.nonterminals.keys().map(|&n| (n, false)).collect();
        for rule in &self.rules {
            defined.insert(rule.left, true);
        }
        let mut referenced = vec![start];
        for rule in &self.rules {
            referenced.extend(rule.body.iter().filter_map(|s| match s {
                SymbolID::N(n) => Some(*n),
                _ => None,
            }));
        }
        for n in referenced {
            if !defined[&n] {
                return Err(format!(
                    "the nonterminal `{}' has no production rules",
                    self.nonterminals[&n]
                )
                .into());
            }
        }

        for (&n, &defined) in &defined {
            if !defined && n != NonterminalID::START {
                tracing::warn!(
                    "the nonterminal `{}' is declared but has no production rules",
                    self.nonterminals[&n]
                );
            }
        }

        let mut rules = Map::default();
        rules.insert(
            RuleID::ACCEPT,
            Rule::new(NonterminalID::START, vec![SymbolID::N(start)]),
        );
        for (i, rule) in self.rules.into_iter().enumerate() {
            // The ID range has been checked when the rule was added.
            rules.insert(RuleID(i as u16 + 1), rule);
        }

        let mut rules_of: Map<NonterminalID, Vec<RuleID>> = Map::default();
        for (&id, rule) in &rules {
            rules_of.entry(rule.left).or_default().push(id);
        }

        let first_sets = FirstSets::new(&self.nonterminals, &rules);

        Ok(Grammar {
            terminals: self.terminals,
            nonterminals: self.nonterminals,
            actions: self.actions,
            rules,
            start_symbol: start,
            names: self.names,
            rules_of,
            first_sets,
        })
    }
}

fn next_raw(len: usize, kind: &str) -> Result<u16, GrammarError> {
    u16::try_from(len).map_err(|_| format!("too many {} symbols", kind).into())
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GrammarError {
    #[error("IO error: {}", _0)]
    Io(#[from] io::Error),

    #[error("syntax error at line {line}: {msg}")]
    Syntax { line: usize, msg: String },

    #[error("invalid grammar: {msg}")]
    InvalidGrammar { msg: String },
}
impl From<&str> for GrammarError {
    fn from(msg: &str) -> Self {
        Self::InvalidGrammar { msg: msg.into() }
    }
}
impl From<String> for GrammarError {
    fn from(msg: String) -> Self {
        Self::InvalidGrammar { msg }
    }
}

/// Nonterminal names are identifiers, optionally followed by primes (`E'`).
fn verify_ident(s: &str) -> bool {
    let s = s.trim_end_matches('\'');
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first == '_' || unicode_ident::is_xid_start(first) => (),
        _ => return false,
    }
    chars.all(unicode_ident::is_xid_continue)
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
    fn p(left: &str, right: Vec<Symbol>) -> ProductionDesc {
        ProductionDesc {
            left: left.into(),
            right,
        }
    }

    #[test]
    fn augmented_rule_comes_first() {
        let g = Grammar::from_productions(
            &[p("E", vec![n("E"), t("+"), n("T")]), p("E", vec![n("T")]), p("T", vec![t("id")])],
            None,
        )
        .unwrap();
        let e = g.nonterminal("E").unwrap();
        assert_eq!(g.start_symbol, e);
        let accept = g.rule(RuleID::ACCEPT);
        assert_eq!(accept.left, NonterminalID::START);
        assert_eq!(accept.right, vec![SymbolID::N(e)]);
        assert_eq!(g.rules.len(), 4);
        assert_eq!(g.productions_of(e).count(), 2);
        // the end of input plus `+` and `id`
        assert_eq!(g.terminals.len(), 3);
    }

    #[test]
    fn lookup_by_name() {
        let g = Grammar::from_productions(
            &[
                p("S", vec![t("a"), n("A")]),
                p("A", vec![t("b")]),
                p("S", vec![t("c")]),
                p("A", vec![]),
            ],
            None,
        )
        .unwrap();
        let s = g.nonterminal("S").unwrap();
        let a = g.nonterminal("A").unwrap();
        assert_eq!(g.terminal_name(g.terminal("b").unwrap()), "b");
        assert_eq!(g.nonterminal_name(a), "A");

        // A name resolves only within its own kind.
        assert_eq!(g.terminal("S"), None);
        assert_eq!(g.nonterminal("a"), None);
        assert_eq!(g.terminal("$"), None);
        assert_eq!(g.nonterminal("$start"), None);

        let ids = |n| g.productions_of(n).map(|(id, _)| id.into_raw()).collect::<Vec<_>>();
        assert_eq!(ids(NonterminalID::START), vec![0]);
        assert_eq!(ids(s), vec![1, 3]);
        assert_eq!(ids(a), vec![2, 4]);
        assert!(g.productions_of(s).all(|(_, rule)| rule.left == s));
    }

    #[test]
    fn explicit_start_symbol() {
        let g = Grammar::from_productions(
            &[p("A", vec![t("a")]), p("S", vec![n("A")])],
            Some("S"),
        )
        .unwrap();
        assert_eq!(g.start_symbol, g.nonterminal("S").unwrap());
    }

    #[test]
    fn undefined_nonterminal() {
        let err = Grammar::from_productions(&[p("S", vec![n("A"), t("a")])], None).unwrap_err();
        assert!(
            matches!(&err, GrammarError::InvalidGrammar { msg } if msg.contains("`A'")),
            "{:?}",
            err
        );
    }

    #[test]
    fn undefined_start_symbol() {
        let err = Grammar::from_productions(&[p("S", vec![t("a")])], Some("X")).unwrap_err();
        assert!(matches!(err, GrammarError::InvalidGrammar { .. }));
    }

    #[test]
    fn name_collision_between_kinds() {
        let err = Grammar::from_productions(
            &[p("S", vec![t("x")]), p("x", vec![t("y")])],
            None,
        )
        .unwrap_err();
        assert!(
            matches!(&err, GrammarError::InvalidGrammar { msg } if msg.contains("terminal")),
            "{:?}",
            err
        );
    }

    #[test]
    fn end_of_input_in_right_hand_side() {
        let err = Grammar::from_productions(&[p("S", vec![t("a"), Symbol::EndOfInput])], None)
            .unwrap_err();
        assert!(matches!(err, GrammarError::InvalidGrammar { .. }));
    }

    #[test]
    fn empty_grammar() {
        let err = Grammar::from_productions(&[], None).unwrap_err();
        assert!(matches!(err, GrammarError::InvalidGrammar { .. }));
    }

    #[test]
    fn epsilon_and_actions_occupy_no_position() {
        let g = Grammar::from_productions(
            &[
                p("S", vec![t("a"), Symbol::Action("PUSH".into()), n("B")]),
                p("B", vec![Symbol::Epsilon, Symbol::Action("EMPTY".into())]),
            ],
            None,
        )
        .unwrap();
        let s = g.nonterminal("S").unwrap();
        let b = g.nonterminal("B").unwrap();
        let (_, rule) = g.productions_of(s).next().unwrap();
        assert_eq!(rule.right.len(), 3);
        assert_eq!(rule.body.len(), 2);
        assert_eq!(rule.trailing_action(), None);

        let (_, rule) = g.productions_of(b).next().unwrap();
        assert!(rule.body.is_empty());
        let action = rule.trailing_action().unwrap();
        assert_eq!(g.action_name(action), "EMPTY");
        assert_eq!(rule.display(&g).to_string(), "B -> @EMPTY");
    }

    #[test]
    fn display_rules() {
        let g = Grammar::from_productions(
            &[p("S", vec![n("A"), t("b")]), p("A", vec![])],
            None,
        )
        .unwrap();
        let dump = g.to_string();
        assert!(dump.contains("0    $start -> S\n"), "{}", dump);
        assert!(dump.contains("1    S -> A b\n"), "{}", dump);
        assert!(dump.contains("2    A -> ε\n"), "{}", dump);
        assert!(dump.contains("S (start)\n"), "{}", dump);
    }

    #[test]
    fn nonterminal_names() {
        assert!(verify_ident("Expr"));
        assert!(verify_ident("E'"));
        assert!(verify_ident("_Tail2"));
        assert!(!verify_ident(""));
        assert!(!verify_ident("'"));
        assert!(!verify_ident("1A"));
        assert!(!verify_ident("A-B"));
    }
}
