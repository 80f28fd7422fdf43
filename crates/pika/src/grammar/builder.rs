use compact_str::CompactString;
use hashbrown::HashMap;
use lasso::{Rodeo, RodeoReader, Spur};
use smallvec::SmallVec;

use crate::grammar::analysis;
use crate::grammar::{Clause, ClauseId, ClauseKind, Expr, Terminal};

/// Identity of a rule within its grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(u32);

impl RuleId {
    pub(crate) fn new(index: usize) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Self(index as u32)
    }

    /// Index of this rule in the grammar's rule list.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A named binding `name <- clause`, with an optional AST node label.
#[derive(Debug, Clone)]
pub struct Rule {
    pub(crate) name: Spur,
    pub(crate) ast_label: Option<Spur>,
    pub(crate) clause: ClauseId,
}

impl Rule {
    /// The toplevel clause of this rule.
    #[must_use]
    pub const fn clause(&self) -> ClauseId {
        self.clause
    }

    /// The AST node label bound to this rule, if any. Resolve it with
    /// [`Grammar::label_text`].
    #[must_use]
    pub const fn ast_label(&self) -> Option<Spur> {
        self.ast_label
    }
}

/// A frozen grammar: the id-indexed clause graph, its rule bindings, and the
/// analysis results (`can_match_zero_chars`, seed parents) the parser relies
/// on. Grammars are immutable once built.
pub struct Grammar {
    clauses: Vec<Clause>,
    rules: Vec<Rule>,
    rule_index: HashMap<Spur, RuleId, ahash::RandomState>,
    entry_rule: RuleId,
    terminals: Vec<ClauseId>,
    zero_char_clauses: Vec<ClauseId>,
    interner: RodeoReader,
}

impl Grammar {
    #[must_use]
    pub fn clause(&self, id: ClauseId) -> &Clause {
        &self.clauses[id.index()]
    }

    pub fn clauses(&self) -> impl Iterator<Item = (ClauseId, &Clause)> {
        self.clauses
            .iter()
            .enumerate()
            .map(|(idx, clause)| (ClauseId::new(idx), clause))
    }

    #[must_use]
    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }

    #[must_use]
    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.index()]
    }

    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules
            .iter()
            .enumerate()
            .map(|(idx, rule)| (RuleId::new(idx), rule))
    }

    #[must_use]
    pub fn rule_name(&self, id: RuleId) -> &str {
        self.interner.resolve(&self.rules[id.index()].name)
    }

    /// Toplevel clause of the rule with the given name.
    #[must_use]
    pub fn rule_clause(&self, name: &str) -> Option<ClauseId> {
        let spur = self.interner.get(name)?;
        let rule = self.rule_index.get(&spur)?;
        Some(self.rules[rule.index()].clause)
    }

    /// Toplevel clause of the designated entry-point rule.
    #[must_use]
    pub fn entry_clause(&self) -> ClauseId {
        self.rules[self.entry_rule.index()].clause
    }

    /// The designated entry-point rule.
    #[must_use]
    pub fn entry_rule(&self) -> &Rule {
        &self.rules[self.entry_rule.index()]
    }

    /// All terminal clauses, in clause-id order. Used to seed the parse.
    #[must_use]
    pub fn terminal_clauses(&self) -> &[ClauseId] {
        &self.terminals
    }

    /// All clauses that can match zero characters, in clause-id order.
    #[must_use]
    pub fn zero_char_clauses(&self) -> &[ClauseId] {
        &self.zero_char_clauses
    }

    /// Resolve an interned AST label.
    #[must_use]
    pub fn label_text(&self, label: Spur) -> &str {
        self.interner.resolve(&label)
    }

    /// Render a clause as a PEG expression, substituting rule names for
    /// subclauses that are rule toplevels.
    #[must_use]
    pub fn clause_display(&self, id: ClauseId) -> String {
        let mut out = String::new();
        self.render_clause(id, true, &mut out);
        out
    }

    fn render_clause(&self, id: ClauseId, expand: bool, out: &mut String) {
        let clause = self.clause(id);
        if !expand && let Some(&rule) = clause.rules.first() {
            out.push_str(self.rule_name(rule));
            return;
        }
        match &clause.kind {
            ClauseKind::Terminal(Terminal::Literal(text)) => {
                out.push('\'');
                for c in text.chars() {
                    match c {
                        '\'' | '\\' => {
                            out.push('\\');
                            out.push(c);
                        }
                        '\n' => out.push_str("\\n"),
                        '\t' => out.push_str("\\t"),
                        _ => out.push(c),
                    }
                }
                out.push('\'');
            }
            ClauseKind::Terminal(Terminal::CharSet(set)) => {
                out.push('[');
                if set.is_negated() {
                    out.push('^');
                }
                for &(start, end) in set.ranges() {
                    out.push(start);
                    if start != end {
                        out.push('-');
                        out.push(end);
                    }
                }
                out.push(']');
            }
            ClauseKind::Terminal(Terminal::Any) => out.push('.'),
            ClauseKind::Seq => self.render_joined(clause, " ", out),
            ClauseKind::First => self.render_joined(clause, " / ", out),
            ClauseKind::Longest => self.render_joined(clause, " | ", out),
            ClauseKind::Opt => {
                self.render_operand(clause.sub_clauses[0], out);
                out.push('?');
            }
            ClauseKind::OneOrMore => {
                self.render_operand(clause.sub_clauses[0], out);
                out.push('+');
            }
            ClauseKind::FollowedBy => {
                out.push('&');
                self.render_operand(clause.sub_clauses[0], out);
            }
            ClauseKind::NotFollowedBy => {
                out.push('!');
                self.render_operand(clause.sub_clauses[0], out);
            }
        }
    }

    fn render_joined(&self, clause: &Clause, sep: &str, out: &mut String) {
        for (idx, &sub) in clause.sub_clauses.iter().enumerate() {
            if idx > 0 {
                out.push_str(sep);
            }
            self.render_operand(sub, out);
        }
    }

    fn render_operand(&self, id: ClauseId, out: &mut String) {
        let clause = self.clause(id);
        let needs_parens = clause.rules.is_empty()
            && matches!(
                clause.kind,
                ClauseKind::Seq | ClauseKind::First | ClauseKind::Longest
            )
            && clause.sub_clauses.len() > 1;
        if needs_parens {
            out.push('(');
            self.render_clause(id, false, out);
            out.push(')');
        } else {
            self.render_clause(id, false, out);
        }
    }
}

/// Errors detected while constructing a grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    #[error("missing entry point")]
    MissingEntryPoint,

    #[error("duplicate rule: {0}")]
    DuplicateRule(CompactString),

    #[error("undefined rule: {0}")]
    UndefinedRule(CompactString),

    #[error("literal terminal must not be empty")]
    EmptyLiteral,

    #[error("{0} must have at least one subclause")]
    EmptyClause(&'static str),
}

/// Builder for constructing grammars from [`Expr`] trees.
pub struct GrammarBuilder {
    rules: Vec<(CompactString, Option<CompactString>, Expr)>,
    entry_point: Option<CompactString>,
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GrammarBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            entry_point: None,
        }
    }

    #[must_use]
    pub fn entry_point(mut self, name: impl Into<CompactString>) -> Self {
        self.entry_point = Some(name.into());
        self
    }

    #[must_use]
    pub fn rule(mut self, name: impl Into<CompactString>, expr: Expr) -> Self {
        self.rules.push((name.into(), None, expr));
        self
    }

    /// Define a rule that also carries an AST node label.
    #[must_use]
    pub fn labeled_rule(
        mut self,
        name: impl Into<CompactString>,
        ast_label: impl Into<CompactString>,
        expr: Expr,
    ) -> Self {
        self.rules.push((name.into(), Some(ast_label.into()), expr));
        self
    }

    /// Build the frozen grammar from the configured rules.
    ///
    /// Interns the expression forest into the clause arena (identical
    /// terminals are shared), resolves rule references including cycles,
    /// lowers `ZeroOrMore` to `Opt(OneOrMore(..))`, and runs the
    /// zero-char-match and seed-parent analysis passes.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry point is missing or undefined, a rule is
    /// defined twice, a rule reference does not resolve, or a clause body is
    /// structurally empty.
    pub fn build(self) -> Result<Grammar, GrammarError> {
        let entry_name = self.entry_point.ok_or(GrammarError::MissingEntryPoint)?;

        let mut interner = Rodeo::default();
        let mut rule_index: HashMap<Spur, RuleId, ahash::RandomState> =
            HashMap::with_hasher(ahash::RandomState::new());
        let mut clauses: Vec<Clause> = Vec::new();
        let mut rules: Vec<Rule> = Vec::new();

        // One clause slot per rule, allocated up front so rule references
        // (cycles included) resolve before any body is lowered.
        for (idx, (name, ast_label, _)) in self.rules.iter().enumerate() {
            let spur = interner.get_or_intern(name.as_str());
            if rule_index.insert(spur, RuleId::new(idx)).is_some() {
                return Err(GrammarError::DuplicateRule(name.clone()));
            }
            let ast_label = ast_label
                .as_ref()
                .map(|label| interner.get_or_intern(label.as_str()));
            clauses.push(Clause::new(ClauseKind::Seq, SmallVec::new()));
            rules.push(Rule {
                name: spur,
                ast_label,
                clause: ClauseId::new(idx),
            });
        }

        let entry_rule = interner
            .get(entry_name.as_str())
            .and_then(|spur| rule_index.get(&spur).copied())
            .ok_or(GrammarError::UndefinedRule(entry_name))?;

        let mut lowering = Lowering {
            interner: &mut interner,
            rule_index: &rule_index,
            clauses: &mut clauses,
            terminals: HashMap::with_hasher(ahash::RandomState::new()),
        };
        for (idx, (_, _, expr)) in self.rules.into_iter().enumerate() {
            lowering.lower_rule_body(idx, expr, &mut rules)?;
        }

        for (idx, rule) in rules.iter().enumerate() {
            clauses[rule.clause.index()].rules.push(RuleId::new(idx));
        }

        analysis::compute_can_match_zero_chars(&mut clauses);
        analysis::install_seed_parents(&mut clauses);

        let terminals = clauses
            .iter()
            .enumerate()
            .filter(|(_, clause)| clause.is_terminal())
            .map(|(idx, _)| ClauseId::new(idx))
            .collect();
        let zero_char_clauses = clauses
            .iter()
            .enumerate()
            .filter(|(_, clause)| clause.can_match_zero_chars)
            .map(|(idx, _)| ClauseId::new(idx))
            .collect();

        Ok(Grammar {
            clauses,
            rules,
            rule_index,
            entry_rule,
            terminals,
            zero_char_clauses,
            interner: interner.into_reader(),
        })
    }
}

/// State for interning an expression forest into the clause arena.
struct Lowering<'a> {
    interner: &'a mut Rodeo,
    rule_index: &'a HashMap<Spur, RuleId, ahash::RandomState>,
    clauses: &'a mut Vec<Clause>,
    /// Structural dedup of terminal clauses, so every occurrence of a terminal
    /// shares one memo sub-map.
    terminals: HashMap<Terminal, ClauseId, ahash::RandomState>,
}

impl Lowering<'_> {
    fn lower_rule_body(
        &mut self,
        rule_idx: usize,
        mut expr: Expr,
        rules: &mut [Rule],
    ) -> Result<(), GrammarError> {
        // A label wrapping the whole body names the rule's AST node.
        while let Expr::Label { name, expr: inner } = expr {
            if rules[rule_idx].ast_label.is_none() {
                rules[rule_idx].ast_label = Some(self.interner.get_or_intern(name.as_str()));
            }
            expr = *inner;
        }
        let clause = match expr {
            // An alias rule wraps its target so the rule keeps its own slot.
            Expr::RuleRef(name) => {
                let target = self.resolve_rule_ref(&name)?;
                Clause::new(ClauseKind::Seq, SmallVec::from_slice(&[target]))
            }
            other => self.lower_node(other)?,
        };
        self.clauses[rule_idx] = clause;
        Ok(())
    }

    /// Lower a composite or terminal expression into a clause value, without
    /// allocating a slot for it.
    fn lower_node(&mut self, expr: Expr) -> Result<Clause, GrammarError> {
        match expr {
            Expr::Literal(text) => {
                if text.is_empty() {
                    return Err(GrammarError::EmptyLiteral);
                }
                Ok(Clause::new(
                    ClauseKind::Terminal(Terminal::Literal(text)),
                    SmallVec::new(),
                ))
            }
            Expr::CharSet(set) => Ok(Clause::new(
                ClauseKind::Terminal(Terminal::CharSet(set)),
                SmallVec::new(),
            )),
            Expr::AnyChar => Ok(Clause::new(
                ClauseKind::Terminal(Terminal::Any),
                SmallVec::new(),
            )),
            Expr::RuleRef(name) => {
                let target = self.resolve_rule_ref(&name)?;
                Ok(Clause::new(ClauseKind::Seq, SmallVec::from_slice(&[target])))
            }
            Expr::Seq(exprs) => self.lower_composite(ClauseKind::Seq, "sequence", exprs),
            Expr::First(exprs) => self.lower_composite(ClauseKind::First, "ordered choice", exprs),
            Expr::Longest(exprs) => {
                self.lower_composite(ClauseKind::Longest, "longest choice", exprs)
            }
            Expr::Opt(inner) => self.lower_single(ClauseKind::Opt, *inner),
            Expr::OneOrMore(inner) => self.lower_single(ClauseKind::OneOrMore, *inner),
            Expr::ZeroOrMore(inner) => {
                let (child, label) = self.lower(*inner)?;
                let mut repeat = Clause::new(ClauseKind::OneOrMore, SmallVec::from_slice(&[child]));
                repeat.sub_clause_labels[0] = label;
                let repeat = self.push(repeat);
                Ok(Clause::new(ClauseKind::Opt, SmallVec::from_slice(&[repeat])))
            }
            Expr::FollowedBy(inner) => self.lower_single(ClauseKind::FollowedBy, *inner),
            Expr::NotFollowedBy(inner) => self.lower_single(ClauseKind::NotFollowedBy, *inner),
            Expr::Label { expr, .. } => self.lower_node(*expr),
        }
    }

    fn lower_composite(
        &mut self,
        kind: ClauseKind,
        what: &'static str,
        exprs: Vec<Expr>,
    ) -> Result<Clause, GrammarError> {
        if exprs.is_empty() {
            return Err(GrammarError::EmptyClause(what));
        }
        let mut sub_clauses: SmallVec<[ClauseId; 2]> = SmallVec::with_capacity(exprs.len());
        let mut labels: SmallVec<[Option<Spur>; 2]> = SmallVec::with_capacity(exprs.len());
        for expr in exprs {
            let (id, label) = self.lower(expr)?;
            sub_clauses.push(id);
            labels.push(label);
        }
        let mut clause = Clause::new(kind, sub_clauses);
        clause.sub_clause_labels = labels;
        Ok(clause)
    }

    fn lower_single(&mut self, kind: ClauseKind, inner: Expr) -> Result<Clause, GrammarError> {
        let (child, label) = self.lower(inner)?;
        let mut clause = Clause::new(kind, SmallVec::from_slice(&[child]));
        clause.sub_clause_labels[0] = label;
        Ok(clause)
    }

    /// Lower any expression to a clause id, reusing terminal clauses and rule
    /// slots.
    fn lower(&mut self, expr: Expr) -> Result<(ClauseId, Option<Spur>), GrammarError> {
        match expr {
            Expr::Label { name, expr } => {
                let label = self.interner.get_or_intern(name.as_str());
                let (id, _) = self.lower(*expr)?;
                Ok((id, Some(label)))
            }
            Expr::RuleRef(name) => Ok((self.resolve_rule_ref(&name)?, None)),
            Expr::Literal(text) => {
                if text.is_empty() {
                    return Err(GrammarError::EmptyLiteral);
                }
                Ok((self.terminal(Terminal::Literal(text)), None))
            }
            Expr::CharSet(set) => Ok((self.terminal(Terminal::CharSet(set)), None)),
            Expr::AnyChar => Ok((self.terminal(Terminal::Any), None)),
            other => {
                let clause = self.lower_node(other)?;
                Ok((self.push(clause), None))
            }
        }
    }

    fn terminal(&mut self, terminal: Terminal) -> ClauseId {
        if let Some(&id) = self.terminals.get(&terminal) {
            return id;
        }
        let id = ClauseId::new(self.clauses.len());
        self.clauses.push(Clause::new(
            ClauseKind::Terminal(terminal.clone()),
            SmallVec::new(),
        ));
        self.terminals.insert(terminal, id);
        id
    }

    fn push(&mut self, clause: Clause) -> ClauseId {
        let id = ClauseId::new(self.clauses.len());
        self.clauses.push(clause);
        id
    }

    fn resolve_rule_ref(&self, name: &str) -> Result<ClauseId, GrammarError> {
        self.interner
            .get(name)
            .and_then(|spur| self.rule_index.get(&spur))
            .map(|rule| ClauseId::new(rule.index()))
            .ok_or_else(|| GrammarError::UndefinedRule(name.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::CharSet;

    #[test]
    fn test_builder_missing_entry_point() {
        let result = GrammarBuilder::new().rule("A", Expr::lit("a")).build();
        assert!(matches!(result, Err(GrammarError::MissingEntryPoint)));
    }

    #[test]
    fn test_builder_undefined_entry_point() {
        let result = GrammarBuilder::new()
            .entry_point("Missing")
            .rule("A", Expr::lit("a"))
            .build();
        assert!(matches!(result, Err(GrammarError::UndefinedRule(_))));
    }

    #[test]
    fn test_builder_duplicate_rule() {
        let result = GrammarBuilder::new()
            .entry_point("A")
            .rule("A", Expr::lit("a"))
            .rule("A", Expr::lit("b"))
            .build();
        assert!(matches!(result, Err(GrammarError::DuplicateRule(_))));
    }

    #[test]
    fn test_builder_undefined_rule_ref() {
        let result = GrammarBuilder::new()
            .entry_point("A")
            .rule("A", Expr::ref_("Nope"))
            .build();
        assert!(matches!(result, Err(GrammarError::UndefinedRule(_))));
    }

    #[test]
    fn test_builder_empty_literal() {
        let result = GrammarBuilder::new()
            .entry_point("A")
            .rule("A", Expr::lit(""))
            .build();
        assert!(matches!(result, Err(GrammarError::EmptyLiteral)));
    }

    #[test]
    fn test_terminal_dedup() {
        let grammar = GrammarBuilder::new()
            .entry_point("A")
            .rule("A", Expr::seq([Expr::lit("x"), Expr::lit("x")]))
            .build()
            .unwrap();
        let root = grammar.entry_clause();
        let subs = grammar.clause(root).sub_clauses();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0], subs[1]);
    }

    #[test]
    fn test_alias_rule_wraps_target() {
        let grammar = GrammarBuilder::new()
            .entry_point("A")
            .rule("A", Expr::ref_("B"))
            .rule("B", Expr::lit("b"))
            .build()
            .unwrap();
        let a = grammar.rule_clause("A").unwrap();
        let b = grammar.rule_clause("B").unwrap();
        assert_eq!(grammar.clause(a).sub_clauses(), &[b]);
    }

    #[test]
    fn test_left_recursive_rule_resolves() {
        let grammar = GrammarBuilder::new()
            .entry_point("E")
            .rule(
                "E",
                Expr::first([
                    Expr::seq([Expr::ref_("E"), Expr::lit("+"), Expr::ref_("E")]),
                    Expr::char_set(CharSet::digits()),
                ]),
            )
            .build()
            .unwrap();
        let e = grammar.rule_clause("E").unwrap();
        // The sequence alternative must reference E's own slot.
        let seq = grammar.clause(e).sub_clauses()[0];
        assert_eq!(grammar.clause(seq).sub_clauses()[0], e);
    }

    #[test]
    fn test_ast_labels_on_rules_and_sub_clauses() {
        let grammar = GrammarBuilder::new()
            .entry_point("Pair")
            .labeled_rule(
                "Pair",
                "pair",
                Expr::seq([
                    Expr::label("lhs", Expr::lit("a")),
                    Expr::lit("="),
                    Expr::label("rhs", Expr::lit("b")),
                ]),
            )
            .build()
            .unwrap();
        let rule = grammar.entry_rule();
        assert_eq!(grammar.label_text(rule.ast_label().unwrap()), "pair");

        let clause = grammar.clause(grammar.entry_clause());
        assert_eq!(grammar.label_text(clause.sub_clause_label(0).unwrap()), "lhs");
        assert!(clause.sub_clause_label(1).is_none());
        assert_eq!(grammar.label_text(clause.sub_clause_label(2).unwrap()), "rhs");
    }

    #[test]
    fn test_clause_display() {
        let grammar = GrammarBuilder::new()
            .entry_point("S")
            .rule(
                "S",
                Expr::seq([
                    Expr::not_followed_by(Expr::lit("x")),
                    Expr::any(),
                    Expr::opt(Expr::char_set(CharSet::digits())),
                ]),
            )
            .build()
            .unwrap();
        let rendered = grammar.clause_display(grammar.entry_clause());
        assert_eq!(rendered, "!'x' . [0-9]?");
    }
}
