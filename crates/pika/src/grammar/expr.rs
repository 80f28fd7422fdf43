use compact_str::CompactString;

use crate::grammar::CharSet;

/// Grammar expression used to define rules.
///
/// Expressions are an owned tree; [`GrammarBuilder::build`](crate::grammar::GrammarBuilder::build)
/// interns them into the frozen clause graph the parser runs on.
#[derive(Debug, Clone)]
pub enum Expr {
    // Primitives
    /// A fixed character sequence.
    Literal(CompactString),
    /// Any single character from a character set.
    CharSet(CharSet),
    /// Any single character.
    AnyChar,
    /// Reference to another rule by name.
    RuleRef(CompactString),

    // Combinators
    Seq(Vec<Expr>),
    /// Ordered choice: the first matching alternative wins.
    First(Vec<Expr>),
    /// The longest-matching alternative wins; ties go to the earliest.
    Longest(Vec<Expr>),
    Opt(Box<Expr>),
    OneOrMore(Box<Expr>),
    /// Sugar: lowered to `Opt(OneOrMore(..))` during grammar construction.
    ZeroOrMore(Box<Expr>),

    // Predicates
    /// Zero-width positive lookahead.
    FollowedBy(Box<Expr>),
    /// Zero-width negative lookahead.
    NotFollowedBy(Box<Expr>),

    // Tree construction
    /// Attach an AST label to the labeled expression's position in its parent.
    /// Labels are opaque to matching.
    Label {
        name: CompactString,
        expr: Box<Expr>,
    },
}

impl Expr {
    // Primitives
    #[must_use]
    pub fn lit(text: impl Into<CompactString>) -> Self {
        Self::Literal(text.into())
    }

    #[must_use]
    pub const fn char_set(set: CharSet) -> Self {
        Self::CharSet(set)
    }

    #[must_use]
    pub const fn any() -> Self {
        Self::AnyChar
    }

    /// Reference a rule by name.
    #[must_use]
    pub fn ref_(name: impl Into<CompactString>) -> Self {
        Self::RuleRef(name.into())
    }

    // Combinators
    #[must_use]
    pub fn seq<I>(exprs: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut vec: Vec<_> = exprs.into_iter().collect();
        if vec.len() == 1 { vec.pop().unwrap() } else { Self::Seq(vec) }
    }

    /// Ordered choice over the given alternatives.
    #[must_use]
    pub fn first<I>(exprs: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut vec: Vec<_> = exprs.into_iter().collect();
        if vec.len() == 1 { vec.pop().unwrap() } else { Self::First(vec) }
    }

    /// Longest-match choice over the given alternatives.
    #[must_use]
    pub fn longest<I>(exprs: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut vec: Vec<_> = exprs.into_iter().collect();
        if vec.len() == 1 { vec.pop().unwrap() } else { Self::Longest(vec) }
    }

    #[must_use]
    pub fn opt(expr: Self) -> Self {
        Self::Opt(Box::new(expr))
    }

    /// Zero or more repetitions.
    #[must_use]
    pub fn star(expr: Self) -> Self {
        Self::ZeroOrMore(Box::new(expr))
    }

    /// One or more repetitions.
    #[must_use]
    pub fn plus(expr: Self) -> Self {
        Self::OneOrMore(Box::new(expr))
    }

    // Predicates
    #[must_use]
    pub fn followed_by(expr: Self) -> Self {
        Self::FollowedBy(Box::new(expr))
    }

    #[must_use]
    pub fn not_followed_by(expr: Self) -> Self {
        Self::NotFollowedBy(Box::new(expr))
    }

    // Tree construction
    #[must_use]
    pub fn label(name: impl Into<CompactString>, expr: Self) -> Self {
        Self::Label {
            name: name.into(),
            expr: Box::new(expr),
        }
    }
}
