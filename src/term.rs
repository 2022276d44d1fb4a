//! Logic terms: atoms, variables, pairs, and nominal binder forms.
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::value::Value;

static NEXT_VAR_ID: AtomicU64 = AtomicU64::new(0);

/// A globally-unique logic variable identifier.
///
/// Equality and hashing are defined on the id alone; the optional name is
/// for display only, matching the teacher's `VarID`/name split in `lterm.rs`.
#[derive(Copy, Clone, Eq, Debug)]
pub struct VarId(u64);

impl VarId {
    pub fn fresh() -> VarId {
        VarId(NEXT_VAR_ID.fetch_add(1, Ordering::SeqCst))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl PartialEq for VarId {
    fn eq(&self, other: &VarId) -> bool {
        self.0 == other.0
    }
}

impl std::hash::Hash for VarId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "_.{}", self.0)
    }
}

/// A logic term: atom, variable, cons pair, or nominal binder form.
///
/// Terms are value-equal by structure (spec §3); variables compare by id.
#[derive(Clone, Debug)]
pub enum Term {
    Atom(Value),
    Var(VarIdHandle),
    Nil,
    Pair(Rc<Term>, Rc<Term>),
    /// `Tie(name, body)`: a nominal binder `name.body`, see spec §4.10.
    Tie(Rc<str>, Rc<Term>),
}

/// Newtype wrapping a variable so `Term::Var` carries both id and display name
/// without making every pattern match spell out the tuple.
#[derive(Clone, Debug)]
pub struct VarIdHandle(Rc<VarInner>);

#[derive(Debug)]
struct VarInner {
    id: VarId,
    name: Option<Rc<str>>,
}

impl VarIdHandle {
    pub fn id(&self) -> VarId {
        self.0.id
    }

    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }
}

impl PartialEq for VarIdHandle {
    fn eq(&self, other: &VarIdHandle) -> bool {
        self.0.id == other.0.id
    }
}
impl Eq for VarIdHandle {}

impl std::hash::Hash for VarIdHandle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.id.hash(state)
    }
}

impl Term {
    pub fn atom<V: Into<Value>>(v: V) -> Term {
        Term::Atom(v.into())
    }

    pub fn var(name: &str) -> Term {
        Term::Var(VarIdHandle(Rc::new(VarInner {
            id: VarId::fresh(),
            name: Some(Rc::from(name)),
        })))
    }

    pub fn fresh_var() -> Term {
        Term::Var(VarIdHandle(Rc::new(VarInner {
            id: VarId::fresh(),
            name: None,
        })))
    }

    pub fn nil() -> Term {
        Term::Nil
    }

    pub fn pair(car: Term, cdr: Term) -> Term {
        Term::Pair(Rc::new(car), Rc::new(cdr))
    }

    pub fn tie(name: &str, body: Term) -> Term {
        Term::Tie(Rc::from(name), Rc::new(body))
    }

    /// Builds a proper list from an iterator of terms, per spec §6's `list(...)`.
    pub fn list<I: IntoIterator<Item = Term>>(items: I) -> Term {
        let items: Vec<Term> = items.into_iter().collect();
        items
            .into_iter()
            .rev()
            .fold(Term::Nil, |tail, head| Term::pair(head, tail))
    }

    pub fn is_var(&self) -> bool {
        matches!(self, Term::Var(_))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Term::Nil)
    }

    pub fn is_pair(&self) -> bool {
        matches!(self, Term::Pair(_, _))
    }

    pub fn is_atom(&self) -> bool {
        matches!(self, Term::Atom(_))
    }

    pub fn as_var(&self) -> Option<VarId> {
        match self {
            Term::Var(v) => Some(v.id()),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Term::Atom(Value::Int(n)) => Some(*n),
            _ => None,
        }
    }

    /// Iterates a proper list term's elements; stops at the first non-`Pair`
    /// tail (which need not be `Nil` for an improper list).
    pub fn iter_list(&self) -> ListIter<'_> {
        ListIter { cur: Some(self) }
    }
}

pub struct ListIter<'a> {
    cur: Option<&'a Term>,
}

impl<'a> Iterator for ListIter<'a> {
    type Item = &'a Term;

    fn next(&mut self) -> Option<&'a Term> {
        match self.cur.take() {
            Some(Term::Pair(head, tail)) => {
                self.cur = Some(tail.as_ref());
                Some(head.as_ref())
            }
            _ => None,
        }
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Term) -> bool {
        match (self, other) {
            (Term::Atom(a), Term::Atom(b)) => a == b,
            (Term::Var(a), Term::Var(b)) => a == b,
            (Term::Nil, Term::Nil) => true,
            (Term::Pair(a1, a2), Term::Pair(b1, b2)) => a1 == b1 && a2 == b2,
            (Term::Tie(n1, b1), Term::Tie(n2, b2)) => n1 == n2 && b1 == b2,
            _ => false,
        }
    }
}
impl Eq for Term {}

impl std::hash::Hash for Term {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Term::Atom(v) => v.hash(state),
            Term::Var(v) => v.hash(state),
            Term::Nil => {}
            Term::Pair(a, b) => {
                a.hash(state);
                b.hash(state);
            }
            Term::Tie(n, b) => {
                n.hash(state);
                b.hash(state);
            }
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Term::Atom(v) => write!(f, "{}", v),
            Term::Var(v) => match v.name() {
                Some(name) => write!(f, "{}", name),
                None => write!(f, "{}", v.id()),
            },
            Term::Nil => write!(f, "()"),
            Term::Pair(_, _) => {
                write!(f, "(")?;
                let mut cur = self;
                let mut first = true;
                loop {
                    match cur {
                        Term::Pair(head, tail) => {
                            if !first {
                                write!(f, " ")?;
                            }
                            write!(f, "{}", head)?;
                            first = false;
                            cur = tail.as_ref();
                        }
                        Term::Nil => break,
                        other => {
                            write!(f, " . {}", other)?;
                            break;
                        }
                    }
                }
                write!(f, ")")
            }
            Term::Tie(name, body) => write!(f, "{}.{}", name, body),
        }
    }
}

impl From<i64> for Term {
    fn from(n: i64) -> Term {
        Term::atom(n)
    }
}

impl From<bool> for Term {
    fn from(b: bool) -> Term {
        Term::atom(b)
    }
}

impl From<&str> for Term {
    fn from(s: &str) -> Term {
        Term::atom(Value::Symbol(Rc::from(s)))
    }
}
