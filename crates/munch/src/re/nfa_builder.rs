use super::Expr;
use crate::{nfa::Nfa, state::State};

/// One node of the expression laid out for construction
///
/// Every fragment owns the contiguous block of states
/// `base..base + size`, enters at `base` and accepts only at
/// `base + size - 1`.  Operands are placed inside their parent's block, so
/// the whole automaton is numbered without relabelling any fragment.
struct Slot<'a> {
    expr: &'a Expr,
    kids: Vec<usize>,
    base: usize,
    size: usize,
}

impl Slot<'_> {
    fn head(&self) -> State { State::numbered(self.base) }

    fn tail(&self) -> State { State::numbered(self.base + self.size - 1) }
}

/// Flatten the tree in preorder, so every node precedes its operands and the
/// left operand's subtree precedes the right one's
fn flatten(root: &Expr) -> Vec<Slot<'_>> {
    let mut slots: Vec<Slot<'_>> = vec![];
    let mut stack: Vec<(&Expr, Option<usize>)> = vec![(root, None)];

    while let Some((expr, parent)) = stack.pop() {
        let id = slots.len();
        if let Some(p) = parent {
            slots[p].kids.push(id);
        }

        slots.push(Slot {
            expr,
            kids: Vec::with_capacity(expr.arity()),
            base: 0,
            size: 0,
        });
        stack.extend(expr.children().into_iter().rev().map(|c| (c, Some(id))));
    }

    slots
}

fn layout(slots: &mut [Slot<'_>]) {
    for id in (0..slots.len()).rev() {
        let kids: usize = slots[id].kids.iter().map(|&k| slots[k].size).sum();
        slots[id].size = match slots[id].expr {
            Expr::Epsilon => 1,
            Expr::Symbol(_) | Expr::Empty => 2,
            Expr::Concat(..) => kids,
            Expr::Union(..) | Expr::Star(_) | Expr::Plus(_) => kids + 2,
        };
    }

    for id in 0..slots.len() {
        let Slot { expr, base, .. } = slots[id];
        let mut next = match expr {
            Expr::Concat(..) => base,
            _ => base + 1,
        };

        for k in slots[id].kids.clone() {
            slots[k].base = next;
            next += slots[k].size;
        }
    }
}

fn connect(nfa: &mut Nfa, from: &State, to: State) { nfa.connect(from, to, None); }

fn emit(nfa: &mut Nfa, slots: &[Slot<'_>], slot: &Slot<'_>) {
    let (head, tail) = (slot.head(), slot.tail());

    match (slot.expr, &*slot.kids) {
        (Expr::Symbol(c), []) => {
            nfa.connect(&head, tail, Some(*c));
        },
        (Expr::Epsilon | Expr::Empty, []) => (),
        (Expr::Concat(..), &[l, r]) => connect(nfa, &slots[l].tail(), slots[r].head()),
        (Expr::Union(..), &[l, r]) => {
            for k in [&slots[l], &slots[r]] {
                connect(nfa, &head, k.head());
                connect(nfa, &k.tail(), tail.clone());
            }
        },
        (Expr::Star(_) | Expr::Plus(_), &[k]) => {
            let inner = &slots[k];
            connect(nfa, &head, inner.head());
            connect(nfa, &inner.tail(), inner.head());
            connect(nfa, &inner.tail(), tail.clone());

            if matches!(slot.expr, Expr::Star(_)) {
                connect(nfa, &head, tail);
            }
        },
        _ => unreachable!("Operand count does not match {}", slot.expr.name()),
    }
}

/// Thompson construction, visiting the tree without recursion
pub fn build(expr: Expr) -> Nfa {
    let mut slots = flatten(&expr);
    layout(&mut slots);

    let root = &slots[0];
    let mut nfa = Nfa::new(root.head());
    for n in 1..root.size {
        nfa.insert(State::numbered(n));
    }

    for slot in &slots {
        emit(&mut nfa, &slots, slot);
    }
    nfa.set_accept([root.tail()]);

    tracing::debug!(
        states = nfa.states().len(),
        symbols = nfa.alphabet().len(),
        "Thompson construction finished"
    );
    nfa
}
