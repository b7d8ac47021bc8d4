//! Dependency ordering of message definitions.
//!
//! Builds the graph whose edges run from a message to each message it
//! references by field type and reorders the definition sequence so a
//! referenced message always appears before its referrer. Enums have no
//! dependencies and keep their relative positions. When the graph is
//! cyclic the original order is left untouched and the cycle is
//! signalled to feature negotiation.

use std::collections::HashSet;

use crate::types::{Def, TypeRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopoOutcome {
    Ordered,
    Cyclic,
}

/// Reorders `defs` leaves-first, or returns them unchanged with
/// [`TopoOutcome::Cyclic`] when no such order exists.
pub fn sort_defs(defs: Vec<Def>) -> (Vec<Def>, TopoOutcome) {
    let msg_names: HashSet<String> = defs
        .iter()
        .filter(|d| matches!(d, Def::Msg(_)))
        .map(|d| d.name().to_string())
        .collect();

    let mut emitted: HashSet<usize> = HashSet::new();
    let mut emitted_names: HashSet<String> = HashSet::new();
    let mut order: Vec<usize> = Vec::new();

    while order.len() < defs.len() {
        let mut progressed = false;
        for (i, def) in defs.iter().enumerate() {
            if emitted.contains(&i) {
                continue;
            }
            if ready(def, &msg_names, &emitted_names) {
                emitted.insert(i);
                emitted_names.insert(def.name().to_string());
                order.push(i);
                progressed = true;
            }
        }
        if !progressed {
            return (defs, TopoOutcome::Cyclic);
        }
    }

    let mut slots: Vec<Option<Def>> = defs.into_iter().map(Some).collect();
    let ordered = order
        .into_iter()
        .map(|i| slots[i].take().expect("definition emitted twice"))
        .collect();
    (ordered, TopoOutcome::Ordered)
}

/// A definition is ready once every message it references has been
/// emitted. A self-reference is never ready, which is what makes a
/// one-message cycle come out as cyclic.
fn ready(def: &Def, msg_names: &HashSet<String>, emitted_names: &HashSet<String>) -> bool {
    let Def::Msg(m) = def else { return true };
    m.fields.iter().all(|field| match &field.typ {
        TypeRef::Msg(name) => !msg_names.contains(name) || emitted_names.contains(name),
        _ => true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EnumNorm, FieldNorm, MsgNorm};
    use protopod_schema::defs::Occurrence;

    fn msg(name: &str, refs: &[&str]) -> Def {
        Def::Msg(MsgNorm {
            name: name.to_string(),
            fields: refs
                .iter()
                .enumerate()
                .map(|(i, r)| FieldNorm {
                    name: format!("f{}", i),
                    fnum: i as u32 + 1,
                    rnum: i + 1,
                    typ: TypeRef::Msg(r.to_string()),
                    occurrence: Occurrence::Optional,
                    packed: false,
                    default: None,
                })
                .collect(),
        })
    }

    fn an_enum(name: &str) -> Def {
        Def::Enum(EnumNorm {
            name: name.to_string(),
            symbols: vec![("A".to_string(), 0)],
        })
    }

    #[test]
    fn dependencies_come_first() {
        let defs = vec![msg("Top", &["Mid"]), msg("Mid", &["Leaf"]), msg("Leaf", &[])];
        let (ordered, outcome) = sort_defs(defs);
        assert_eq!(outcome, TopoOutcome::Ordered);
        let names: Vec<&str> = ordered.iter().map(|d| d.name()).collect();
        assert_eq!(names, ["Leaf", "Mid", "Top"]);
    }

    #[test]
    fn independent_defs_keep_their_relative_order() {
        let defs = vec![an_enum("E1"), msg("A", &[]), an_enum("E2"), msg("B", &[])];
        let (ordered, outcome) = sort_defs(defs.clone());
        assert_eq!(outcome, TopoOutcome::Ordered);
        assert_eq!(ordered, defs);
    }

    #[test]
    fn cycles_keep_the_original_order() {
        let defs = vec![msg("A", &["B"]), msg("B", &["A"]), msg("C", &[])];
        let (ordered, outcome) = sort_defs(defs.clone());
        assert_eq!(outcome, TopoOutcome::Cyclic);
        assert_eq!(ordered, defs);
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let defs = vec![msg("Tree", &["Tree"])];
        let (_, outcome) = sort_defs(defs);
        assert_eq!(outcome, TopoOutcome::Cyclic);
    }
}
