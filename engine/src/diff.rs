//! Collection diffing and change classification.
//!
//! # Algorithm
//!
//! 1. Trim the common prefix and suffix.
//! 2. Find a common subsequence of the remainder; elements outside it
//!    become raw removals (indexed into `old`) and raw insertions (indexed
//!    into `new`). Small remainders use an exact longest-common-subsequence
//!    table. Large ones anchor on identity instead: each new element is
//!    matched to the old element with the same identity and equal content,
//!    and the longest increasing run of those anchors is kept. That costs
//!    `O(n log n)`, so a large reorder never builds a quadratic table.
//! 3. Pair each raw insertion with an unpaired raw removal of an *equal*
//!    element: that pair is a [`Change::Move`].
//! 4. Pair each remaining insertion with an unpaired removal that carries
//!    the *same present identity*: that pair is a [`Change::Edit`].
//! 5. Whatever is left stays a plain removal or insertion.
//!
//! Pairing scans in ascending position order, so the result is
//! deterministic for a given pair of collections. Candidates are bucketed
//! by identity, which assumes equal elements carry equal identities.

use crate::Element;
use std::collections::{HashMap, HashSet};

/// Largest `old × new` remainder diffed with the exact table.
const TABLE_CELLS_MAX: usize = 1 << 16;

/// One classified difference between two collections.
///
/// `position` and `from` index the old collection; `position` on an
/// insertion and `to` index the new one.
#[derive(Debug, Clone, PartialEq)]
pub enum Change<E> {
    Insertion { position: usize, element: E },
    Removal { position: usize, element: E },
    /// The same element at a different position.
    Move { element: E, from: usize, to: usize },
    /// Same identity, different content.
    Edit { old: E, new: E, from: usize, to: usize },
}

impl<E> Change<E> {
    /// Position vacated in the old collection, if any.
    pub fn vacates(&self) -> Option<usize> {
        match self {
            Change::Removal { position, .. } => Some(*position),
            Change::Move { from, .. } | Change::Edit { from, .. } => Some(*from),
            Change::Insertion { .. } => None,
        }
    }

    /// Position filled in the new collection, if any.
    pub fn fills(&self) -> Option<usize> {
        match self {
            Change::Insertion { position, .. } => Some(*position),
            Change::Move { to, .. } | Change::Edit { to, .. } => Some(*to),
            Change::Removal { .. } => None,
        }
    }

    /// The element that ends up in the new collection, if any.
    fn placed(&self) -> Option<&E> {
        match self {
            Change::Insertion { element, .. } | Change::Move { element, .. } => Some(element),
            Change::Edit { new, .. } => Some(new),
            Change::Removal { .. } => None,
        }
    }
}

/// The classified changes turning one collection into another.
///
/// Changes are ordered edits first, then removals, insertions and moves,
/// each group in ascending position order.
#[derive(Debug, Clone, PartialEq)]
pub struct Diff<E> {
    changes: Vec<Change<E>>,
}

impl<E> Default for Diff<E> {
    fn default() -> Self {
        Self {
            changes: Vec::new(),
        }
    }
}

impl<E: Clone> Diff<E> {
    pub fn changes(&self) -> &[Change<E>] {
        &self.changes
    }

    pub fn into_changes(self) -> Vec<Change<E>> {
        self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn edits(&self) -> impl Iterator<Item = &Change<E>> {
        self.changes.iter().filter(|c| matches!(c, Change::Edit { .. }))
    }

    pub fn removals(&self) -> impl Iterator<Item = &Change<E>> {
        self.changes.iter().filter(|c| matches!(c, Change::Removal { .. }))
    }

    pub fn insertions(&self) -> impl Iterator<Item = &Change<E>> {
        self.changes.iter().filter(|c| matches!(c, Change::Insertion { .. }))
    }

    pub fn moves(&self) -> impl Iterator<Item = &Change<E>> {
        self.changes.iter().filter(|c| matches!(c, Change::Move { .. }))
    }

    /// Whether the collections hold the same elements in a different order.
    pub fn is_reorder_only(&self) -> bool {
        self.changes.iter().all(|c| matches!(c, Change::Move { .. }))
    }

    /// Replay every change against `old`.
    ///
    /// Vacated positions are dropped and every placed element lands at its
    /// new position; kept elements fill the gaps in their old order. The
    /// result equals the collection the diff was computed against.
    pub fn apply(&self, old: &[E]) -> Vec<E> {
        let vacated: HashSet<usize> = self.changes.iter().filter_map(Change::vacates).collect();
        let mut kept = old
            .iter()
            .enumerate()
            .filter(|(i, _)| !vacated.contains(i))
            .map(|(_, element)| element);

        let mut placed: Vec<(usize, &E)> = self
            .changes
            .iter()
            .filter_map(|c| Some((c.fills()?, c.placed()?)))
            .collect();
        placed.sort_unstable_by_key(|(to, _)| *to);
        let mut placed = placed.into_iter().peekable();

        let mut result = Vec::with_capacity(old.len() - vacated.len() + placed.len());
        loop {
            let next = match placed.peek() {
                Some((to, _)) if *to <= result.len() => placed.next().map(|(_, e)| e),
                _ => kept.next().or_else(|| placed.next().map(|(_, e)| e)),
            };
            match next {
                Some(element) => result.push(element.clone()),
                None => break,
            }
        }
        result
    }

    /// Apply only the moves to `old`.
    ///
    /// Elements kept across the diff (unchanged or moved) adopt the order
    /// they have in `new` while occupying the slots kept elements had in
    /// `old`. Elements under a removal or edit stay where they are.
    pub fn apply_moves(&self, old: &[E], new: &[E]) -> Vec<E> {
        let mut vacated = HashSet::new();
        let mut filled = HashSet::new();
        for change in &self.changes {
            match change {
                Change::Removal { position, .. } => {
                    vacated.insert(*position);
                }
                Change::Insertion { position, .. } => {
                    filled.insert(*position);
                }
                Change::Edit { from, to, .. } => {
                    vacated.insert(*from);
                    filled.insert(*to);
                }
                Change::Move { .. } => {}
            }
        }

        let slots = (0..old.len()).filter(|i| !vacated.contains(i));
        let kept = new
            .iter()
            .enumerate()
            .filter(|(j, _)| !filled.contains(j))
            .map(|(_, element)| element);

        let mut result = old.to_vec();
        for (slot, element) in slots.zip(kept) {
            result[slot] = element.clone();
        }
        result
    }
}

/// Classify the changes from `old` to `new`.
pub fn diff<E: Element>(old: &[E], new: &[E]) -> Diff<E> {
    let prefix = old
        .iter()
        .zip(new)
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];
    let (removed, inserted) = unmatched(old_mid, new_mid);

    let mut removals: Vec<Option<usize>> = removed.into_iter().map(|i| Some(i + prefix)).collect();
    let mut insertions: Vec<Option<usize>> =
        inserted.into_iter().map(|j| Some(j + prefix)).collect();

    let candidates = Candidates::new(old, &removals);

    let mut moves = Vec::new();
    candidates.pair(
        &mut removals,
        &mut insertions,
        |to| new[to].id(),
        |from, to| old[from] == new[to],
        |from, to| {
            moves.push(Change::Move {
                element: new[to].clone(),
                from,
                to,
            });
        },
    );

    let mut edits = Vec::new();
    candidates.pair(
        &mut removals,
        &mut insertions,
        |to| new[to].id(),
        |from, to| old[from].same_identity(&new[to]),
        |from, to| {
            edits.push(Change::Edit {
                old: old[from].clone(),
                new: new[to].clone(),
                from,
                to,
            });
        },
    );

    let mut changes = edits;
    changes.extend(removals.into_iter().flatten().map(|position| Change::Removal {
        position,
        element: old[position].clone(),
    }));
    changes.extend(insertions.into_iter().flatten().map(|position| Change::Insertion {
        position,
        element: new[position].clone(),
    }));
    changes.extend(moves);

    Diff { changes }
}

/// Raw removals bucketed by identity. Each bucket lists slots into the
/// removal list in ascending position order.
struct Candidates<Id> {
    by_id: HashMap<Id, Vec<usize>>,
    anonymous: Vec<usize>,
}

impl<Id: Eq + std::hash::Hash> Candidates<Id> {
    fn new<E: Element<Id = Id>>(old: &[E], removals: &[Option<usize>]) -> Self {
        let mut by_id: HashMap<Id, Vec<usize>> = HashMap::new();
        let mut anonymous = Vec::new();
        for (slot, from) in removals.iter().enumerate() {
            let Some(from) = from else { continue };
            match old[*from].id() {
                Some(id) => by_id.entry(id).or_default().push(slot),
                None => anonymous.push(slot),
            }
        }
        Self { by_id, anonymous }
    }

    /// Match each remaining insertion with the first remaining removal of
    /// the same identity bucket that satisfies `matches`, consuming both.
    fn pair(
        &self,
        removals: &mut [Option<usize>],
        insertions: &mut [Option<usize>],
        identity: impl Fn(usize) -> Option<Id>,
        matches: impl Fn(usize, usize) -> bool,
        mut emit: impl FnMut(usize, usize),
    ) {
        for insertion in insertions.iter_mut() {
            let Some(to) = *insertion else { continue };
            let bucket = match identity(to) {
                Some(id) => self.by_id.get(&id).map(Vec::as_slice).unwrap_or_default(),
                None => self.anonymous.as_slice(),
            };
            let candidate = bucket
                .iter()
                .find(|slot| matches!(removals[**slot], Some(from) if matches(from, to)));
            if let Some(slot) = candidate {
                if let Some(from) = removals[*slot].take() {
                    emit(from, to);
                    *insertion = None;
                }
            }
        }
    }
}

/// Indices of `old` and `new` left out of a common subsequence.
fn unmatched<E: Element>(old: &[E], new: &[E]) -> (Vec<usize>, Vec<usize>) {
    if old.len().saturating_mul(new.len()) <= TABLE_CELLS_MAX {
        exact(old, new)
    } else {
        anchored(old, new)
    }
}

/// Common subsequence of identity anchors: longest increasing run of old
/// positions over new elements that have an equal, same-identity element in
/// `old`. Elements without an identity are never anchored.
fn anchored<E: Element>(old: &[E], new: &[E]) -> (Vec<usize>, Vec<usize>) {
    let mut positions: HashMap<E::Id, usize> = HashMap::with_capacity(old.len());
    for (i, element) in old.iter().enumerate() {
        if let Some(id) = element.id() {
            positions.entry(id).or_insert(i);
        }
    }

    // (new position, old position)
    let anchors: Vec<(usize, usize)> = new
        .iter()
        .enumerate()
        .filter_map(|(j, element)| {
            let i = *positions.get(&element.id()?)?;
            (old[i] == *element).then_some((j, i))
        })
        .collect();

    // Patience sort over old positions.
    let mut tails: Vec<usize> = Vec::new();
    let mut previous: Vec<Option<usize>> = vec![None; anchors.len()];
    for (k, &(_, i)) in anchors.iter().enumerate() {
        let length = tails.partition_point(|&t| anchors[t].1 < i);
        if length > 0 {
            previous[k] = Some(tails[length - 1]);
        }
        if length == tails.len() {
            tails.push(k);
        } else {
            tails[length] = k;
        }
    }

    let mut old_kept = vec![false; old.len()];
    let mut new_kept = vec![false; new.len()];
    let mut cursor = tails.last().copied();
    while let Some(k) = cursor {
        let (j, i) = anchors[k];
        old_kept[i] = true;
        new_kept[j] = true;
        cursor = previous[k];
    }

    let removed = (0..old.len()).filter(|i| !old_kept[*i]).collect();
    let inserted = (0..new.len()).filter(|j| !new_kept[*j]).collect();
    (removed, inserted)
}

/// Indices of `old` and `new` that are not part of a longest common
/// subsequence.
fn exact<E: PartialEq>(old: &[E], new: &[E]) -> (Vec<usize>, Vec<usize>) {
    let (n, m) = (old.len(), new.len());
    let width = m + 1;

    // lcs[i * width + j] = length of the LCS of old[i..] and new[j..]
    let mut lcs = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i * width + j] = if old[i] == new[j] {
                lcs[(i + 1) * width + j + 1] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }

    let mut removed = Vec::new();
    let mut inserted = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old[i] == new[j] {
            i += 1;
            j += 1;
        } else if lcs[(i + 1) * width + j] >= lcs[i * width + j + 1] {
            removed.push(i);
            i += 1;
        } else {
            inserted.push(j);
            j += 1;
        }
    }
    removed.extend(i..n);
    inserted.extend(j..m);
    (removed, inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Account {
        id: Option<u8>,
        name: String,
    }

    impl Element for Account {
        type Id = u8;

        fn id(&self) -> Option<u8> {
            self.id
        }
    }

    fn account(id: u8, name: &str) -> Account {
        Account {
            id: Some(id),
            name: name.into(),
        }
    }

    fn unsaved(name: &str) -> Account {
        Account {
            id: None,
            name: name.into(),
        }
    }

    #[test]
    fn identical_collections_have_no_changes() {
        let old = vec![account(1, "Tom"), account(2, "Max")];
        assert!(diff(&old, &old.clone()).is_empty());
        assert!(diff::<Account>(&[], &[]).is_empty());
    }

    #[test]
    fn append_is_one_insertion() {
        let old = vec![account(1, "Tom")];
        let new = vec![account(1, "Tom"), unsaved("Max")];

        let changes = diff(&old, &new).into_changes();

        assert_eq!(
            changes,
            vec![Change::Insertion {
                position: 1,
                element: unsaved("Max")
            }]
        );
    }

    #[test]
    fn removal_is_one_removal() {
        let old = vec![account(1, "Tom"), account(2, "Max"), account(3, "Paul")];
        let new = vec![account(1, "Tom"), account(3, "Paul")];

        let changes = diff(&old, &new).into_changes();

        assert_eq!(
            changes,
            vec![Change::Removal {
                position: 1,
                element: account(2, "Max")
            }]
        );
    }

    #[test]
    fn content_change_is_an_edit() {
        let old = vec![account(1, "Tom"), account(2, "Max")];
        let new = vec![account(1, "Paul"), account(2, "Max")];

        let diff = diff(&old, &new);

        assert_eq!(
            diff.changes(),
            &[Change::Edit {
                old: account(1, "Tom"),
                new: account(1, "Paul"),
                from: 0,
                to: 0,
            }]
        );
        assert_eq!(diff.insertions().count(), 0);
        assert_eq!(diff.removals().count(), 0);
    }

    #[test]
    fn reorder_is_moves_only() {
        let old = vec![account(1, "Tom"), account(2, "Max"), account(3, "Paul")];
        let new = vec![account(2, "Max"), account(3, "Paul"), account(1, "Tom")];

        let diff = diff(&old, &new);

        assert!(diff.is_reorder_only());
        assert_eq!(
            diff.changes(),
            &[Change::Move {
                element: account(1, "Tom"),
                from: 0,
                to: 2,
            }]
        );
    }

    #[test]
    fn unsaved_elements_never_pair_as_edits() {
        let old = vec![unsaved("Tom")];
        let new = vec![unsaved("Max")];

        let diff = diff(&old, &new);

        assert_eq!(diff.edits().count(), 0);
        assert_eq!(diff.removals().count(), 1);
        assert_eq!(diff.insertions().count(), 1);
    }

    #[test]
    fn edits_come_first() {
        let old = vec![account(1, "Tom"), account(2, "Max")];
        let new = vec![account(1, "Paul"), unsaved("Ann")];

        let changes = diff(&old, &new).into_changes();

        assert!(matches!(changes[0], Change::Edit { .. }));
        assert!(matches!(changes[1], Change::Removal { position: 1, .. }));
        assert!(matches!(changes[2], Change::Insertion { position: 1, .. }));
    }

    #[test]
    fn apply_moves_keeps_pending_slots() {
        let old = vec![account(1, "Tom"), account(2, "Max"), account(3, "Paul")];
        // Max is edited, Tom and Paul swap places.
        let new = vec![account(3, "Paul"), account(2, "Maxim"), account(1, "Tom")];

        let diff = diff(&old, &new);

        assert_eq!(diff.edits().count(), 1);
        assert_eq!(
            diff.apply_moves(&old, &new),
            vec![account(3, "Paul"), account(2, "Max"), account(1, "Tom")]
        );
    }

    #[test]
    fn apply_moves_without_moves_is_identity() {
        let old = vec![account(1, "Tom"), account(2, "Max")];
        let new = vec![account(1, "Tom")];

        assert_eq!(diff(&old, &new).apply_moves(&old, &new), old);
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        id: Option<u32>,
        value: u32,
    }

    impl Element for Row {
        type Id = u32;

        fn id(&self) -> Option<u32> {
            self.id
        }
    }

    fn rows(len: u32) -> Vec<Row> {
        (0..len)
            .map(|i| Row {
                id: Some(i),
                value: i % 97,
            })
            .collect()
    }

    #[test]
    fn large_reverse_is_moves_only() {
        let old = rows(20_000);
        let mut new = old.clone();
        new.reverse();

        let diff = diff(&old, &new);

        assert!(diff.is_reorder_only());
        assert_eq!(diff.len(), 19_999);
        assert_eq!(diff.apply_moves(&old, &new), new);
        assert_eq!(diff.apply(&old), new);
    }

    #[test]
    fn large_mixed_change_is_classified() {
        let old = rows(5_000);
        let mut new: Vec<Row> = old.iter().rev().cloned().collect();
        // Edit every hundredth row, drop one and append two unsaved rows.
        for row in new.iter_mut().step_by(100) {
            row.value += 1000;
        }
        new.remove(1);
        new.push(Row { id: None, value: 1 });
        new.push(Row { id: None, value: 2 });

        let diff = diff(&old, &new);

        assert_eq!(diff.edits().count(), 50);
        assert_eq!(diff.removals().count(), 1);
        assert_eq!(diff.insertions().count(), 2);
        assert_eq!(diff.apply(&old), new);
    }

    #[test]
    fn large_unsaved_rows_pair_as_moves() {
        let mut old = rows(1_000);
        old.push(Row { id: None, value: 7 });
        let mut new = old.clone();
        new.rotate_right(1);

        let diff = diff(&old, &new);

        assert!(diff.is_reorder_only());
        assert_eq!(diff.apply_moves(&old, &new), new);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_account() -> impl Strategy<Value = Account> {
            (prop::option::of(0u8..6), 0u8..4).prop_map(|(id, name)| Account {
                id,
                name: format!("n{name}"),
            })
        }

        fn arb_collection() -> impl Strategy<Value = Vec<Account>> {
            prop::collection::vec(arb_account(), 0..12)
        }

        proptest! {
            #[test]
            fn prop_apply_reproduces_new(old in arb_collection(), new in arb_collection()) {
                let diff = diff(&old, &new);
                prop_assert_eq!(diff.apply(&old), new);
            }

            #[test]
            fn prop_permutation_is_reorder_only(
                old in arb_collection(),
                seed in any::<u64>(),
            ) {
                let mut new = old.clone();
                // deterministic shuffle
                let len = new.len();
                for i in (1..len).rev() {
                    let j = (seed.wrapping_mul(i as u64 + 7) % (i as u64 + 1)) as usize;
                    new.swap(i, j);
                }

                let diff = diff(&old, &new);
                prop_assert!(diff.is_reorder_only());
                prop_assert_eq!(diff.apply_moves(&old, &new), new);
            }

            #[test]
            fn prop_positions_are_in_bounds(old in arb_collection(), new in arb_collection()) {
                for change in diff(&old, &new).changes() {
                    if let Some(from) = change.vacates() {
                        prop_assert!(from < old.len());
                    }
                    if let Some(to) = change.fills() {
                        prop_assert!(to < new.len());
                    }
                }
            }
        }
    }
}
