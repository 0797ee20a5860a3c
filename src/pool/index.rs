//! Wire indices over ordered entry sequences
//!
//! A transmitted reference is a small integer naming a position in some
//! agreed-upon ordering of pool entries. [`Index`] freezes one such ordering
//! and answers lookups in both directions; [`IndexGroup`] owns the membership
//! and ordering decisions the indices are built from.

use super::{ClassEntry, ConstantPool, Entry, Tag};
use crate::util::RefId;
use std::collections::{BTreeMap, HashMap, HashSet};

/// A finalized entry ordering with 1-based wire numbering
///
/// Index 0 is reserved for the null reference, so the entry at position `i`
/// of the sequence answers to wire index `i + 1`. Rebuilt from scratch
/// whenever the ordering changes.
pub struct Index<'g> {
    name: Box<str>,
    entries: Vec<Entry<'g>>,
    ranks: HashMap<Entry<'g>, u32>,
}

impl<'g> Index<'g> {
    pub fn new(name: &str, entries: Vec<Entry<'g>>) -> Index<'g> {
        let mut ranks = HashMap::with_capacity(entries.len());
        for (position, &entry) in entries.iter().enumerate() {
            ranks.entry(entry).or_insert(position as u32 + 1);
        }
        Index {
            name: name.into(),
            entries,
            ranks,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry at a wire index, `None` for 0 and for out-of-range indices
    pub fn get(&self, index: u32) -> Option<Entry<'g>> {
        if index == 0 {
            None
        } else {
            self.entries.get(index as usize - 1).copied()
        }
    }

    /// The wire index of an entry, if it is part of this ordering
    pub fn index_of(&self, entry: Entry<'g>) -> Option<u32> {
        self.ranks.get(&entry).copied()
    }

    pub fn entries(&self) -> &[Entry<'g>] {
        &self.entries
    }
}

/// Deduplicated entry membership, partitioned by tag
///
/// Within a tag, entries keep the order in which they were added; across
/// tags, the untyped view concatenates in [`Tag`]'s priority order.
pub struct IndexGroup<'g> {
    seen: HashSet<Entry<'g>>,
    by_tag: BTreeMap<Tag, Vec<Entry<'g>>>,
}

impl<'g> IndexGroup<'g> {
    pub fn new() -> IndexGroup<'g> {
        IndexGroup {
            seen: HashSet::new(),
            by_tag: BTreeMap::new(),
        }
    }

    /// Add an entry, reporting whether it was new
    pub fn add(&mut self, entry: Entry<'g>) -> bool {
        if !self.seen.insert(entry) {
            return false;
        }
        self.by_tag.entry(entry.tag()).or_default().push(entry);
        true
    }

    pub fn contains(&self, entry: Entry<'g>) -> bool {
        self.seen.contains(&entry)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Index over one tag's entries
    pub fn tag_index(&self, tag: Tag) -> Index<'g> {
        let entries = self.by_tag.get(&tag).cloned().unwrap_or_default();
        Index::new(&format!("{:?}", tag), entries)
    }

    /// Index over every entry, tags concatenated in priority order
    pub fn untyped_index(&self) -> Index<'g> {
        let mut entries = Vec::with_capacity(self.seen.len());
        for tag_entries in self.by_tag.values() {
            entries.extend_from_slice(tag_entries);
        }
        Index::new("all", entries)
    }

    /// Index over the members rooted at one class, matched by identity
    pub fn members_of(&self, class: &'g ClassEntry<'g>) -> Index<'g> {
        let mut entries = Vec::new();
        for tag in [Tag::Field, Tag::Method, Tag::InterfaceMethod] {
            for &entry in self.by_tag.get(&tag).map(Vec::as_slice).unwrap_or(&[]) {
                if let Entry::Member(member) = entry {
                    if RefId::same(member.class, class) {
                        entries.push(entry);
                    }
                }
            }
        }
        Index::new(&format!("members of {}", class.name.value), entries)
    }
}

/// Close a set of entries over everything they reference
///
/// With `flatten_signatures`, each signature entry is swapped for the Utf8
/// spelling of its full descriptor; the signature's form and class list are
/// then not pulled into the set on its account.
pub fn complete_references_in<'g>(
    refs: &mut HashSet<Entry<'g>>,
    flatten_signatures: bool,
    pool: &ConstantPool<'g>,
) {
    let mut work: Vec<Entry<'g>> = refs.iter().copied().collect();
    while let Some(mut entry) = work.pop() {
        if flatten_signatures {
            if let Entry::Signature(signature) = entry {
                refs.remove(&entry);
                entry = Entry::Utf8(pool.flattened_signature(signature));
                if !refs.insert(entry) {
                    continue;
                }
            }
        }
        for referenced in entry.references() {
            if refs.insert(referenced) {
                work.push(referenced);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pool::{MemberKind, PoolArenas};

    #[test]
    fn wire_indices_are_one_based() {
        let arenas = PoolArenas::new();
        let pool = ConstantPool::new(&arenas);

        let a = Entry::Utf8(pool.get_utf8("a"));
        let b = Entry::Utf8(pool.get_utf8("b"));
        let index = Index::new("test", vec![a, b]);

        assert_eq!(index.get(0), None);
        assert_eq!(index.get(1), Some(a));
        assert_eq!(index.get(2), Some(b));
        assert_eq!(index.get(3), None);

        assert_eq!(index.index_of(a), Some(1));
        assert_eq!(index.index_of(b), Some(2));
        assert_eq!(index.index_of(Entry::Utf8(pool.get_utf8("c"))), None);
    }

    #[test]
    fn group_deduplicates_and_keeps_insertion_order() {
        let arenas = PoolArenas::new();
        let pool = ConstantPool::new(&arenas);
        let mut group = IndexGroup::new();

        let second = Entry::Utf8(pool.get_utf8("second"));
        let first = Entry::Utf8(pool.get_utf8("first"));
        assert!(group.add(second));
        assert!(group.add(first));
        assert!(!group.add(second));
        assert_eq!(group.len(), 2);

        let utf8s = group.tag_index(Tag::Utf8);
        assert_eq!(utf8s.get(1), Some(second));
        assert_eq!(utf8s.get(2), Some(first));
    }

    #[test]
    fn untyped_index_concatenates_in_tag_priority_order() {
        let arenas = PoolArenas::new();
        let pool = ConstantPool::new(&arenas);
        let mut group = IndexGroup::new();

        let class = Entry::Class(pool.get_class("C"));
        let utf8 = Entry::Utf8(pool.get_utf8("C"));
        let int = Entry::Literal(pool.get_integer(3));
        group.add(class);
        group.add(int);
        group.add(utf8);

        let all = group.untyped_index();
        assert_eq!(all.entries(), &[utf8, int, class]);
        assert_eq!(all.index_of(class), Some(3));
    }

    #[test]
    fn members_partition_by_owning_class() {
        let arenas = PoolArenas::new();
        let pool = ConstantPool::new(&arenas);
        let mut group = IndexGroup::new();

        let here = pool.get_class("pkg/Here");
        let there = pool.get_class("pkg/There");
        let ty = pool.get_signature("()V");
        let run = pool.get_descriptor(pool.get_utf8("run"), ty);
        let stop = pool.get_descriptor(pool.get_utf8("stop"), ty);

        let here_run = Entry::Member(pool.get_member(MemberKind::Method, here, run));
        let here_stop = Entry::Member(pool.get_member(MemberKind::Method, here, stop));
        let there_run = Entry::Member(pool.get_member(MemberKind::Method, there, run));
        group.add(here_run);
        group.add(there_run);
        group.add(here_stop);

        let members = group.members_of(here);
        assert_eq!(members.entries(), &[here_run, here_stop]);
        assert_eq!(members.index_of(there_run), None);
    }

    #[test]
    fn closure_pulls_in_every_reference() {
        let arenas = PoolArenas::new();
        let pool = ConstantPool::new(&arenas);

        let class = pool.get_class("pkg/Owner");
        let ty = pool.get_signature("(Ljava/lang/String;)V");
        let descriptor = pool.get_descriptor(pool.get_utf8("greet"), ty);
        let member = pool.get_member(MemberKind::Method, class, descriptor);

        let mut refs = HashSet::new();
        refs.insert(Entry::Member(member));
        complete_references_in(&mut refs, false, &pool);

        assert!(refs.contains(&Entry::Class(class)));
        assert!(refs.contains(&Entry::Utf8(class.name)));
        assert!(refs.contains(&Entry::Descriptor(descriptor)));
        assert!(refs.contains(&Entry::Utf8(descriptor.name)));
        assert!(refs.contains(&Entry::Signature(ty)));
        assert!(refs.contains(&Entry::Utf8(ty.form)));
        assert!(refs.contains(&Entry::Class(pool.get_class("java/lang/String"))));
        assert!(refs.contains(&Entry::Utf8(pool.get_utf8("java/lang/String"))));
        assert_eq!(refs.len(), 9);
    }

    #[test]
    fn flattening_swaps_signatures_for_their_spelling() {
        let arenas = PoolArenas::new();
        let pool = ConstantPool::new(&arenas);

        let ty = pool.get_signature("(Ljava/lang/String;)V");
        let descriptor = pool.get_descriptor(pool.get_utf8("greet"), ty);

        let mut refs = HashSet::new();
        refs.insert(Entry::Descriptor(descriptor));
        complete_references_in(&mut refs, true, &pool);

        assert!(refs.contains(&Entry::Utf8(pool.get_utf8("(Ljava/lang/String;)V"))));
        assert!(!refs.iter().any(|e| matches!(e, Entry::Signature(_))));
        assert!(!refs.iter().any(|e| matches!(e, Entry::Class(_))));
        assert_eq!(refs.len(), 3);
    }
}
