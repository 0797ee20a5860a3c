//! Interned constant pool
//!
//! The pool is a session-local interner for every datum an attribute can
//! reference from its byte stream. Factories hand out `&'g` references into
//! arena storage, so entries can point at each other without reference
//! counting, and interning guarantees one allocation per distinct value.
//!
//! ### Shape
//!
//! [`PoolArenas`] owns the allocations and must outlive the [`ConstantPool`]
//! that fills them, the same split as between an arena set and the graph
//! built over it. Interning makes structural equality of entries coincide
//! with pointer identity, which is what lets `&'g` references double as
//! hash keys.
//!
//! ### Indexing
//!
//! Entries carry no numbering of their own. [`Index`] assigns 1-based wire
//! indices to an externally ordered entry sequence (0 stays reserved for
//! null), and [`IndexGroup`] collects entries per [`Tag`] so that typed,
//! untyped, and per-class views can be built over one membership set.

use crate::util::RefId;
use elsa::map::FrozenMap;
use std::cell::Cell;
use typed_arena::Arena;

mod entry;
mod index;

pub use entry::{
    ClassEntry, DescriptorEntry, Entry, LiteralEntry, MemberEntry, MemberKind, SignatureEntry,
    Tag, Utf8Entry,
};
pub use index::{complete_references_in, Index, IndexGroup};

/// Backing storage for one pool's entries
pub struct PoolArenas<'g> {
    utf8_arena: Arena<Utf8Entry>,
    literal_arena: Arena<LiteralEntry<'g>>,
    class_arena: Arena<ClassEntry<'g>>,
    signature_arena: Arena<SignatureEntry<'g>>,
    descriptor_arena: Arena<DescriptorEntry<'g>>,
    member_arena: Arena<MemberEntry<'g>>,
}

impl<'g> PoolArenas<'g> {
    pub fn new() -> Self {
        PoolArenas {
            utf8_arena: Arena::new(),
            literal_arena: Arena::new(),
            class_arena: Arena::new(),
            signature_arena: Arena::new(),
            descriptor_arena: Arena::new(),
            member_arena: Arena::new(),
        }
    }
}

/// Interning factories over a set of arenas
///
/// All `get_*` methods return the unique interned instance for their
/// arguments, allocating on first use. Entries are immutable once published
/// (the signature flattening cache is the one interior-mutable exception).
pub struct ConstantPool<'g> {
    arenas: &'g PoolArenas<'g>,
    utf8s: FrozenMap<&'g str, &'g Utf8Entry>,
    literals: FrozenMap<LiteralEntry<'g>, &'g LiteralEntry<'g>>,
    classes: FrozenMap<RefId<'g, Utf8Entry>, &'g ClassEntry<'g>>,
    signatures: FrozenMap<Box<str>, &'g SignatureEntry<'g>>,
    #[allow(clippy::type_complexity)]
    descriptors:
        FrozenMap<(RefId<'g, Utf8Entry>, RefId<'g, SignatureEntry<'g>>), &'g DescriptorEntry<'g>>,
    #[allow(clippy::type_complexity)]
    members: FrozenMap<
        (MemberKind, RefId<'g, ClassEntry<'g>>, RefId<'g, DescriptorEntry<'g>>),
        &'g MemberEntry<'g>,
    >,
}

impl<'g> ConstantPool<'g> {
    /// New empty pool
    pub fn new(arenas: &'g PoolArenas<'g>) -> Self {
        ConstantPool {
            arenas,
            utf8s: FrozenMap::new(),
            literals: FrozenMap::new(),
            classes: FrozenMap::new(),
            signatures: FrozenMap::new(),
            descriptors: FrozenMap::new(),
            members: FrozenMap::new(),
        }
    }

    pub fn get_utf8(&self, value: &str) -> &'g Utf8Entry {
        if let Some(interned) = self.utf8s.map_get(value, |&e| e) {
            return interned;
        }
        let entry = &*self.arenas.utf8_arena.alloc(Utf8Entry { value: value.into() });
        self.utf8s.insert(&*entry.value, entry);
        entry
    }

    pub fn get_integer(&self, value: i32) -> &'g LiteralEntry<'g> {
        self.intern_literal(LiteralEntry::Integer(value))
    }

    pub fn get_long(&self, value: i64) -> &'g LiteralEntry<'g> {
        self.intern_literal(LiteralEntry::Long(value))
    }

    /// Floats intern by bit pattern, so every NaN payload gets its own entry
    pub fn get_float(&self, value: f32) -> &'g LiteralEntry<'g> {
        self.intern_literal(LiteralEntry::Float(value.to_bits()))
    }

    pub fn get_double(&self, value: f64) -> &'g LiteralEntry<'g> {
        self.intern_literal(LiteralEntry::Double(value.to_bits()))
    }

    pub fn get_string(&self, value: &str) -> &'g LiteralEntry<'g> {
        let utf8 = self.get_utf8(value);
        self.intern_literal(LiteralEntry::String(utf8))
    }

    fn intern_literal(&self, literal: LiteralEntry<'g>) -> &'g LiteralEntry<'g> {
        if let Some(interned) = self.literals.map_get(&literal, |&e| e) {
            return interned;
        }
        let entry = &*self.arenas.literal_arena.alloc(literal);
        self.literals.insert(literal, entry);
        entry
    }

    pub fn get_class(&self, name: &str) -> &'g ClassEntry<'g> {
        let name = self.get_utf8(name);
        if let Some(interned) = self.classes.map_get(&RefId(name), |&e| e) {
            return interned;
        }
        let entry = &*self.arenas.class_arena.alloc(ClassEntry { name });
        self.classes.insert(RefId(name), entry);
        entry
    }

    /// Intern a field or method type from its full descriptor string
    pub fn get_signature(&self, descriptor: &str) -> &'g SignatureEntry<'g> {
        if let Some(interned) = self.signatures.map_get(descriptor, |&e| e) {
            return interned;
        }
        let (form, class_names) = split_signature(descriptor);
        let form = self.get_utf8(&form);
        let classes = class_names.into_iter().map(|name| self.get_class(name)).collect();
        let entry = &*self.arenas.signature_arena.alloc(SignatureEntry {
            form,
            classes,
            flat: Cell::new(None),
        });
        self.signatures.insert(descriptor.into(), entry);
        entry
    }

    pub fn get_descriptor(
        &self,
        name: &'g Utf8Entry,
        ty: &'g SignatureEntry<'g>,
    ) -> &'g DescriptorEntry<'g> {
        let key = (RefId(name), RefId(ty));
        if let Some(interned) = self.descriptors.map_get(&key, |&e| e) {
            return interned;
        }
        let entry = &*self.arenas.descriptor_arena.alloc(DescriptorEntry { name, ty });
        self.descriptors.insert(key, entry);
        entry
    }

    pub fn get_member(
        &self,
        kind: MemberKind,
        class: &'g ClassEntry<'g>,
        descriptor: &'g DescriptorEntry<'g>,
    ) -> &'g MemberEntry<'g> {
        let key = (kind, RefId(class), RefId(descriptor));
        if let Some(interned) = self.members.map_get(&key, |&e| e) {
            return interned;
        }
        let entry = &*self.arenas.member_arena.alloc(MemberEntry { kind, class, descriptor });
        self.members.insert(key, entry);
        entry
    }

    /// The interned Utf8 spelling of a signature's full descriptor
    ///
    /// Cached on the entry after the first call.
    pub fn flattened_signature(&self, signature: &'g SignatureEntry<'g>) -> &'g Utf8Entry {
        if let Some(flat) = signature.flat.get() {
            return flat;
        }
        let flat = self.get_utf8(&signature.expand());
        signature.flat.set(Some(flat));
        flat
    }
}

/// Split a type descriptor into its form and the class names it mentions
///
/// Every `L` in a descriptor introduces a class name running up to the next
/// `;` or `<`. The name is cut out and the delimiter left in the form, so
/// `(Ljava/lang/String;I)V` splits into `(L;I)V` plus `java/lang/String`.
fn split_signature(descriptor: &str) -> (String, Vec<&str>) {
    let mut form = String::new();
    let mut classes = Vec::new();
    let mut rest = descriptor;
    while let Some(pos) = rest.find('L') {
        form.push_str(&rest[..=pos]);
        rest = &rest[pos + 1..];
        let end = rest.find(|c| c == ';' || c == '<').unwrap_or(rest.len());
        classes.push(&rest[..end]);
        rest = &rest[end..];
    }
    form.push_str(rest);
    (form, classes)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn interning_deduplicates() {
        let arenas = PoolArenas::new();
        let pool = ConstantPool::new(&arenas);

        assert!(RefId::same(pool.get_utf8("Code"), pool.get_utf8("Code")));
        assert!(RefId::same(pool.get_integer(42), pool.get_integer(42)));
        assert!(!RefId::same(pool.get_integer(42), pool.get_integer(43)));
        assert!(RefId::same(pool.get_class("java/lang/Object"), pool.get_class("java/lang/Object")));
        assert!(RefId::same(pool.get_string("hi"), pool.get_string("hi")));
    }

    #[test]
    fn floats_intern_by_bit_pattern() {
        let arenas = PoolArenas::new();
        let pool = ConstantPool::new(&arenas);

        assert!(RefId::same(pool.get_float(f32::NAN), pool.get_float(f32::NAN)));
        assert!(!RefId::same(pool.get_float(0.0), pool.get_float(-0.0)));
        assert!(RefId::same(pool.get_double(1.5), pool.get_double(1.5)));
    }

    #[test]
    fn strings_share_their_utf8() {
        let arenas = PoolArenas::new();
        let pool = ConstantPool::new(&arenas);

        let s = pool.get_string("value");
        match s {
            LiteralEntry::String(utf8) => assert!(RefId::same(*utf8, pool.get_utf8("value"))),
            other => panic!("expected a string literal, got {:?}", other),
        }
    }

    #[test]
    fn signatures_split_into_form_and_classes() {
        let (form, classes) = split_signature("(Ljava/lang/String;I)V");
        assert_eq!(form, "(L;I)V");
        assert_eq!(classes, vec!["java/lang/String"]);

        let (form, classes) = split_signature("Ljava/util/List<Ljava/lang/String;>;");
        assert_eq!(form, "L<L;>;");
        assert_eq!(classes, vec!["java/util/List", "java/lang/String"]);

        let (form, classes) = split_signature("([IJ)Z");
        assert_eq!(form, "([IJ)Z");
        assert!(classes.is_empty());
    }

    #[test]
    fn signature_expansion_inverts_the_split() {
        let arenas = PoolArenas::new();
        let pool = ConstantPool::new(&arenas);

        for descriptor in [
            "(Ljava/lang/String;I)V",
            "Ljava/util/Map<Ljava/lang/String;Ljava/lang/Integer;>;",
            "()V",
            "[[D",
        ] {
            let sig = pool.get_signature(descriptor);
            assert_eq!(sig.expand(), descriptor);
        }
    }

    #[test]
    fn flattened_signatures_are_interned_and_cached() {
        let arenas = PoolArenas::new();
        let pool = ConstantPool::new(&arenas);

        let sig = pool.get_signature("(Ljava/lang/Object;)I");
        let flat = pool.flattened_signature(sig);
        assert!(RefId::same(flat, pool.get_utf8("(Ljava/lang/Object;)I")));
        assert!(RefId::same(flat, pool.flattened_signature(sig)));
    }

    #[test]
    fn members_intern_through_shared_parts() {
        let arenas = PoolArenas::new();
        let pool = ConstantPool::new(&arenas);

        let class = pool.get_class("pkg/Owner");
        let descriptor = pool.get_descriptor(pool.get_utf8("run"), pool.get_signature("()V"));
        let method = pool.get_member(MemberKind::Method, class, descriptor);

        assert!(RefId::same(method, pool.get_member(MemberKind::Method, class, descriptor)));
        assert!(!RefId::same(method, pool.get_member(MemberKind::InterfaceMethod, class, descriptor)));

        let refs = Entry::Member(method).references();
        assert_eq!(refs, vec![Entry::Class(class), Entry::Descriptor(descriptor)]);
    }

    #[test]
    fn entry_tags_follow_the_variant() {
        let arenas = PoolArenas::new();
        let pool = ConstantPool::new(&arenas);

        assert_eq!(Entry::Utf8(pool.get_utf8("x")).tag(), Tag::Utf8);
        assert_eq!(Entry::Literal(pool.get_long(7)).tag(), Tag::Long);
        assert_eq!(Entry::Literal(pool.get_string("s")).tag(), Tag::String);
        assert_eq!(Entry::Class(pool.get_class("C")).tag(), Tag::Class);
        assert!(Entry::Literal(pool.get_integer(1)).is_literal());
        assert!(!Entry::Class(pool.get_class("C")).is_literal());
    }
}
