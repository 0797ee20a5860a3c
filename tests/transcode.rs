use classband::coding::{read_band, write_band, CodingChooser, UNSIGNED5};
use classband::layout::{
    expand_case_dash_notation, parse, unparse, AttrContext, AttrDefs, Attribute, BandBuffer,
    BciMap, Layout, ValueSink,
};
use classband::pool::{ConstantPool, Entry, Index, PoolArenas};

fn round_trip(def: &str, bytes: &[u8]) {
    let layout = Layout::define(AttrContext::Code, "Test", def).unwrap();
    let arenas = PoolArenas::new();
    let pool = ConstantPool::new(&arenas);
    let local_cp = Index::new("cp", Vec::new());

    let mut bands = BandBuffer::for_layout(&layout);
    parse(&layout, bytes, &pool, &local_cp, &mut bands).unwrap();
    bands.rewind();

    let mut rebuilt = Vec::new();
    let fixups = unparse(&layout, &mut bands, &mut rebuilt).unwrap();
    assert!(fixups.is_empty());
    assert_eq!(rebuilt, bytes, "layout {:?}", def);
}

#[test]
fn assorted_layouts_reproduce_their_bytes() {
    let cases: &[(&str, &[u8])] = &[
        // every integral width, including the empty one
        ("BHIV", &[0x05, 0x01, 0x00, 0x7F, 0xFF, 0xFF, 0xFE]),
        ("SBSH", &[0xFF, 0x80, 0x00]),
        // replication counts of zero, one and more, nested
        ("NB[NB[B]]", &[0x02, 0x00, 0x03, 0x0A, 0x0B, 0x0C]),
        ("NB[H]", &[0x00]),
        ("NB[H]", &[0x01, 0x12, 0x34]),
        // a signed union through each case and the default
        ("TSB(-1)[SB](0)[]()[BB]", &[0xFF, 0xFE]),
        ("TSB(-1)[SB](0)[]()[BB]", &[0x00]),
        ("TSB(-1)[SB](0)[]()[BB]", &[0x05, 0x01, 0x02]),
        // a forward call replicated from another callable
        ("[NH[(1)]][B]", &[0x00, 0x02, 0x07, 0x08]),
    ];
    for &(def, bytes) in cases {
        round_trip(def, bytes);
    }
}

#[test]
fn annotation_attributes_round_trip_with_references() {
    let defs = AttrDefs::new();
    defs.install_standard().unwrap();
    let layout = defs
        .lookup(AttrContext::Class, "RuntimeVisibleAnnotations")
        .unwrap()
        .layout();

    let arenas = PoolArenas::new();
    let pool = ConstantPool::new(&arenas);
    let type_utf8 = Entry::Utf8(pool.get_utf8("LA;"));
    let x = Entry::Utf8(pool.get_utf8("x"));
    let forty_two = Entry::Literal(pool.get_integer(42));
    let y = Entry::Utf8(pool.get_utf8("y"));
    let a = Entry::Utf8(pool.get_utf8("a"));
    let b = Entry::Utf8(pool.get_utf8("b"));
    let local_cp = Index::new("cp", vec![type_utf8, x, forty_two, y, a, b]);

    // @A(x = 42, y = {"a", "b"})
    let bytes: Vec<u8> = vec![
        0x00, 0x01, // one annotation
        0x00, 0x01, // type LA;
        0x00, 0x02, // two element value pairs
        0x00, 0x02, 0x49, 0x00, 0x03, // x: 'I', the integer 42
        0x00, 0x04, 0x5B, // y: '[', an array
        0x00, 0x02, // of two
        0x73, 0x00, 0x05, // 's', "a"
        0x73, 0x00, 0x06, // 's', "b"
    ];

    let mut bands = BandBuffer::for_layout(layout);
    parse(layout, &bytes, &pool, &local_cp, &mut bands).unwrap();

    let signature = Entry::Signature(pool.get_signature("LA;"));
    assert_eq!(bands.ints(0), [1]);
    assert_eq!(bands.refs(1), [Some(signature)]);
    assert_eq!(bands.ints(2), [2]);
    assert_eq!(bands.refs(3), [Some(x), Some(y)]);
    assert_eq!(bands.ints(4), [73, 91, 115, 115]);
    assert_eq!(bands.refs(5), [Some(forty_two)]);
    assert_eq!(bands.refs(12), [Some(a), Some(b)]);
    assert_eq!(bands.ints(13), [2]);
    // the element value table reenters itself once per array element
    assert_eq!(bands.back_calls(), [0, 0, 2]);

    // rebuilding swaps the raw type Utf8 for its promoted signature
    bands.rewind();
    let mut attr = Attribute::unparse(layout, &mut bands).unwrap();
    let final_cp = Index::new("cp", vec![signature, x, forty_two, y, a, b]);
    attr.finish_refs(&final_cp).unwrap();
    assert_eq!(attr.bytes(), &bytes[..]);
}

#[test]
fn local_variable_tables_renumber_through_the_boundary_map() {
    let defs = AttrDefs::new();
    defs.install_standard().unwrap();
    let layout = defs.lookup(AttrContext::Code, "LocalVariableTable").unwrap().layout();

    let arenas = PoolArenas::new();
    let pool = ConstantPool::new(&arenas);
    let name = Entry::Utf8(pool.get_utf8("i"));
    let signature = Entry::Signature(pool.get_signature("I"));
    let local_cp = Index::new("cp", vec![name, signature]);

    // two scopes over instructions starting at 0, 2, 4, 8 and ending at 16
    let bytes: Vec<u8> = vec![
        0x00, 0x02, // two rows
        0x00, 0x00, 0x00, 0x04, 0x00, 0x01, 0x00, 0x02, 0x00, 0x00, // pc 0 len 4 slot 0
        0x00, 0x04, 0x00, 0x0C, 0x00, 0x01, 0x00, 0x02, 0x00, 0x01, // pc 4 len 12 slot 1
    ];

    let mut bands = BandBuffer::for_layout(layout);
    bands.set_bci_map(BciMap::new(vec![0, 2, 4, 8, 16]));
    parse(layout, &bytes, &pool, &local_cp, &mut bands).unwrap();

    // positions renumber to instruction ordinals, lengths to ordinal spans
    assert_eq!(bands.ints(1), [0, 2]);
    assert_eq!(bands.ints(2), [2, 2]);
    assert_eq!(bands.ints(5), [0, 1]);

    bands.rewind();
    let mut attr = Attribute::unparse(layout, &mut bands).unwrap();
    attr.finish_refs(&local_cp).unwrap();
    assert_eq!(attr.bytes(), &bytes[..]);
}

#[test]
fn bands_travel_through_chosen_codings() {
    let defs = AttrDefs::new();
    defs.install_standard().unwrap();
    let layout = defs.lookup(AttrContext::Code, "LineNumberTable").unwrap().layout();

    let mut bytes = Vec::new();
    bytes.extend_from_slice(&500u16.to_be_bytes());
    for i in 0..500u16 {
        bytes.extend_from_slice(&(i * 3).to_be_bytes());
        bytes.extend_from_slice(&(100 + i % 7).to_be_bytes());
    }

    let arenas = PoolArenas::new();
    let pool = ConstantPool::new(&arenas);
    let local_cp = Index::new("cp", Vec::new());
    let mut bands = BandBuffer::for_layout(layout);
    parse(layout, &bytes, &pool, &local_cp, &mut bands).unwrap();

    // each band rides the stream under its chosen coding
    let chooser = CodingChooser::new(9);
    let mut replay = BandBuffer::for_layout(layout);
    for band in 0..layout.band_count() {
        let values = bands.ints(band).to_vec();
        let choice = chooser.choose(&values, UNSIGNED5);

        let mut stream = Vec::new();
        write_band(&mut stream, &choice.method, &values, UNSIGNED5).unwrap();
        let mut decoded = Vec::new();
        read_band(&mut &stream[..], values.len(), UNSIGNED5, &mut decoded).unwrap();
        assert_eq!(values, decoded, "band {}", band);

        for value in decoded {
            replay.put_int(band, value);
        }
    }

    let rebuilt = Attribute::unparse(layout, &mut replay).unwrap();
    assert_eq!(rebuilt.bytes(), &bytes[..]);
}

#[test]
fn archives_can_define_versioned_layouts() {
    // older archives spell case lists with dash ranges; expand first
    let expanded = expand_case_dash_notation("TB(1-3)[H]()[]").unwrap();
    assert_eq!(expanded, "TB(1,2,3)[H]()[]");

    let defs = AttrDefs::new();
    let attr = defs.define(AttrContext::Code, "Versioned", &expanded).unwrap();
    assert_eq!(attr.layout().band_count() as usize, 2);

    round_trip("TB(1,2,3)[H]()[]", &[0x02, 0x12, 0x34]);
    round_trip("TB(1,2,3)[H]()[]", &[0x09]);
}
