//! Tokenizer, object parser and serializer tests.

use vellum_core::model::objects::write_sequence;
use vellum_core::parser::{Lexer, PdfParser};
use vellum_core::{Dictionary, ObjRef, PdfError, PdfObject};

fn parse(data: &[u8]) -> PdfObject {
    PdfParser::new(data).parse_object().unwrap()
}

fn serialize(obj: &PdfObject) -> String {
    String::from_utf8(obj.to_bytes().unwrap()).unwrap()
}

#[test]
fn test_tokens_and_positions() {
    let mut lexer = Lexer::new(b"/a[1 2]%comment\n(x) <<>>");
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        if token.is_end() {
            break;
        }
        tokens.push((token.pos, String::from_utf8_lossy(token.bytes).into_owned()));
    }
    let expected: Vec<(usize, String)> = [
        (0, "/"),
        (1, "a"),
        (2, "["),
        (3, "1"),
        (5, "2"),
        (6, "]"),
        (16, "("),
        (17, "x"),
        (18, ")"),
        (20, "<"),
        (21, "<"),
        (22, ">"),
        (23, ">"),
    ]
    .into_iter()
    .map(|(pos, s)| (pos, s.to_string()))
    .collect();
    assert_eq!(tokens, expected);
}

#[test]
fn test_pushback_is_lifo() {
    let mut lexer = Lexer::new(b"1 2 3");
    let a = lexer.next_token();
    let b = lexer.next_token();
    lexer.push_back(b);
    lexer.push_back(a);
    assert_eq!(lexer.tell(), 0);
    assert_eq!(lexer.next_token().bytes, b"1");
    assert_eq!(lexer.tell(), 2);
    assert_eq!(lexer.next_token().bytes, b"2");
    assert_eq!(lexer.next_token().bytes, b"3");
}

#[test]
fn test_literal_strings() {
    assert_eq!(
        parse(b"(a(b)c\\n\\101\\\nd\\q)"),
        PdfObject::String(b"a(b)c\nAdq".to_vec())
    );
    assert_eq!(parse(b"(x\r\ny)"), PdfObject::String(b"x\ny".to_vec()));
    assert_eq!(parse(b"(\\0053)"), PdfObject::String(b"\x053".to_vec()));
}

#[test]
fn test_hex_strings() {
    assert_eq!(parse(b"<41 42\n43>"), PdfObject::HexString(b"ABC".to_vec()));
    assert_eq!(parse(b"<414>"), PdfObject::HexString(vec![0x41, 0x40]));
    assert!(PdfParser::new(b"<4G>").parse_object().is_err());
}

#[test]
fn test_numbers_and_references() {
    assert_eq!(parse(b"5.0"), PdfObject::Int(5));
    assert_eq!(parse(b"-.5"), PdfObject::Real(-0.5));
    assert_eq!(
        parse(b"[1 0 R 2 3]"),
        PdfObject::Array(vec![
            PdfObject::Ref(ObjRef::new(1, 0)),
            PdfObject::Int(2),
            PdfObject::Int(3)
        ])
    );
    assert!(PdfParser::new(b"[-1 0 R]").parse_object().is_err());
}

#[test]
fn test_bare_keyword_outside_content_is_error() {
    let err = PdfParser::new(b"[1 foo]").parse_object().unwrap_err();
    assert!(matches!(err, PdfError::Syntax { .. }));
    let mut content = PdfParser::content(b"1 foo");
    content.parse_object().unwrap();
    assert_eq!(
        content.parse_object().unwrap(),
        PdfObject::Token(b"foo".to_vec())
    );
}

#[test]
fn test_dictionary_keys_must_be_names() {
    assert!(PdfParser::new(b"<</A 1 2 3>>").parse_object().is_err());
    let dict = parse(b"<</A 1/B<</C null>>>>");
    let dict = dict.as_dict().unwrap();
    assert_eq!(dict.get_int("A"), Some(1));
    assert!(dict.get("B").unwrap().as_dict().unwrap().is_empty());
}

#[test]
fn test_name_escapes() {
    assert_eq!(parse(b"/A#23B"), PdfObject::name("A#B"));
    insta::assert_snapshot!(serialize(&PdfObject::name("A#B")), @"/A#23B");
    insta::assert_snapshot!(serialize(&PdfObject::name("a b/c")), @"/a#20b#2Fc");
    insta::assert_snapshot!(serialize(&PdfObject::name("\u{e9}")), @"/#E9");
    assert_eq!(parse(b"/#E9"), PdfObject::name("\u{e9}"));
}

#[test]
fn test_null_values_drop_keys() {
    let mut dict = Dictionary::new();
    dict.set("Keep", 1i64);
    dict.set("Drop", 2i64);
    dict.set("Drop", PdfObject::Null);
    assert!(!dict.has_object("Drop"));
    insta::assert_snapshot!(serialize(&PdfObject::Dict(dict)), @"<</Keep 1>>");
}

#[test]
fn test_minimal_whitespace() {
    let array = PdfObject::Array(vec![
        PdfObject::Int(1),
        PdfObject::name("a"),
        PdfObject::name("b"),
        PdfObject::string("s"),
        PdfObject::Int(2),
        PdfObject::reference(3, 0),
        PdfObject::Bool(true),
        PdfObject::Array(vec![]),
        PdfObject::Null,
    ]);
    insta::assert_snapshot!(serialize(&array), @"[1/a/b(s)2 3 0 R true[]null]");

    let dict: Dictionary = [
        ("b".to_string(), PdfObject::Int(1)),
        ("a".to_string(), PdfObject::name("x")),
        ("c".to_string(), PdfObject::HexString(vec![0xAB])),
    ]
    .into_iter()
    .collect();
    insta::assert_snapshot!(serialize(&PdfObject::Dict(dict)), @"<</a/x/b 1/c<AB>>>");

    let mut out = Vec::new();
    write_sequence(
        &[PdfObject::Real(0.25), PdfObject::Real(-2.5), PdfObject::Real(1e-7)],
        &mut out,
    )
    .unwrap();
    assert_eq!(out, b"0.25 -2.5 0.0000001");
}

#[test]
fn test_string_escapes_on_write() {
    let s = PdfObject::string(b"a(b)\\\n\x08".to_vec());
    insta::assert_snapshot!(serialize(&s), @r"(a\(b\)\\\n\b)");
    assert_eq!(parse(serialize(&s).as_bytes()), s);
}
