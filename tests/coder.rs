use std::any::Any;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use chrono::NaiveDate;
use record_coder::value::{FieldValue, RecordRef};
use record_coder::{
    Coder, CoderError, ConstructError, ConvertError, DecodeError, FieldDecl, FieldType, Fields, Record,
    Reflect, ResolveError, SchemaBuildError, Tree, TypeRef, TypeRegistry, impl_scalar, record, text,
};
use serde_json::json;

// ---- Fixtures ---- //

record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Person {
        pub name: String,
        pub age: i64,
        pub birthday: NaiveDate,
        pub friend: Option<Box<Person>> = None,
    }
}

record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Data {
        pub a: String,
    }
}

record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Test {
        pub string: String,
        pub digit: i64,
        pub li: Vec<i64>,
        pub data: Data,
        pub data_list: Vec<Data>,
    }
}

fn iso_dates() -> Coder<Person> {
    Coder::<Person>::builder()
        .field_decoder::<Person, _, _>("birthday", |raw: &Tree| {
            raw.expect_str()?.parse::<NaiveDate>().map_err(ConvertError::new)
        })
        .text_encoder(|d: &NaiveDate| d.format("%Y-%m-%d").to_string())
        .build()
        .unwrap()
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn sample_test() -> Test {
    Test {
        string: "asadsf".into(),
        digit: 234234,
        li: vec![1, 23, 234, 5, 4534, 653, 65],
        data: Data { a: "sfgdfg".into() },
        data_list: vec![Data { a: "aaaaaaaa".into() }, Data { a: "bbbbb".into() }],
    }
}

// ---- Demo scenarios ---- //

#[test]
fn quickstart_round_trip() {
    let coder = iso_dates();
    let data = r#"{"name": "High Time", "age": 30, "birthday": "1991-04-01"}"#;

    let person = coder.from_text(data).unwrap();
    assert_eq!(person, Person { name: "High Time".into(), age: 30, birthday: ymd(1991, 4, 1), friend: None });

    let tree = coder.to_tree(&person).unwrap();
    assert_eq!(tree.get("birthday"), Some(&Tree::opaque(ymd(1991, 4, 1))));

    let text = coder.to_text(&person).unwrap();
    assert_eq!(text, r#"{"name":"High Time","age":30,"birthday":"1991-04-01","friend":null}"#);
}

#[test]
fn self_nested_friend_defaults_when_absent() {
    let coder = iso_dates();
    let data = r#"{"name": "High Time", "age": 26, "birthday": "1995-04-01",
        "friend": {"name": "All Cats", "age": 26, "birthday": "1995-04-12"}}"#;

    let person = coder.from_text(data).unwrap();
    let friend = person.friend.as_deref().unwrap();
    assert_eq!(friend.name, "All Cats");
    assert_eq!(friend.birthday, ymd(1995, 4, 12));
    assert_eq!(friend.friend, None);

    let again = coder.from_text(&coder.to_text(&person).unwrap()).unwrap();
    assert_eq!(again, person);
}

#[test]
fn collections_keep_shape_and_order() {
    let coder = Coder::<Test>::new().unwrap();
    let value = sample_test();

    let tree = coder.to_tree(&value).unwrap();
    let expected = Tree::from(json!({
        "string": "asadsf",
        "digit": 234234,
        "li": [1, 23, 234, 5, 4534, 653, 65],
        "data": {"a": "sfgdfg"},
        "data_list": [{"a": "aaaaaaaa"}, {"a": "bbbbb"}]
    }));
    assert_eq!(tree, expected);
    assert_eq!(coder.from_tree(&tree).unwrap(), value);

    let text = coder.to_text(&value).unwrap();
    assert_eq!(text::parse(&text).unwrap(), expected);
}

// ---- Properties ---- //

#[test]
fn acyclic_values_round_trip_through_trees_and_text() {
    let coder = iso_dates();
    let mut p = Person { name: "a".into(), age: -3, birthday: ymd(2000, 2, 29), friend: None };
    p.friend = Some(Box::new(Person { name: "b".into(), age: 0, birthday: ymd(1970, 1, 1), friend: None }));

    assert_eq!(coder.from_tree(&coder.to_tree(&p).unwrap()).unwrap(), p);
    assert_eq!(coder.from_text(&coder.to_text_pretty(&p).unwrap()).unwrap(), p);
}

record! {
    #[derive(Debug, PartialEq)]
    pub struct Shapes {
        pub queue: VecDeque<String>,
        pub maybe: Option<Vec<f64>>,
        pub when: Option<NaiveDate>,
    }
}

#[test]
fn deque_and_optional_collections() {
    let coder = Coder::<Shapes>::new().unwrap();
    let value = Shapes { queue: ["x", "y"].map(String::from).into(), maybe: Some(vec![0.5]), when: None };
    let tree = coder.to_tree(&value).unwrap();
    assert_eq!(tree, Tree::from(json!({"queue": ["x", "y"], "maybe": [0.5], "when": null})));
    assert_eq!(coder.from_tree(&tree).unwrap(), value);

    let sparse: Shapes = coder.from_text(r#"{"queue": [], "when": "2020-05-06"}"#).unwrap();
    assert_eq!(sparse, Shapes { queue: VecDeque::new(), maybe: None, when: Some(ymd(2020, 5, 6)) });
}

#[test]
fn type_decoder_applies_to_every_field_of_that_type() {
    let coder = Coder::<Person>::builder()
        .type_decoder(|raw: &Tree| {
            NaiveDate::parse_from_str(raw.expect_str()?, "%d/%m/%Y").map_err(ConvertError::new)
        })
        .build()
        .unwrap();
    let tree = Tree::from(json!({
        "name": "a", "age": 1, "birthday": "01/02/2003",
        "friend": {"name": "b", "age": 2, "birthday": "04/05/2006"}
    }));
    let p = coder.from_tree(&tree).unwrap();
    assert_eq!(p.birthday, ymd(2003, 2, 1));
    assert_eq!(p.friend.unwrap().birthday, ymd(2006, 5, 4));
}

#[test]
fn decode_errors_name_the_field() {
    let coder = iso_dates();
    let err = coder
        .from_text(r#"{"name": "a", "age": 1, "birthday": "not a date"}"#)
        .unwrap_err();
    match err {
        CoderError::Decode(DecodeError::Conversion { record, field, .. }) => {
            assert_eq!((record, field), ("Person", "birthday"));
        }
        other => panic!("unexpected {other:?}"),
    }

    let err = coder.from_text(r#"{"name": "a", "age": 1}"#).unwrap_err();
    assert!(matches!(
        err,
        CoderError::Decode(DecodeError::Construct { source: ConstructError::MissingField { field: "birthday", .. }, .. })
    ));
}

record! {
    #[derive(Debug, PartialEq)]
    pub struct Counters {
        pub total: u64,
        pub slots: Vec<usize>,
        pub delta: i64,
    }
}

#[test]
fn integers_beyond_i64_round_trip_exactly() {
    let coder = Coder::<Counters>::new().unwrap();
    let value = Counters { total: u64::MAX, slots: vec![0, usize::MAX], delta: i64::MIN };

    let tree = coder.to_tree(&value).unwrap();
    assert_eq!(coder.from_tree(&tree).unwrap(), value);

    let text = coder.to_text(&value).unwrap();
    assert_eq!(
        text,
        format!(r#"{{"total":18446744073709551615,"slots":[0,{}],"delta":-9223372036854775808}}"#, usize::MAX)
    );
    assert_eq!(coder.from_text(&text).unwrap(), value);
}

#[test]
fn out_of_range_floats_do_not_saturate_into_integers() {
    let coder = Coder::<Counters>::new().unwrap();
    let err = coder
        .from_text(r#"{"total": 1, "slots": [], "delta": 1e30}"#)
        .unwrap_err();
    assert!(matches!(err, CoderError::Decode(DecodeError::Conversion { field: "delta", .. })));

    let err = coder
        .from_text(r#"{"total": -1, "slots": [], "delta": 0}"#)
        .unwrap_err();
    assert!(matches!(
        err,
        CoderError::Decode(DecodeError::Construct { source: ConstructError::Field { field: "total", .. }, .. })
    ));
}

// ---- User scalars ---- //

/// Amount in cents.
#[derive(Clone, Debug, PartialEq)]
pub struct Money(pub i64);

impl_scalar!(Money, "money");

record! {
    #[derive(Debug, PartialEq)]
    pub struct Invoice {
        pub number: u32,
        pub total: Money,
    }
}

fn parse_money(raw: &Tree) -> Result<Money, ConvertError> {
    let (units, cents) = raw
        .expect_str()?
        .split_once('.')
        .ok_or_else(|| ConvertError::new("expected `units.cents`"))?;
    let units: i64 = units.parse().map_err(ConvertError::new)?;
    let cents: i64 = cents.parse().map_err(ConvertError::new)?;
    Ok(Money(units * 100 + cents))
}

#[test]
fn user_scalars_need_converters_at_both_ends() {
    let input = r#"{"number": 7, "total": "12.05"}"#;

    let bare = Coder::<Invoice>::new().unwrap();
    match bare.from_text(input).unwrap_err() {
        CoderError::Decode(DecodeError::Conversion { record, field, source }) => {
            assert_eq!((record, field), ("Invoice", "total"));
            assert!(source.to_string().contains("register a decoder"));
        }
        other => panic!("unexpected {other:?}"),
    }

    let coder = Coder::<Invoice>::builder()
        .type_decoder(parse_money)
        .text_encoder(|m: &Money| format!("{}.{:02}", m.0 / 100, m.0 % 100))
        .build()
        .unwrap();
    let invoice = coder.from_text(input).unwrap();
    assert_eq!(invoice, Invoice { number: 7, total: Money(1205) });

    assert_eq!(coder.to_tree(&invoice).unwrap().get("total"), Some(&Tree::opaque(Money(1205))));
    assert_eq!(coder.to_text(&invoice).unwrap(), r#"{"number":7,"total":"12.05"}"#);
}

// ---- Forward references ---- //

/// A record written by hand that refers to itself by name only.
#[derive(Debug, PartialEq)]
pub struct Named {
    name: String,
    friend: Option<Box<Named>>,
}

impl Reflect for Named {
    fn record_name(&self) -> &'static str {
        Self::NAME
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "name" => Some(self.name.to_value()),
            "friend" => Some(self.friend.to_value()),
            _ => None,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl Record for Named {
    const NAME: &'static str = "Named";

    fn fields() -> Vec<FieldDecl> {
        vec![
            FieldDecl::new("name", TypeRef::named("str")),
            FieldDecl::new("friend", TypeRef::optional(TypeRef::named("Named"))),
        ]
    }

    fn construct(mut fields: Fields) -> Result<Self, ConstructError> {
        Ok(Self { name: fields.take("name")?, friend: fields.take("friend")? })
    }
}

impl FieldType for Named {
    fn declared() -> TypeRef {
        TypeRef::record::<Self>()
    }

    fn to_value(&self) -> FieldValue<'_> {
        FieldValue::Record(RecordRef::Borrowed(self))
    }

    fn from_dynamic(value: record_coder::value::Dynamic) -> Result<Self, ConstructError> {
        value.into_record()
    }
}

#[test]
fn forward_reference_by_name_resolves_to_the_root() {
    let coder = Coder::<Named>::new().unwrap();
    assert_eq!(coder.schema().len(), 1);

    let value = Named {
        name: "outer".into(),
        friend: Some(Box::new(Named { name: "inner".into(), friend: None })),
    };
    let tree = coder.to_tree(&value).unwrap();
    assert_eq!(tree, Tree::from(json!({"name": "outer", "friend": {"name": "inner", "friend": null}})));
    assert_eq!(coder.from_tree(&tree).unwrap(), value);
}

#[test]
fn unknown_forward_reference_fails_at_build_time() {
    // an empty registry has no built-in scalar names
    let err = Coder::<Named>::builder()
        .registry(TypeRegistry::empty())
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        SchemaBuildError::Field { field: "name", source: ResolveError::UnknownName(ref n), .. } if n == "str"
    ));
}

// ---- Cycles ---- //

record! {
    pub struct Node {
        pub label: String,
        pub me: Weak<Node>,
        pub children: Vec<Arc<Child>>,
    }
}

record! {
    pub struct Child {
        pub label: String,
        pub parent: Weak<Node>,
    }
}

#[test]
fn back_references_are_omitted_at_every_depth() {
    let coder = Coder::<Node>::new().unwrap();
    let root = Arc::new_cyclic(|me: &Weak<Node>| Node {
        label: "root".into(),
        me: me.clone(),
        children: vec![
            Arc::new(Child { label: "a".into(), parent: me.clone() }),
            Arc::new(Child { label: "b".into(), parent: me.clone() }),
        ],
    });

    let tree = coder.to_tree(&root).unwrap();
    assert_eq!(tree, Tree::from(json!({"label": "root", "children": [{"label": "a"}, {"label": "b"}]})));

    // the omitted back references decode as dangling weak pointers
    let decoded = coder.from_tree(&tree).unwrap();
    assert!(decoded.me.upgrade().is_none());
    assert_eq!(decoded.children.len(), 2);
    assert!(decoded.children[0].parent.upgrade().is_none());
}

// ---- Build-time rejections ---- //

macro_rules! declared_record {
    ($name:ident, $decls:expr) => {
        #[derive(Debug)]
        struct $name;

        impl Reflect for $name {
            fn record_name(&self) -> &'static str {
                stringify!($name)
            }
            fn field(&self, _: &str) -> Option<FieldValue<'_>> {
                None
            }
            fn as_any(&self) -> &dyn Any {
                self
            }
            fn into_any(self: Box<Self>) -> Box<dyn Any> {
                self
            }
        }

        impl Record for $name {
            const NAME: &'static str = stringify!($name);
            fn fields() -> Vec<FieldDecl> {
                $decls
            }
            fn construct(_: Fields) -> Result<Self, ConstructError> {
                Ok($name)
            }
        }
    };
}

#[test]
fn unrepresentable_declarations_fail_at_build_time() {
    use record_coder::Wrapper;

    declared_record!(WithMap, vec![FieldDecl::new(
        "m",
        TypeRef::generic(Wrapper::Map, vec![TypeRef::named("str"), TypeRef::named("int")]),
    )]);
    declared_record!(WithTuple, vec![FieldDecl::new(
        "t",
        TypeRef::generic(Wrapper::Tuple, vec![TypeRef::named("int")]),
    )]);
    declared_record!(WithUnion, vec![FieldDecl::new(
        "u",
        TypeRef::generic(Wrapper::Union, vec![TypeRef::named("int"), TypeRef::named("str")]),
    )]);
    declared_record!(WithNested, vec![FieldDecl::new(
        "n",
        TypeRef::list(TypeRef::set(TypeRef::named("int"))),
    )]);

    assert!(matches!(
        Coder::<WithMap>::new().unwrap_err(),
        SchemaBuildError::Field { source: ResolveError::UnsupportedGeneric { .. }, .. }
    ));
    assert!(matches!(
        Coder::<WithTuple>::new().unwrap_err(),
        SchemaBuildError::Field { source: ResolveError::UnsupportedGeneric { .. }, .. }
    ));
    assert!(matches!(
        Coder::<WithUnion>::new().unwrap_err(),
        SchemaBuildError::Field { source: ResolveError::UnsupportedUnion { arity: 2 }, .. }
    ));
    assert!(matches!(
        Coder::<WithNested>::new().unwrap_err(),
        SchemaBuildError::Field { source: ResolveError::NestedCollection { .. }, .. }
    ));
}

// ---- Concurrency ---- //

#[test]
fn concurrent_encodes_agree() {
    let coder = Coder::<Test>::new().unwrap();
    let value = sample_test();
    let expected = coder.to_tree(&value).unwrap();
    std::thread::scope(|s| {
        let workers: Vec<_> = (0..8)
            .map(|_| s.spawn(|| (coder.to_tree(&value).unwrap(), coder.to_text(&value).unwrap())))
            .collect();
        for w in workers {
            let (tree, text) = w.join().unwrap();
            assert_eq!(tree, expected);
            assert_eq!(coder.from_text(&text).unwrap(), value);
        }
    });
}
