/// Tests for instance construction: default resolution, dynamic defaults,
/// construction hooks, argument validation, and reconstruction.
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use baseclasses::{
    Args, ClassDecl, ClassRef, ErrorKind, Field, InstanceState, RecordError, Value, base_class, frozen_base_class,
    kwargs,
};
use pretty_assertions::assert_eq;

/// `class Foo(FrozenBaseClass): a: int; b: int = 5`
fn foo() -> ClassRef {
    ClassDecl::new("Foo")
        .extends(&frozen_base_class())
        .required("a", "int")
        .with_default("b", "int", 5)
        .build()
        .unwrap()
}

/// `class ChildFoo(Foo): y: float = Field(default_factory=lambda **kw: kw["a"] * 2.0)`
fn child_foo(foo: &ClassRef) -> ClassRef {
    ClassDecl::new("ChildFoo")
        .extends(foo)
        .field(
            "y",
            "float",
            Field::with_factory(|kw| {
                let a = kw.require("a")?.as_float().unwrap_or_default();
                Ok(Value::Float(a * 2.0))
            }),
        )
        .build()
        .unwrap()
}

/// `class Parent(BaseClass): x: int; y: int; z: Optional[str] = "parent"`
fn parent() -> ClassRef {
    ClassDecl::new("Parent")
        .extends(&base_class())
        .required("x", "int")
        .required("y", "int")
        .with_default("z", "Optional[str]", "parent")
        .build()
        .unwrap()
}

#[test]
fn static_default_fills_missing_field() {
    let x = foo().new_instance(kwargs! { "a" => 1 }).unwrap();
    assert_eq!(x.get("a").unwrap(), &Value::Int(1));
    assert_eq!(x.get("b").unwrap(), &Value::Int(5));
    assert_eq!(x.state(), InstanceState::Sealed);
}

#[test]
fn supplied_value_wins_over_default() {
    let x = foo().new_instance(kwargs! { "a" => 1, "b" => 7 }).unwrap();
    assert_eq!(x.get("b").unwrap(), &Value::Int(7));

    // an explicit None is still a supplied value
    let x = foo().new_instance(kwargs! { "a" => 1, "b" => Value::None }).unwrap();
    assert!(x.get("b").unwrap().is_none());
}

/// A factory reads fields resolved before it.
#[test]
fn dependent_factory_reads_earlier_fields() {
    let foo = foo();
    let child = child_foo(&foo);
    let c = child.new_instance(kwargs! { "a" => 3 }).unwrap();
    assert_eq!(c.get("y").unwrap(), &Value::Float(6.0));
    assert_eq!(c.get("b").unwrap(), &Value::Int(5));

    let c = child.new_instance(kwargs! { "a" => 3, "y" => 0.5 }).unwrap();
    assert_eq!(c.get("y").unwrap(), &Value::Float(0.5));
}

/// A default derived from another field tracks the supplied value unless overridden.
#[test]
fn derived_default_tracks_sibling() {
    let kwargs_class = ClassDecl::new("BCKwargs")
        .extends(&frozen_base_class())
        .required("window", "int")
        .field("com", "int", Field::with_factory(|kw| Ok(kw.require("window")?.clone())))
        .build()
        .unwrap();

    let derived = kwargs_class.new_instance(kwargs! { "window" => 252 }).unwrap();
    assert_eq!(derived.get("com").unwrap(), &Value::Int(252));

    let explicit = kwargs_class
        .new_instance(kwargs! { "window" => 252, "com" => 181 })
        .unwrap();
    assert_eq!(explicit.get("com").unwrap(), &Value::Int(181));
}

/// Factories never see fields that come after their own.
#[test]
fn factory_cannot_read_later_fields() {
    let class = ClassDecl::new("Backwards")
        .extends(&base_class())
        .required("a", "int")
        .field("early", "int", Field::with_factory(|kw| Ok(kw.require("late")?.clone())))
        .with_default("late", "int", 1)
        .build()
        .unwrap();
    let err = class.new_instance(kwargs! { "a" => 1 }).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingFieldError);

    // a plain lookup sees only what is resolved so far
    let seen = Arc::new(AtomicUsize::new(usize::MAX));
    let seen_in_factory = Arc::clone(&seen);
    let class = ClassDecl::new("Counts")
        .extends(&base_class())
        .required("a", "int")
        .field(
            "n",
            "int",
            Field::with_factory(move |kw| {
                seen_in_factory.store(kw.len(), Ordering::SeqCst);
                Ok(Value::Int(0))
            }),
        )
        .with_default("after", "int", 1)
        .build()
        .unwrap();
    class.new_instance(kwargs! { "a" => 1, "after" => 2 }).unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

/// A plain factory runs once per construction that needs it.
#[test]
fn plain_factory_runs_per_instance() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let class = ClassDecl::new("Bag")
        .extends(&base_class())
        .field(
            "items",
            "list",
            Field::builder()
                .default_factory(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Value::list(Vec::<Value>::new())
                })
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    let mut first = class.new_instance(kwargs! {}).unwrap();
    let second = class.new_instance(kwargs! {}).unwrap();
    class.new_instance(kwargs! { "items" => Value::list([1]) }).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    first.set("items", Value::list([1, 2])).unwrap();
    assert_eq!(second.get("items").unwrap(), &Value::list(Vec::<Value>::new()));
}

#[test]
fn missing_required_field() {
    let parent = parent();
    let err = parent.new_instance(kwargs! {}).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingFieldError);
    assert_eq!(err.message(), "Parent() missing required argument: \"x\"");

    let err = parent.new_instance(kwargs! { "x" => 1 }).unwrap_err();
    assert_eq!(err.message(), "Parent() missing required argument: \"y\"");

    // resolution runs before the unknown-name check
    let err = parent.new_instance(kwargs! { "foobar" => 1 }).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingFieldError);
}

#[test]
fn unknown_fields_are_reported_together() {
    let err = parent()
        .new_instance(kwargs! { "x" => 1, "y" => 2, "foobar" => 1, "other" => 2 })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownFieldError);
    assert_eq!(err.message(), "Parent() unexpected arguments: \"foobar\", \"other\"");
}

#[test]
fn accepted_instance_reads_back() {
    let p = parent().new_instance(kwargs! { "x" => 1, "y" => 2 }).unwrap();
    assert_eq!(p.get("x").unwrap(), &Value::Int(1));
    assert_eq!(p.get("y").unwrap(), &Value::Int(2));
    assert_eq!(p.get("z").unwrap(), &Value::from("parent"));
    assert_eq!(p.fields().len(), 3);
    assert_eq!(p.get("nope").unwrap_err().kind(), ErrorKind::UnknownFieldError);
}

/// Positional arguments are only accepted directly below a root class.
#[test]
fn positional_arguments() {
    let parent = parent();
    let p = parent.instantiate(Args::positional([1, 2])).unwrap();
    assert_eq!(p.as_tuple(), Value::tuple([Value::Int(1), Value::Int(2), Value::from("parent")]));

    let p = parent.instantiate(Args::positional([1]).kwarg("y", 2)).unwrap();
    assert_eq!(p.get("y").unwrap(), &Value::Int(2));

    let err = parent.instantiate(Args::positional([1]).kwarg("x", 2)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArgumentError);
    assert_eq!(err.message(), "Parent() got multiple values for argument \"x\"");

    let err = parent.instantiate(Args::positional([1, 2, 3, 4])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArgumentError);

    let child = ClassDecl::new("Child").extends(&parent).build().unwrap();
    assert!(!child.accepts_positional());
    let err = child.instantiate(Args::positional([1, 2])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArgumentError);
    child.instantiate(Args::new().kwarg("x", 1).kwarg("y", 2)).unwrap();
}

/// `__pre_init__` that fills `z` only when neither `x` nor `y` is given.
fn pre_init_class() -> ClassRef {
    ClassDecl::new("BCPreInit")
        .extends(&frozen_base_class())
        .with_default("x", "Optional[int]", Value::None)
        .with_default("y", "Optional[int]", Value::None)
        .with_default("z", "Optional[int]", Value::None)
        .pre_init(|mut kw| {
            let unset = |name: &str| kw.get(name).is_none_or(Value::is_none);
            if unset("x") && unset("y") {
                kw.insert("z".to_owned(), Value::Int(100));
            }
            Ok(kw)
        })
        .build()
        .unwrap()
}

#[test]
fn pre_init_rewrites_arguments() {
    let class = pre_init_class();
    let given = class.new_instance(kwargs! { "x" => 1, "y" => 2 }).unwrap();
    assert_eq!(given.get("x").unwrap(), &Value::Int(1));
    assert_eq!(given.get("y").unwrap(), &Value::Int(2));
    assert!(given.get("z").unwrap().is_none());

    let mut filled = class.new_instance(kwargs! {}).unwrap();
    assert!(filled.get("x").unwrap().is_none());
    assert!(filled.get("y").unwrap().is_none());
    assert_eq!(filled.get("z").unwrap(), &Value::Int(100));
    assert_eq!(filled.set("x", 1).unwrap_err().kind(), ErrorKind::FrozenInstanceError);
}

/// Subclasses without their own hook inherit the nearest one.
#[test]
fn pre_init_is_inherited_and_overridable() {
    let class = pre_init_class();
    let child = ClassDecl::new("Child").extends(&class).build().unwrap();
    assert_eq!(child.new_instance(kwargs! {}).unwrap().get("z").unwrap(), &Value::Int(100));

    let replaced = ClassDecl::new("Replaced").extends(&class).pre_init(Ok).build().unwrap();
    assert!(replaced.new_instance(kwargs! {}).unwrap().get("z").unwrap().is_none());
}

/// An extending hook sees the keywords the inherited hook produced.
#[test]
fn pre_init_can_extend_inherited_hook() {
    let class = pre_init_class();
    let doubled = ClassDecl::new("Doubled")
        .extends(&class)
        .extend_pre_init(|mut kw| {
            if let Some(Value::Int(z)) = kw.get("z").cloned() {
                kw.insert("z".to_owned(), Value::Int(z * 2));
            }
            Ok(kw)
        })
        .build()
        .unwrap();

    assert_eq!(doubled.new_instance(kwargs! {}).unwrap().get("z").unwrap(), &Value::Int(200));
    assert!(doubled.new_instance(kwargs! { "x" => 1 }).unwrap().get("z").unwrap().is_none());
    assert_eq!(doubled.new_instance(kwargs! { "x" => 1, "z" => 4 }).unwrap().get("z").unwrap(), &Value::Int(8));

    // the composed hook is what subclasses inherit
    let grandchild = ClassDecl::new("GrandChild").extends(&doubled).build().unwrap();
    assert_eq!(grandchild.apply_pre_init(kwargs! {}).unwrap().get("z"), Some(&Value::Int(200)));

    // with nothing to extend it acts as a plain hook
    let alone = ClassDecl::new("Alone")
        .extends(&base_class())
        .with_default("z", "int", 0)
        .extend_pre_init(|mut kw| {
            kw.insert("z".to_owned(), Value::Int(7));
            Ok(kw)
        })
        .build()
        .unwrap();
    assert_eq!(alone.new_instance(kwargs! {}).unwrap().get("z").unwrap(), &Value::Int(7));
    assert_eq!(base_class().apply_pre_init(kwargs! { "a" => 1 }).unwrap(), kwargs! { "a" => 1 });
}

/// The pre-init hook may rename arguments, and its errors propagate.
#[test]
fn pre_init_can_rename_and_fail() {
    let class = ClassDecl::new("Renamed")
        .extends(&base_class())
        .required("name", "str")
        .pre_init(|mut kw| {
            if let Some(legacy) = kw.shift_remove("title") {
                kw.insert("name".to_owned(), legacy);
            }
            if kw.get("name") == Some(&Value::from("")) {
                return Err(RecordError::new(ErrorKind::ArgumentError, "name must not be empty"));
            }
            Ok(kw)
        })
        .build()
        .unwrap();

    let r = class.new_instance(kwargs! { "title" => "old" }).unwrap();
    assert_eq!(r.get("name").unwrap(), &Value::from("old"));

    let err = class.new_instance(kwargs! { "name" => "" }).unwrap_err();
    assert_eq!(err.to_string(), "ArgumentError: name must not be empty");
}

/// The post-init hook runs before sealing, so it can still write.
#[test]
fn post_init_runs_before_sealing() {
    let class = ClassDecl::new("Area")
        .extends(&frozen_base_class())
        .required("w", "int")
        .required("h", "int")
        .with_default("area", "int", Value::None)
        .post_init(|instance| {
            assert_eq!(instance.state(), InstanceState::Building);
            let w = instance.get("w")?.as_int().unwrap_or_default();
            let h = instance.get("h")?.as_int().unwrap_or_default();
            instance.set("area", w * h)
        })
        .build()
        .unwrap();

    let mut a = class.new_instance(kwargs! { "w" => 3, "h" => 4 }).unwrap();
    assert_eq!(a.get("area").unwrap(), &Value::Int(12));
    assert_eq!(a.state(), InstanceState::Sealed);
    assert_eq!(a.set("area", 0).unwrap_err().kind(), ErrorKind::FrozenInstanceError);
}

/// `as_dict` output fed back to the constructor yields an equal instance.
#[test]
fn round_trip_through_as_dict() {
    let foo = foo();
    let child = child_foo(&foo);
    let original = child.new_instance(kwargs! { "a" => 2, "b" => 9 }).unwrap();
    let rebuilt = child.new_instance(original.as_dict()).unwrap();
    assert_eq!(rebuilt, original);
    assert_eq!(
        original.as_dict().keys().collect::<Vec<_>>(),
        ["a", "b", "y"]
    );
}

/// `replace` goes through the constructor with the changes applied.
#[test]
fn replace_builds_a_new_instance() {
    let foo = foo();
    let x = foo.new_instance(kwargs! { "a" => 1 }).unwrap();
    let y = x.replace(kwargs! { "b" => 6 }).unwrap();
    assert_eq!(y.get("b").unwrap(), &Value::Int(6));
    assert_eq!(x.get("b").unwrap(), &Value::Int(5));
    assert!(y.is_frozen());

    let err = x.replace(kwargs! { "c" => 1 }).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownFieldError);
}

#[test]
fn instances_know_their_class() {
    let foo = foo();
    let child = child_foo(&foo);
    let c = child.new_instance(kwargs! { "a" => 1 }).unwrap();
    assert!(c.is_instance_of(&child));
    assert!(c.is_instance_of(&foo));
    assert!(c.is_instance_of(&frozen_base_class()));
    assert!(c.is_instance_of(&base_class()));
    assert_eq!(Value::from(c).type_name(), "ChildFoo");
}
