/// Tests for construction tracing.
use baseclasses::{
    ClassDecl, ClassStage, ErrorKind, Field, InstanceState, NoopTracer, RecordingTracer, TraceEvent, Value,
    ValueSource, base_class, frozen_base_class, kwargs,
};
use pretty_assertions::assert_eq;

fn stage(class_name: &str, stage: ClassStage) -> TraceEvent {
    TraceEvent::ClassStage {
        class_name: class_name.to_owned(),
        stage,
    }
}

fn resolved(field: &str, source: ValueSource) -> TraceEvent {
    TraceEvent::FieldResolved {
        class_name: "Foo".to_owned(),
        field: field.to_owned(),
        source,
    }
}

#[test]
fn class_definition_walks_every_stage() {
    let mut tracer = RecordingTracer::new();
    ClassDecl::new("Foo")
        .extends(&frozen_base_class())
        .required("a", "int")
        .build_traced(&mut tracer)
        .unwrap();
    assert_eq!(
        tracer.events(),
        [
            stage("Foo", ClassStage::Declared),
            stage("Foo", ClassStage::Merging),
            stage("Foo", ClassStage::Validated),
            stage("Foo", ClassStage::Installed),
        ]
    );
}

#[test]
fn rejected_definition_stops_before_installation() {
    let mut tracer = RecordingTracer::new();
    let err = ClassDecl::new("Bad")
        .extends(&base_class())
        .with_default("a", "int", 1)
        .required("b", "int")
        .build_traced(&mut tracer)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FieldOrderError);
    assert_eq!(
        tracer.into_events(),
        vec![
            stage("Bad", ClassStage::Declared),
            stage("Bad", ClassStage::Merging),
            TraceEvent::ClassRejected {
                class_name: "Bad".to_owned(),
                kind: ErrorKind::FieldOrderError,
            },
        ]
    );

    let mut tracer = RecordingTracer::new();
    ClassDecl::new("no good").extends(&base_class()).build_traced(&mut tracer).unwrap_err();
    assert_eq!(
        tracer.events(),
        [TraceEvent::ClassRejected {
            class_name: "no good".to_owned(),
            kind: ErrorKind::ConfigurationError,
        }]
    );
}

/// Each field reports where its value came from, in table order.
#[test]
fn construction_reports_value_sources() {
    let foo = ClassDecl::new("Foo")
        .extends(&frozen_base_class())
        .required("a", "int")
        .with_default("b", "int", 5)
        .field("c", "int", Field::with_factory(|kw| Ok(kw.require("a")?.clone())))
        .pre_init(Ok)
        .build()
        .unwrap();

    let mut tracer = RecordingTracer::new();
    foo.instantiate_traced(kwargs! { "a" => 1 }.into(), &mut tracer).unwrap();
    assert_eq!(
        tracer.events(),
        [
            TraceEvent::PreInit {
                class_name: "Foo".to_owned(),
                keys: vec!["a".to_owned()],
            },
            resolved("a", ValueSource::Supplied),
            resolved("b", ValueSource::StaticDefault),
            resolved("c", ValueSource::Factory),
            TraceEvent::InstanceReady {
                class_name: "Foo".to_owned(),
                state: InstanceState::Sealed,
            },
        ]
    );
}

#[test]
fn recording_limit_caps_events() {
    let mut tracer = RecordingTracer::with_limit(2);
    ClassDecl::new("Capped")
        .extends(&base_class())
        .build_traced(&mut tracer)
        .unwrap();
    assert_eq!(tracer.events().len(), 2);

    tracer.clear();
    assert!(tracer.events().is_empty());
}

/// The no-op tracer changes nothing about the result.
#[test]
fn noop_tracer_builds_normally() {
    let class = ClassDecl::new("Quiet")
        .extends(&base_class())
        .with_default("a", "int", 1)
        .build_traced(&mut NoopTracer)
        .unwrap();
    let q = class.instantiate_traced(kwargs! {}.into(), &mut NoopTracer).unwrap();
    assert_eq!(q.get("a").unwrap(), &Value::Int(1));
    assert_eq!(q.state(), InstanceState::Open);
}

#[test]
fn sources_and_stages_display_in_snake_case() {
    assert_eq!(ValueSource::StaticDefault.to_string(), "static_default");
    assert_eq!(ClassStage::Validated.to_string(), "validated");
    assert_eq!(InstanceState::Sealed.to_string(), "sealed");
}
