#![doc = include_str!("../../../README.md")]
#![expect(clippy::cast_possible_truncation, reason = "float to int casts are range checked")]
#![expect(clippy::cast_sign_loss, reason = "hash lanes reinterpret signed values")]
#![expect(clippy::cast_possible_wrap, reason = "hash arithmetic wraps on purpose")]

mod args;
mod class;
mod error;
mod field;
mod instance;
mod limits;
mod py_hash;
mod signature;
mod tracer;
mod value;

pub use crate::{
    args::{Args, Kwargs, Resolved},
    class::{
        ClassDecl, ClassOptions, ClassRef, ClassStage, FieldTable, PostInitHook, PreInitHook, RecordClass, base_class,
        frozen_base_class,
    },
    error::{ErrorKind, RecordError, RecordResult},
    field::{
        DefaultFactory, DependentFactoryFn, FactoryFn, Field, FieldBuilder, FieldDefault, FieldSpec, Metadata,
        internal_state_field,
    },
    instance::{Instance, InstanceState},
    limits::{MAX_INHERITANCE_DEPTH, MAX_MRO_LENGTH, SchemaLimits},
    signature::{Parameter, ParameterDefault, Signature},
    tracer::{ConstructionTracer, LogTracer, NoopTracer, RecordingTracer, TraceEvent, ValueSource},
    value::Value,
};
