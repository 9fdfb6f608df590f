//! Record class construction.
//!
//! A [`ClassDecl`] plays the role of a class body: a name, its bases, and the
//! annotated members in declaration order. [`ClassDecl::build`] turns it into a
//! [`RecordClass`] by linearizing the bases (C3), merging every ancestor's field
//! declarations into one ordered table, validating that table, and resolving the
//! class-level options. A class that fails any step is never produced.
//!
//! ```
//! use baseclasses::{ClassDecl, frozen_base_class};
//!
//! let foo = ClassDecl::new("Foo")
//!     .extends(&frozen_base_class())
//!     .required("a", "int")
//!     .with_default("b", "int", 5)
//!     .build()
//!     .unwrap();
//! assert!(foo.is_frozen());
//! assert_eq!(foo.fields().keys().collect::<Vec<_>>(), ["a", "b"]);
//! ```

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::{
        Arc, LazyLock,
        atomic::{AtomicU64, Ordering},
    },
};

use ahash::AHashMap;
use indexmap::IndexMap;
use smallvec::SmallVec;
use strum::Display;

use crate::{
    args::Kwargs,
    error::{RecordError, RecordResult},
    field::{Field, FieldSpec},
    instance::Instance,
    limits::SchemaLimits,
    signature::Signature,
    tracer::{ConstructionTracer, LogTracer},
    value::Value,
};

/// Shared handle to a built record class.
pub type ClassRef = Arc<RecordClass>;

/// Ordered field table: name to resolved spec.
pub type FieldTable = IndexMap<String, Arc<FieldSpec>>;

/// Hook that rewrites the keyword mapping before any field is resolved.
pub type PreInitHook = dyn Fn(Kwargs) -> RecordResult<Kwargs> + Send + Sync;

/// Hook run on a fully assigned instance before it is sealed.
pub type PostInitHook = dyn Fn(&mut Instance) -> RecordResult<()> + Send + Sync;

/// Options set on a class declaration.
///
/// Every option left as `None` is inherited from the nearest ancestor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassOptions {
    /// Whether instances are sealed once constructed.
    pub frozen: Option<bool>,
}

impl ClassOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn frozen(mut self, frozen: bool) -> Self {
        self.frozen = Some(frozen);
        self
    }
}

/// Stages a class passes through while it is being defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ClassStage {
    /// The body has been read and its declarations checked.
    Declared,
    /// Bases are linearized and the field tables merged.
    Merging,
    /// The merged table satisfies the ordering rule and limits.
    Validated,
    /// The class object exists and can be instantiated.
    Installed,
}

/// One annotated name in a class body.
#[derive(Debug)]
struct Member {
    name: String,
    annotation: Option<String>,
    field: Field,
}

/// A class body awaiting construction.
pub struct ClassDecl {
    name: String,
    bases: Vec<ClassRef>,
    members: Vec<Member>,
    options: ClassOptions,
    pre_init: Option<Arc<PreInitHook>>,
    chain_pre_init: bool,
    post_init: Option<Arc<PostInitHook>>,
    limits: SchemaLimits,
}

impl ClassDecl {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bases: Vec::new(),
            members: Vec::new(),
            options: ClassOptions::default(),
            pre_init: None,
            chain_pre_init: false,
            post_init: None,
            limits: SchemaLimits::default(),
        }
    }

    /// Appends a direct base. Bases are listed in declaration order.
    #[must_use]
    pub fn extends(mut self, base: &ClassRef) -> Self {
        self.bases.push(Arc::clone(base));
        self
    }

    /// Declares a field without a default.
    #[must_use]
    pub fn required(self, name: impl Into<String>, annotation: impl Into<String>) -> Self {
        self.member(name.into(), Some(annotation.into()), Field::required())
    }

    /// Declares a field whose literal default is `value`.
    #[must_use]
    pub fn with_default(self, name: impl Into<String>, annotation: impl Into<String>, value: impl Into<Value>) -> Self {
        self.member(name.into(), Some(annotation.into()), Field::with_default(value))
    }

    /// Declares a field configured by a descriptor.
    #[must_use]
    pub fn field(self, name: impl Into<String>, annotation: impl Into<String>, field: Field) -> Self {
        self.member(name.into(), Some(annotation.into()), field)
    }

    /// Declares a field configured by a descriptor, with no type annotation.
    #[must_use]
    pub fn untyped_field(self, name: impl Into<String>, field: Field) -> Self {
        self.member(name.into(), None, field)
    }

    fn member(mut self, name: String, annotation: Option<String>, field: Field) -> Self {
        self.members.push(Member {
            name,
            annotation,
            field,
        });
        self
    }

    /// Overrides the inherited frozen mode.
    #[must_use]
    pub fn frozen(mut self, frozen: bool) -> Self {
        self.options.frozen = Some(frozen);
        self
    }

    #[must_use]
    pub fn options(mut self, options: ClassOptions) -> Self {
        self.options = options;
        self
    }

    /// Installs a hook that receives the raw keyword mapping and returns the one
    /// construction should use. It replaces any inherited hook.
    #[must_use]
    pub fn pre_init(mut self, hook: impl Fn(Kwargs) -> RecordResult<Kwargs> + Send + Sync + 'static) -> Self {
        self.pre_init = Some(Arc::new(hook));
        self.chain_pre_init = false;
        self
    }

    /// Installs a hook that runs on the output of the inherited one.
    ///
    /// With no inherited hook this behaves like [`ClassDecl::pre_init`].
    #[must_use]
    pub fn extend_pre_init(
        mut self,
        hook: impl Fn(Kwargs) -> RecordResult<Kwargs> + Send + Sync + 'static,
    ) -> Self {
        self.pre_init = Some(Arc::new(hook));
        self.chain_pre_init = true;
        self
    }

    /// Installs a hook run after every field is assigned and before sealing.
    #[must_use]
    pub fn post_init(mut self, hook: impl Fn(&mut Instance) -> RecordResult<()> + Send + Sync + 'static) -> Self {
        self.post_init = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn limits(mut self, limits: SchemaLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Builds the class, logging each stage through [`LogTracer`].
    pub fn build(self) -> RecordResult<ClassRef> {
        self.build_traced(&mut LogTracer)
    }

    /// Builds the class, reporting each stage to `tracer`.
    pub fn build_traced(self, tracer: &mut impl ConstructionTracer) -> RecordResult<ClassRef> {
        let name = self.name.clone();
        self.construct(tracer).inspect_err(|err| tracer.on_class_rejected(&name, err))
    }

    fn construct(self, tracer: &mut impl ConstructionTracer) -> RecordResult<ClassRef> {
        let Self {
            name,
            bases,
            members,
            options,
            pre_init,
            chain_pre_init,
            post_init,
            limits,
        } = self;

        check_declaration(&name, &bases, &members)?;
        tracer.on_class_stage(&name, ClassStage::Declared);

        let ancestors = linearize(&name, &bases, &limits)?;
        let own_fields: FieldTable = members
            .into_iter()
            .map(|m| {
                let spec = m.field.resolve(&m.name, m.annotation, &name);
                (m.name, Arc::new(spec))
            })
            .collect();
        let fields = merge_fields(&ancestors, &own_fields);
        tracer.on_class_stage(&name, ClassStage::Merging);

        check_field_order(&name, &fields)?;
        if let Some(max) = limits.max_fields
            && fields.len() > max
        {
            return Err(RecordError::configuration(format!(
                "{name}: {} fields exceeds the limit of {max}",
                fields.len()
            )));
        }
        tracer.on_class_stage(&name, ClassStage::Validated);

        // Bases are non-empty after check_declaration, so the first base is the
        // nearest ancestor.
        let frozen = options.frozen.unwrap_or_else(|| bases[0].frozen);
        let positional = bases.iter().all(|base| base.root);
        let pre_init = match (pre_init, ancestors.iter().find_map(|c| c.pre_init.clone())) {
            (Some(own), Some(inherited)) if chain_pre_init => Some(chain_hooks(inherited, own)),
            (own, _) => own,
        };
        let class = Arc::new(RecordClass {
            name,
            uid: next_class_uid(),
            bases,
            ancestors,
            own_fields,
            fields,
            frozen,
            root: false,
            positional,
            pre_init,
            post_init,
        });
        tracer.on_class_stage(&class.name, ClassStage::Installed);
        Ok(class)
    }
}

impl fmt::Debug for ClassDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDecl")
            .field("name", &self.name)
            .field("bases", &self.bases.iter().map(|b| b.name()).collect::<Vec<_>>())
            .field("members", &self.members)
            .field("options", &self.options)
            .field("pre_init", &self.pre_init.is_some())
            .field("chain_pre_init", &self.chain_pre_init)
            .field("post_init", &self.post_init.is_some())
            .finish_non_exhaustive()
    }
}

fn next_class_uid() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c == '_' || c.is_alphabetic()) && chars.all(|c| c == '_' || c.is_alphanumeric())
}

fn check_declaration(name: &str, bases: &[ClassRef], members: &[Member]) -> RecordResult<()> {
    if !is_identifier(name) {
        return Err(RecordError::configuration(format!(
            "class name {name:?} is not a valid identifier"
        )));
    }
    if bases.is_empty() {
        return Err(RecordError::configuration(format!(
            "{name}: a record class needs at least one base"
        )));
    }
    for (i, base) in bases.iter().enumerate() {
        if bases[..i].iter().any(|earlier| earlier.uid == base.uid) {
            return Err(RecordError::configuration(format!(
                "{name}: duplicate base class {}",
                base.name
            )));
        }
    }
    for (i, member) in members.iter().enumerate() {
        if !is_identifier(&member.name) {
            return Err(RecordError::configuration(format!(
                "{name}: field name {:?} is not a valid identifier",
                member.name
            )));
        }
        if members[..i].iter().any(|earlier| earlier.name == member.name) {
            return Err(RecordError::configuration(format!(
                "{name}: field {:?} is declared more than once",
                member.name
            )));
        }
    }
    Ok(())
}

/// Computes the ancestors of a new class in method resolution order, excluding
/// the class itself.
/// Composes two pre-init hooks: `first` runs, then `then` sees its output.
fn chain_hooks(first: Arc<PreInitHook>, then: Arc<PreInitHook>) -> Arc<PreInitHook> {
    Arc::new(move |kwargs: Kwargs| then(first(kwargs)?))
}

fn linearize(name: &str, bases: &[ClassRef], limits: &SchemaLimits) -> RecordResult<Vec<ClassRef>> {
    let mut by_uid: AHashMap<u64, &ClassRef> = AHashMap::new();
    let mut sequences: Vec<SmallVec<[u64; 8]>> = Vec::with_capacity(bases.len() + 1);
    for base in bases {
        let mro_len = base.ancestors.len() + 1;
        if mro_len > limits.max_inheritance_depth {
            return Err(RecordError::configuration(format!(
                "{name}: inheritance chain too deep (maximum depth {})",
                limits.max_inheritance_depth
            )));
        }
        by_uid.insert(base.uid, base);
        for ancestor in &base.ancestors {
            by_uid.insert(ancestor.uid, ancestor);
        }
        sequences.push(base.mro_uids().collect());
    }
    sequences.push(bases.iter().map(|b| b.uid).collect());

    let mut merged: Vec<ClassRef> = Vec::new();
    loop {
        sequences.retain(|seq| !seq.is_empty());
        if sequences.is_empty() {
            break;
        }
        let head = sequences
            .iter()
            .map(|seq| seq[0])
            .find(|candidate| !sequences.iter().any(|seq| seq[1..].contains(candidate)));
        let Some(next) = head else {
            let names = bases.iter().map(|b| b.name.as_str()).collect::<Vec<_>>();
            return Err(RecordError::configuration(format!(
                "{name}: cannot create a consistent method resolution order for bases {}",
                names.join(", ")
            )));
        };
        if let Some(class) = by_uid.get(&next) {
            merged.push(Arc::clone(class));
        }
        if merged.len() + 1 > limits.max_mro_length {
            return Err(RecordError::configuration(format!(
                "{name}: method resolution order exceeds {} classes",
                limits.max_mro_length
            )));
        }
        for seq in &mut sequences {
            if seq.first() == Some(&next) {
                seq.remove(0);
            }
        }
    }
    Ok(merged)
}

/// Merges own fields over the ancestors' declarations.
///
/// Walks the MRO from the most basic class towards the new one. A name seen for
/// the first time is appended; a redeclared name replaces the earlier spec but
/// keeps its position.
fn merge_fields(ancestors: &[ClassRef], own_fields: &FieldTable) -> FieldTable {
    let mut merged = FieldTable::new();
    for class in ancestors.iter().rev() {
        for (name, spec) in &class.own_fields {
            merged.insert(name.clone(), Arc::clone(spec));
        }
    }
    for (name, spec) in own_fields {
        merged.insert(name.clone(), Arc::clone(spec));
    }
    merged
}

/// Enforces that no field without a default follows one with a default.
fn check_field_order(class_name: &str, fields: &FieldTable) -> RecordResult<()> {
    let mut first_default: Option<&str> = None;
    for (name, spec) in fields {
        match (spec.has_default(), first_default) {
            (true, None) => first_default = Some(name),
            (false, Some(after)) => return Err(RecordError::field_order(class_name, name, after)),
            _ => {}
        }
    }
    Ok(())
}

/// A record class: the resolved field table plus class-level behavior.
pub struct RecordClass {
    name: String,
    uid: u64,
    bases: Vec<ClassRef>,
    /// Ancestors in MRO order, excluding this class.
    ancestors: Vec<ClassRef>,
    own_fields: FieldTable,
    fields: FieldTable,
    frozen: bool,
    root: bool,
    /// Whether the constructor accepts positional arguments.
    positional: bool,
    pre_init: Option<Arc<PreInitHook>>,
    post_init: Option<Arc<PostInitHook>>,
}

impl RecordClass {
    fn root(name: &str, frozen: bool, bases: Vec<ClassRef>) -> Self {
        let ancestors = bases
            .iter()
            .flat_map(|b| std::iter::once(Arc::clone(b)).chain(b.ancestors.iter().cloned()))
            .collect();
        Self {
            name: name.to_owned(),
            uid: next_class_uid(),
            bases,
            ancestors,
            own_fields: FieldTable::new(),
            fields: FieldTable::new(),
            frozen,
            root: true,
            positional: true,
            pre_init: None,
            post_init: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Process-unique identity of this class.
    #[must_use]
    pub fn class_uid(&self) -> u64 {
        self.uid
    }

    /// Direct bases in declaration order.
    #[must_use]
    pub fn bases(&self) -> &[ClassRef] {
        &self.bases
    }

    /// Ancestors in method resolution order, excluding this class.
    #[must_use]
    pub fn ancestors(&self) -> &[ClassRef] {
        &self.ancestors
    }

    /// Class names in method resolution order, starting with this class.
    #[must_use]
    pub fn mro(&self) -> Vec<&str> {
        std::iter::once(self.name.as_str())
            .chain(self.ancestors.iter().map(|c| c.name.as_str()))
            .collect()
    }

    fn mro_uids(&self) -> impl Iterator<Item = u64> + '_ {
        std::iter::once(self.uid).chain(self.ancestors.iter().map(|c| c.uid))
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// True for the two root classes.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.root
    }

    /// Whether the constructor accepts positional arguments.
    #[must_use]
    pub fn accepts_positional(&self) -> bool {
        self.positional
    }

    /// The resolved field table, in construction order.
    #[must_use]
    pub fn fields(&self) -> &FieldTable {
        &self.fields
    }

    /// Fields declared by this class's own body, including redeclarations.
    #[must_use]
    pub fn own_fields(&self) -> &FieldTable {
        &self.own_fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Arc<FieldSpec>> {
        self.fields.get(name)
    }

    /// True when `other` is this class or one of its ancestors.
    #[must_use]
    pub fn is_subclass_of(&self, other: &RecordClass) -> bool {
        self.mro_uids().any(|uid| uid == other.uid)
    }

    /// The constructor signature implied by the field table.
    #[must_use]
    pub fn signature(&self) -> Signature {
        Signature::of(self)
    }

    /// Runs the pre-init hook in effect on `kwargs`, or returns them unchanged.
    pub fn apply_pre_init(&self, kwargs: Kwargs) -> RecordResult<Kwargs> {
        match self.pre_init_hook() {
            Some(hook) => hook(kwargs),
            None => Ok(kwargs),
        }
    }

    /// The pre-init hook in effect: this class's own, or the nearest ancestor's.
    pub(crate) fn pre_init_hook(&self) -> Option<&PreInitHook> {
        self.pre_init
            .as_deref()
            .or_else(|| self.ancestors.iter().find_map(|c| c.pre_init.as_deref()))
    }

    /// The post-init hook in effect: this class's own, or the nearest ancestor's.
    pub(crate) fn post_init_hook(&self) -> Option<&PostInitHook> {
        self.post_init
            .as_deref()
            .or_else(|| self.ancestors.iter().find_map(|c| c.post_init.as_deref()))
    }
}

impl fmt::Debug for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordClass")
            .field("name", &self.name)
            .field("mro", &self.mro())
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("frozen", &self.frozen)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class '{}'>", self.name)
    }
}

impl PartialEq for RecordClass {
    fn eq(&self, other: &Self) -> bool {
        self.uid == other.uid
    }
}

impl Eq for RecordClass {}

impl Hash for RecordClass {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uid.hash(state);
    }
}

static BASE_CLASS: LazyLock<ClassRef> = LazyLock::new(|| Arc::new(RecordClass::root("BaseClass", false, Vec::new())));

static FROZEN_BASE_CLASS: LazyLock<ClassRef> = LazyLock::new(|| {
    Arc::new(RecordClass::root(
        "FrozenBaseClass",
        true,
        vec![Arc::clone(&BASE_CLASS)],
    ))
});

/// The mutable root record class.
#[must_use]
pub fn base_class() -> ClassRef {
    Arc::clone(&BASE_CLASS)
}

/// The frozen root record class. It derives from [`base_class`].
#[must_use]
pub fn frozen_base_class() -> ClassRef {
    Arc::clone(&FROZEN_BASE_CLASS)
}
