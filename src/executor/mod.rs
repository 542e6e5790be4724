//! Resolve an operation into a response tree.
//!
//! Execution is organized around two trees. [`ExecutionNode`]s mirror the
//! request shape: which fields to fetch, with which (eagerly coerced)
//! arguments, memoized per runtime type so polymorphic subtrees are collected
//! once. [`ResultNode`]s mirror the response being built: each node records
//! its kind, value and whether the declared type required non-`null` at that
//! position, so a `null` can bubble up to the nearest nullable ancestor.
//!
//! One [`ExecuteNodeTask`] is dispatched per collected field. A task invokes
//! the field's resolver and completes the returned value against the declared
//! return type, recursing through lists and objects by collecting child
//! fields and dispatching more tasks.

use std::{
    collections::{HashSet, VecDeque},
    sync::{
        atomic::{AtomicBool, AtomicU8, Ordering},
        Arc, Condvar, Mutex, Weak,
    },
};

use arcstr::ArcStr;
use fnv::FnvHashMap;
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, trace};

use crate::{
    ast::{self, Definition, Document, Fragment, Operation, OperationType},
    error::{Error, ErrorKind, ErrorLocation, PathSegment, ResponsePath},
    position::Positioned,
    schema::{
        meta::{Field, MetaType, ObjectMeta},
        model::{Schema, TypeType},
    },
    value::{coercion, Object, Value, Variables},
};

/// The result of resolving the value of a field.
pub type FieldResult = Result<Value, Error>;

/// A resolver producing the value of a single field.
///
/// Receives the source value (the resolved value of the enclosing object) and
/// a [`ResolveInfo`] describing the position being resolved. Fields without a
/// resolver fall back to reading the equally-named property of the source.
pub trait Resolver: Send + Sync {
    /// Resolves the field value.
    fn resolve(&self, source: &Value, info: &ResolveInfo<'_, '_>) -> FieldResult;
}

impl<F> Resolver for F
where
    F: Fn(&Value, &ResolveInfo<'_, '_>) -> FieldResult + Send + Sync,
{
    fn resolve(&self, source: &Value, info: &ResolveInfo<'_, '_>) -> FieldResult {
        self(source, info)
    }
}

fn default_property_resolver(source: &Value, field_name: &str) -> Value {
    source
        .as_object_value()
        .and_then(|o| o.get_field_value(field_name))
        .cloned()
        .unwrap_or(Value::Null)
}

/// Everything a resolver can learn about the field it is resolving.
pub struct ResolveInfo<'i, 'a> {
    context: &'i ExecutionContext<'a>,
    node: &'i ExecutionNode<'a>,
    result: &'i ResultNode<'a>,
}

impl<'i, 'a> ResolveInfo<'i, 'a> {
    /// The schema the operation executes against.
    pub fn schema(&self) -> &'a Schema {
        self.context.schema()
    }

    /// The operation's variable values, with defaults applied.
    pub fn variables(&self) -> &'i Variables {
        self.context.variables()
    }

    /// The coerced argument values of the field.
    pub fn arguments(&self) -> &'i IndexMap<String, Value> {
        self.node.arguments()
    }

    /// The coerced value of a single argument.
    pub fn argument(&self, name: &str) -> Option<&'i Value> {
        self.node.arguments().get(name)
    }

    /// The name of the field being resolved.
    pub fn field_name(&self) -> &'i str {
        self.node.field.map(|f| f.name.as_str()).unwrap_or_default()
    }

    /// The response path of the field being resolved.
    pub fn response_path(&self) -> ResponsePath {
        self.result.path()
    }
}

/// A handle used to request cancellation of a running operation.
///
/// Cancellation is checked at every task's entry and before each descent into
/// a subtree: in-flight resolvers finish, pending tasks are discarded and the
/// response carries a single `operation canceled` error.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    canceled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Builds a new, un-canceled [`CancellationToken`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        debug!("operation cancellation requested");
        self.canceled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }
}

/// Shared state of a single operation execution.
///
/// Owns the error sink and the merged variable values; borrows the schema,
/// the operation and the root value for the duration of the run. Both the
/// execution and the result tree are released together with the context.
pub struct ExecutionContext<'a> {
    schema: &'a Schema,
    operation: &'a Positioned<Operation>,
    fragments: FnvHashMap<&'a str, &'a Fragment>,
    variables: Variables,
    root_value: &'a Value,
    errors: Mutex<Vec<Error>>,
    cancel: CancellationToken,
}

impl<'a> ExecutionContext<'a> {
    fn new(
        schema: &'a Schema,
        operation: &'a Positioned<Operation>,
        fragments: FnvHashMap<&'a str, &'a Fragment>,
        variables: &Variables,
        root_value: &'a Value,
        cancel: CancellationToken,
    ) -> Self {
        // Merge in default values of variables the request did not provide.
        let mut variables = variables.clone();
        if let Some(definitions) = &operation.item.variable_definitions {
            let no_vars = Variables::new();
            for (name, definition) in &definitions.item.items {
                if variables.contains_key(name.item.as_str()) {
                    continue;
                }
                if let Some(default) = &definition.default_value {
                    if let Some(value) = default.item.resolve(&no_vars) {
                        variables.insert(name.item.to_string(), value);
                    }
                }
            }
        }

        Self {
            schema,
            operation,
            fragments,
            variables,
            root_value,
            errors: Mutex::new(Vec::new()),
            cancel,
        }
    }

    /// The schema the operation executes against.
    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// The operation being executed.
    pub fn operation(&self) -> &'a Positioned<Operation> {
        self.operation
    }

    /// The variable values of the run, with defaults applied.
    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    /// The root source value the top-level resolvers receive.
    pub fn root_value(&self) -> &'a Value {
        self.root_value
    }

    /// Looks up a fragment definition by name.
    pub fn fragment(&self, name: &str) -> Option<&'a Fragment> {
        self.fragments.get(name).copied()
    }

    /// Appends an error to the run.
    pub fn append_error(&self, error: Error) {
        debug!(error = error.message(), "appending execution error");
        self.errors.lock().unwrap().push(error);
    }

    /// Whether cancellation of this run has been requested.
    pub fn is_canceled(&self) -> bool {
        self.cancel.is_canceled()
    }

    fn into_errors(self) -> Vec<Error> {
        self.errors.into_inner().unwrap()
    }
}

/// A node of the request-shape tree: one field to fetch, with the AST
/// selections that coalesced into it and its eagerly coerced arguments.
///
/// Child nodes are collected lazily, memoized per runtime type, because
/// polymorphic types can require different child sets.
#[derive(Debug)]
pub struct ExecutionNode<'a> {
    parent: Option<Weak<ExecutionNode<'a>>>,
    definitions: Vec<&'a Positioned<ast::Field>>,
    field: Option<&'a Field>,
    object_type: Option<&'a ObjectMeta>,
    argument_values: IndexMap<String, Value>,
    children: Mutex<FnvHashMap<usize, Arc<Vec<Arc<ExecutionNode<'a>>>>>>,
}

impl<'a> ExecutionNode<'a> {
    fn new_root() -> Arc<Self> {
        Arc::new(Self {
            parent: None,
            definitions: Vec::new(),
            field: None,
            object_type: None,
            argument_values: IndexMap::new(),
            children: Mutex::new(FnvHashMap::default()),
        })
    }

    /// Whether this is the root node of the operation.
    pub fn is_root(&self) -> bool {
        self.definitions.is_empty()
    }

    /// The node this one was collected under, unless it is the root. The
    /// back-reference is non-owning.
    pub fn parent(&self) -> Option<Arc<ExecutionNode<'a>>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    fn is_typename(&self) -> bool {
        self.field.is_none() && !self.definitions.is_empty()
    }

    /// The key under which this node's value appears in the response.
    pub fn response_key(&self) -> Option<&'a ArcStr> {
        self.definitions.first().map(|d| d.item.response_key())
    }

    /// The coerced argument values of this node's field.
    pub fn arguments(&self) -> &IndexMap<String, Value> {
        &self.argument_values
    }

    /// The schema field definition backing this node, absent on the root and
    /// on `__typename` selections.
    pub fn field_definition(&self) -> Option<&'a Field> {
        self.field
    }

    fn requires_non_null(&self) -> bool {
        // `__typename` is implicitly `String!`.
        self.field
            .map(|f| f.field_type.is_non_null())
            .unwrap_or(true)
    }
}

/// The kind of a [`ResultNode`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum ResultKind {
    /// No value has been produced yet.
    Unresolved = 0,
    /// The node resolved to `null`.
    Nil = 1,
    /// The node resolved to a scalar or enum value.
    Leaf = 2,
    /// The node resolved to a list of values.
    List = 3,
    /// The node resolved to an object of fields.
    Object = 4,
}

impl ResultKind {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Unresolved,
            1 => Self::Nil,
            2 => Self::Leaf,
            3 => Self::List,
            4 => Self::Object,
            _ => unreachable!("invalid result kind discriminant"),
        }
    }
}

#[derive(Debug)]
enum ResultPayload<'a> {
    Unset,
    Leaf(Value),
    List(Vec<Arc<ResultNode<'a>>>),
    Object(
        Arc<Vec<Arc<ExecutionNode<'a>>>>,
        Vec<Arc<ResultNode<'a>>>,
    ),
}

/// A node of the response tree being built.
///
/// The kind transitions monotonically from [`ResultKind::Unresolved`] to one
/// terminal kind; the only rewrite is the null-bubbling rule, which replaces
/// any kind with [`ResultKind::Nil`]. Once a node is `Nil` it stays `Nil`.
#[derive(Debug)]
pub struct ResultNode<'a> {
    parent: Option<Weak<ResultNode<'a>>>,
    segment: Option<PathSegment>,
    is_non_null: bool,
    kind: AtomicU8,
    payload: Mutex<ResultPayload<'a>>,
}

impl<'a> ResultNode<'a> {
    fn new_root() -> Arc<Self> {
        Arc::new(Self {
            parent: None,
            segment: None,
            is_non_null: false,
            kind: AtomicU8::new(ResultKind::Unresolved as u8),
            payload: Mutex::new(ResultPayload::Unset),
        })
    }

    fn new_child(parent: &Arc<Self>, segment: PathSegment, is_non_null: bool) -> Arc<Self> {
        Arc::new(Self {
            parent: Some(Arc::downgrade(parent)),
            segment: Some(segment),
            is_non_null,
            kind: AtomicU8::new(ResultKind::Unresolved as u8),
            payload: Mutex::new(ResultPayload::Unset),
        })
    }

    /// The current kind of this node.
    pub fn kind(&self) -> ResultKind {
        ResultKind::from_u8(self.kind.load(Ordering::Acquire))
    }

    /// Whether this node has resolved to `null`.
    pub fn is_nil(&self) -> bool {
        self.kind() == ResultKind::Nil
    }

    /// Whether the declared type required non-`null` at this position.
    pub fn is_non_null(&self) -> bool {
        self.is_non_null
    }

    fn parent(&self) -> Option<Arc<ResultNode<'a>>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    fn make_nil(&self) {
        let mut payload = self.payload.lock().unwrap();
        self.kind.store(ResultKind::Nil as u8, Ordering::Release);
        *payload = ResultPayload::Unset;
    }

    fn try_set(&self, kind: ResultKind, payload: ResultPayload<'a>) -> bool {
        let mut guard = self.payload.lock().unwrap();
        if self
            .kind
            .compare_exchange(
                ResultKind::Unresolved as u8,
                kind as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return false;
        }
        *guard = payload;
        true
    }

    /// The response path of this node, computed by walking the parent chain.
    pub fn path(&self) -> ResponsePath {
        let mut segments = Vec::new();
        if let Some(segment) = &self.segment {
            segments.push(segment.clone());
        }
        let mut current = self.parent();
        while let Some(node) = current {
            if let Some(segment) = &node.segment {
                segments.push(segment.clone());
            }
            current = node.parent();
        }
        segments.reverse();

        let mut path = ResponsePath::new();
        for segment in segments {
            match segment {
                PathSegment::Field(name) => path.append_field_name(name),
                PathSegment::Index(index) => path.append_index(index),
            }
        }
        path
    }

    /// Copies the completed subtree under this node into a [`Value`].
    pub fn to_value(&self) -> Value {
        match self.kind() {
            ResultKind::Unresolved | ResultKind::Nil => Value::Null,
            ResultKind::Leaf => {
                let payload = self.payload.lock().unwrap();
                match &*payload {
                    ResultPayload::Leaf(value) => value.clone(),
                    _ => Value::Null,
                }
            }
            ResultKind::List => {
                let payload = self.payload.lock().unwrap();
                match &*payload {
                    ResultPayload::List(children) => {
                        Value::List(children.iter().map(|c| c.to_value()).collect())
                    }
                    _ => Value::Null,
                }
            }
            ResultKind::Object => {
                let payload = self.payload.lock().unwrap();
                match &*payload {
                    ResultPayload::Object(nodes, values) => {
                        let mut object = Object::with_capacity(nodes.len());
                        for (node, value) in nodes.iter().zip(values) {
                            if let Some(key) = node.response_key() {
                                object.add_field(key.as_str(), value.to_value());
                            }
                        }
                        Value::Object(object)
                    }
                    _ => Value::Null,
                }
            }
        }
    }
}

impl Serialize for ResultNode<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Promotes a `null` at `node` through every non-`null` ancestor, up to the
/// nearest nullable one.
fn bubble_nil(node: &Arc<ResultNode<'_>>) {
    let mut current = Arc::clone(node);
    loop {
        current.make_nil();
        if !current.is_non_null {
            break;
        }
        match current.parent() {
            Some(parent) => current = parent,
            // Bubbling reached the root: `data` is null.
            None => break,
        }
    }
}

/// Schedules field-resolution tasks and records errors against the run.
///
/// The serial implementation runs tasks in FIFO order and is the default; it
/// yields deterministic error order. The parallel implementation restores
/// determinism by sorting errors by response path at completion.
pub trait Dispatcher<'e, 'a>: Sync {
    /// Enqueues a task.
    fn dispatch(&self, task: ExecuteNodeTask<'e, 'a>);

    /// Records an error against the run.
    fn append_error(&self, error: Error);
}

struct SerialDispatcher<'e, 'a> {
    ctx: &'e ExecutionContext<'a>,
    queue: Mutex<VecDeque<ExecuteNodeTask<'e, 'a>>>,
}

impl<'e, 'a> SerialDispatcher<'e, 'a> {
    fn new(ctx: &'e ExecutionContext<'a>) -> Self {
        Self {
            ctx,
            queue: Mutex::new(VecDeque::new()),
        }
    }

    fn run_to_completion(&self) {
        loop {
            let task = self.queue.lock().unwrap().pop_front();
            match task {
                Some(task) => task.run(self),
                None => break,
            }
        }
    }
}

impl<'e, 'a> Dispatcher<'e, 'a> for SerialDispatcher<'e, 'a> {
    fn dispatch(&self, task: ExecuteNodeTask<'e, 'a>) {
        self.queue.lock().unwrap().push_back(task);
    }

    fn append_error(&self, error: Error) {
        self.ctx.append_error(error);
    }
}

struct ParallelState<'e, 'a> {
    queue: VecDeque<ExecuteNodeTask<'e, 'a>>,
    running: usize,
}

struct ParallelDispatcher<'e, 'a> {
    ctx: &'e ExecutionContext<'a>,
    state: Mutex<ParallelState<'e, 'a>>,
    work_available: Condvar,
}

impl<'e, 'a> ParallelDispatcher<'e, 'a> {
    fn new(ctx: &'e ExecutionContext<'a>) -> Self {
        Self {
            ctx,
            state: Mutex::new(ParallelState {
                queue: VecDeque::new(),
                running: 0,
            }),
            work_available: Condvar::new(),
        }
    }

    fn run_to_completion(&self, workers: usize) {
        std::thread::scope(|scope| {
            for _ in 0..workers.max(1) {
                scope.spawn(|| self.worker_loop());
            }
        });
    }

    fn worker_loop(&self) {
        loop {
            let task = {
                let mut state = self.state.lock().unwrap();
                loop {
                    if let Some(task) = state.queue.pop_front() {
                        state.running += 1;
                        break task;
                    }
                    if state.running == 0 {
                        // Queue drained and nothing in flight: all done.
                        self.work_available.notify_all();
                        return;
                    }
                    state = self.work_available.wait(state).unwrap();
                }
            };

            task.run(self);

            let mut state = self.state.lock().unwrap();
            state.running -= 1;
            if state.running == 0 && state.queue.is_empty() {
                self.work_available.notify_all();
            }
        }
    }
}

impl<'e, 'a> Dispatcher<'e, 'a> for ParallelDispatcher<'e, 'a> {
    fn dispatch(&self, task: ExecuteNodeTask<'e, 'a>) {
        self.state.lock().unwrap().queue.push_back(task);
        self.work_available.notify_one();
    }

    fn append_error(&self, error: Error) {
        self.ctx.append_error(error);
    }
}

/// Collects the ordered child [`ExecutionNode`]s to resolve for an object of
/// `runtime_type` under `parent`.
///
/// The result is memoized on the parent, keyed by the runtime type's
/// identity. Invoking the collection twice for the same (parent, runtime
/// type) yields the same list.
fn collect_fields<'a>(
    ctx: &ExecutionContext<'a>,
    parent: &Arc<ExecutionNode<'a>>,
    runtime_type: &'a ObjectMeta,
) -> Result<Arc<Vec<Arc<ExecutionNode<'a>>>>, Error> {
    let key = runtime_type as *const ObjectMeta as usize;

    let mut children = parent.children.lock().unwrap();
    if let Some(nodes) = children.get(&key) {
        return Ok(Arc::clone(nodes));
    }

    let nodes = build_child_execution_nodes(ctx, parent, runtime_type)?;
    children.insert(key, Arc::clone(&nodes));
    Ok(nodes)
}

struct NodeBuilder<'a> {
    definitions: Vec<&'a Positioned<ast::Field>>,
    field: Option<&'a Field>,
    argument_values: IndexMap<String, Value>,
}

/// Builds [`ExecutionNode`]s for the selection sets of `parent` under
/// `runtime_type`, walking fragments depth-first in textual order.
fn build_child_execution_nodes<'a>(
    ctx: &ExecutionContext<'a>,
    parent: &Arc<ExecutionNode<'a>>,
    runtime_type: &'a ObjectMeta,
) -> Result<Arc<Vec<Arc<ExecutionNode<'a>>>>, Error> {
    // Prevents a named fragment from being applied twice in a selection set.
    let mut visited_fragments: HashSet<&'a str> = HashSet::new();

    // Maps response keys to node indexes, grouping field definitions when two
    // selections share a response key.
    let mut keyed: IndexMap<&'a str, usize> = IndexMap::new();
    let mut builders: Vec<NodeBuilder<'a>> = Vec::new();

    // Stack of selection sets pending processing, with a resume index each.
    let mut stack: Vec<(&'a [ast::Selection], usize)> = Vec::new();

    if parent.is_root() {
        stack.push((&ctx.operation().item.selection_set[..], 0));
    } else {
        // LIFO stack, so place the selection sets in reverse order.
        for definition in parent.definitions.iter().rev() {
            if let Some(selection_set) = &definition.item.selection_set {
                stack.push((&selection_set[..], 0));
            }
        }
    }

    loop {
        let Some(frame) = stack.last_mut() else {
            break;
        };
        let (selections, index) = (frame.0, frame.1);
        if index >= selections.len() {
            stack.pop();
            continue;
        }
        frame.1 += 1;
        let selection = &selections[index];

        // Check @skip and @include.
        if !coercion::should_include(ctx.schema(), selection.directives(), ctx.variables())? {
            continue;
        }

        match selection {
            ast::Selection::Field(positioned_field) => {
                let field = &positioned_field.item;
                let response_key = field.response_key().as_str();

                if let Some(&existing) = keyed.get(response_key) {
                    // A field with the same response key was selected before.
                    // Append the definition to the same node to coalesce
                    // their selection sets.
                    builders[existing].definitions.push(positioned_field);
                    continue;
                }

                if field.name.item.as_str() == "__typename" {
                    keyed.insert(response_key, builders.len());
                    builders.push(NodeBuilder {
                        definitions: vec![positioned_field],
                        field: None,
                        argument_values: IndexMap::new(),
                    });
                    continue;
                }

                let Some(field_def) =
                    find_field_def(ctx.schema(), runtime_type, field.name.item.as_str())
                else {
                    // The runtime type does not declare the field: skip it
                    // without an error.
                    continue;
                };

                let argument_values = coercion::argument_values(
                    ctx.schema(),
                    &field_def.arguments,
                    field.arguments.as_ref(),
                    ctx.variables(),
                    &positioned_field.position,
                )?;

                keyed.insert(response_key, builders.len());
                builders.push(NodeBuilder {
                    definitions: vec![positioned_field],
                    field: Some(field_def),
                    argument_values,
                });
            }

            ast::Selection::InlineFragment(positioned_fragment) => {
                let fragment = &positioned_fragment.item;
                if let Some(condition) = &fragment.type_condition {
                    if !type_condition_satisfied(
                        ctx.schema(),
                        condition.item.as_str(),
                        runtime_type,
                    ) {
                        continue;
                    }
                }
                // Process the fragment's selections before the next sibling,
                // keeping depth-first textual order.
                stack.push((&fragment.selection_set[..], 0));
            }

            ast::Selection::FragmentSpread(positioned_spread) => {
                let name = positioned_spread.item.name.item.as_str();
                if !visited_fragments.insert(name) {
                    continue;
                }
                let Some(fragment) = ctx.fragment(name) else {
                    continue;
                };
                if !type_condition_satisfied(
                    ctx.schema(),
                    fragment.type_condition.item.as_str(),
                    runtime_type,
                ) {
                    continue;
                }
                stack.push((&fragment.selection_set[..], 0));
            }
        }
    }

    let parent_weak = Arc::downgrade(parent);
    let nodes = builders
        .into_iter()
        .map(|builder| {
            Arc::new(ExecutionNode {
                parent: Some(parent_weak.clone()),
                definitions: builder.definitions,
                field: builder.field,
                object_type: Some(runtime_type),
                argument_values: builder.argument_values,
                children: Mutex::new(FnvHashMap::default()),
            })
        })
        .collect();

    Ok(Arc::new(nodes))
}

/// Looks up a field on the given type.
///
/// `__typename` is handled before lookup, since it can be queried on any
/// type. `__schema` and `__type` are meta fields of the query root only.
fn find_field_def<'a>(
    schema: &'a Schema,
    parent_type: &'a ObjectMeta,
    field_name: &str,
) -> Option<&'a Field> {
    if (field_name == "__schema" || field_name == "__type") && !schema.is_query_root(parent_type) {
        return None;
    }
    parent_type.field_by_name(field_name)
}

/// Determines if a type condition is satisfied by the given runtime type:
/// either the named type is the runtime type itself, or the runtime type is
/// one of its possible types.
fn type_condition_satisfied(
    schema: &Schema,
    type_condition: &str,
    runtime_type: &ObjectMeta,
) -> bool {
    let Some(conditional_type) = schema.concrete_type_by_name(type_condition) else {
        return false;
    };

    if let Some(object) = conditional_type.as_object() {
        return std::ptr::eq(object, runtime_type);
    }

    schema.is_possible_type(conditional_type, runtime_type)
}

/// Allocates [`ResultNode`]s for `child_nodes` and dispatches one task per
/// node to resolve the fields of an object value.
fn dispatch_tasks_for_object<'e, 'a>(
    ctx: &'e ExecutionContext<'a>,
    dispatcher: &dyn Dispatcher<'e, 'a>,
    result: &Arc<ResultNode<'a>>,
    child_nodes: &Arc<Vec<Arc<ExecutionNode<'a>>>>,
    source: Arc<Value>,
) {
    let field_values: Vec<Arc<ResultNode<'a>>> = child_nodes
        .iter()
        .map(|node| {
            let key = node
                .response_key()
                .map(|k| k.to_string())
                .unwrap_or_default();
            ResultNode::new_child(result, PathSegment::Field(key), node.requires_non_null())
        })
        .collect();

    if !result.try_set(
        ResultKind::Object,
        ResultPayload::Object(Arc::clone(child_nodes), field_values.clone()),
    ) {
        // A null already bubbled through this node; the subtree is moot.
        return;
    }

    for (node, node_result) in child_nodes.iter().zip(field_values) {
        dispatcher.dispatch(ExecuteNodeTask {
            ctx,
            node: Arc::clone(node),
            result: node_result,
            source: Arc::clone(&source),
        });
    }
}

/// A scheduled resolution of one field: runs the resolver and completes the
/// returned value into the target [`ResultNode`].
pub struct ExecuteNodeTask<'e, 'a> {
    ctx: &'e ExecutionContext<'a>,
    node: Arc<ExecutionNode<'a>>,
    result: Arc<ResultNode<'a>>,
    source: Arc<Value>,
}

impl<'e, 'a> ExecuteNodeTask<'e, 'a> {
    /// Runs the task. The field value is written into the task's result node
    /// and errors are recorded against the run, so nothing is returned.
    pub fn run(self, dispatcher: &dyn Dispatcher<'e, 'a>) {
        let ctx = self.ctx;
        if ctx.is_canceled() {
            return;
        }
        if self.result.parent().is_some_and(|p| p.is_nil()) {
            return;
        }

        if self.node.is_typename() {
            if let Some(object_type) = self.node.object_type {
                self.result.try_set(
                    ResultKind::Leaf,
                    ResultPayload::Leaf(Value::scalar(object_type.name.as_str())),
                );
            }
            return;
        }

        let Some(field) = self.node.field else {
            dispatcher.append_error(
                Error::new("execution node is missing its field definition")
                    .with_kind(ErrorKind::Internal),
            );
            return;
        };

        trace!(field = field.name.as_str(), "resolving field");

        let info = ResolveInfo {
            context: ctx,
            node: &self.node,
            result: &self.result,
        };
        let resolved = match field.resolver() {
            Some(resolver) => resolver.resolve(&self.source, &info),
            None => Ok(default_property_resolver(&self.source, field.name.as_str())),
        };

        match resolved {
            Ok(value) => match ctx.schema().make_type(&field.field_type) {
                Ok(return_type) => {
                    self.complete_value(dispatcher, &return_type, &self.result, value)
                }
                Err(err) => self.handle_node_error(dispatcher, err, &self.result),
            },
            Err(err) => self.handle_node_error(dispatcher, err, &self.result),
        }
    }

    fn parent_type_name(&self) -> &str {
        self.node
            .object_type
            .map(|o| o.name.as_str())
            .unwrap_or_default()
    }

    fn field_name(&self) -> &str {
        self.node.field.map(|f| f.name.as_str()).unwrap_or_default()
    }

    /// Records `error` against the run, attaching the source locations of
    /// every coalesced definition and the response path of `result`, and
    /// nulls the result.
    fn handle_node_error(
        &self,
        dispatcher: &dyn Dispatcher<'e, 'a>,
        error: Error,
        result: &Arc<ResultNode<'a>>,
    ) {
        let locations: Vec<ErrorLocation> = self
            .node
            .definitions
            .iter()
            .map(|d| ErrorLocation::from(&d.position))
            .collect();

        let mut error = error;
        error.set_locations(locations);
        error.set_path(result.path());
        error.ensure_kind(ErrorKind::Execution);

        bubble_nil(result);
        dispatcher.append_error(error);
    }

    /// Value completion: ensures the value resolved from the field resolver
    /// adheres to the expected return type.
    fn complete_value(
        &self,
        dispatcher: &dyn Dispatcher<'e, 'a>,
        return_type: &TypeType<'a>,
        result: &Arc<ResultNode<'a>>,
        value: Value,
    ) {
        match return_type {
            TypeType::NonNull(_) | TypeType::List(_) => {
                self.complete_wrapping_value(dispatcher, return_type, result, value);
            }
            TypeType::Concrete(_) => {
                self.complete_non_wrapping_value(dispatcher, return_type, result, value);
            }
        }
    }

    /// Completes a value of a non-`null` or list type.
    ///
    /// Nested wrapping types are processed through a local work queue rather
    /// than recursion, to bound stack depth on deeply nested lists.
    fn complete_wrapping_value(
        &self,
        dispatcher: &dyn Dispatcher<'e, 'a>,
        return_type: &TypeType<'a>,
        result: &Arc<ResultNode<'a>>,
        value: Value,
    ) {
        struct ValueNode<'t, 'a> {
            return_type: &'t TypeType<'a>,
            result: Arc<ResultNode<'a>>,
            value: Value,
        }

        let mut queue = VecDeque::new();
        queue.push_back(ValueNode {
            return_type,
            result: Arc::clone(result),
            value,
        });

        while let Some(ValueNode {
            return_type,
            result,
            value,
        }) = queue.pop_front()
        {
            if self.ctx.is_canceled() {
                return;
            }
            // If the parent was resolved to nil, this work is moot.
            if result.parent().is_some_and(|p| p.is_nil()) {
                continue;
            }

            let (inner_type, non_null_required) = match return_type {
                TypeType::NonNull(inner) => (&**inner, true),
                other => (other, false),
            };

            if value.is_null() {
                if non_null_required {
                    self.handle_node_error(
                        dispatcher,
                        Error::new(format!(
                            "Cannot return null for non-nullable field {}.{}.",
                            self.parent_type_name(),
                            self.field_name(),
                        )),
                        &result,
                    );
                } else {
                    result.make_nil();
                }
                continue;
            }

            let TypeType::List(element_type) = inner_type else {
                self.complete_non_wrapping_value(dispatcher, inner_type, &result, value);
                continue;
            };

            let Value::List(items) = value else {
                self.handle_node_error(
                    dispatcher,
                    Error::new(format!(
                        "Expected Iterable, but did not find one for field {}.{}.",
                        self.parent_type_name(),
                        self.field_name(),
                    )),
                    &result,
                );
                continue;
            };

            let element_non_null = matches!(&**element_type, TypeType::NonNull(_));
            let element_wrapping =
                matches!(&**element_type, TypeType::NonNull(_) | TypeType::List(_));

            let children: Vec<Arc<ResultNode<'a>>> = (0..items.len())
                .map(|index| {
                    ResultNode::new_child(&result, PathSegment::Index(index), element_non_null)
                })
                .collect();

            if !result.try_set(ResultKind::List, ResultPayload::List(children.clone())) {
                continue;
            }

            if element_wrapping {
                for (child, item) in children.iter().zip(items) {
                    queue.push_back(ValueNode {
                        return_type: element_type,
                        result: Arc::clone(child),
                        value: item,
                    });
                }
            } else {
                // Elements here are nullable (a non-null item type takes the
                // queue path above), so an element failure nulls only its own
                // entry and the remaining elements still complete.
                for (child, item) in children.iter().zip(items) {
                    self.complete_non_wrapping_value(dispatcher, element_type, child, item);
                }
            }
        }
    }

    fn complete_non_wrapping_value(
        &self,
        dispatcher: &dyn Dispatcher<'e, 'a>,
        return_type: &TypeType<'a>,
        result: &Arc<ResultNode<'a>>,
        value: Value,
    ) {
        // Non-null types are already unwrapped by complete_wrapping_value.
        if value.is_null() {
            result.make_nil();
            return;
        }

        let TypeType::Concrete(meta) = return_type else {
            self.handle_node_error(
                dispatcher,
                Error::new("wrapping type reached non-wrapping completion")
                    .with_kind(ErrorKind::Internal),
                result,
            );
            return;
        };

        match meta {
            MetaType::Scalar(scalar) => {
                let coerced = scalar.coerce_result(&value);
                self.complete_leaf_value(dispatcher, scalar.name.as_str(), &value, coerced, result)
            }
            MetaType::Enum(enum_meta) => {
                let coerced = enum_meta.coerce_result(&value);
                self.complete_leaf_value(
                    dispatcher,
                    enum_meta.name.as_str(),
                    &value,
                    coerced,
                    result,
                )
            }
            MetaType::Object(object_type) => {
                self.complete_object_value(dispatcher, object_type, result, value)
            }
            MetaType::Interface(_) | MetaType::Union(_) => {
                self.complete_abstract_value(dispatcher, meta, result, value)
            }
            MetaType::InputObject(_) => {
                self.handle_node_error(
                    dispatcher,
                    Error::new(format!(
                        "Cannot complete value of unexpected type \"{}\".",
                        meta.name(),
                    )),
                    result,
                );
            }
        }
    }

    fn complete_leaf_value(
        &self,
        dispatcher: &dyn Dispatcher<'e, 'a>,
        type_name: &str,
        original: &Value,
        coerced: Result<Value, Error>,
        result: &Arc<ResultNode<'a>>,
    ) {
        match coerced {
            Ok(value) => {
                result.try_set(ResultKind::Leaf, ResultPayload::Leaf(value));
            }
            Err(err) => {
                let err = if err.kind() == ErrorKind::Coercion {
                    err
                } else {
                    Error::new(format!(
                        "Expected a value of type \"{type_name}\" but received: {original}",
                    ))
                    .with_kind(ErrorKind::Coercion)
                    .caused_by(err)
                };
                self.handle_node_error(dispatcher, err, result);
            }
        }
    }

    fn complete_object_value(
        &self,
        dispatcher: &dyn Dispatcher<'e, 'a>,
        object_type: &'a ObjectMeta,
        result: &Arc<ResultNode<'a>>,
        value: Value,
    ) {
        match collect_fields(self.ctx, &self.node, object_type) {
            Ok(child_nodes) => {
                dispatch_tasks_for_object(
                    self.ctx,
                    dispatcher,
                    result,
                    &child_nodes,
                    Arc::new(value),
                );
            }
            Err(err) => {
                self.handle_node_error(dispatcher, err, result);
            }
        }
    }

    /// Resolves the concrete object type of a union- or interface-typed
    /// value, then completes it as an object of that type.
    fn complete_abstract_value(
        &self,
        dispatcher: &dyn Dispatcher<'e, 'a>,
        abstract_type: &'a MetaType,
        result: &Arc<ResultNode<'a>>,
        value: Value,
    ) {
        let schema = self.ctx.schema();

        let resolved_name = match abstract_type {
            MetaType::Interface(interface) => interface.resolve_type(&value),
            MetaType::Union(union) => union.resolve_type(&value),
            _ => None,
        };

        let object_type = match resolved_name {
            Some(name) => schema
                .concrete_type_by_name(name.as_str())
                .and_then(MetaType::as_object),
            // Without a type resolver, probe each possible type.
            None => schema
                .possible_types(abstract_type)
                .into_iter()
                .find(|candidate| candidate.probe_type(&value) == Some(true)),
        };

        match object_type {
            Some(object_type) if schema.is_possible_type(abstract_type, object_type) => {
                self.complete_object_value(dispatcher, object_type, result, value)
            }
            _ => {
                self.handle_node_error(
                    dispatcher,
                    Error::new(format!(
                        "Abstract type \"{}\" could not resolve a concrete type for field {}.{}.",
                        abstract_type.name(),
                        self.parent_type_name(),
                        self.field_name(),
                    )),
                    result,
                );
            }
        }
    }
}

/// How field-resolution tasks are scheduled.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ExecutionStrategy {
    /// Tasks run one at a time in FIFO order. Deterministic error order.
    #[default]
    Serial,

    /// Tasks run on a pool of worker threads. Errors are sorted by response
    /// path at completion. Top-level mutation fields are still serialized.
    Parallel {
        /// Number of worker threads.
        workers: usize,
    },
}

/// The outcome of executing an operation: the response tree and the ordered
/// list of execution errors.
#[derive(Debug)]
pub struct ExecutionResult<'a> {
    data: Option<Arc<ResultNode<'a>>>,
    errors: Vec<Error>,
}

impl<'a> ExecutionResult<'a> {
    /// The root of the response tree, absent only on total pre-execution
    /// failure.
    pub fn data(&self) -> Option<&ResultNode<'a>> {
        self.data.as_deref()
    }

    /// The errors recorded during execution.
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    /// Copies the response tree into a [`Value`]; `null` when bubbling
    /// reached the root.
    pub fn data_to_value(&self) -> Value {
        self.data
            .as_ref()
            .map(|data| data.to_value())
            .unwrap_or(Value::Null)
    }
}

impl Serialize for ExecutionResult<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(data) = &self.data {
            map.serialize_entry("data", data.as_ref())?;
        }
        if !self.errors.is_empty() {
            map.serialize_entry("errors", &self.errors)?;
        }
        map.end()
    }
}

/// Finds the operation to execute in `document`.
///
/// Without an `operation_name`, the document must contain exactly one
/// operation.
pub fn get_operation<'d>(
    document: &'d Document,
    operation_name: Option<&str>,
) -> Result<&'d Positioned<Operation>, Error> {
    let mut operation = None;
    for definition in document {
        if let Definition::Operation(op) = definition {
            if operation_name.is_none() && operation.is_some() {
                return Err(Error::new(
                    "Must provide operation name if query contains multiple operations",
                )
                .with_kind(ErrorKind::Validation));
            }

            let matches = operation_name.is_none()
                || op.item.name.as_ref().map(|s| s.item.as_str()) == operation_name;
            if matches {
                operation = Some(op);
            }
        }
    }

    operation.ok_or_else(|| {
        let message = match operation_name {
            Some(name) => format!("Unknown operation named \"{name}\""),
            None => "Must provide an operation".into(),
        };
        Error::new(message).with_kind(ErrorKind::Validation)
    })
}

fn check_subscription_selection(operation: &Positioned<Operation>) -> Result<(), Error> {
    if operation.item.selection_set.len() == 1 {
        return Ok(());
    }
    let message = match &operation.item.name {
        Some(name) => format!(
            "Subscription \"{}\" must select only one top level field.",
            name.item,
        ),
        None => "Anonymous Subscription must select only one top level field.".into(),
    };
    Err(Error::new(message)
        .at(&operation.position)
        .with_kind(ErrorKind::Validation))
}

fn sort_errors(errors: &mut [Error]) {
    use std::cmp::Ordering as CmpOrdering;

    errors.sort_by(|a, b| match (a.path(), b.path()) {
        (None, None) => a.locations().cmp(b.locations()),
        (None, Some(_)) => CmpOrdering::Less,
        (Some(_), None) => CmpOrdering::Greater,
        (Some(pa), Some(pb)) => pa.cmp(pb).then_with(|| a.locations().cmp(b.locations())),
    });
}

/// Executes an operation serially against `schema`.
///
/// `variables` must already be shape-verified; `root_value` is handed to the
/// top-level resolvers as their source.
pub fn execute<'a>(
    schema: &'a Schema,
    document: &'a Document,
    operation_name: Option<&str>,
    variables: &Variables,
    root_value: &'a Value,
) -> Result<ExecutionResult<'a>, Error> {
    execute_with(
        schema,
        document,
        operation_name,
        variables,
        root_value,
        ExecutionStrategy::Serial,
        CancellationToken::new(),
    )
}

/// Executes an operation with an explicit scheduling strategy and
/// cancellation token.
///
/// Serial and parallel execution produce identical responses; under the
/// parallel strategy errors are sorted by response path before being
/// returned. Mutations always run serially, since their top-level fields may
/// not run in parallel.
pub fn execute_with<'a>(
    schema: &'a Schema,
    document: &'a Document,
    operation_name: Option<&str>,
    variables: &Variables,
    root_value: &'a Value,
    strategy: ExecutionStrategy,
    cancel: CancellationToken,
) -> Result<ExecutionResult<'a>, Error> {
    let operation = get_operation(document, operation_name)?;

    if operation.item.operation_type == OperationType::Subscription {
        check_subscription_selection(operation)?;
    }

    let mut fragments = FnvHashMap::default();
    for definition in document {
        if let Definition::Fragment(fragment) = definition {
            fragments.insert(fragment.item.name.item.as_str(), &fragment.item);
        }
    }

    let ctx = ExecutionContext::new(schema, operation, fragments, variables, root_value, cancel);
    let root_type = schema.root_type_for(operation.item.operation_type)?;

    debug!(
        operation_type = ?operation.item.operation_type,
        "executing operation"
    );

    // The root node behaves like a field with no parent and no definitions.
    let root_node = ExecutionNode::new_root();
    let root_result = ResultNode::new_root();

    // A failure to collect the top-level fields fails the whole request.
    let root_nodes = collect_fields(&ctx, &root_node, root_type)?;

    let strategy = match operation.item.operation_type {
        OperationType::Mutation => ExecutionStrategy::Serial,
        _ => strategy,
    };

    let source = Arc::new(root_value.clone());
    match strategy {
        ExecutionStrategy::Serial => {
            let dispatcher = SerialDispatcher::new(&ctx);
            dispatch_tasks_for_object(&ctx, &dispatcher, &root_result, &root_nodes, source);
            dispatcher.run_to_completion();
        }
        ExecutionStrategy::Parallel { workers } => {
            let dispatcher = ParallelDispatcher::new(&ctx);
            dispatch_tasks_for_object(&ctx, &dispatcher, &root_result, &root_nodes, source);
            dispatcher.run_to_completion(workers);
        }
    }

    let canceled = ctx.is_canceled();
    let mut errors = ctx.into_errors();
    if canceled {
        errors = vec![Error::new("operation canceled").with_kind(ErrorKind::Execution)];
    } else if matches!(strategy, ExecutionStrategy::Parallel { .. }) {
        sort_errors(&mut errors);
    }

    Ok(ExecutionResult {
        data: Some(root_result),
        errors,
    })
}
