use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::config::AssignmentPolicy;
use crate::value::{InstanceRef, Value};
use crate::{EvalError, EvalResult};

/// Stable handle to a scope in the arena.
///
/// The generation makes a handle to a released slot detectably stale
/// instead of silently aliasing whatever reuses the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId {
    index: usize,
    generation: u32,
}

impl ScopeId {
    pub fn index(&self) -> usize {
        self.index
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ScopeKind {
    Global,
    Function,
    Instance,
}

/// Zero-argument observer fired after an instance scope's storage changes.
pub type MutationCallback = Rc<dyn Fn()>;

struct ScopeRecord {
    kind: ScopeKind,
    parent: Option<ScopeId>,
    storage: HashMap<String, Value>,
    observers: Vec<MutationCallback>,
    // allocation tick, compared against argument frames
    created: u64,
    // instances only: alive while some `InstanceRef` is
    lease: Option<Weak<()>>,
}

impl ScopeRecord {
    fn new(kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Self {
            kind,
            parent,
            storage: HashMap::new(),
            observers: Vec::new(),
            created: 0,
            lease: None,
        }
    }
}

/// Bindings written while one argument list resolves, with the value each
/// had before the first write.
struct ArgumentFrame {
    opened_at: u64,
    current: usize,
    touched: HashMap<ScopeId, HashMap<String, JournalEntry>>,
}

struct JournalEntry {
    prior: Option<Value>,
    writer: usize,
}

struct Slot {
    generation: u32,
    record: Option<ScopeRecord>,
}

/// Arena owning every scope of one interpreter.
///
/// Parents are handles, never references. The global scope lives as long as
/// the arena. Function scopes are released when their activation ends.
/// Instance scopes are reclaimed once no `InstanceRef` to them remains.
pub struct Scopes {
    slots: Vec<Slot>,
    free: Vec<usize>,
    global: ScopeId,
    policy: AssignmentPolicy,
    clock: u64,
    journal: Vec<ArgumentFrame>,
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new(AssignmentPolicy::default())
    }
}

impl Scopes {
    /// Create an arena holding only the global scope
    pub fn new(policy: AssignmentPolicy) -> Self {
        Self::with_globals(policy, std::iter::empty::<(String, Value)>())
    }

    /// Create an arena whose global scope starts out holding `bindings`
    pub fn with_globals<I, S>(policy: AssignmentPolicy, bindings: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let global = ScopeId {
            index: 0,
            generation: 0,
        };
        let mut record = ScopeRecord::new(ScopeKind::Global, None);
        record.storage.extend(
            bindings
                .into_iter()
                .map(|(name, value)| (name.into(), value)),
        );
        Self {
            slots: vec![Slot {
                generation: 0,
                record: Some(record),
            }],
            free: Vec::new(),
            global,
            policy,
            clock: 0,
            journal: Vec::new(),
        }
    }

    pub fn global(&self) -> ScopeId {
        self.global
    }

    pub fn policy(&self) -> AssignmentPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: AssignmentPolicy) {
        self.policy = policy;
    }

    /// Open a scope for one function activation
    pub fn push_function(&mut self, parent: ScopeId) -> EvalResult<ScopeId> {
        self.record(parent)?;
        Ok(self.allocate(ScopeRecord::new(ScopeKind::Function, Some(parent))))
    }

    /// Release a function scope once its activation has returned
    pub fn pop_function(&mut self, id: ScopeId) -> EvalResult<()> {
        if self.kind(id)? != ScopeKind::Function {
            return Err(EvalError::InvalidScope(id.index));
        }
        self.release(id.index);
        Ok(())
    }

    /// Create the backing scope of a mutable object. Instances nobody holds
    /// any more are reclaimed first.
    pub fn new_instance(&mut self, parent: Option<ScopeId>) -> EvalResult<InstanceRef> {
        if let Some(parent) = parent {
            self.record(parent)?;
        }
        self.reclaim_instances();
        let lease = Rc::new(());
        let mut record = ScopeRecord::new(ScopeKind::Instance, parent);
        record.lease = Some(Rc::downgrade(&lease));
        let id = self.allocate(record);
        Ok(InstanceRef::new(id, lease))
    }

    /// Release every instance scope whose last `InstanceRef` has been
    /// dropped, including those only reachable through released ones.
    /// Returns how many were released.
    pub fn reclaim_instances(&mut self) -> usize {
        let mut released = 0;
        loop {
            let orphans: Vec<usize> = self
                .slots
                .iter()
                .enumerate()
                .filter(|(_, slot)| {
                    slot.record
                        .as_ref()
                        .and_then(|record| record.lease.as_ref())
                        .map_or(false, |lease| lease.strong_count() == 0)
                })
                .map(|(index, _)| index)
                .collect();
            if orphans.is_empty() {
                break;
            }
            released += orphans.len();
            for index in orphans {
                self.release(index);
            }
        }
        if released > 0 {
            debug!("reclaimed {} instance scope(s)", released);
        }
        released
    }

    pub fn is_live(&self, id: ScopeId) -> bool {
        self.record(id).is_ok()
    }

    pub fn kind(&self, id: ScopeId) -> EvalResult<ScopeKind> {
        Ok(self.record(id)?.kind)
    }

    pub fn parent(&self, id: ScopeId) -> EvalResult<Option<ScopeId>> {
        Ok(self.record(id)?.parent)
    }

    /// Attach an observer to an instance scope
    pub fn on_mutation<F>(&mut self, id: ScopeId, callback: F) -> EvalResult<()>
    where
        F: Fn() + 'static,
    {
        let record = self.record_mut(id)?;
        if record.kind != ScopeKind::Instance {
            return Err(EvalError::unsupported(format!(
                "{} scope cannot be observed",
                record.kind
            )));
        }
        record.observers.push(Rc::new(callback));
        Ok(())
    }

    /// Bind `name` in this scope, replacing any local binding
    pub fn define<S: Into<String>>(&mut self, id: ScopeId, name: S, value: Value) -> EvalResult<()> {
        let name = name.into();
        trace!("define {} in scope #{}", name, id.index);
        self.journal_write(id, &name)?;
        self.record_mut(id)?.storage.insert(name, value);
        self.notify(id)
    }

    /// Rewrite the nearest binding of `name`, walking outward from `id`
    pub fn set(&mut self, id: ScopeId, name: &str, value: Value) -> EvalResult<()> {
        match self.resolve(id, name) {
            Some(owner) => {
                trace!("set {} in scope #{}", name, owner.index);
                self.journal_write(owner, name)?;
                self.record_mut(owner)?
                    .storage
                    .insert(name.to_string(), value);
                self.notify(owner)
            }
            None => match self.policy {
                AssignmentPolicy::Strict => Err(EvalError::UnknownIdentifier(name.to_string())),
                AssignmentPolicy::DefineLocal => self.define(id, name, value),
            },
        }
    }

    /// Look `name` up from `id` outward
    pub fn get(&self, id: ScopeId, name: &str) -> Option<Value> {
        let owner = self.resolve(id, name)?;
        self.get_local(owner, name)
    }

    /// Look `name` up in this scope only
    pub fn get_local(&self, id: ScopeId, name: &str) -> Option<Value> {
        self.visible(id, name, self.journal.len()).cloned()
    }

    /// The scope that binds `name` as seen from `id`
    pub fn resolve(&self, id: ScopeId, name: &str) -> Option<ScopeId> {
        let mut current = Some(id);
        while let Some(scope) = current {
            let record = self.record(scope).ok()?;
            if self.visible(scope, name, self.journal.len()).is_some() {
                return Some(scope);
            }
            current = record.parent;
        }
        None
    }

    /// Start resolving one argument list. Until the matching
    /// [`Scopes::close_arguments`], a binding written while one argument
    /// resolves keeps reading as its earlier value from the other arguments
    /// of the list. Writes themselves land immediately.
    pub(crate) fn open_arguments(&mut self) {
        self.journal.push(ArgumentFrame {
            opened_at: self.clock,
            current: 0,
            touched: HashMap::new(),
        });
    }

    /// Mark the argument at `index` of the innermost open list as resolving
    pub(crate) fn begin_argument(&mut self, index: usize) {
        if let Some(frame) = self.journal.last_mut() {
            frame.current = index;
        }
    }

    pub(crate) fn close_arguments(&mut self) {
        self.journal.pop();
    }

    /// Number of live scopes, the global one included
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.record.is_some()).count()
    }

    // Observers get no handle to the arena, and `self` stays exclusively
    // borrowed while they run, so a notification cannot re-enter a write.
    fn notify(&mut self, id: ScopeId) -> EvalResult<()> {
        let record = self.record(id)?;
        if record.kind != ScopeKind::Instance || record.observers.is_empty() {
            return Ok(());
        }
        let observers = record.observers.clone();
        trace!(
            "notifying {} observer(s) of instance #{}",
            observers.len(),
            id.index
        );
        for observer in observers {
            observer();
        }
        Ok(())
    }

    // What `name` in scope `id` reads as under the outermost `depth`
    // argument frames. The innermost frame that saw a write decides: the
    // argument that wrote it sees the live value, its siblings the prior one.
    fn visible(&self, id: ScopeId, name: &str, depth: usize) -> Option<&Value> {
        for frame in self.journal[..depth].iter().rev() {
            if let Some(entry) = frame.touched.get(&id).and_then(|names| names.get(name)) {
                if entry.writer != frame.current {
                    return entry.prior.as_ref();
                }
                break;
            }
        }
        self.record(id).ok()?.storage.get(name)
    }

    // Record, in every open argument frame older than scope `id`, the value
    // `name` had before its first write and which argument wrote it last.
    fn journal_write(&mut self, id: ScopeId, name: &str) -> EvalResult<()> {
        if self.journal.is_empty() {
            return Ok(());
        }
        let created = self.record(id)?.created;
        let priors: Vec<Option<Value>> = (0..self.journal.len())
            .map(|depth| self.visible(id, name, depth).cloned())
            .collect();
        for (frame, prior) in self.journal.iter_mut().zip(priors) {
            if created > frame.opened_at {
                continue;
            }
            let writer = frame.current;
            let names = frame.touched.entry(id).or_default();
            match names.get_mut(name) {
                Some(entry) => entry.writer = writer,
                None => {
                    names.insert(name.to_string(), JournalEntry { prior, writer });
                }
            }
        }
        Ok(())
    }

    fn release(&mut self, index: usize) {
        let slot = &mut self.slots[index];
        slot.record = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
    }

    fn allocate(&mut self, mut record: ScopeRecord) -> ScopeId {
        self.clock += 1;
        record.created = self.clock;
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.record = Some(record);
                ScopeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    record: Some(record),
                });
                ScopeId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    fn record(&self, id: ScopeId) -> EvalResult<&ScopeRecord> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.record.as_ref())
            .ok_or(EvalError::InvalidScope(id.index))
    }

    fn record_mut(&mut self, id: ScopeId) -> EvalResult<&mut ScopeRecord> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.record.as_mut())
            .ok_or(EvalError::InvalidScope(id.index))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn counter(scopes: &mut Scopes, id: ScopeId) -> Rc<Cell<usize>> {
        let count = Rc::new(Cell::new(0));
        let observed = count.clone();
        scopes
            .on_mutation(id, move || observed.set(observed.get() + 1))
            .unwrap();
        count
    }

    #[test]
    fn test_lookup_walks_outward() {
        let mut scopes = Scopes::default();
        let global = scopes.global();
        scopes.define(global, "x", Value::Int(1)).unwrap();
        let frame = scopes.push_function(global).unwrap();
        assert_eq!(scopes.get(frame, "x"), Some(Value::Int(1)));
        assert_eq!(scopes.get_local(frame, "x"), None);
        assert_eq!(scopes.get(frame, "missing"), None);
    }

    #[test]
    fn test_with_globals_seeds_global_scope() {
        let scopes = Scopes::with_globals(AssignmentPolicy::Strict, [("answer", Value::Int(42))]);
        assert_eq!(scopes.get(scopes.global(), "answer"), Some(Value::Int(42)));
        assert_eq!(scopes.live_count(), 1);
    }

    #[test]
    fn test_define_shadows_parent() {
        let mut scopes = Scopes::default();
        let global = scopes.global();
        scopes.define(global, "x", Value::Int(1)).unwrap();
        let frame = scopes.push_function(global).unwrap();
        scopes.define(frame, "x", Value::Int(2)).unwrap();
        assert_eq!(scopes.get(frame, "x"), Some(Value::Int(2)));
        assert_eq!(scopes.get(global, "x"), Some(Value::Int(1)));
    }

    #[test]
    fn test_set_mutates_nearest_binding() {
        let mut scopes = Scopes::default();
        let global = scopes.global();
        scopes.define(global, "x", Value::Int(1)).unwrap();
        let frame = scopes.push_function(global).unwrap();
        scopes.set(frame, "x", Value::Int(5)).unwrap();
        assert_eq!(scopes.get(global, "x"), Some(Value::Int(5)));
        assert_eq!(scopes.get_local(frame, "x"), None);
    }

    #[test]
    fn test_strict_set_never_creates() {
        let mut scopes = Scopes::new(AssignmentPolicy::Strict);
        let global = scopes.global();
        let frame = scopes.push_function(global).unwrap();
        let result = scopes.set(frame, "ghost", Value::Int(1));
        assert_eq!(result, Err(EvalError::UnknownIdentifier("ghost".to_string())));
        assert_eq!(scopes.get(frame, "ghost"), None);
    }

    #[test]
    fn test_define_local_set_creates_if_absent() {
        let mut scopes = Scopes::new(AssignmentPolicy::DefineLocal);
        let global = scopes.global();
        let frame = scopes.push_function(global).unwrap();
        scopes.set(frame, "ghost", Value::Int(1)).unwrap();
        assert_eq!(scopes.get_local(frame, "ghost"), Some(Value::Int(1)));
        assert_eq!(scopes.get(global, "ghost"), None);
    }

    #[test]
    fn test_instance_write_fires_observer_after_store() {
        let mut scopes = Scopes::default();
        let model = scopes.new_instance(None).unwrap();
        let instance = model.scope();
        let count = counter(&mut scopes, instance);

        scopes.define(instance, "arr", Value::from(vec![1i64])).unwrap();
        assert_eq!(count.get(), 1);
        scopes.set(instance, "arr", Value::from(vec![2i64])).unwrap();
        assert_eq!(count.get(), 2);
        assert_eq!(scopes.get(instance, "arr"), Some(Value::from(vec![2i64])));
    }

    #[test]
    fn test_set_through_child_notifies_owning_instance() {
        let mut scopes = Scopes::default();
        let model = scopes.new_instance(None).unwrap();
        let instance = model.scope();
        scopes.define(instance, "n", Value::Int(0)).unwrap();
        let count = counter(&mut scopes, instance);
        let frame = scopes.push_function(instance).unwrap();

        scopes.set(frame, "n", Value::Int(1)).unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_only_instances_are_observable() {
        let mut scopes = Scopes::default();
        let global = scopes.global();
        assert!(scopes.on_mutation(global, || {}).is_err());
    }

    #[test]
    fn test_released_function_scope_is_stale() {
        let mut scopes = Scopes::default();
        let global = scopes.global();
        let frame = scopes.push_function(global).unwrap();
        scopes.pop_function(frame).unwrap();
        assert!(!scopes.is_live(frame));
        assert_eq!(
            scopes.define(frame, "x", Value::Int(1)),
            Err(EvalError::InvalidScope(frame.index()))
        );

        // slot reuse must not revive the old handle
        let reused = scopes.push_function(global).unwrap();
        assert_eq!(reused.index(), frame.index());
        assert!(!scopes.is_live(frame));
        assert!(scopes.is_live(reused));
        assert_eq!(scopes.live_count(), 2);
    }

    #[test]
    fn test_dropped_instances_are_reclaimed() {
        let mut scopes = Scopes::default();
        let global = scopes.global();
        let kept = scopes.new_instance(Some(global)).unwrap();
        let dropped = scopes.new_instance(Some(global)).unwrap();
        let stale = dropped.scope();
        // an instance held only by another dropped instance goes too
        let nested = scopes.new_instance(Some(global)).unwrap();
        scopes.define(stale, "child", Value::Instance(nested.clone())).unwrap();
        let nested_scope = nested.scope();
        drop(nested);
        drop(dropped);
        assert_eq!(scopes.live_count(), 4);

        assert_eq!(scopes.reclaim_instances(), 2);
        assert_eq!(scopes.live_count(), 2);
        assert!(scopes.is_live(kept.scope()));
        assert!(!scopes.is_live(stale));
        assert!(!scopes.is_live(nested_scope));
        assert_eq!(scopes.reclaim_instances(), 0);
    }

    #[test]
    fn test_bound_instance_survives_reclaim() {
        let mut scopes = Scopes::default();
        let global = scopes.global();
        let instance = scopes.new_instance(Some(global)).unwrap();
        let scope = instance.scope();
        scopes.define(global, "model", Value::Instance(instance.clone())).unwrap();
        assert_eq!(instance.handle_count(), 2);
        drop(instance);

        assert_eq!(scopes.reclaim_instances(), 0);
        assert!(scopes.is_live(scope));

        scopes.define(global, "model", Value::Int(0)).unwrap();
        assert_eq!(scopes.reclaim_instances(), 1);
        assert!(!scopes.is_live(scope));
    }

    #[test]
    fn test_sibling_write_reads_as_prior_value() {
        let mut scopes = Scopes::default();
        let global = scopes.global();
        scopes.define(global, "x", Value::Int(1)).unwrap();

        scopes.open_arguments();
        scopes.begin_argument(0);
        scopes.set(global, "x", Value::Int(2)).unwrap();
        scopes.define(global, "fresh", Value::Int(3)).unwrap();
        assert_eq!(scopes.get(global, "x"), Some(Value::Int(2)));
        scopes.begin_argument(1);
        assert_eq!(scopes.get(global, "x"), Some(Value::Int(1)));
        assert_eq!(scopes.get(global, "fresh"), None);
        // a scope opened inside the list is not isolated from itself
        let frame = scopes.push_function(global).unwrap();
        scopes.define(frame, "p", Value::Int(4)).unwrap();
        assert_eq!(scopes.get(frame, "p"), Some(Value::Int(4)));
        scopes.pop_function(frame).unwrap();
        scopes.close_arguments();

        assert_eq!(scopes.get(global, "x"), Some(Value::Int(2)));
        assert_eq!(scopes.get(global, "fresh"), Some(Value::Int(3)));
    }

    #[test]
    fn test_global_cannot_be_popped() {
        let mut scopes = Scopes::default();
        let global = scopes.global();
        assert!(scopes.pop_function(global).is_err());
        assert!(scopes.is_live(global));
    }
}
