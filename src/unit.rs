use std::collections::{BTreeSet, HashMap, HashSet};

use crate::diagnostics::CompileError;

/// Identity of a label within one method.
pub type LabelId = u32;

/// One registered try-catch region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TryRegion {
    /// Registration sequence number, unique within the method.
    pub seq: u32,
    pub start: LabelId,
    pub end: LabelId,
    pub handler: LabelId,
    /// Internal name of the caught class; `None` catches everything.
    pub catch_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PoolEntry {
    String(String),
    Class(String),
}

/// Constant pool of string and class literals, addressed by offset.
#[derive(Debug, Default, Clone)]
pub struct ConstantPool {
    entries: Vec<PoolEntry>,
    index: HashMap<PoolEntry, usize>,
}

impl ConstantPool {
    /// Offset of `entry`, adding it if absent.
    pub fn intern(&mut self, entry: PoolEntry) -> usize {
        if let Some(&offset) = self.index.get(&entry) {
            return offset;
        }
        let offset = self.entries.len();
        self.entries.push(entry.clone());
        self.index.insert(entry, offset);
        offset
    }

    pub fn entries(&self) -> &[PoolEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Label usage, try markers and the catch depth cache are method-scoped and
/// cleared by [`TranslationUnit::begin_method`]. The constant pool and the
/// virtual-call registry live until [`TranslationUnit::reset`].
#[derive(Debug, Default)]
pub struct TranslationUnit {
    referenced_labels: HashSet<LabelId>,
    regions: Vec<TryRegion>,
    begin_markers: HashMap<LabelId, Vec<u32>>,
    end_markers: HashMap<LabelId, Vec<u32>>,
    catch_depths: HashMap<LabelId, i32>,
    pool: ConstantPool,
    virtual_calls: BTreeSet<String>,
}

impl TranslationUnit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all method-scoped registries. Must run before building the
    /// instruction list of each method.
    pub fn begin_method(&mut self) {
        self.referenced_labels.clear();
        self.regions.clear();
        self.begin_markers.clear();
        self.end_markers.clear();
        self.catch_depths.clear();
    }

    /// Clear everything, including the constant pool and virtual-call registry.
    pub fn reset(&mut self) {
        self.begin_method();
        self.pool = ConstantPool::default();
        self.virtual_calls.clear();
    }

    // ── Labels ───────────────────────────────────────────────────────

    pub fn mark_label_referenced(&mut self, label: LabelId) {
        self.referenced_labels.insert(label);
    }

    pub fn is_label_referenced(&self, label: LabelId) -> bool {
        self.referenced_labels.contains(&label)
    }

    pub fn referenced_labels(&self) -> impl Iterator<Item = LabelId> + '_ {
        self.referenced_labels.iter().copied()
    }

    // ── Try regions ──────────────────────────────────────────────────

    /// Register a try region: marks its three labels as referenced and attaches
    /// a begin marker to `start` and an end marker to `end`.
    pub fn register_try_region(
        &mut self,
        start: LabelId,
        end: LabelId,
        handler: LabelId,
        catch_type: Option<String>,
    ) -> u32 {
        let seq = self.regions.len() as u32;
        self.regions.push(TryRegion { seq, start, end, handler, catch_type });
        self.mark_label_referenced(start);
        self.mark_label_referenced(end);
        self.mark_label_referenced(handler);
        self.begin_markers.entry(start).or_default().push(seq);
        self.end_markers.entry(end).or_default().push(seq);
        self.catch_depths.clear();
        seq
    }

    pub fn has_try_regions(&self) -> bool {
        !self.regions.is_empty()
    }

    pub fn try_regions(&self) -> &[TryRegion] {
        &self.regions
    }

    pub fn region(&self, seq: u32) -> Option<&TryRegion> {
        self.regions.get(seq as usize)
    }

    /// Regions beginning at `label`, in registration order.
    pub fn begin_markers(&self, label: LabelId) -> &[u32] {
        self.begin_markers.get(&label).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Regions ending at `label`, in registration order.
    pub fn end_markers(&self, label: LabelId) -> &[u32] {
        self.end_markers.get(&label).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Number of try regions open at `target`: the running sum, over every
    /// label before it in program order, of begins minus ends. Memoized.
    pub fn catch_depth<I>(&mut self, target: LabelId, labels_in_order: I) -> Result<i32, CompileError>
    where
        I: IntoIterator<Item = LabelId>,
    {
        if let Some(&depth) = self.catch_depths.get(&target) {
            return Ok(depth);
        }
        let mut depth: i32 = 0;
        let mut found = false;
        for label in labels_in_order {
            if label == target {
                found = true;
                break;
            }
            depth += self.begin_markers(label).len() as i32;
            depth -= self.end_markers(label).len() as i32;
            if depth < 0 {
                return Err(CompileError::unbalanced_try(format!(
                    "label_{label} closes more try regions than are open"
                )));
            }
        }
        if !found {
            return Err(CompileError::unsupported(format!(
                "jump target label_{target} does not exist in this method"
            )));
        }
        self.catch_depths.insert(target, depth);
        Ok(depth)
    }

    /// The memoized depth for `label`, if computed.
    pub fn cached_catch_depth(&self, label: LabelId) -> Option<i32> {
        self.catch_depths.get(&label).copied()
    }

    // ── Constant pool ────────────────────────────────────────────────

    pub fn intern_string(&mut self, value: &str) -> usize {
        self.pool.intern(PoolEntry::String(value.to_string()))
    }

    pub fn intern_class(&mut self, internal_name: &str) -> usize {
        self.pool.intern(PoolEntry::Class(internal_name.to_string()))
    }

    pub fn constant_pool(&self) -> &ConstantPool {
        &self.pool
    }

    // ── Virtual call registry ────────────────────────────────────────

    pub fn record_virtual_call(&mut self, symbol: &str) {
        self.virtual_calls.insert(symbol.to_string());
    }

    pub fn virtual_calls(&self) -> &BTreeSet<String> {
        &self.virtual_calls
    }
}
