// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Compiles per-parameter stage bindings into contiguous native bind ranges.

A shader declares its resources one parameter at a time, each at some native
slot.  The native API, on the other hand, binds a contiguous run of slots per
call.  This module turns the first into the second with as few runs as possible.

# Algorithm

1. Bindings are split by [`ResourceKind`], keeping their order.
2. Every binding becomes one [`SlotRange`] holding a single [`SlotLink`] that maps
   the whole range onto the parameter's entries in the effect's resource table.
3. A single forward scan merges each range into its predecessor when the gap
   between them is at most one slot.  If the merged link is contiguous in *both*
   slot space and resource-table space, the previous link simply grows.  Otherwise
   a new link is appended and the range will need a gather buffer at apply time.

Merging only when the table entries line up is what keeps this correct: a range
is read straight out of the resource table only when slot `s` really is bound to
table entry `g + (s - start)`.

# Precondition

Bindings of one kind must arrive in ascending, non-overlapping slot order.  The
scan does not sort; [`prepare_slot_links`] rejects input that breaks the order
rather than silently building wrong ranges.

```
use passes_and_sprites::bindings::resource_kind::ResourceKind;
use passes_and_sprites::bindings::slot_link::{prepare_slot_links, StageBinding};

// Textures at slots 0 and 1 whose table entries are 4 and 5: one direct range.
let links = prepare_slot_links(&[
    StageBinding::new(ResourceKind::ShaderResourceView, 0, 4, 1),
    StageBinding::new(ResourceKind::ShaderResourceView, 1, 5, 1),
]).unwrap();
let ranges = links.ranges(ResourceKind::ShaderResourceView);
assert_eq!(ranges.len(), 1);
assert!(ranges[0].is_direct());
```
*/

use crate::bindings::BindingError;
use crate::bindings::resource_kind::ResourceKind;

/// One parameter bound at one native slot of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageBinding {
    pub kind: ResourceKind,
    /// First native slot.
    pub slot: u32,
    /// First entry in the resource table.
    pub global_offset: u32,
    /// Number of consecutive slots (and table entries).
    pub count: u32,
}

impl StageBinding {
    pub const fn new(kind: ResourceKind, slot: u32, global_offset: u32, count: u32) -> Self {
        StageBinding {
            kind,
            slot,
            global_offset,
            count,
        }
    }
}

/// Copies `slot_count` table entries starting at `global_index` into the range,
/// starting `slot_index` slots after the range's first slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLink {
    pub global_index: u32,
    pub slot_index: u32,
    pub slot_count: u32,
}

/// A contiguous run of native slots bound with one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRange {
    pub slot_index: u32,
    pub slot_count: u32,
    pub links: Vec<SlotLink>,
}

impl SlotRange {
    fn from_binding(binding: &StageBinding) -> Self {
        SlotRange {
            slot_index: binding.slot,
            slot_count: binding.count,
            links: vec![SlotLink {
                global_index: binding.global_offset,
                slot_index: 0,
                slot_count: binding.count,
            }],
        }
    }

    /// One past the last slot of the range.
    pub fn end(&self) -> u32 {
        self.slot_index + self.slot_count
    }

    /**
    True when the range can be bound straight out of the resource table.

    That is the case when a single link covers every slot of the range, so slot
    `slot_index + i` reads table entry `global_index + i` for the whole range.
    */
    pub fn is_direct(&self) -> bool {
        match self.links.as_slice() {
            [link] => link.slot_index == 0 && link.slot_count == self.slot_count,
            _ => false,
        }
    }

    /// Folds `next`, which starts at most one slot after this range ends, into this range.
    fn absorb(&mut self, next: SlotRange) {
        let shift = next.slot_index - self.slot_index;
        let next_end = next.end();
        for link in next.links {
            let local = shift + link.slot_index;
            match self.links.last_mut() {
                Some(last)
                    if last.global_index + last.slot_count == link.global_index
                        && last.slot_index + last.slot_count == local =>
                {
                    last.slot_count += link.slot_count;
                }
                _ => self.links.push(SlotLink {
                    global_index: link.global_index,
                    slot_index: local,
                    slot_count: link.slot_count,
                }),
            }
        }
        self.slot_count = next_end - self.slot_index;
    }
}

/// The compiled ranges of one stage, per resource kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageSlotLinks {
    ranges: [Vec<SlotRange>; ResourceKind::COUNT],
}

impl StageSlotLinks {
    pub fn ranges(&self, kind: ResourceKind) -> &[SlotRange] {
        &self.ranges[kind.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.iter().all(Vec::is_empty)
    }

    pub fn range_count(&self) -> usize {
        self.ranges.iter().map(Vec::len).sum()
    }
}

/// Builds the optimized slot ranges for one stage.
pub fn prepare_slot_links(bindings: &[StageBinding]) -> Result<StageSlotLinks, BindingError> {
    let mut links = StageSlotLinks::default();
    for binding in bindings.iter().filter(|b| b.count > 0) {
        let kind = binding.kind;
        if binding
            .slot
            .checked_add(binding.count)
            .is_none_or(|end| end > kind.max_slots())
        {
            return Err(BindingError::SlotOutOfRange {
                kind,
                slot: binding.slot,
                count: binding.count,
                max: kind.max_slots(),
            });
        }
        let ranges = &mut links.ranges[kind.index()];
        if let Some(previous) = ranges.last() {
            if binding.slot < previous.end() {
                return Err(BindingError::UnorderedSlots {
                    kind,
                    slot: binding.slot,
                    previous_end: previous.end(),
                });
            }
        }
        ranges.push(SlotRange::from_binding(binding));
    }
    for ranges in &mut links.ranges {
        coalesce_ranges(ranges);
    }
    Ok(links)
}

/**
Merges neighbouring ranges in place.

`ranges` must be in ascending, non-overlapping slot order; an overlapping range
is left unmerged.  Running this on its own output changes nothing.
*/
pub fn coalesce_ranges(ranges: &mut Vec<SlotRange>) {
    let mut merged: Vec<SlotRange> = Vec::with_capacity(ranges.len());
    for current in ranges.drain(..) {
        match merged.last_mut() {
            Some(previous)
                if current
                    .slot_index
                    .checked_sub(previous.end())
                    .is_some_and(|gap| gap <= 1) =>
            {
                previous.absorb(current);
            }
            _ => merged.push(current),
        }
    }
    *ranges = merged;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    const SRV: ResourceKind = ResourceKind::ShaderResourceView;

    fn srv(slot: u32, global: u32, count: u32) -> StageBinding {
        StageBinding::new(SRV, slot, global, count)
    }

    /// slot -> table entry, as described by the ranges.
    fn slot_map(ranges: &[SlotRange]) -> BTreeMap<u32, u32> {
        let mut map = BTreeMap::new();
        for range in ranges {
            for link in &range.links {
                assert!(link.slot_index + link.slot_count <= range.slot_count);
                for i in 0..link.slot_count {
                    let old = map.insert(range.slot_index + link.slot_index + i, link.global_index + i);
                    assert!(old.is_none(), "slot described twice");
                }
            }
        }
        map
    }

    fn input_map(bindings: &[StageBinding]) -> BTreeMap<u32, u32> {
        let mut map = BTreeMap::new();
        for b in bindings {
            for i in 0..b.count {
                map.insert(b.slot + i, b.global_offset + i);
            }
        }
        map
    }

    /// Small deterministic generator so the property tests need no extra crates.
    struct Lcg(u64);
    impl Lcg {
        fn next(&mut self, bound: u32) -> u32 {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((self.0 >> 33) % bound as u64) as u32
        }
    }

    fn random_bindings(rng: &mut Lcg) -> Vec<StageBinding> {
        let mut bindings = Vec::new();
        let mut slot = rng.next(3);
        let mut global = rng.next(4);
        for _ in 0..rng.next(10) {
            let count = 1 + rng.next(3);
            if slot + count > SRV.max_slots() {
                break;
            }
            bindings.push(srv(slot, global, count));
            slot += count + rng.next(3);
            // sometimes contiguous in the table, sometimes not
            global += count + rng.next(2) * (1 + rng.next(5));
        }
        bindings
    }

    #[test]
    fn adjacent_contiguous_bindings_become_one_direct_range() {
        let links = prepare_slot_links(&[srv(0, 3, 1), srv(1, 4, 2), srv(3, 6, 1)]).unwrap();
        let ranges = links.ranges(SRV);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].slot_index, 0);
        assert_eq!(ranges[0].slot_count, 4);
        assert_eq!(
            ranges[0].links,
            vec![SlotLink { global_index: 3, slot_index: 0, slot_count: 4 }]
        );
        assert!(ranges[0].is_direct());
    }

    #[test]
    fn adjacent_but_scattered_table_entries_need_gather() {
        let links = prepare_slot_links(&[srv(0, 0, 1), srv(1, 7, 1)]).unwrap();
        let ranges = links.ranges(SRV);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].slot_count, 2);
        assert_eq!(ranges[0].links.len(), 2);
        assert_eq!(ranges[0].links[1], SlotLink { global_index: 7, slot_index: 1, slot_count: 1 });
        assert!(!ranges[0].is_direct());
    }

    #[test]
    fn one_slot_gap_is_bridged() {
        let links = prepare_slot_links(&[srv(0, 0, 1), srv(2, 1, 1)]).unwrap();
        let ranges = links.ranges(SRV);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].slot_count, 3);
        // table entries are contiguous, but the slots are not, so this still gathers
        assert_eq!(ranges[0].links[1], SlotLink { global_index: 1, slot_index: 2, slot_count: 1 });
        assert!(!ranges[0].is_direct());
    }

    #[test]
    fn larger_gap_starts_a_new_range() {
        let links = prepare_slot_links(&[srv(0, 0, 1), srv(3, 1, 1)]).unwrap();
        let ranges = links.ranges(SRV);
        assert_eq!(ranges.len(), 2);
        assert!(ranges.iter().all(SlotRange::is_direct));
    }

    #[test]
    fn kinds_are_compiled_independently() {
        let links = prepare_slot_links(&[
            srv(0, 0, 1),
            StageBinding::new(ResourceKind::SamplerState, 0, 1, 1),
            srv(1, 2, 1),
        ])
        .unwrap();
        assert_eq!(links.ranges(SRV).len(), 1);
        assert!(!links.ranges(SRV)[0].is_direct());
        assert_eq!(links.ranges(ResourceKind::SamplerState).len(), 1);
        assert!(links.ranges(ResourceKind::ConstantBuffer).is_empty());
        assert_eq!(links.range_count(), 2);
    }

    #[test]
    fn empty_bindings_are_skipped() {
        let links = prepare_slot_links(&[srv(4, 0, 0)]).unwrap();
        assert!(links.is_empty());
    }

    #[test]
    fn unordered_slots_are_rejected() {
        let err = prepare_slot_links(&[srv(2, 0, 1), srv(1, 1, 1)]).unwrap_err();
        assert_eq!(
            err,
            BindingError::UnorderedSlots { kind: SRV, slot: 1, previous_end: 3 }
        );
        let err = prepare_slot_links(&[srv(0, 0, 2), srv(1, 2, 1)]).unwrap_err();
        assert!(matches!(err, BindingError::UnorderedSlots { .. }));
    }

    #[test]
    fn slots_past_the_native_limit_are_rejected() {
        let err = prepare_slot_links(&[StageBinding::new(ResourceKind::SamplerState, 15, 0, 2)]).unwrap_err();
        assert!(matches!(err, BindingError::SlotOutOfRange { max: 16, .. }));
    }

    #[test]
    fn slots_near_the_integer_limit_are_rejected() {
        let err = prepare_slot_links(&[srv(u32::MAX, 0, 1)]).unwrap_err();
        assert_eq!(
            err,
            BindingError::SlotOutOfRange { kind: SRV, slot: u32::MAX, count: 1, max: 128 }
        );
        let err = prepare_slot_links(&[srv(1, 0, u32::MAX)]).unwrap_err();
        assert!(matches!(err, BindingError::SlotOutOfRange { count: u32::MAX, .. }));
    }

    #[test]
    fn output_describes_exactly_the_input_slots() {
        let mut rng = Lcg(0x5eed);
        for _ in 0..500 {
            let bindings = random_bindings(&mut rng);
            let links = prepare_slot_links(&bindings).unwrap();
            assert_eq!(slot_map(links.ranges(SRV)), input_map(&bindings), "{bindings:?}");
            let ranges = links.ranges(SRV);
            for pair in ranges.windows(2) {
                assert!(pair[1].slot_index >= pair[0].end() + 2, "ranges left unmerged");
            }
        }
    }

    #[test]
    fn direct_exactly_when_one_full_link() {
        let mut rng = Lcg(42);
        for _ in 0..500 {
            let bindings = random_bindings(&mut rng);
            let links = prepare_slot_links(&bindings).unwrap();
            for range in links.ranges(SRV) {
                let map = slot_map(std::slice::from_ref(range));
                let first = range.links[0].global_index;
                let straight = map.len() as u32 == range.slot_count
                    && map
                        .iter()
                        .all(|(&slot, &global)| global == first + (slot - range.slot_index));
                assert_eq!(range.is_direct(), straight, "{range:?}");
            }
        }
    }

    #[test]
    fn coalescing_is_idempotent() {
        let mut rng = Lcg(7);
        for _ in 0..500 {
            let bindings = random_bindings(&mut rng);
            let links = prepare_slot_links(&bindings).unwrap();
            let once = links.ranges(SRV).to_vec();
            let mut twice = once.clone();
            coalesce_ranges(&mut twice);
            assert_eq!(once, twice);
        }
    }
}
