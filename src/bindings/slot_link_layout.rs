// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Lays out the bind descriptors and gather buffers of one effect pass.

After [`slot_link`](crate::bindings::slot_link) has compiled every stage, a pass
needs, per stage and resource kind, one descriptor per range, plus scratch space
for the ranges that cannot be bound straight out of the resource table.

Everything lives in a handful of typed arrays sized exactly once:

```text
descriptors:  [ stage 0: CB.. SRV.. UAV.. Sampler.. | stage 1: ... ]
copy_links:   [ links of every gathered range, in descriptor order ]
gather:       [ resources of every gathered range, back to back ]
gather UAV:   [ initial counters, parallel to gather ]
```

The layout is built in two passes over the same compiled ranges.  The first
pass only counts, the second places, so no array ever reallocates and every
position stored in a descriptor is final.  Positions are plain indices into
these arrays.

Direct ranges (see [`SlotRange::is_direct`]) get no gather space at all: their
descriptor refers to the resource table, and binding them costs no copy.
*/

use std::ops::Range;

use crate::bindings::bind_style::Stage;
use crate::bindings::resource_kind::ResourceKind;
use crate::bindings::resource_table::ResourceTable;
use crate::bindings::slot_link::{SlotRange, StageSlotLinks};
use crate::device::{NativeHandle, UAV_COUNTER_UNCHANGED};

/// Where a range reads its resources from when it is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSource {
    /// Straight out of the resource table, starting at `global_index`.
    Direct { global_index: u32 },
    /// Out of the gather buffer, starting at `gather_index`.
    Gathered { gather_index: u32 },
}

/// Copies `count` table entries from `global_index` to `gather_index` before binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyLink {
    pub global_index: u32,
    pub gather_index: u32,
    pub count: u32,
}

/// One native bind call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeDescriptor {
    pub kind: ResourceKind,
    pub start_slot: u32,
    pub slot_count: u32,
    pub source: SlotSource,
    links: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StageBlock {
    stage: Stage,
    kinds: [Range<usize>; ResourceKind::COUNT],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct LayoutSize {
    stages: usize,
    descriptors: usize,
    copy_links: usize,
    gather_slots: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotLinkLayout {
    stages: Vec<StageBlock>,
    descriptors: Vec<RangeDescriptor>,
    copy_links: Vec<CopyLink>,
    gather_resources: Vec<Option<NativeHandle>>,
    gather_uav_counters: Vec<i32>,
}

impl SlotLinkLayout {
    /// Plans the layout for the compiled stages of one pass.  Stages without any
    /// range get no block.
    pub fn plan(stages: &[(Stage, StageSlotLinks)]) -> Self {
        let size = Self::measure(stages);
        let mut layout = SlotLinkLayout {
            stages: Vec::with_capacity(size.stages),
            descriptors: Vec::with_capacity(size.descriptors),
            copy_links: Vec::with_capacity(size.copy_links),
            gather_resources: vec![None; size.gather_slots],
            gather_uav_counters: vec![UAV_COUNTER_UNCHANGED; size.gather_slots],
        };
        let mut next_gather = 0u32;
        for (stage, links) in stages.iter().filter(|(_, links)| !links.is_empty()) {
            let kinds = ResourceKind::ALL.map(|kind| {
                let first = layout.descriptors.len();
                for range in links.ranges(kind) {
                    layout.place(kind, range, &mut next_gather);
                }
                first..layout.descriptors.len()
            });
            layout.stages.push(StageBlock { stage: *stage, kinds });
        }
        debug_assert_eq!(layout.stages.len(), size.stages);
        debug_assert_eq!(layout.descriptors.len(), size.descriptors);
        debug_assert_eq!(layout.copy_links.len(), size.copy_links);
        debug_assert_eq!(next_gather as usize, size.gather_slots);
        layout
    }

    fn measure(stages: &[(Stage, StageSlotLinks)]) -> LayoutSize {
        let mut size = LayoutSize::default();
        for (_, links) in stages.iter().filter(|(_, links)| !links.is_empty()) {
            size.stages += 1;
            for kind in ResourceKind::ALL {
                for range in links.ranges(kind) {
                    size.descriptors += 1;
                    if !range.is_direct() {
                        size.copy_links += range.links.len();
                        size.gather_slots += range.slot_count as usize;
                    }
                }
            }
        }
        size
    }

    fn place(&mut self, kind: ResourceKind, range: &SlotRange, next_gather: &mut u32) {
        let first_link = self.copy_links.len();
        let source = if range.is_direct() {
            SlotSource::Direct {
                global_index: range.links[0].global_index,
            }
        } else {
            let gather_index = *next_gather;
            *next_gather += range.slot_count;
            self.copy_links.extend(range.links.iter().map(|link| CopyLink {
                global_index: link.global_index,
                gather_index: gather_index + link.slot_index,
                count: link.slot_count,
            }));
            SlotSource::Gathered { gather_index }
        };
        self.descriptors.push(RangeDescriptor {
            kind,
            start_slot: range.slot_index,
            slot_count: range.slot_count,
            source,
            links: first_link..self.copy_links.len(),
        });
    }

    /// Copies the current contents of `table` into every gathered range.
    pub fn gather(&mut self, table: &ResourceTable) {
        for descriptor in &self.descriptors {
            if let SlotSource::Direct { .. } = descriptor.source {
                continue;
            }
            for link in &self.copy_links[descriptor.links.clone()] {
                let from = link.global_index as usize..(link.global_index + link.count) as usize;
                let to = link.gather_index as usize..(link.gather_index + link.count) as usize;
                self.gather_resources[to.clone()].copy_from_slice(table.resource_range(from.clone()));
                if descriptor.kind == ResourceKind::UnorderedAccessView {
                    self.gather_uav_counters[to].copy_from_slice(table.uav_count_range(from));
                }
            }
        }
    }

    pub fn descriptors(&self, stage: Stage, kind: ResourceKind) -> &[RangeDescriptor] {
        self.stages
            .iter()
            .find(|block| block.stage == stage)
            .map(|block| &self.descriptors[block.kinds[kind.index()].clone()])
            .unwrap_or(&[])
    }

    pub fn copy_links(&self, descriptor: &RangeDescriptor) -> &[CopyLink] {
        &self.copy_links[descriptor.links.clone()]
    }

    /// The resources to bind for `descriptor`, as of the last [`gather`](Self::gather).
    pub fn resources<'a>(
        &'a self,
        descriptor: &RangeDescriptor,
        table: &'a ResourceTable,
    ) -> &'a [Option<NativeHandle>] {
        let count = descriptor.slot_count as usize;
        match descriptor.source {
            SlotSource::Direct { global_index } => {
                let start = global_index as usize;
                table.resource_range(start..start + count)
            }
            SlotSource::Gathered { gather_index } => {
                let start = gather_index as usize;
                &self.gather_resources[start..start + count]
            }
        }
    }

    /// UAV initial counters parallel to [`resources`](Self::resources).
    pub fn uav_initial_counts<'a>(&'a self, descriptor: &RangeDescriptor, table: &'a ResourceTable) -> &'a [i32] {
        let count = descriptor.slot_count as usize;
        match descriptor.source {
            SlotSource::Direct { global_index } => {
                let start = global_index as usize;
                table.uav_count_range(start..start + count)
            }
            SlotSource::Gathered { gather_index } => {
                let start = gather_index as usize;
                &self.gather_uav_counters[start..start + count]
            }
        }
    }

    /// Stages that have at least one range.
    pub fn stages(&self) -> impl Iterator<Item = Stage> + '_ {
        self.stages.iter().map(|block| block.stage)
    }

    /// Total slots that go through the gather buffer.
    pub fn gather_len(&self) -> usize {
        self.gather_resources.len()
    }

    pub fn descriptor_count(&self) -> usize {
        self.descriptors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::slot_link::{StageBinding, prepare_slot_links};

    const SRV: ResourceKind = ResourceKind::ShaderResourceView;
    const UAV: ResourceKind = ResourceKind::UnorderedAccessView;

    fn handle(raw: u64) -> Option<NativeHandle> {
        NativeHandle::from_raw(raw)
    }

    fn compile(stage: Stage, bindings: &[StageBinding]) -> (Stage, StageSlotLinks) {
        (stage, prepare_slot_links(bindings).unwrap())
    }

    #[test]
    fn direct_ranges_take_no_gather_space() {
        let stages = [compile(
            Stage::Pixel,
            &[
                StageBinding::new(SRV, 0, 0, 1),
                StageBinding::new(SRV, 1, 1, 1),
                StageBinding::new(ResourceKind::SamplerState, 0, 2, 1),
            ],
        )];
        let layout = SlotLinkLayout::plan(&stages);
        assert_eq!(layout.gather_len(), 0);
        assert_eq!(layout.descriptor_count(), 2);
        let srvs = layout.descriptors(Stage::Pixel, SRV);
        assert_eq!(srvs.len(), 1);
        assert_eq!(srvs[0].source, SlotSource::Direct { global_index: 0 });
        assert!(layout.copy_links(&srvs[0]).is_empty());
    }

    #[test]
    fn direct_ranges_see_table_changes_without_gathering() {
        let stages = [compile(Stage::Vertex, &[StageBinding::new(SRV, 3, 1, 2)])];
        let layout = SlotLinkLayout::plan(&stages);
        let mut table = ResourceTable::with_len(3);
        table.set(1, handle(10));
        table.set(2, handle(11));
        let descriptor = &layout.descriptors(Stage::Vertex, SRV)[0];
        assert_eq!(descriptor.start_slot, 3);
        assert_eq!(layout.resources(descriptor, &table), &[handle(10), handle(11)]);
    }

    #[test]
    fn scattered_ranges_are_gathered() {
        // slots 0,1 read entries 5,2; slot 2 is a gap; slot 3 reads entry 0
        let stages = [compile(
            Stage::Pixel,
            &[
                StageBinding::new(SRV, 0, 5, 1),
                StageBinding::new(SRV, 1, 2, 1),
                StageBinding::new(SRV, 3, 0, 1),
            ],
        )];
        let mut layout = SlotLinkLayout::plan(&stages);
        assert_eq!(layout.gather_len(), 4);
        let mut table = ResourceTable::with_len(6);
        table.set(0, handle(100));
        table.set(2, handle(102));
        table.set(5, handle(105));
        layout.gather(&table);
        let descriptor = layout.descriptors(Stage::Pixel, SRV)[0].clone();
        assert_eq!(descriptor.slot_count, 4);
        assert_eq!(descriptor.source, SlotSource::Gathered { gather_index: 0 });
        assert_eq!(
            layout.resources(&descriptor, &table),
            &[handle(105), handle(102), None, handle(100)]
        );

        // a later gather picks up new bindings
        table.set(2, handle(7));
        layout.gather(&table);
        assert_eq!(layout.resources(&descriptor, &table)[1], handle(7));
    }

    #[test]
    fn gather_positions_are_sequential_across_stages() {
        let scattered = [StageBinding::new(SRV, 0, 1, 1), StageBinding::new(SRV, 1, 0, 1)];
        let stages = [
            compile(Stage::Vertex, &scattered),
            compile(Stage::Hull, &[]),
            compile(Stage::Pixel, &scattered),
        ];
        let layout = SlotLinkLayout::plan(&stages);
        assert_eq!(layout.stages().collect::<Vec<_>>(), vec![Stage::Vertex, Stage::Pixel]);
        assert_eq!(layout.gather_len(), 4);
        let pixel = &layout.descriptors(Stage::Pixel, SRV)[0];
        assert_eq!(pixel.source, SlotSource::Gathered { gather_index: 2 });
        let links = layout.copy_links(pixel);
        assert_eq!(links[0], CopyLink { global_index: 1, gather_index: 2, count: 1 });
        assert_eq!(links[1], CopyLink { global_index: 0, gather_index: 3, count: 1 });
        assert!(layout.descriptors(Stage::Hull, SRV).is_empty());
    }

    #[test]
    fn uav_counters_follow_their_views() {
        let stages = [compile(
            Stage::Compute,
            &[StageBinding::new(UAV, 0, 1, 1), StageBinding::new(UAV, 2, 0, 1)],
        )];
        let mut layout = SlotLinkLayout::plan(&stages);
        let mut table = ResourceTable::with_len(2);
        table.set_unordered_access(0, handle(1), 0);
        table.set_unordered_access(1, handle(2), 16);
        layout.gather(&table);
        let descriptor = layout.descriptors(Stage::Compute, UAV)[0].clone();
        assert_eq!(layout.resources(&descriptor, &table), &[handle(2), None, handle(1)]);
        assert_eq!(
            layout.uav_initial_counts(&descriptor, &table),
            &[16, UAV_COUNTER_UNCHANGED, 0]
        );
    }
}
