//! Address decoding for a 16-bit address space.
//!
//! A map is an ordered list of `(range, device)` entries plus a flat lookup
//! table rebuilt whenever the list changes, so decoding an address is a
//! single index. Ordinary mappings may not overlap; overlays (cartridge
//! RAM over a ROM segment, a banked window over an open hole) are
//! registered explicitly and win over earlier entries.

use std::fmt::Debug;

use crate::CoreFault;

const UNMAPPED: u16 = u16::MAX;

/// Result of decoding an address: the device and the offset within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded<D> {
    pub device: D,
    pub offset: u16,
}

#[derive(Debug, Clone)]
struct Entry<D> {
    start: u16,
    end: u16,
    device: D,
}

/// Range table routing addresses to devices.
#[derive(Debug, Clone)]
pub struct MemoryMap<D> {
    entries: Vec<Entry<D>>,
    lookup: Vec<u16>,
}

impl<D: Copy + PartialEq + Debug> MemoryMap<D> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            lookup: vec![UNMAPPED; 0x1_0000],
        }
    }

    /// Map `start..=end` to `device`. Fails if any address is already mapped.
    pub fn map(&mut self, start: u16, end: u16, device: D) -> Result<(), CoreFault> {
        if end < start {
            return Err(CoreFault::BusConfiguration(format!(
                "{device:?}: empty range {start:#06X}-{end:#06X}"
            )));
        }
        if let Some(other) = self
            .entries
            .iter()
            .find(|e| e.start <= end && start <= e.end)
        {
            return Err(CoreFault::BusConfiguration(format!(
                "{device:?} at {start:#06X}-{end:#06X} overlaps {:?} at {:#06X}-{:#06X}",
                other.device, other.start, other.end
            )));
        }
        self.push(start, end, device);
        Ok(())
    }

    /// Map `len` addresses from `start`. Fails if the range is empty,
    /// runs past `$FFFF` or overlaps an existing mapping.
    pub fn map_len(&mut self, start: u16, len: usize, device: D) -> Result<(), CoreFault> {
        let end = (usize::from(start) + len)
            .checked_sub(1)
            .filter(|_| len > 0)
            .and_then(|end| u16::try_from(end).ok())
            .ok_or_else(|| {
                CoreFault::BusConfiguration(format!(
                    "{device:?}: {len:#X} addresses from {start:#06X} do not fit below $10000"
                ))
            })?;
        self.map(start, end, device)
    }

    /// Map `start..=end` to `device`, taking precedence over anything
    /// already mapped there.
    pub fn overlay(&mut self, start: u16, end: u16, device: D) {
        if end >= start {
            self.push(start, end, device);
        }
    }

    /// Remove every range routed to `device`.
    pub fn unmap(&mut self, device: D) {
        self.entries.retain(|e| e.device != device);
        self.rebuild();
    }

    #[must_use]
    pub fn decode(&self, address: u16) -> Option<Decoded<D>> {
        let index = self.lookup[address as usize];
        if index == UNMAPPED {
            return None;
        }
        let entry = &self.entries[index as usize];
        Some(Decoded {
            device: entry.device,
            offset: address - entry.start,
        })
    }

    /// Partition of the whole address space into runs of identical
    /// routing, `None` for holes.
    #[must_use]
    pub fn coverage(&self) -> Vec<(u16, u16, Option<D>)> {
        let mut runs: Vec<(u16, u16, Option<D>)> = Vec::new();
        for address in 0..=u16::MAX {
            let device = self.decode(address).map(|d| d.device);
            let index = self.lookup[address as usize];
            match runs.last_mut() {
                Some(run)
                    if run.2 == device
                        && self.lookup[run.1 as usize] == index =>
                {
                    run.1 = address;
                }
                _ => runs.push((address, address, device)),
            }
        }
        runs
    }

    /// Registered ranges in registration order.
    pub fn ranges(&self) -> impl Iterator<Item = (u16, u16, D)> + '_ {
        self.entries.iter().map(|e| (e.start, e.end, e.device))
    }

    fn push(&mut self, start: u16, end: u16, device: D) {
        self.entries.push(Entry { start, end, device });
        let index = (self.entries.len() - 1) as u16;
        self.lookup[start as usize..=end as usize].fill(index);
    }

    fn rebuild(&mut self) {
        self.lookup.fill(UNMAPPED);
        for (index, entry) in self.entries.iter().enumerate() {
            self.lookup[entry.start as usize..=entry.end as usize].fill(index as u16);
        }
    }
}

impl<D: Copy + PartialEq + Debug> Default for MemoryMap<D> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Dev {
        Ram,
        Rom,
        Cart,
    }

    #[test]
    fn decode_gives_offset() {
        let mut map = MemoryMap::new();
        map.map(0x1000, 0x1FFF, Dev::Rom).unwrap();
        let hit = map.decode(0x1234).unwrap();
        assert_eq!(hit.device, Dev::Rom);
        assert_eq!(hit.offset, 0x234);
        assert_eq!(map.decode(0x2000), None);
    }

    #[test]
    fn overlap_is_rejected() {
        let mut map = MemoryMap::new();
        map.map(0x0000, 0x3FFF, Dev::Ram).unwrap();
        let err = map.map(0x3F00, 0x4FFF, Dev::Cart).unwrap_err();
        assert!(matches!(err, CoreFault::BusConfiguration(_)));
        assert_eq!(map.decode(0x4000), None);
    }

    #[test]
    fn map_len_rejects_ranges_past_the_top() {
        let mut map = MemoryMap::new();
        map.map_len(0xF000, 0x1000, Dev::Rom).unwrap();
        assert_eq!(map.decode(0xFFFF).map(|d| d.offset), Some(0x0FFF));
        assert!(matches!(
            map.map_len(0xE800, 0x1000, Dev::Ram),
            Err(CoreFault::BusConfiguration(_))
        ));
        assert!(matches!(
            map.map_len(0x0000, 0x1_0001, Dev::Ram),
            Err(CoreFault::BusConfiguration(_))
        ));
        assert!(matches!(
            map.map_len(0x1000, 0, Dev::Ram),
            Err(CoreFault::BusConfiguration(_))
        ));
    }

    #[test]
    fn overlay_wins_and_unmap_restores() {
        let mut map = MemoryMap::new();
        map.map(0x5000, 0x6FFF, Dev::Cart).unwrap();
        map.overlay(0x6000, 0x60FF, Dev::Ram);
        assert_eq!(map.decode(0x6010).unwrap().device, Dev::Ram);
        assert_eq!(map.decode(0x6010).unwrap().offset, 0x10);
        map.unmap(Dev::Ram);
        assert_eq!(map.decode(0x6010).unwrap().device, Dev::Cart);
    }

    #[test]
    fn coverage_partitions_whole_space() {
        let mut map = MemoryMap::new();
        map.map(0x0000, 0x00FF, Dev::Ram).unwrap();
        map.map(0xF000, 0xFFFF, Dev::Rom).unwrap();
        let runs = map.coverage();
        assert_eq!(
            runs,
            vec![
                (0x0000, 0x00FF, Some(Dev::Ram)),
                (0x0100, 0xEFFF, None),
                (0xF000, 0xFFFF, Some(Dev::Rom)),
            ]
        );
    }
}
