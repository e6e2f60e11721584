//! Plain memory devices: RAM, ROM and a bank-switched ROM window.
//!
//! Cells are stored as `u16` for both machine families. Byte machines map
//! RAM with an 8-bit width, the Intellivision uses 8-, 10- and 16-bit RAM
//! and 10-bit or 16-bit ROM images.

use serde::{Deserialize, Serialize};

/// Read/write memory whose cells hold `width` significant bits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ram {
    cells: Vec<u16>,
    mask: u16,
}

impl Ram {
    /// `width` is the number of data bits per cell (1-16).
    #[must_use]
    pub fn new(len: usize, width: u8) -> Self {
        let mask = if width >= 16 {
            0xFFFF
        } else {
            (1u16 << width) - 1
        };
        Self {
            cells: vec![0; len.max(1)],
            mask,
        }
    }

    /// Offsets beyond the end wrap (mirrored RAM).
    #[must_use]
    pub fn read(&self, offset: u16) -> u16 {
        self.cells[offset as usize % self.cells.len()]
    }

    pub fn write(&mut self, offset: u16, value: u16) {
        let len = self.cells.len();
        self.cells[offset as usize % len] = value & self.mask;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[must_use]
    pub fn cells(&self) -> &[u16] {
        &self.cells
    }

    pub fn clear(&mut self) {
        self.cells.fill(0);
    }
}

/// Read-only memory. Contents are fixed once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rom {
    data: Vec<u16>,
}

impl Rom {
    #[must_use]
    pub fn new(data: Vec<u16>) -> Self {
        Self { data }
    }

    /// One cell per byte.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            data: bytes.iter().map(|&b| u16::from(b)).collect(),
        }
    }

    /// Offsets beyond the end read as open bus (`None`).
    #[must_use]
    pub fn read(&self, offset: u16) -> Option<u16> {
        self.data.get(offset as usize).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn data(&self) -> &[u16] {
        &self.data
    }
}

/// How a [`RomBanker`] decides which page is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankTrigger {
    /// A write to window offset `offset` whose value matches `value` under
    /// `mask` selects page `value & page_mask`.
    Write {
        offset: u16,
        mask: u16,
        value: u16,
        page_mask: u16,
    },
    /// Any read or write of window offsets `first..first + count` selects
    /// page `offset - first`.
    Access { first: u16, count: u16 },
}

/// A ROM window backed by several switchable pages.
///
/// Reads see the page active when the read happens; an access that also
/// switches pages takes effect for the following access.
#[derive(Debug, Clone)]
pub struct RomBanker {
    pages: Vec<(u16, Rom)>,
    active: Option<usize>,
    trigger: BankTrigger,
}

impl RomBanker {
    #[must_use]
    pub fn new(trigger: BankTrigger) -> Self {
        Self {
            pages: Vec::new(),
            active: None,
            trigger,
        }
    }

    /// Add a page. The first page added becomes visible.
    pub fn add_page(&mut self, page: u16, rom: Rom) {
        self.pages.push((page, rom));
        if self.active.is_none() {
            self.active = Some(self.pages.len() - 1);
        }
    }

    /// Read through the active page. `None` means no page is visible.
    pub fn read(&mut self, offset: u16) -> Option<u16> {
        let value = self.peek(offset);
        if let BankTrigger::Access { first, count } = self.trigger {
            if offset >= first && offset < first + count {
                self.select_page(offset - first);
            }
        }
        value
    }

    /// Read the active page without triggering a switch.
    #[must_use]
    pub fn peek(&self, offset: u16) -> Option<u16> {
        self.active
            .and_then(|index| self.pages[index].1.read(offset))
    }

    pub fn write(&mut self, offset: u16, value: u16) {
        match self.trigger {
            BankTrigger::Write {
                offset: trigger_offset,
                mask,
                value: expected,
                page_mask,
            } => {
                if offset == trigger_offset && value & mask == expected {
                    self.select_page(value & page_mask);
                }
            }
            BankTrigger::Access { first, count } => {
                if offset >= first && offset < first + count {
                    self.select_page(offset - first);
                }
            }
        }
    }

    /// Make `page` visible; selecting a page that was never added leaves
    /// the window unmapped.
    pub fn select_page(&mut self, page: u16) {
        self.active = self.pages.iter().position(|(p, _)| *p == page);
    }

    #[must_use]
    pub fn active_page(&self) -> Option<u16> {
        self.active.map(|index| self.pages[index].0)
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ram_masks_to_width() {
        let mut ram = Ram::new(16, 8);
        ram.write(3, 0x1234);
        assert_eq!(ram.read(3), 0x34);
        let mut ram = Ram::new(16, 10);
        ram.write(3, 0xFFFF);
        assert_eq!(ram.read(3), 0x3FF);
    }

    #[test]
    fn ram_mirrors_past_end() {
        let mut ram = Ram::new(4, 16);
        ram.write(5, 0xBEEF);
        assert_eq!(ram.read(1), 0xBEEF);
    }

    #[test]
    fn rom_past_end_is_open_bus() {
        let rom = Rom::new(vec![1, 2, 3]);
        assert_eq!(rom.read(2), Some(3));
        assert_eq!(rom.read(3), None);
    }

    #[test]
    fn write_trigger_switches_page() {
        let mut banker = RomBanker::new(BankTrigger::Write {
            offset: 0xFFF,
            mask: 0xFFF0,
            value: 0x2A50,
            page_mask: 0x000F,
        });
        banker.add_page(0, Rom::new(vec![0x100; 0x1000]));
        banker.add_page(1, Rom::new(vec![0x200; 0x1000]));
        assert_eq!(banker.read(0), Some(0x100));

        banker.write(0xFFF, 0x1234);
        assert_eq!(banker.active_page(), Some(0));

        banker.write(0xFFF, 0x2A51);
        assert_eq!(banker.active_page(), Some(1));
        assert_eq!(banker.read(0), Some(0x200));

        banker.write(0xFFF, 0x2A57);
        assert_eq!(banker.active_page(), None);
        assert_eq!(banker.read(0), None);
    }

    #[test]
    fn access_trigger_read_sees_old_page() {
        let mut banker = RomBanker::new(BankTrigger::Access {
            first: 0xFF6,
            count: 4,
        });
        for page in 0..4u16 {
            banker.add_page(page, Rom::new(vec![page; 0x1000]));
        }
        assert_eq!(banker.peek(0xFF8), Some(0));
        assert_eq!(banker.active_page(), Some(0));
        assert_eq!(banker.read(0xFF8), Some(0));
        assert_eq!(banker.active_page(), Some(2));
        assert_eq!(banker.read(0x10), Some(2));
    }
}
