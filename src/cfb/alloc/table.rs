//! Generic sector-chain table shared by the FAT and the MiniFAT.

use std::cell::RefCell;
use std::rc::Rc;

use fixedbitset::FixedBitSet;

use crate::cfb::consts::{ENDOFCHAIN, ENTRIES_PER_TABLE_SECTOR, FREESECT};
use crate::cfb::sectors::{Sector, Sectors};
use crate::common::error::{Error, Result};

/// Hook invoked whenever a table grows by one sector of its own.
///
/// The FAT tags the new sector and registers it in the DIFAT; the MiniFAT
/// chains it through the FAT. A bare table does nothing.
pub trait TableGrowth {
    fn table_sector_allocated(&self, table: &AllocationTable, position: u32) -> Result<()>;
}

/// Growth hook for a table with no external bookkeeping.
#[derive(Debug, Default, Clone, Copy)]
pub struct Detached;

impl TableGrowth for Detached {
    fn table_sector_allocated(&self, _table: &AllocationTable, _position: u32) -> Result<()> {
        Ok(())
    }
}

/// Maps every unit (sector or mini sector) to its successor in a chain.
///
/// The table itself is stored in the sectors listed in `chain`, 128 slots
/// of 4 bytes per sector.
#[derive(Debug)]
pub struct AllocationTable {
    sectors: Rc<Sectors>,
    chain: RefCell<Vec<u32>>,
}

#[inline]
fn slot_offset(position: u32) -> usize {
    position as usize % ENTRIES_PER_TABLE_SECTOR * 4
}

impl AllocationTable {
    pub fn new(sectors: Rc<Sectors>, chain: Vec<u32>) -> Self {
        Self {
            sectors,
            chain: RefCell::new(chain),
        }
    }

    /// Positions of the sectors holding this table.
    pub fn table_sectors(&self) -> Vec<u32> {
        self.chain.borrow().clone()
    }

    pub fn table_sector_count(&self) -> usize {
        self.chain.borrow().len()
    }

    /// Follow successors from `start` until `ENDOFCHAIN`.
    ///
    /// A start that is itself a marker yields an empty chain.
    pub fn build_chain(&self, start: u32) -> Result<Vec<u32>> {
        if start >= crate::cfb::consts::DIFSECT {
            return Ok(Vec::new());
        }
        let capacity = self.table_sector_count() * ENTRIES_PER_TABLE_SECTOR;
        let mut chain = Vec::new();
        let mut visited = FixedBitSet::with_capacity(capacity);
        let mut current = start;
        while current != ENDOFCHAIN {
            if current == FREESECT || current >= crate::cfb::consts::DIFSECT {
                return Err(Error::premature_end_of_chain());
            }
            let index = current as usize;
            if index >= capacity {
                return Err(Error::out_of_bounds("chain sector", index, capacity));
            }
            if visited.put(index) {
                return Err(Error::Structure(format!(
                    "chain starting at {start} loops back to {current}"
                )));
            }
            chain.push(current);
            current = self.value_at(current)?;
        }
        Ok(chain)
    }

    /// Slot value for `position`.
    pub fn value_at(&self, position: u32) -> Result<u32> {
        let index = position as usize / ENTRIES_PER_TABLE_SECTOR;
        let table_sector = {
            let chain = self.chain.borrow();
            chain
                .get(index)
                .copied()
                .ok_or_else(|| Error::out_of_bounds("allocation table sector", index, chain.len()))?
        };
        self.sectors.sector(table_sector)?.u32_at(slot_offset(position))
    }

    /// Terminate a chain at `position`, linking `previous` to it when given.
    pub fn register_sector<G>(&self, growth: &G, position: u32, previous: Option<u32>) -> Result<()>
    where
        G: TableGrowth + ?Sized,
    {
        self.set_value(growth, position, ENDOFCHAIN)?;
        if let Some(previous) = previous {
            self.set_value(growth, previous, position)?;
        }
        Ok(())
    }

    /// Write `value` into the slot of `position`, growing the table as needed.
    pub fn set_value<G>(&self, growth: &G, position: u32, value: u32) -> Result<()>
    where
        G: TableGrowth + ?Sized,
    {
        self.table_sector_for(growth, position)?
            .set_u32(slot_offset(position), value)
    }

    fn table_sector_for<G>(&self, growth: &G, position: u32) -> Result<Sector>
    where
        G: TableGrowth + ?Sized,
    {
        let index = position as usize / ENTRIES_PER_TABLE_SECTOR;
        loop {
            let existing = self.chain.borrow().get(index).copied();
            match existing {
                Some(table_sector) => return self.sectors.sector(table_sector),
                None => self.allocate_table_sector(growth)?,
            }
        }
    }

    fn allocate_table_sector<G>(&self, growth: &G) -> Result<()>
    where
        G: TableGrowth + ?Sized,
    {
        let sector = self.sectors.allocate()?;
        self.chain.borrow_mut().push(sector.position());
        growth.table_sector_allocated(self, sector.position())
    }
}
