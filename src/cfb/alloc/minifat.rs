//! The MiniFAT: chains of 64-byte mini sectors inside the mini stream.

use std::rc::Rc;

use tracing::debug;

use super::fat::Fat;
use super::table::{AllocationTable, TableGrowth};
use crate::cfb::header::Header;
use crate::cfb::sectors::Sectors;
use crate::common::error::Result;

/// Sector chain table for mini sectors.
///
/// The table's own sectors form an ordinary FAT chain starting at the
/// header's first MiniFAT sector.
#[derive(Debug)]
pub struct MiniFat {
    table: AllocationTable,
    header: Rc<Header>,
    fat: Rc<Fat>,
}

impl MiniFat {
    pub fn new(sectors: Rc<Sectors>, header: Rc<Header>, fat: Rc<Fat>) -> Result<Self> {
        let chain = fat.build_chain(header.first_minifat_sector()?)?;
        Ok(Self {
            table: AllocationTable::new(sectors, chain),
            header,
            fat,
        })
    }

    pub fn build_chain(&self, start: u32) -> Result<Vec<u32>> {
        self.table.build_chain(start)
    }

    pub fn value_at(&self, position: u32) -> Result<u32> {
        self.table.value_at(position)
    }

    pub fn register_sector(&self, position: u32, previous: Option<u32>) -> Result<()> {
        self.table.register_sector(self, position, previous)
    }

    pub fn minifat_sectors(&self) -> Vec<u32> {
        self.table.table_sectors()
    }
}

impl TableGrowth for MiniFat {
    fn table_sector_allocated(&self, table: &AllocationTable, position: u32) -> Result<()> {
        let chain = table.table_sectors();
        let previous = chain.len().checked_sub(2).map(|i| chain[i]);
        debug!(position, count = chain.len(), "allocated MiniFAT sector");
        self.fat.register_sector(position, previous)?;
        self.header.set_number_of_minifat_sectors(chain.len() as u32)?;
        if chain.len() == 1 {
            self.header.set_first_minifat_sector(position)?;
        }
        Ok(())
    }
}
