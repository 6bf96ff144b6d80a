//! The main File Allocation Table.

use std::rc::Rc;

use tracing::debug;

use super::facade::FatDifatFacade;
use super::table::{AllocationTable, TableGrowth};
use crate::cfb::consts::{DIFSECT, FATSECT};
use crate::cfb::header::Header;
use crate::cfb::sectors::Sectors;
use crate::common::error::Result;

/// Sector chain table for regular sectors.
///
/// Its own sectors are listed by the DIFAT, tagged `FATSECT` in the table
/// itself, and counted in the header.
#[derive(Debug)]
pub struct Fat {
    table: AllocationTable,
    header: Rc<Header>,
    difat: Rc<FatDifatFacade>,
}

impl Fat {
    /// Load the FAT whose sectors the DIFAT (reached through `difat`) lists.
    pub fn new(
        sectors: Rc<Sectors>,
        header: Rc<Header>,
        difat: Rc<FatDifatFacade>,
    ) -> Result<Self> {
        let chain = difat.fat_sector_chain()?;
        Ok(Self {
            table: AllocationTable::new(sectors, chain),
            header,
            difat,
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

    /// Tag `position` as a DIFAT sector.
    pub fn register_difat_sector(&self, position: u32) -> Result<()> {
        self.table.set_value(self, position, DIFSECT)
    }

    pub fn fat_sectors(&self) -> Vec<u32> {
        self.table.table_sectors()
    }
}

impl TableGrowth for Fat {
    fn table_sector_allocated(&self, table: &AllocationTable, position: u32) -> Result<()> {
        debug!(position, count = table.table_sector_count(), "allocated FAT sector");
        // DIFAT first so its order matches the chain even if tagging below
        // allocates further FAT sectors.
        self.difat.register_fat_sector_in_difat(position)?;
        self.header
            .set_number_of_fat_sectors(table.table_sector_count() as u32)?;
        table.set_value(self, position, FATSECT)
    }
}
