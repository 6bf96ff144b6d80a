//! Double-indirect FAT: the registry of FAT sector positions.
//!
//! The first 109 entries live in the header; further entries go to a chain
//! of DIFAT sectors, 127 entries each, linked through their last slot.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use super::facade::FatDifatFacade;
use crate::cfb::consts::{self, DIFAT_NEXT_SECTOR_OFFSET, DIFAT_SECTOR_ENTRIES, ENDOFCHAIN};
use crate::cfb::header::Header;
use crate::cfb::sectors::{Sector, Sectors};
use crate::common::error::{Error, Result};

#[derive(Debug)]
struct DifatSector {
    sector: Sector,
    fat_sectors: Vec<u32>,
}

impl DifatSector {
    fn load(sector: Sector) -> Result<Self> {
        let mut fat_sectors = Vec::new();
        for slot in 0..DIFAT_SECTOR_ENTRIES {
            let entry = sector.u32_at(slot * 4)?;
            if consts::is_free_or_nostream(entry) {
                break;
            }
            fat_sectors.push(entry);
        }
        Ok(Self {
            sector,
            fat_sectors,
        })
    }

    fn has_free_slot(&self) -> bool {
        self.fat_sectors.len() < DIFAT_SECTOR_ENTRIES
    }

    fn push(&mut self, position: u32) -> Result<()> {
        if !self.has_free_slot() {
            return Err(Error::Capacity(format!(
                "DIFAT sector {} is full",
                self.sector.position()
            )));
        }
        self.sector.set_u32(self.fat_sectors.len() * 4, position)?;
        self.fat_sectors.push(position);
        Ok(())
    }

    fn next(&self) -> Result<u32> {
        self.sector.u32_at(DIFAT_NEXT_SECTOR_OFFSET)
    }
}

#[derive(Debug)]
pub struct Difat {
    sectors: Rc<Sectors>,
    header: Rc<Header>,
    fat: Rc<FatDifatFacade>,
    difat_sectors: RefCell<Vec<DifatSector>>,
}

impl Difat {
    /// Read the DIFAT sector chain starting at the header's first DIFAT sector.
    pub fn open(sectors: Rc<Sectors>, header: Rc<Header>, fat: Rc<FatDifatFacade>) -> Result<Self> {
        let mut difat_sectors = Vec::new();
        let mut next = header.first_difat_sector()?;
        while next != ENDOFCHAIN && !consts::is_free_or_nostream(next) {
            if difat_sectors.len() > sectors.len() {
                return Err(Error::Structure("DIFAT sector chain loops".to_string()));
            }
            let sector = DifatSector::load(sectors.sector(next)?)?;
            next = sector.next()?;
            difat_sectors.push(sector);
        }
        Ok(Self {
            sectors,
            header,
            fat,
            difat_sectors: RefCell::new(difat_sectors),
        })
    }

    /// All FAT sector positions: header entries first, then DIFAT sectors.
    pub fn fat_sector_chain(&self) -> Vec<u32> {
        let mut chain = self.header.difat_entries();
        for sector in self.difat_sectors.borrow().iter() {
            chain.extend_from_slice(&sector.fat_sectors);
        }
        chain
    }

    pub fn difat_sector_positions(&self) -> Vec<u32> {
        self.difat_sectors
            .borrow()
            .iter()
            .map(|s| s.sector.position())
            .collect()
    }

    pub fn register_fat_sector(&self, position: u32) -> Result<()> {
        if self.header.can_fit_more_difat_entries() {
            return self.header.register_fat_sector(position);
        }
        let tail_full = self
            .difat_sectors
            .borrow()
            .last()
            .is_none_or(|tail| !tail.has_free_slot());
        if !tail_full {
            return self.push_to_tail(position);
        }

        let sector = self.sectors.allocate_difat()?;
        {
            let mut difat_sectors = self.difat_sectors.borrow_mut();
            match difat_sectors.last() {
                None => self.header.set_first_difat_sector(sector.position())?,
                Some(previous) => previous
                    .sector
                    .set_u32(DIFAT_NEXT_SECTOR_OFFSET, sector.position())?,
            }
            difat_sectors.push(DifatSector {
                sector: sector.clone(),
                fat_sectors: Vec::new(),
            });
            self.header
                .set_number_of_difat_sectors(difat_sectors.len() as u32)?;
        }
        debug!(position = sector.position(), "allocated DIFAT sector");
        // The FAT sector is recorded before the FAT tags the DIFAT sector,
        // which may itself register more FAT sectors.
        self.push_to_tail(position)?;
        self.fat.register_difat_sector_in_fat(sector.position())
    }

    fn push_to_tail(&self, position: u32) -> Result<()> {
        let mut difat_sectors = self.difat_sectors.borrow_mut();
        let tail = difat_sectors
            .last_mut()
            .ok_or_else(|| Error::Structure("no DIFAT sector to extend".to_string()))?;
        tail.push(position)
    }
}
