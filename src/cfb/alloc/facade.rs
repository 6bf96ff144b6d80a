//! Mutual wiring between the FAT and the DIFAT.
//!
//! Growing the FAT adds an entry to the DIFAT; growing the DIFAT tags a
//! sector in the FAT. Both sides hold this facade instead of each other and
//! resolve the peer lazily through weak references.

use std::rc::{Rc, Weak};

use once_cell::unsync::OnceCell;

use super::difat::Difat;
use super::fat::Fat;
use crate::common::error::{Error, Result};

#[derive(Debug, Default)]
pub struct FatDifatFacade {
    fat: OnceCell<Weak<Fat>>,
    difat: OnceCell<Weak<Difat>>,
}

impl FatDifatFacade {
    pub fn set_fat(&self, fat: &Rc<Fat>) -> Result<()> {
        self.fat
            .set(Rc::downgrade(fat))
            .map_err(|_| Error::Structure("FAT already wired".to_string()))
    }

    pub fn set_difat(&self, difat: &Rc<Difat>) -> Result<()> {
        self.difat
            .set(Rc::downgrade(difat))
            .map_err(|_| Error::Structure("DIFAT already wired".to_string()))
    }

    pub fn fat_sector_chain(&self) -> Result<Vec<u32>> {
        Ok(self.difat()?.fat_sector_chain())
    }

    pub fn register_fat_sector_in_difat(&self, position: u32) -> Result<()> {
        self.difat()?.register_fat_sector(position)
    }

    pub fn register_difat_sector_in_fat(&self, position: u32) -> Result<()> {
        self.fat()?.register_difat_sector(position)
    }

    fn fat(&self) -> Result<Rc<Fat>> {
        self.fat
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| Error::Structure("FAT is not wired".to_string()))
    }

    fn difat(&self) -> Result<Rc<Difat>> {
        self.difat
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| Error::Structure("DIFAT is not wired".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwired_facade_reports_structure_error() {
        let facade = FatDifatFacade::default();
        assert!(matches!(facade.fat_sector_chain(), Err(Error::Structure(_))));
        assert!(matches!(
            facade.register_difat_sector_in_fat(0),
            Err(Error::Structure(_))
        ));
    }
}
