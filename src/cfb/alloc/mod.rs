//! Allocation tables: FAT, DIFAT and MiniFAT.

mod difat;
mod facade;
mod fat;
mod minifat;
mod table;

use std::rc::Rc;

pub use difat::Difat;
pub use facade::FatDifatFacade;
pub use fat::Fat;
pub use minifat::MiniFat;
pub use table::{AllocationTable, Detached, TableGrowth};

use super::header::Header;
use super::sectors::Sectors;
use crate::common::error::Result;

/// The three tables of one container, wired to each other.
#[derive(Debug, Clone)]
pub struct Tables {
    pub fat: Rc<Fat>,
    pub difat: Rc<Difat>,
    pub minifat: Rc<MiniFat>,
}

/// Load the tables described by `header` over `sectors`.
///
/// The DIFAT is opened first since the FAT's own sector list comes from it.
pub fn open_tables(sectors: &Rc<Sectors>, header: &Rc<Header>) -> Result<Tables> {
    let facade = Rc::new(FatDifatFacade::default());
    let difat = Rc::new(Difat::open(
        Rc::clone(sectors),
        Rc::clone(header),
        Rc::clone(&facade),
    )?);
    facade.set_difat(&difat)?;
    let fat = Rc::new(Fat::new(
        Rc::clone(sectors),
        Rc::clone(header),
        Rc::clone(&facade),
    )?);
    facade.set_fat(&fat)?;
    let minifat = Rc::new(MiniFat::new(
        Rc::clone(sectors),
        Rc::clone(header),
        Rc::clone(&fat),
    )?);
    Ok(Tables {
        fat,
        difat,
        minifat,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfb::consts::{
        DIFAT_NEXT_SECTOR_OFFSET, DIFAT_SECTOR_ENTRIES, DIFSECT, ENDOFCHAIN, FATSECT,
        HEADER_DIFAT_ENTRIES, HEADER_SIZE,
    };
    use crate::cfb::view::FixedSizeChunkedView;

    #[test]
    fn test_fat_overflowing_header_difat_allocates_difat_sector() {
        let backing = FixedSizeChunkedView::new(512);
        let header = Rc::new(Header::empty(backing.allocate(HEADER_SIZE).unwrap()).unwrap());
        let sectors = Rc::new(Sectors::new(backing).unwrap());
        let tables = open_tables(&sectors, &header).unwrap();

        // Enough data sectors to need more FAT sectors than the header lists.
        let mut positions = Vec::new();
        let mut previous = None;
        for _ in 0..(HEADER_DIFAT_ENTRIES + 1) * 128 {
            let position = sectors.allocate().unwrap().position();
            tables.fat.register_sector(position, previous).unwrap();
            positions.push(position);
            previous = Some(position);
        }
        assert_eq!(tables.fat.build_chain(positions[0]).unwrap(), positions);

        let fat_sectors = tables.fat.fat_sectors();
        assert!(fat_sectors.len() > HEADER_DIFAT_ENTRIES);
        assert_eq!(header.number_of_fat_sectors().unwrap() as usize, fat_sectors.len());
        assert_eq!(header.number_of_difat_sectors().unwrap(), 1);
        assert_eq!(tables.difat.fat_sector_chain(), fat_sectors);

        let difat_sector = tables.difat.difat_sector_positions()[0];
        assert_eq!(header.first_difat_sector().unwrap(), difat_sector);
        assert_eq!(tables.fat.value_at(difat_sector).unwrap(), DIFSECT);
        for fat_sector in fat_sectors {
            assert_eq!(tables.fat.value_at(fat_sector).unwrap(), FATSECT);
        }
    }

    #[test]
    fn test_second_difat_sector_is_chained() {
        let backing = FixedSizeChunkedView::new(512);
        let header = Rc::new(Header::empty(backing.allocate(HEADER_SIZE).unwrap()).unwrap());
        let sectors = Rc::new(Sectors::new(backing.clone()).unwrap());
        let tables = open_tables(&sectors, &header).unwrap();

        let count = (HEADER_DIFAT_ENTRIES + DIFAT_SECTOR_ENTRIES + 2) * 128;
        let mut first = None;
        let mut previous = None;
        for _ in 0..count {
            let position = sectors.allocate().unwrap().position();
            tables.fat.register_sector(position, previous).unwrap();
            first.get_or_insert(position);
            previous = Some(position);
        }

        let difat_sectors = tables.difat.difat_sector_positions();
        assert_eq!(difat_sectors.len(), 2);
        assert_eq!(header.number_of_difat_sectors().unwrap(), 2);
        assert_eq!(header.first_difat_sector().unwrap(), difat_sectors[0]);
        let head = sectors.sector(difat_sectors[0]).unwrap();
        let tail = sectors.sector(difat_sectors[1]).unwrap();
        assert_eq!(head.u32_at(DIFAT_NEXT_SECTOR_OFFSET).unwrap(), difat_sectors[1]);
        assert_eq!(tail.u32_at(DIFAT_NEXT_SECTOR_OFFSET).unwrap(), ENDOFCHAIN);
        for &position in &difat_sectors {
            assert_eq!(tables.fat.value_at(position).unwrap(), DIFSECT);
        }
        let fat_sectors = tables.fat.fat_sectors();
        assert!(fat_sectors.len() > HEADER_DIFAT_ENTRIES + DIFAT_SECTOR_ENTRIES);

        let reopened = FixedSizeChunkedView::from_bytes(512, backing.to_vec()).unwrap();
        let header = Rc::new(Header::new(reopened.chunk(0).unwrap()).unwrap());
        let sectors = Rc::new(Sectors::new(reopened).unwrap());
        let tables = open_tables(&sectors, &header).unwrap();
        assert_eq!(tables.difat.difat_sector_positions(), difat_sectors);
        assert_eq!(tables.fat.fat_sectors(), fat_sectors);
        for fat_sector in fat_sectors {
            assert_eq!(tables.fat.value_at(fat_sector).unwrap(), FATSECT);
        }
        let chain = tables.fat.build_chain(first.unwrap()).unwrap();
        assert_eq!(chain.len(), count);
        assert_eq!(tables.fat.value_at(previous.unwrap()).unwrap(), ENDOFCHAIN);
    }

    #[test]
    fn test_reopen_sees_same_tables() {
        let backing = FixedSizeChunkedView::new(512);
        let header = Rc::new(Header::empty(backing.allocate(HEADER_SIZE).unwrap()).unwrap());
        let sectors = Rc::new(Sectors::new(backing.clone()).unwrap());
        let tables = open_tables(&sectors, &header).unwrap();
        let positions: Vec<u32> = (0..3).map(|_| sectors.allocate().unwrap().position()).collect();
        tables.fat.register_sector(positions[0], None).unwrap();
        tables.fat.register_sector(positions[1], Some(positions[0])).unwrap();
        tables.fat.register_sector(positions[2], Some(positions[1])).unwrap();

        let bytes = backing.to_vec();
        let reopened = FixedSizeChunkedView::from_bytes(512, bytes).unwrap();
        let header = Rc::new(Header::new(reopened.chunk(0).unwrap()).unwrap());
        let sectors = Rc::new(Sectors::new(reopened).unwrap());
        let tables = open_tables(&sectors, &header).unwrap();
        assert_eq!(tables.fat.build_chain(positions[0]).unwrap(), positions);
    }
}
