//! The 128-byte directory entry record.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use smallvec::SmallVec;

use crate::cfb::consts::{
    self, DIRENTRY_SIZE, ENDOFCHAIN, MAX_NAME_CHARS, NAME_FIELD_SIZE, NOSTREAM, ROOT_ENTRY_NAME,
    direntry as off,
};
use crate::cfb::tree::Color;
use crate::cfb::view::SimpleView;
use crate::common::binary::{decode_utf16le, encode_utf16le};
use crate::common::error::{Error, Result};

/// Entry id of the root storage.
pub const ROOT_ID: u32 = 0;

/// 100ns intervals between 1601-01-01 and 1970-01-01
const FILETIME_UNIX_OFFSET: i64 = 116_444_736_000_000_000;

/// Stored object type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Empty,
    Storage,
    Stream,
    Root,
}

impl ObjectType {
    pub fn from_byte(tag: u8) -> Result<Self> {
        match tag {
            consts::STGTY_EMPTY => Ok(ObjectType::Empty),
            consts::STGTY_STORAGE => Ok(ObjectType::Storage),
            consts::STGTY_STREAM => Ok(ObjectType::Stream),
            consts::STGTY_ROOT => Ok(ObjectType::Root),
            other => Err(Error::Structure(format!("unknown object type {other}"))),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            ObjectType::Empty => consts::STGTY_EMPTY,
            ObjectType::Storage => consts::STGTY_STORAGE,
            ObjectType::Stream => consts::STGTY_STREAM,
            ObjectType::Root => consts::STGTY_ROOT,
        }
    }
}

/// Sibling ordering key: UTF-16 length first, then the uppercased code units.
pub type NameKey = (usize, SmallVec<[u16; MAX_NAME_CHARS]>);

/// Ordering key of `name`.
pub fn name_key(name: &str) -> NameKey {
    let units: SmallVec<[u16; MAX_NAME_CHARS]> = name.to_uppercase().encode_utf16().collect();
    (name.encode_utf16().count(), units)
}

/// Compare two sibling names the way the directory tree orders them.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    name_key(a).cmp(&name_key(b))
}

/// Reject names the record cannot hold.
pub fn validate_name(name: &str) -> Result<()> {
    let units = name.encode_utf16().count();
    if units == 0 {
        return Err(Error::InvalidName("name must not be empty".to_string()));
    }
    if units > MAX_NAME_CHARS {
        return Err(Error::InvalidName(format!(
            "{name:?} is {units} UTF-16 units long, at most {MAX_NAME_CHARS} fit"
        )));
    }
    Ok(())
}

fn link(value: u32) -> Option<u32> {
    if consts::is_free_or_nostream(value) || value == ENDOFCHAIN {
        None
    } else {
        Some(value)
    }
}

/// Raw FILETIME to UTC. Zero means "not set".
pub fn filetime_to_datetime(filetime: u64) -> Option<DateTime<Utc>> {
    if filetime == 0 {
        return None;
    }
    let unix_ticks = i64::try_from(filetime).ok()? - FILETIME_UNIX_OFFSET;
    DateTime::from_timestamp(
        unix_ticks.div_euclid(10_000_000),
        (unix_ticks.rem_euclid(10_000_000) * 100) as u32,
    )
}

/// UTC to raw FILETIME, `None` outside the range FILETIME can represent.
pub fn datetime_to_filetime(time: DateTime<Utc>) -> Option<u64> {
    let ticks = time
        .timestamp()
        .checked_mul(10_000_000)?
        .checked_add(i64::from(time.timestamp_subsec_nanos() / 100))?
        .checked_add(FILETIME_UNIX_OFFSET)?;
    u64::try_from(ticks).ok()
}

/// One directory entry, read and written in place.
///
/// Every accessor goes straight to the record bytes; nothing is cached.
#[derive(Clone, Debug)]
pub struct EntryRecord {
    sid: u32,
    view: SimpleView,
}

impl EntryRecord {
    /// Wrap an existing record.
    pub fn load(sid: u32, view: SimpleView) -> Result<Self> {
        if view.len() != DIRENTRY_SIZE {
            return Err(Error::InvalidFormat(format!(
                "directory entry {sid} is {} bytes, expected {DIRENTRY_SIZE}",
                view.len()
            )));
        }
        let record = Self { sid, view };
        let name_length = record.name_length()?;
        if name_length > NAME_FIELD_SIZE {
            return Err(Error::InvalidFormat(format!(
                "directory entry {sid} name length {name_length} exceeds {NAME_FIELD_SIZE}"
            )));
        }
        Ok(record)
    }

    /// Initialize `view` as a fresh entry with no links and no data.
    pub fn init(
        sid: u32,
        view: SimpleView,
        name: &str,
        object_type: ObjectType,
        color: Color,
    ) -> Result<Self> {
        validate_name(name)?;
        if view.len() != DIRENTRY_SIZE {
            return Err(Error::out_of_bounds("directory entry view", view.len(), DIRENTRY_SIZE));
        }
        view.fill(&[0])?;
        let record = Self { sid, view };
        record.write_name(name)?;
        record.view.set_u8(off::OBJECT_TYPE, object_type.to_byte())?;
        record.set_color(color)?;
        record.view.set_u32(off::LEFT_SIBLING, NOSTREAM)?;
        record.view.set_u32(off::RIGHT_SIBLING, NOSTREAM)?;
        record.view.set_u32(off::CHILD, NOSTREAM)?;
        record.view.set_u32(off::STARTING_SECTOR, ENDOFCHAIN)?;
        record.view.set_u64(off::STREAM_SIZE, 0)?;
        Ok(record)
    }

    #[inline]
    pub fn sid(&self) -> u32 {
        self.sid
    }

    pub fn is_root(&self) -> Result<bool> {
        Ok(self.object_type()? == ObjectType::Root)
    }

    pub fn name(&self) -> Result<String> {
        Ok(decode_utf16le(&self.view.read(off::NAME..off::NAME + NAME_FIELD_SIZE)?)?)
    }

    /// Stored name length in bytes, terminator included.
    pub fn name_length(&self) -> Result<usize> {
        Ok(usize::from(self.view.u16_at(off::NAME_LENGTH)?))
    }

    /// Name length in UTF-16 code units, terminator excluded.
    pub fn name_len_chars(&self) -> Result<usize> {
        Ok(self.name_length()?.saturating_sub(2) / 2)
    }

    pub fn set_name(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        if self.is_root()? && name != ROOT_ENTRY_NAME {
            return Err(Error::InvalidName(format!(
                "the root entry is always named {ROOT_ENTRY_NAME:?}"
            )));
        }
        self.write_name(name)
    }

    fn write_name(&self, name: &str) -> Result<()> {
        let mut field = encode_utf16le(name);
        let length = field.len() + 2;
        field.resize(NAME_FIELD_SIZE, 0);
        self.view.write_at(off::NAME, &field)?;
        self.view.set_u16(off::NAME_LENGTH, length as u16)
    }

    pub fn key(&self) -> Result<NameKey> {
        Ok(name_key(&self.name()?))
    }

    pub fn object_type(&self) -> Result<ObjectType> {
        ObjectType::from_byte(self.view.u8_at(off::OBJECT_TYPE)?)
    }

    pub fn color(&self) -> Result<Color> {
        Ok(Color::from_flag(self.view.u8_at(off::COLOR)?))
    }

    pub fn set_color(&self, color: Color) -> Result<()> {
        self.view.set_u8(off::COLOR, color.flag())
    }

    pub fn left_sibling(&self) -> Result<Option<u32>> {
        Ok(link(self.view.u32_at(off::LEFT_SIBLING)?))
    }

    pub fn right_sibling(&self) -> Result<Option<u32>> {
        Ok(link(self.view.u32_at(off::RIGHT_SIBLING)?))
    }

    pub fn set_left_sibling(&self, sibling: Option<u32>) -> Result<()> {
        self.set_sibling(off::LEFT_SIBLING, sibling)
    }

    pub fn set_right_sibling(&self, sibling: Option<u32>) -> Result<()> {
        self.set_sibling(off::RIGHT_SIBLING, sibling)
    }

    fn set_sibling(&self, offset: usize, sibling: Option<u32>) -> Result<()> {
        if sibling.is_some() && self.is_root()? {
            return Err(Error::Structure("the root entry cannot have siblings".to_string()));
        }
        self.view.set_u32(offset, sibling.unwrap_or(NOSTREAM))
    }

    pub fn child(&self) -> Result<Option<u32>> {
        let child = link(self.view.u32_at(off::CHILD)?);
        if child == Some(ROOT_ID) {
            return Err(Error::Structure(format!(
                "entry {} names the root entry as its child",
                self.sid
            )));
        }
        Ok(child)
    }

    pub fn set_child(&self, child: Option<u32>) -> Result<()> {
        if child == Some(ROOT_ID) {
            return Err(Error::Structure("the root entry cannot be a child".to_string()));
        }
        self.view.set_u32(off::CHILD, child.unwrap_or(NOSTREAM))
    }

    pub fn clsid(&self) -> Result<[u8; 16]> {
        let mut clsid = [0u8; 16];
        clsid.copy_from_slice(&self.view.read(off::CLSID..off::CLSID + 16)?);
        Ok(clsid)
    }

    pub fn set_clsid(&self, clsid: &[u8; 16]) -> Result<()> {
        self.view.write_at(off::CLSID, clsid)
    }

    pub fn state_bits(&self) -> Result<u32> {
        self.view.u32_at(off::STATE_BITS)
    }

    pub fn set_state_bits(&self, bits: u32) -> Result<()> {
        self.view.set_u32(off::STATE_BITS, bits)
    }

    /// Raw FILETIME; see [`filetime_to_datetime`].
    pub fn creation_time(&self) -> Result<u64> {
        self.view.u64_at(off::CREATION_TIME)
    }

    pub fn set_creation_time(&self, filetime: u64) -> Result<()> {
        self.view.set_u64(off::CREATION_TIME, filetime)
    }

    pub fn modified_time(&self) -> Result<u64> {
        self.view.u64_at(off::MODIFIED_TIME)
    }

    pub fn set_modified_time(&self, filetime: u64) -> Result<()> {
        self.view.set_u64(off::MODIFIED_TIME, filetime)
    }

    pub fn starting_sector(&self) -> Result<u32> {
        self.view.u32_at(off::STARTING_SECTOR)
    }

    pub fn set_starting_sector(&self, position: u32) -> Result<()> {
        self.view.set_u32(off::STARTING_SECTOR, position)
    }

    /// Stream size. Version 3 files only define the low 32 bits.
    pub fn stream_size(&self) -> Result<u64> {
        Ok(u64::from(self.view.u32_at(off::STREAM_SIZE)?))
    }

    pub fn set_stream_size(&self, size: u64) -> Result<()> {
        self.view.set_u64(off::STREAM_SIZE, size)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn record(name: &str, object_type: ObjectType) -> EntryRecord {
        let view = SimpleView::zeroed(DIRENTRY_SIZE);
        EntryRecord::init(1, view, name, object_type, Color::Red).unwrap()
    }

    #[test]
    fn test_init_layout() {
        let entry = record("Stream", ObjectType::Stream);
        assert_eq!(entry.name().unwrap(), "Stream");
        assert_eq!(entry.name_length().unwrap(), 14);
        assert_eq!(entry.name_len_chars().unwrap(), 6);
        assert_eq!(entry.object_type().unwrap(), ObjectType::Stream);
        assert_eq!(entry.color().unwrap(), Color::Red);
        assert_eq!(entry.left_sibling().unwrap(), None);
        assert_eq!(entry.right_sibling().unwrap(), None);
        assert_eq!(entry.child().unwrap(), None);
        assert_eq!(entry.starting_sector().unwrap(), ENDOFCHAIN);
        assert_eq!(entry.stream_size().unwrap(), 0);
        assert_eq!(entry.clsid().unwrap(), [0u8; 16]);
        assert_eq!(entry.view.u32_at(off::LEFT_SIBLING).unwrap(), NOSTREAM);
    }

    #[test]
    fn test_name_limits() {
        let view = SimpleView::zeroed(DIRENTRY_SIZE);
        assert!(matches!(
            EntryRecord::init(1, view.clone(), "", ObjectType::Stream, Color::Red),
            Err(Error::InvalidName(_))
        ));
        let longest = "x".repeat(MAX_NAME_CHARS);
        let entry =
            EntryRecord::init(1, view.clone(), &longest, ObjectType::Stream, Color::Red).unwrap();
        assert_eq!(entry.name_length().unwrap(), NAME_FIELD_SIZE);
        assert!(matches!(entry.set_name(&"x".repeat(32)), Err(Error::InvalidName(_))));
        entry.set_name("short").unwrap();
        assert_eq!(entry.name().unwrap(), "short");
    }

    #[test]
    fn test_root_rules() {
        let root = record(ROOT_ENTRY_NAME, ObjectType::Root);
        assert!(matches!(root.set_left_sibling(Some(3)), Err(Error::Structure(_))));
        assert!(matches!(root.set_right_sibling(Some(3)), Err(Error::Structure(_))));
        root.set_left_sibling(None).unwrap();
        assert!(matches!(root.set_name("Other"), Err(Error::InvalidName(_))));
        root.set_name(ROOT_ENTRY_NAME).unwrap();

        root.view.set_u32(off::CHILD, ROOT_ID).unwrap();
        assert!(matches!(root.child(), Err(Error::Structure(_))));
    }

    #[test]
    fn test_links_treat_markers_as_absent() {
        let entry = record("a", ObjectType::Storage);
        entry.set_left_sibling(Some(4)).unwrap();
        entry.set_child(Some(7)).unwrap();
        assert_eq!(entry.left_sibling().unwrap(), Some(4));
        assert_eq!(entry.child().unwrap(), Some(7));
        entry.view.set_u32(off::RIGHT_SIBLING, ENDOFCHAIN).unwrap();
        assert_eq!(entry.right_sibling().unwrap(), None);
    }

    #[test]
    fn test_metadata_fields() {
        let entry = record("meta", ObjectType::Storage);
        let clsid = [0xAB; 16];
        entry.set_clsid(&clsid).unwrap();
        entry.set_state_bits(0x0102_0304).unwrap();
        entry.set_creation_time(1).unwrap();
        entry.set_modified_time(u64::MAX).unwrap();
        assert_eq!(entry.clsid().unwrap(), clsid);
        assert_eq!(entry.state_bits().unwrap(), 0x0102_0304);
        assert_eq!(entry.creation_time().unwrap(), 1);
        assert_eq!(entry.modified_time().unwrap(), u64::MAX);
        assert_eq!(entry.name().unwrap(), "meta");
    }

    #[test]
    fn test_stream_size_writes_eight_bytes() {
        let entry = record("s", ObjectType::Stream);
        entry.view.set_u64(off::STREAM_SIZE, u64::MAX).unwrap();
        entry.set_stream_size(4096).unwrap();
        assert_eq!(entry.view.u64_at(off::STREAM_SIZE).unwrap(), 4096);
        assert_eq!(entry.stream_size().unwrap(), 4096);
    }

    #[test]
    fn test_name_ordering() {
        assert_eq!(compare_names("b", "aa"), Ordering::Less);
        assert_eq!(compare_names("abc", "ABC"), Ordering::Equal);
        assert_eq!(compare_names("abd", "ABC"), Ordering::Greater);
    }

    #[test]
    fn test_load_rejects_bad_records() {
        assert!(EntryRecord::load(0, SimpleView::zeroed(64)).is_err());
        let view = SimpleView::zeroed(DIRENTRY_SIZE);
        view.set_u16(off::NAME_LENGTH, 66).unwrap();
        assert!(EntryRecord::load(0, view).is_err());
    }

    #[test]
    fn test_unknown_object_type() {
        let view = SimpleView::zeroed(DIRENTRY_SIZE);
        view.set_u8(off::OBJECT_TYPE, 9).unwrap();
        let entry = EntryRecord::load(2, view).unwrap();
        assert!(matches!(entry.object_type(), Err(Error::Structure(_))));
    }

    #[test]
    fn test_filetime_conversion() {
        assert_eq!(filetime_to_datetime(0), None);
        let epoch = filetime_to_datetime(FILETIME_UNIX_OFFSET as u64).unwrap();
        assert_eq!(epoch.timestamp(), 0);

        let time = Utc.with_ymd_and_hms(2020, 5, 17, 8, 30, 0).unwrap();
        let filetime = datetime_to_filetime(time).unwrap();
        assert_eq!(filetime_to_datetime(filetime), Some(time));
    }

    #[test]
    fn test_filetime_out_of_range() {
        assert_eq!(datetime_to_filetime(DateTime::<Utc>::MAX_UTC), None);
        assert_eq!(datetime_to_filetime(DateTime::<Utc>::MIN_UTC), None);
        let before_1601 = Utc.with_ymd_and_hms(1600, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(datetime_to_filetime(before_1601), None);
        let first = Utc.with_ymd_and_hms(1601, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(datetime_to_filetime(first), Some(0));
    }
}
