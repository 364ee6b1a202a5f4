//! Multi-indexed Bloom filter: a bit vector whose set bits each own an id
//! slot, so a lookup returns the ids of the sets an element was inserted
//! with.
//!
//! Construction is staged:
//!
//! 1. `BuildingBitVector`: every element of every set is inserted with
//!    [`MiBloomFilter::insert_bv`].
//! 2. [`MiBloomFilter::complete_bv_insertion`] freezes the bits and sizes
//!    the id array to the popcount.
//! 3. `BuildingIds`: elements are inserted again with their id.
//! 4. `SaturatingIds` (optional): the slots of selected elements are
//!    flagged as saturated with [`MiBloomFilter::insert_saturation`].
//! 5. `Ready`: read-only.

use std::{
    ffi::OsString,
    fmt,
    fs::File,
    io::{BufWriter, Read, Write},
    mem,
    path::{Path, PathBuf},
    str::FromStr,
};

use tracing::{debug, info};

use super::{
    addressed,
    cell::IdCell,
    persist::{read_filter, signature_line, write_filter, FilterHeader},
    rank::RankIndex,
    store::BitStore,
};
use crate::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MiPhase {
    BuildingBitVector,
    BuildingIds,
    SaturatingIds,
    Ready,
}

impl MiPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            MiPhase::BuildingBitVector => "building_bit_vector",
            MiPhase::BuildingIds => "building_ids",
            MiPhase::SaturatingIds => "saturating_ids",
            MiPhase::Ready => "ready",
        }
    }

    const fn accepts_ids(self) -> bool {
        matches!(self, MiPhase::BuildingIds | MiPhase::SaturatingIds)
    }
}

impl fmt::Display for MiPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MiPhase {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "building_bit_vector" => Ok(MiPhase::BuildingBitVector),
            "building_ids" => Ok(MiPhase::BuildingIds),
            "saturating_ids" => Ok(MiPhase::SaturatingIds),
            "ready" => Ok(MiPhase::Ready),
            other => Err(Error::Corrupt(format!("unknown filter phase {other:?}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Stage {
    BitVector {
        bits: BitStore,
    },
    Indexed {
        bits: BitStore,
        rank: RankIndex,
        ids: Vec<IdCell>,
        phase: MiPhase,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MiBloomFilter {
    stage: Stage,
    hash_num: u32,
    hash_fn: String,
}

impl MiBloomFilter {
    pub const SIGNATURE: &'static str = "MIBloomFilter_v1";
    pub const RANK_SIGNATURE: &'static str = "MIBloomFilterRank_v1";

    pub const SATURATION_MASK: u16 = IdCell::SATURATION_MASK;
    pub const ID_MASK: u16 = IdCell::ID_MASK;

    /// Empty filter of `bits` bits, rounded up to a multiple of 64.
    pub fn new(bits: usize, hash_num: u32) -> Result<Self> {
        Self::with_hash_fn(bits, hash_num, "")
    }

    pub fn with_hash_fn(bits: usize, hash_num: u32, hash_fn: impl Into<String>) -> Result<Self> {
        if bits == 0 {
            return Err(Error::InvalidParameter("bit vector size must be > 0".into()));
        }
        if hash_num == 0 {
            return Err(Error::InvalidHashCount);
        }
        Ok(Self {
            stage: Stage::BitVector {
                bits: BitStore::new(bits.div_ceil(64) * 64),
            },
            hash_num,
            hash_fn: hash_fn.into(),
        })
    }

    /// Filter over an already populated bit vector, ready for id insertion.
    pub fn from_bit_vector(words: Vec<u64>, hash_num: u32) -> Result<Self> {
        if words.is_empty() {
            return Err(Error::InvalidParameter("bit vector size must be > 0".into()));
        }
        if hash_num == 0 {
            return Err(Error::InvalidHashCount);
        }
        Ok(Self {
            stage: index(BitStore::from_words(words)),
            hash_num,
            hash_fn: String::new(),
        })
    }

    /// Bit-vector size giving the requested `occupancy` after inserting
    /// `entries` elements, rounded up to the next multiple of 64.
    pub fn calc_optimal_size(entries: usize, hash_num: u32, occupancy: f64) -> Result<usize> {
        if !(occupancy > 0.0 && occupancy < 1.0) {
            return Err(Error::InvalidParameter(format!(
                "occupancy {occupancy} not in (0, 1)"
            )));
        }
        let approx = -((entries as f64) * hash_num as f64) / (1.0 - occupancy).ln();
        let too_large = || {
            Error::InvalidParameter(format!("{entries} entries need more than usize::MAX bits"))
        };
        if !approx.is_finite() || approx >= usize::MAX as f64 {
            return Err(too_large());
        }
        let approx = approx as usize;
        approx.checked_add(64 - approx % 64).ok_or_else(too_large)
    }

    pub fn phase(&self) -> MiPhase {
        match &self.stage {
            Stage::BitVector { .. } => MiPhase::BuildingBitVector,
            Stage::Indexed { phase, .. } => *phase,
        }
    }

    fn violation(&self, operation: &'static str) -> Error {
        Error::PhaseViolation {
            operation,
            phase: self.phase(),
        }
    }

    fn bits(&self) -> &BitStore {
        match &self.stage {
            Stage::BitVector { bits } | Stage::Indexed { bits, .. } => bits,
        }
    }

    /// The first `hash_num` values of `hashes`, or `InvalidHashCount` when
    /// fewer are given.
    #[inline]
    fn addressed<'h>(&self, hashes: &'h [u64]) -> Result<&'h [u64]> {
        hashes
            .get(..self.hash_num as usize)
            .ok_or(Error::InvalidHashCount)
    }

    pub fn insert_bv(&mut self, hashes: &[u64]) -> Result<()> {
        let hashes = self.addressed(hashes)?;
        let Stage::BitVector { bits } = &mut self.stage else {
            return Err(self.violation("insert_bv"));
        };
        for &h in hashes {
            bits.set(h);
        }
        Ok(())
    }

    /// `true` iff every addressed bit is set. Valid in every phase; a slice
    /// shorter than `hash_num` addresses only the values it holds.
    pub fn bv_contains(&self, hashes: &[u64]) -> bool {
        let bits = self.bits();
        addressed(hashes, self.hash_num)
            .iter()
            .all(|&h| bits.get(h))
    }

    /// Freeze the bit vector and allocate one empty id slot per set bit.
    pub fn complete_bv_insertion(&mut self) -> Result<()> {
        let Stage::BitVector { bits } = &mut self.stage else {
            return Err(self.violation("complete_bv_insertion"));
        };
        let bits = mem::take(bits);
        self.stage = index(bits);
        debug!(
            pop_cnt = self.pop_cnt(),
            phase = %self.phase(),
            "bit vector frozen"
        );
        Ok(())
    }

    /// Record `id` in every addressed slot. An empty slot takes the id, a
    /// slot already holding another id is flagged as saturated instead.
    /// Addressed bits that are unset have no slot and are skipped.
    pub fn insert_id(&mut self, hashes: &[u64], id: u16) -> Result<()> {
        check_id(id)?;
        let hashes = self.addressed(hashes)?;
        let phase = self.phase();
        match &mut self.stage {
            Stage::Indexed {
                bits, rank, ids, ..
            } if phase.accepts_ids() => {
                for &h in hashes {
                    let slot = bits.slot(h);
                    if bits.get_slot(slot) {
                        ids[rank.rank1(bits.words(), slot)].record(id);
                    }
                }
                Ok(())
            }
            _ => Err(self.violation("insert_id")),
        }
    }

    /// Raw slot values for each addressed bit: `0` for an empty slot or an
    /// unset bit, otherwise the id, with [`Self::SATURATION_MASK`] set on
    /// saturated slots.
    pub fn get_id(&self, hashes: &[u64]) -> Result<Vec<u16>> {
        let Stage::Indexed {
            bits, rank, ids, ..
        } = &self.stage
        else {
            return Err(self.violation("get_id"));
        };
        Ok(self
            .addressed(hashes)?
            .iter()
            .map(|&h| {
                let slot = bits.slot(h);
                if bits.get_slot(slot) {
                    ids[rank.rank1(bits.words(), slot)].raw()
                } else {
                    0
                }
            })
            .collect())
    }

    pub fn complete_id_insertion(&mut self) -> Result<()> {
        match &mut self.stage {
            Stage::Indexed { phase, .. } if *phase == MiPhase::BuildingIds => {
                *phase = MiPhase::SaturatingIds;
                debug!(phase = %MiPhase::SaturatingIds, "id insertion completed");
                Ok(())
            }
            _ => Err(self.violation("complete_id_insertion")),
        }
    }

    /// Flag every addressed slot holding `id` as saturated. Returns the
    /// number of slots flagged.
    pub fn insert_saturation(&mut self, hashes: &[u64], id: u16) -> Result<usize> {
        check_id(id)?;
        let hashes = self.addressed(hashes)?;
        let phase = self.phase();
        match &mut self.stage {
            Stage::Indexed {
                bits, rank, ids, ..
            } if phase.accepts_ids() => {
                let mut flagged = 0;
                for &h in hashes {
                    let slot = bits.slot(h);
                    if !bits.get_slot(slot) {
                        continue;
                    }
                    let cell = &mut ids[rank.rank1(bits.words(), slot)];
                    if cell.id() == id && !cell.is_saturated() {
                        cell.saturate();
                        flagged += 1;
                    }
                }
                Ok(flagged)
            }
            _ => Err(self.violation("insert_saturation")),
        }
    }

    pub fn complete_saturation_insertion(&mut self) -> Result<()> {
        match &mut self.stage {
            Stage::Indexed { phase, .. } if phase.accepts_ids() => {
                *phase = MiPhase::Ready;
                debug!(phase = %MiPhase::Ready, "saturation insertion completed");
                Ok(())
            }
            _ => Err(self.violation("complete_saturation_insertion")),
        }
    }

    /// Number of slots holding each id; index `0` counts empty slots.
    /// Trailing ids with no slot are trimmed.
    pub fn get_id_occurence_count(&self, include_saturated: bool) -> Result<Vec<usize>> {
        let Stage::Indexed { ids, .. } = &self.stage else {
            return Err(self.violation("get_id_occurence_count"));
        };
        let mut counts = vec![0usize; IdCell::ID_MASK as usize + 1];
        for cell in ids {
            if include_saturated || !cell.is_saturated() {
                counts[cell.id() as usize] += 1;
            }
        }
        let len = counts.iter().rposition(|&c| c != 0).map_or(0, |i| i + 1);
        counts.truncate(len);
        Ok(counts)
    }

    /// Number of set bits.
    pub fn pop_cnt(&self) -> usize {
        match &self.stage {
            Stage::BitVector { bits } => bits.count_ones(),
            Stage::Indexed { rank, .. } => rank.ones(),
        }
    }

    /// Number of saturated id slots.
    pub fn pop_saturated_cnt(&self) -> usize {
        match &self.stage {
            Stage::BitVector { .. } => 0,
            Stage::Indexed { ids, .. } => ids.iter().filter(|c| c.is_saturated()).count(),
        }
    }

    pub fn bit_len(&self) -> usize {
        self.bits().len()
    }

    /// Number of id slots; zero until the bit vector is frozen.
    pub fn id_array_size(&self) -> usize {
        match &self.stage {
            Stage::BitVector { .. } => 0,
            Stage::Indexed { ids, .. } => ids.len(),
        }
    }

    pub fn hash_num(&self) -> u32 {
        self.hash_num
    }

    pub fn hash_fn(&self) -> &str {
        &self.hash_fn
    }

    pub fn occupancy(&self) -> f64 {
        self.pop_cnt() as f64 / self.bit_len() as f64
    }

    pub fn fpr(&self) -> f64 {
        self.occupancy().powi(self.hash_num as i32)
    }

    /// Path of the side file holding the rank table and id array.
    pub fn rank_path(path: impl AsRef<Path>) -> PathBuf {
        let mut p = OsString::from(path.as_ref().as_os_str());
        p.push(".rank");
        PathBuf::from(p)
    }

    /// Write the bit vector to `path` and, once frozen, the rank table and
    /// id array to [`Self::rank_path`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bits = self.bits();
        let header = FilterHeader {
            phase: Some(self.phase().as_str().to_owned()),
            id_array_size: Some(self.id_array_size() as u64),
            ..FilterHeader::new(bits.len() / 8, self.hash_num, &self.hash_fn)
        };
        write_filter(path, Self::SIGNATURE, &header, &bits.to_le_bytes())?;

        if let Stage::Indexed { rank, ids, .. } = &self.stage {
            let mut out = BufWriter::new(File::create(Self::rank_path(path))?);
            writeln!(out, "{}", signature_line(Self::RANK_SIGNATURE))?;
            for sb in rank.superblocks() {
                out.write_all(&sb.to_le_bytes())?;
            }
            for cell in ids {
                out.write_all(&cell.raw().to_le_bytes())?;
            }
            out.flush()?;
        }
        info!(
            path = %path.display(),
            bits = bits.len(),
            pop_cnt = self.pop_cnt(),
            id_array_size = self.id_array_size(),
            phase = %self.phase(),
            "saved multi-indexed bloom filter"
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let (header, body) = read_filter(path, Self::SIGNATURE)?;
        if body.is_empty() || body.len() % 8 != 0 {
            return Err(Error::Corrupt(format!(
                "bit vector of {} bytes is not a positive multiple of 8",
                body.len()
            )));
        }
        if header.hash_num == 0 {
            return Err(Error::InvalidHashCount);
        }
        let phase: MiPhase = FilterHeader::require(header.phase.as_deref(), "phase")?.parse()?;
        let bits = BitStore::from_le_bytes(&body);

        let stage = if phase == MiPhase::BuildingBitVector {
            Stage::BitVector { bits }
        } else {
            let id_array_size = FilterHeader::require(header.id_array_size, "id_array_size")? as usize;
            let (rank, ids) = read_rank_file(&Self::rank_path(path), &bits, id_array_size)?;
            Stage::Indexed {
                bits,
                rank,
                ids,
                phase,
            }
        };
        let mi = Self {
            stage,
            hash_num: header.hash_num,
            hash_fn: header.hash_fn.unwrap_or_default(),
        };
        info!(
            path = %path.display(),
            bits = mi.bit_len(),
            pop_cnt = mi.pop_cnt(),
            id_array_size = mi.id_array_size(),
            phase = %mi.phase(),
            "loaded multi-indexed bloom filter"
        );
        Ok(mi)
    }
}

fn index(bits: BitStore) -> Stage {
    let rank = RankIndex::build(bits.words());
    let ids = vec![IdCell::default(); rank.ones()];
    Stage::Indexed {
        bits,
        rank,
        ids,
        phase: MiPhase::BuildingIds,
    }
}

fn check_id(id: u16) -> Result<()> {
    if id == 0 || id > IdCell::ID_MASK {
        return Err(Error::InvalidId {
            id,
            max: IdCell::ID_MASK,
        });
    }
    Ok(())
}

fn read_rank_file(
    path: &Path,
    bits: &BitStore,
    id_array_size: usize,
) -> Result<(RankIndex, Vec<IdCell>)> {
    let mut raw = Vec::new();
    File::open(path)?.read_to_end(&mut raw)?;

    let expected = signature_line(MiBloomFilter::RANK_SIGNATURE);
    let line_end = raw.iter().position(|&b| b == b'\n').unwrap_or(raw.len());
    let found = String::from_utf8_lossy(&raw[..line_end]);
    if found != expected {
        return Err(Error::SignatureMismatch {
            expected,
            found: found.into_owned(),
        });
    }
    let body = raw.get(line_end + 1..).unwrap_or_default();

    let superblock_count = bits.words().len().div_ceil(8) + 1;
    let expected_len = superblock_count * 8 + id_array_size * 2;
    if body.len() < expected_len {
        return Err(Error::Truncated {
            expected: expected_len,
            found: body.len(),
        });
    }
    if body.len() > expected_len {
        return Err(Error::Corrupt(format!(
            "{} trailing bytes after id array",
            body.len() - expected_len
        )));
    }

    let (sb_bytes, id_bytes) = body.split_at(superblock_count * 8);
    let superblocks = sb_bytes
        .chunks_exact(8)
        .map(|c| {
            let mut word = [0u8; 8];
            word.copy_from_slice(c);
            u64::from_le_bytes(word)
        })
        .collect();
    let rank = RankIndex::from_superblocks(superblocks);
    if !rank.matches(bits.words()) {
        return Err(Error::Corrupt("rank table does not match the bit vector".into()));
    }
    if rank.ones() != id_array_size {
        return Err(Error::Corrupt(format!(
            "id array holds {id_array_size} slots but the bit vector has {} set bits",
            rank.ones()
        )));
    }
    let ids = id_bytes
        .chunks_exact(2)
        .map(|c| IdCell::from_raw(u16::from_le_bytes([c[0], c[1]])))
        .collect();
    Ok((rank, ids))
}
