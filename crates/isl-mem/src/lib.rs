//! Sparse guest memory for the ISL simulator.
//!
//! [`MemoryImage`] maps 32-bit addresses to bytes. Only bytes that were loaded
//! or written are stored; every other address reads back as zero. The map is
//! ordered so the decoder can skip over gaps in the image and the dumpers can
//! walk it in address order.
//!
//! The [`loader`] module parses the `0xADDR: HH HH ...` text format into an
//! image.

#![forbid(unsafe_code)]

pub mod loader;

pub use loader::{load_memory_file, parse_memory_image, LoadError};

use std::collections::BTreeMap;
use std::io::{self, Write};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryImage {
    bytes: BTreeMap<u32, u8>,
}

impl MemoryImage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an image holding `data` at `base..base + data.len()` (wrapping).
    pub fn from_bytes(base: u32, data: &[u8]) -> Self {
        let mut mem = Self::new();
        mem.load(base, data);
        mem
    }

    /// Copy `data` into the image starting at `base`. Later loads win over
    /// earlier ones at overlapping addresses.
    pub fn load(&mut self, base: u32, data: &[u8]) {
        for (i, &b) in data.iter().enumerate() {
            self.bytes.insert(base.wrapping_add(i as u32), b);
        }
    }

    /// Number of mapped bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn contains(&self, addr: u32) -> bool {
        self.bytes.contains_key(&addr)
    }

    pub fn lowest_address(&self) -> Option<u32> {
        self.bytes.keys().next().copied()
    }

    /// Lowest mapped address strictly greater than `addr`.
    pub fn next_mapped_after(&self, addr: u32) -> Option<u32> {
        let start = addr.checked_add(1)?;
        self.bytes.range(start..).next().map(|(&a, _)| a)
    }

    /// Mapped bytes in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u8)> + '_ {
        self.bytes.iter().map(|(&a, &b)| (a, b))
    }

    /// The run of mapped bytes starting at `addr`.
    ///
    /// Stops at the first unmapped address, after `max` bytes, or when the
    /// address space would wrap.
    pub fn contiguous_from(&self, addr: u32, max: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(max.min(16));
        let mut cur = addr;
        while out.len() < max {
            let Some(&b) = self.bytes.get(&cur) else {
                break;
            };
            out.push(b);
            let Some(next) = cur.checked_add(1) else {
                break;
            };
            cur = next;
        }
        out
    }

    pub fn read_u8(&self, addr: u32) -> u8 {
        self.bytes.get(&addr).copied().unwrap_or(0)
    }

    pub fn read_u16(&self, addr: u32) -> u16 {
        self.read(addr, 2) as u16
    }

    pub fn read_u32(&self, addr: u32) -> u32 {
        self.read(addr, 4) as u32
    }

    pub fn read_u64(&self, addr: u32) -> u64 {
        self.read(addr, 8)
    }

    pub fn write_u8(&mut self, addr: u32, val: u8) {
        self.bytes.insert(addr, val);
    }

    pub fn write_u16(&mut self, addr: u32, val: u16) {
        self.write(addr, 2, u64::from(val));
    }

    pub fn write_u32(&mut self, addr: u32, val: u32) {
        self.write(addr, 4, u64::from(val));
    }

    pub fn write_u64(&mut self, addr: u32, val: u64) {
        self.write(addr, 8, val);
    }

    /// Little-endian read of `size` bytes (at most 8).
    pub fn read(&self, addr: u32, size: usize) -> u64 {
        debug_assert!(size <= 8, "read size {size} exceeds 8 bytes");
        let mut v = 0u64;
        for i in 0..size.min(8) {
            let b = self.read_u8(addr.wrapping_add(i as u32));
            v |= u64::from(b) << (i * 8);
        }
        v
    }

    /// Little-endian write of the low `size` bytes of `val` (at most 8).
    pub fn write(&mut self, addr: u32, size: usize, val: u64) {
        debug_assert!(size <= 8, "write size {size} exceeds 8 bytes");
        for i in 0..size.min(8) {
            self.write_u8(addr.wrapping_add(i as u32), (val >> (i * 8)) as u8);
        }
    }

    /// Write every mapped byte as an `AAAAAAAA: BB` line, in address order.
    pub fn write_dump(&self, out: &mut dyn Write) -> io::Result<()> {
        for (addr, byte) in self.iter() {
            writeln!(out, "{addr:08X}: {byte:02X}")?;
        }
        Ok(())
    }
}

impl FromIterator<(u32, u8)> for MemoryImage {
    fn from_iter<T: IntoIterator<Item = (u32, u8)>>(iter: T) -> Self {
        Self {
            bytes: iter.into_iter().collect(),
        }
    }
}
