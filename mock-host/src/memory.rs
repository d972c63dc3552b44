//! Simulated address space and byte-pattern matching.

/// A contiguous mapped range.
#[derive(Debug, Clone)]
pub struct Region {
    pub base: u64,
    pub bytes: Vec<u8>,
}

impl Region {
    pub fn new(base: u64, size: usize) -> Self {
        Self {
            base,
            bytes: vec![0; size],
        }
    }

    pub fn end(&self) -> u64 {
        self.base + self.bytes.len() as u64
    }

    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr < self.end()
    }

    fn offset(&self, addr: u64) -> usize {
        (addr - self.base) as usize
    }
}

#[derive(Debug, Clone, Default)]
pub struct AddressSpace {
    regions: Vec<Region>,
}

impl AddressSpace {
    pub fn map(&mut self, region: Region) {
        self.regions.push(region);
    }

    fn region(&self, addr: u64) -> Option<&Region> {
        self.regions.iter().find(|r| r.contains(addr))
    }

    fn region_mut(&mut self, addr: u64) -> Option<&mut Region> {
        self.regions.iter_mut().find(|r| r.contains(addr))
    }

    /// Up to `size` bytes from `addr`, stopping at the end of its region.
    pub fn read(&self, addr: u64, size: usize) -> Option<Vec<u8>> {
        let region = self.region(addr)?;
        let start = region.offset(addr);
        let end = start.saturating_add(size).min(region.bytes.len());
        Some(region.bytes[start..end].to_vec())
    }

    /// Bytes written, clipped to the end of the region.
    pub fn write(&mut self, addr: u64, data: &[u8]) -> Option<usize> {
        let region = self.region_mut(addr)?;
        let start = region.offset(addr);
        let len = data.len().min(region.bytes.len() - start);
        region.bytes[start..start + len].copy_from_slice(&data[..len]);
        Some(len)
    }

    pub fn byte(&self, addr: u64) -> Option<u8> {
        self.read(addr, 1).and_then(|b| b.first().copied())
    }

    /// First match of `pattern` that lies entirely inside `[start, start + size)`.
    pub fn find(&self, start: u64, size: u64, pattern: &[Option<u8>]) -> Option<u64> {
        if pattern.is_empty() {
            return None;
        }
        let region = self.region(start)?;
        let from = region.offset(start);
        let limit = start.saturating_add(size).min(region.end());
        let to = region.offset(limit.max(start));
        let window = &region.bytes[from..to];
        window
            .windows(pattern.len())
            .position(|candidate| matches(candidate, pattern))
            .map(|pos| start + pos as u64)
    }
}

fn matches(bytes: &[u8], pattern: &[Option<u8>]) -> bool {
    bytes
        .iter()
        .zip(pattern)
        .all(|(byte, want)| want.map_or(true, |w| w == *byte))
}

/// Parse `"48 8B ?? 05"` or `"488B??05"` into bytes with wildcards.
///
/// `?` and `??` are wildcards. Returns `None` for any other non-hex text.
pub fn parse_pattern(text: &str) -> Option<Vec<Option<u8>>> {
    let compact: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    let mut out = Vec::with_capacity(compact.len() / 2);
    let mut i = 0;
    while i < compact.len() {
        if compact[i] == '?' {
            out.push(None);
            i += if compact.get(i + 1) == Some(&'?') { 2 } else { 1 };
            continue;
        }
        let high = compact[i].to_digit(16)?;
        let low = compact.get(i + 1)?.to_digit(16)?;
        out.push(Some((high * 16 + low) as u8));
        i += 2;
    }
    Some(out)
}
