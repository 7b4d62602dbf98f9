// Copyright (c) 2024 The cpuident developers
//
// SPDX-License-Identifier: Apache-2.0
//

//! Raw hardware descriptor model and its text codec.
//!
//! A [`RawDescriptor`] holds the captured identification leaves of one
//! logical CPU; a [`RawDescriptorSet`] holds one descriptor per logical
//! CPU in ordinal order. The text format is line-oriented and
//! round-trippable: anything produced by [`write`] parses back to an
//! equal set, and re-serializing yields byte-identical text.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::{Error, Result};

/// Number of basic (eax = 0, 1, ...) leaves kept per CPU.
pub const MAX_BASIC_LEAVES: usize = 32;
/// Number of extended (eax = 0x8000_0000, ...) leaves kept per CPU.
pub const MAX_EXT_LEAVES: usize = 32;
/// Sub-leaves of the Intel deterministic cache leaf (eax = 4).
pub const MAX_INTELFN4_SUBLEAVES: usize = 8;
/// Sub-leaves of the Intel topology leaf (eax = 11).
pub const MAX_INTELFN11_SUBLEAVES: usize = 4;
/// Sub-leaves of the Intel SGX leaf (eax = 0x12).
pub const MAX_INTELFN12H_SUBLEAVES: usize = 4;
/// Sub-leaves of the Intel processor trace leaf (eax = 0x14).
pub const MAX_INTELFN14H_SUBLEAVES: usize = 4;
/// Sub-leaves of the AMD deterministic cache leaf (eax = 0x8000_001D).
pub const MAX_AMDFN8000001DH_SUBLEAVES: usize = 4;
/// Leaves of the hypervisor range (eax = 0x4000_0000, ...).
pub const MAX_HYPERVISOR_LEAVES: usize = 2;

/// ARM AA64 identification register counts.
pub const AA64_DFR_REGS: usize = 2;
pub const AA64_ISAR_REGS: usize = 3;
pub const AA64_MMFR_REGS: usize = 5;
pub const AA64_PFR_REGS: usize = 2;
pub const AA64_SMFR_REGS: usize = 1;
pub const AA64_ZFR_REGS: usize = 1;

/// Privileged-register dump lines must never be mistaken for leaf data,
/// even when they superficially look like a `tag[index]=value` line.
const DENYLIST_PREFIXES: &[&str] = &["msr", "MSR", "rdmsr"];

const CPU_SEPARATOR_PREFIX: &str = "_________________ Logical CPU #";
const CPU_SEPARATOR_SUFFIX: &str = " _________________";

/// One 4-register query result (eax, ebx, ecx, edx).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Leaf(pub [u32; 4]);

impl Leaf {
    pub fn eax(&self) -> u32 {
        self.0[0]
    }
    pub fn ebx(&self) -> u32 {
        self.0[1]
    }
    pub fn ecx(&self) -> u32 {
        self.0[2]
    }
    pub fn edx(&self) -> u32 {
        self.0[3]
    }
}

/// Classes of x86-style (4-register) leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafClass {
    Basic,
    Ext,
    IntelFn4,
    IntelFn11,
    IntelFn12h,
    IntelFn14h,
    AmdFn8000001dh,
    Hypervisor,
}

impl LeafClass {
    fn tag(&self) -> &'static str {
        match self {
            LeafClass::Basic => "basic_cpuid",
            LeafClass::Ext => "ext_cpuid",
            LeafClass::IntelFn4 => "intel_fn4",
            LeafClass::IntelFn11 => "intel_fn11",
            LeafClass::IntelFn12h => "intel_fn12h",
            LeafClass::IntelFn14h => "intel_fn14h",
            LeafClass::AmdFn8000001dh => "amd_fn8000001dh",
            LeafClass::Hypervisor => "hypervisor_cpuid",
        }
    }

    fn capacity(&self) -> usize {
        match self {
            LeafClass::Basic => MAX_BASIC_LEAVES,
            LeafClass::Ext => MAX_EXT_LEAVES,
            LeafClass::IntelFn4 => MAX_INTELFN4_SUBLEAVES,
            LeafClass::IntelFn11 => MAX_INTELFN11_SUBLEAVES,
            LeafClass::IntelFn12h => MAX_INTELFN12H_SUBLEAVES,
            LeafClass::IntelFn14h => MAX_INTELFN14H_SUBLEAVES,
            LeafClass::AmdFn8000001dh => MAX_AMDFN8000001DH_SUBLEAVES,
            LeafClass::Hypervisor => MAX_HYPERVISOR_LEAVES,
        }
    }
}

const X86_LEAF_CLASSES: &[LeafClass] = &[
    LeafClass::Basic,
    LeafClass::Ext,
    LeafClass::IntelFn4,
    LeafClass::IntelFn11,
    LeafClass::IntelFn12h,
    LeafClass::IntelFn14h,
    LeafClass::AmdFn8000001dh,
    LeafClass::Hypervisor,
];

/// Classes of ARM (single 64-bit value) identification registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmRegister {
    Midr,
    Mpidr,
    Revidr,
    Aa64Dfr,
    Aa64Isar,
    Aa64Mmfr,
    Aa64Pfr,
    Aa64Smfr,
    Aa64Zfr,
}

impl ArmRegister {
    fn capacity(&self) -> usize {
        match self {
            ArmRegister::Midr | ArmRegister::Mpidr | ArmRegister::Revidr => 1,
            ArmRegister::Aa64Dfr => AA64_DFR_REGS,
            ArmRegister::Aa64Isar => AA64_ISAR_REGS,
            ArmRegister::Aa64Mmfr => AA64_MMFR_REGS,
            ArmRegister::Aa64Pfr => AA64_PFR_REGS,
            ArmRegister::Aa64Smfr => AA64_SMFR_REGS,
            ArmRegister::Aa64Zfr => AA64_ZFR_REGS,
        }
    }
}

/// Captured identification leaves for one logical CPU.
///
/// Lookup is by leaf class plus index; the order leaves appeared in the
/// capture text carries no meaning.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RawDescriptor {
    basic: [Leaf; MAX_BASIC_LEAVES],
    ext: [Leaf; MAX_EXT_LEAVES],
    intel_fn4: [Leaf; MAX_INTELFN4_SUBLEAVES],
    intel_fn11: [Leaf; MAX_INTELFN11_SUBLEAVES],
    intel_fn12h: [Leaf; MAX_INTELFN12H_SUBLEAVES],
    intel_fn14h: [Leaf; MAX_INTELFN14H_SUBLEAVES],
    amd_fn8000001dh: [Leaf; MAX_AMDFN8000001DH_SUBLEAVES],
    hypervisor: [Leaf; MAX_HYPERVISOR_LEAVES],
    arm_midr: u64,
    arm_mpidr: u64,
    arm_revidr: u64,
    arm_id_aa64dfr: [u64; AA64_DFR_REGS],
    arm_id_aa64isar: [u64; AA64_ISAR_REGS],
    arm_id_aa64mmfr: [u64; AA64_MMFR_REGS],
    arm_id_aa64pfr: [u64; AA64_PFR_REGS],
    arm_id_aa64smfr: [u64; AA64_SMFR_REGS],
    arm_id_aa64zfr: [u64; AA64_ZFR_REGS],
}

impl RawDescriptor {
    /// Get one x86-style leaf; `None` when the index exceeds the class
    /// capacity.
    pub fn leaf(&self, class: LeafClass, index: usize) -> Option<Leaf> {
        self.leaves(class).get(index).copied()
    }

    /// Get one ARM identification register value.
    pub fn arm_reg(&self, reg: ArmRegister, index: usize) -> Option<u64> {
        self.arm_regs(reg).get(index).copied()
    }

    /// True when any ARM identification register was captured.
    pub fn has_arm_data(&self) -> bool {
        self.arm_midr != 0
    }

    /// True when the basic vendor leaf was captured.
    pub fn has_x86_data(&self) -> bool {
        self.basic[0] != Leaf::default()
    }

    fn leaves(&self, class: LeafClass) -> &[Leaf] {
        match class {
            LeafClass::Basic => &self.basic,
            LeafClass::Ext => &self.ext,
            LeafClass::IntelFn4 => &self.intel_fn4,
            LeafClass::IntelFn11 => &self.intel_fn11,
            LeafClass::IntelFn12h => &self.intel_fn12h,
            LeafClass::IntelFn14h => &self.intel_fn14h,
            LeafClass::AmdFn8000001dh => &self.amd_fn8000001dh,
            LeafClass::Hypervisor => &self.hypervisor,
        }
    }

    fn leaves_mut(&mut self, class: LeafClass) -> &mut [Leaf] {
        match class {
            LeafClass::Basic => &mut self.basic,
            LeafClass::Ext => &mut self.ext,
            LeafClass::IntelFn4 => &mut self.intel_fn4,
            LeafClass::IntelFn11 => &mut self.intel_fn11,
            LeafClass::IntelFn12h => &mut self.intel_fn12h,
            LeafClass::IntelFn14h => &mut self.intel_fn14h,
            LeafClass::AmdFn8000001dh => &mut self.amd_fn8000001dh,
            LeafClass::Hypervisor => &mut self.hypervisor,
        }
    }

    fn arm_regs(&self, reg: ArmRegister) -> &[u64] {
        match reg {
            ArmRegister::Midr => std::slice::from_ref(&self.arm_midr),
            ArmRegister::Mpidr => std::slice::from_ref(&self.arm_mpidr),
            ArmRegister::Revidr => std::slice::from_ref(&self.arm_revidr),
            ArmRegister::Aa64Dfr => &self.arm_id_aa64dfr,
            ArmRegister::Aa64Isar => &self.arm_id_aa64isar,
            ArmRegister::Aa64Mmfr => &self.arm_id_aa64mmfr,
            ArmRegister::Aa64Pfr => &self.arm_id_aa64pfr,
            ArmRegister::Aa64Smfr => &self.arm_id_aa64smfr,
            ArmRegister::Aa64Zfr => &self.arm_id_aa64zfr,
        }
    }

    fn arm_regs_mut(&mut self, reg: ArmRegister) -> &mut [u64] {
        match reg {
            ArmRegister::Midr => std::slice::from_mut(&mut self.arm_midr),
            ArmRegister::Mpidr => std::slice::from_mut(&mut self.arm_mpidr),
            ArmRegister::Revidr => std::slice::from_mut(&mut self.arm_revidr),
            ArmRegister::Aa64Dfr => &mut self.arm_id_aa64dfr,
            ArmRegister::Aa64Isar => &mut self.arm_id_aa64isar,
            ArmRegister::Aa64Mmfr => &mut self.arm_id_aa64mmfr,
            ArmRegister::Aa64Pfr => &mut self.arm_id_aa64pfr,
            ArmRegister::Aa64Smfr => &mut self.arm_id_aa64smfr,
            ArmRegister::Aa64Zfr => &mut self.arm_id_aa64zfr,
        }
    }
}

/// Builder for a [`RawDescriptor`]; once built the descriptor is
/// read-only. Out-of-capacity indices are ignored, matching the
/// forward-compatible behavior of the text parser.
#[derive(Debug, Default)]
pub struct RawDescriptorBuilder {
    raw: RawDescriptor,
}

impl RawDescriptorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn leaf(mut self, class: LeafClass, index: usize, regs: [u32; 4]) -> Self {
        if let Some(slot) = self.raw.leaves_mut(class).get_mut(index) {
            *slot = Leaf(regs);
        }
        self
    }

    pub fn arm_reg(mut self, reg: ArmRegister, index: usize, value: u64) -> Self {
        if let Some(slot) = self.raw.arm_regs_mut(reg).get_mut(index) {
            *slot = value;
        }
        self
    }

    pub fn build(self) -> RawDescriptor {
        self.raw
    }
}

/// An ordered collection of descriptors, one per logical CPU.
///
/// The position in the collection is the logical CPU ordinal.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RawDescriptorSet {
    cpus: Vec<RawDescriptor>,
}

impl RawDescriptorSet {
    pub fn len(&self) -> usize {
        self.cpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cpus.is_empty()
    }

    pub fn get(&self, ordinal: usize) -> Option<&RawDescriptor> {
        self.cpus.get(ordinal)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RawDescriptor> {
        self.cpus.iter()
    }
}

impl From<Vec<RawDescriptor>> for RawDescriptorSet {
    fn from(cpus: Vec<RawDescriptor>) -> Self {
        RawDescriptorSet { cpus }
    }
}

/// Parse capture text into a descriptor set.
///
/// Unrecognized lines are skipped so captures from newer tooling remain
/// loadable; denylisted privileged-register dumps are skipped as well.
/// A recognized tag carrying malformed register values is an error.
pub fn parse(text: &str) -> Result<RawDescriptorSet> {
    let logger = sl!();
    let mut cpus: Vec<RawDescriptor> = Vec::new();
    let mut current = RawDescriptor::default();
    let mut saw_data = false;
    let mut saw_any = false;

    for (idx, raw_line) in text.lines().enumerate() {
        let lineno = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if DENYLIST_PREFIXES.iter().any(|p| line.starts_with(p)) {
            debug!(logger, "skipping privileged register dump line"; "line" => lineno);
            continue;
        }
        if let Some(ordinal) = parse_separator(line) {
            let ordinal = ordinal.map_err(|reason| Error::Format { line: lineno, reason })?;
            if saw_data || !cpus.is_empty() {
                cpus.push(std::mem::take(&mut current));
                saw_data = false;
            }
            if ordinal != cpus.len() {
                return Err(Error::Format {
                    line: lineno,
                    reason: format!(
                        "logical CPU ordinal {} out of order (expected {})",
                        ordinal,
                        cpus.len()
                    ),
                });
            }
            continue;
        }
        if line.starts_with("version=") {
            continue;
        }
        match parse_data_line(&mut current, line) {
            Ok(true) => {
                saw_data = true;
                saw_any = true;
            }
            Ok(false) => {
                debug!(logger, "ignoring unrecognized capture line"; "line" => lineno);
            }
            Err(reason) => {
                return Err(Error::Format {
                    line: lineno,
                    reason,
                });
            }
        }
    }

    if !saw_any {
        return Err(Error::Format {
            line: 0,
            reason: "no recognizable leaf data in input".to_string(),
        });
    }
    cpus.push(current);
    Ok(RawDescriptorSet { cpus })
}

/// Serialize a descriptor set to its canonical text form.
///
/// The output is deterministic and byte-stable: ascending CPU ordinals,
/// fixed leaf emission order, fixed hexadecimal formatting. Golden-file
/// round trips depend on this.
pub fn write(set: &RawDescriptorSet) -> String {
    let mut out = String::new();
    out.push_str(&format!("version={}\n", env!("CARGO_PKG_VERSION")));
    let multi = set.len() > 1;
    for (ordinal, cpu) in set.iter().enumerate() {
        if multi {
            out.push_str(&format!(
                "\n{}{}{}\n",
                CPU_SEPARATOR_PREFIX, ordinal, CPU_SEPARATOR_SUFFIX
            ));
        }
        write_one(&mut out, cpu);
    }
    out
}

fn write_one(out: &mut String, cpu: &RawDescriptor) {
    if cpu.has_arm_data() {
        out.push_str(&format!("arm_midr={:016x}\n", cpu.arm_midr));
        out.push_str(&format!("arm_mpidr={:016x}\n", cpu.arm_mpidr));
        out.push_str(&format!("arm_revidr={:016x}\n", cpu.arm_revidr));
        for (i, v) in cpu.arm_id_aa64dfr.iter().enumerate() {
            out.push_str(&format!("arm_id_aa64dfr{}={:016x}\n", i, v));
        }
        for (i, v) in cpu.arm_id_aa64isar.iter().enumerate() {
            out.push_str(&format!("arm_id_aa64isar{}={:016x}\n", i, v));
        }
        for (i, v) in cpu.arm_id_aa64mmfr.iter().enumerate() {
            out.push_str(&format!("arm_id_aa64mmfr{}={:016x}\n", i, v));
        }
        for (i, v) in cpu.arm_id_aa64pfr.iter().enumerate() {
            out.push_str(&format!("arm_id_aa64pfr{}={:016x}\n", i, v));
        }
        for (i, v) in cpu.arm_id_aa64smfr.iter().enumerate() {
            out.push_str(&format!("arm_id_aa64smfr{}={:016x}\n", i, v));
        }
        for (i, v) in cpu.arm_id_aa64zfr.iter().enumerate() {
            out.push_str(&format!("arm_id_aa64zfr{}={:016x}\n", i, v));
        }
        return;
    }
    for class in X86_LEAF_CLASSES {
        // The hypervisor range is optional in existing captures; emit it
        // only when populated so legacy files round-trip unchanged.
        let leaves = cpu.leaves(*class);
        if *class == LeafClass::Hypervisor && leaves.iter().all(|l| *l == Leaf::default()) {
            continue;
        }
        for (i, leaf) in leaves.iter().enumerate() {
            out.push_str(&format!(
                "{}[{}]={:08x} {:08x} {:08x} {:08x}\n",
                class.tag(),
                i,
                leaf.eax(),
                leaf.ebx(),
                leaf.ecx(),
                leaf.edx()
            ));
        }
    }
}

/// Load a descriptor set from a file, transparently decompressing
/// gzip-compressed captures by extension.
pub fn load(path: &Path) -> Result<RawDescriptorSet> {
    parse(&read_text_file(path)?)
}

/// Save a descriptor set, compressing when the extension asks for it.
pub fn save(path: &Path, set: &RawDescriptorSet) -> Result<()> {
    write_text_file(path, &write(set))
}

/// Read a text file, decompressing `.gz` transparently.
pub fn read_text_file(path: &Path) -> Result<String> {
    let mut text = String::new();
    let file = File::open(path)?;
    if is_gzip(path) {
        GzDecoder::new(file).read_to_string(&mut text)?;
    } else {
        let mut file = file;
        file.read_to_string(&mut text)?;
    }
    Ok(text)
}

/// Write a text file, compressing `.gz` transparently.
pub fn write_text_file(path: &Path, text: &str) -> Result<()> {
    let file = File::create(path)?;
    if is_gzip(path) {
        let mut enc = GzEncoder::new(file, Compression::default());
        enc.write_all(text.as_bytes())?;
        enc.finish()?;
    } else {
        let mut file = file;
        file.write_all(text.as_bytes())?;
    }
    Ok(())
}

fn is_gzip(path: &Path) -> bool {
    path.extension().map(|e| e == "gz").unwrap_or(false)
}

fn parse_separator(line: &str) -> Option<std::result::Result<usize, String>> {
    let rest = line.strip_prefix(CPU_SEPARATOR_PREFIX)?;
    let num = match rest.strip_suffix(CPU_SEPARATOR_SUFFIX) {
        Some(n) => n,
        None => return Some(Err("malformed logical CPU separator".to_string())),
    };
    Some(
        num.parse::<usize>()
            .map_err(|_| format!("bad logical CPU ordinal '{}'", num)),
    )
}

/// Returns Ok(true) when the line carried leaf data, Ok(false) when it
/// should be ignored, Err on a recognized tag with malformed values.
fn parse_data_line(cpu: &mut RawDescriptor, line: &str) -> std::result::Result<bool, String> {
    let (lhs, rhs) = match line.split_once('=') {
        Some(parts) => parts,
        None => return Ok(false),
    };

    // x86-style: tag[index]=eax ebx ecx edx
    if let Some((tag, index)) = parse_indexed_tag(lhs) {
        for class in X86_LEAF_CLASSES {
            if class.tag() == tag {
                let regs = parse_x86_registers(rhs)?;
                if index < class.capacity() {
                    cpu.leaves_mut(*class)[index] = Leaf(regs);
                }
                return Ok(true);
            }
        }
        return Ok(false);
    }

    // ARM-style: tag=value, with the AA64 register number glued to the tag.
    let (reg, index) = match arm_tag(lhs) {
        Some(found) => found,
        None => return Ok(false),
    };
    let value = u64::from_str_radix(rhs.trim(), 16)
        .map_err(|_| format!("bad register value '{}'", rhs.trim()))?;
    if index < reg.capacity() {
        cpu.arm_regs_mut(reg)[index] = value;
    }
    Ok(true)
}

fn parse_indexed_tag(lhs: &str) -> Option<(&str, usize)> {
    let open = lhs.find('[')?;
    let close = lhs.find(']')?;
    if close != lhs.len() - 1 || close <= open {
        return None;
    }
    let index = lhs[open + 1..close].parse::<usize>().ok()?;
    Some((&lhs[..open], index))
}

fn parse_x86_registers(rhs: &str) -> std::result::Result<[u32; 4], String> {
    let mut regs = [0u32; 4];
    let mut count = 0;
    for tok in rhs.split_whitespace() {
        if count == 4 {
            return Err(format!("too many register values in '{}'", rhs));
        }
        regs[count] = u32::from_str_radix(tok, 16)
            .map_err(|_| format!("bad register value '{}'", tok))?;
        count += 1;
    }
    if count != 4 {
        return Err(format!("expected 4 register values, got {}", count));
    }
    Ok(regs)
}

fn arm_tag(lhs: &str) -> Option<(ArmRegister, usize)> {
    match lhs {
        "arm_midr" => return Some((ArmRegister::Midr, 0)),
        "arm_mpidr" => return Some((ArmRegister::Mpidr, 0)),
        "arm_revidr" => return Some((ArmRegister::Revidr, 0)),
        _ => (),
    }
    let groups: &[(&str, ArmRegister)] = &[
        ("arm_id_aa64dfr", ArmRegister::Aa64Dfr),
        ("arm_id_aa64isar", ArmRegister::Aa64Isar),
        ("arm_id_aa64mmfr", ArmRegister::Aa64Mmfr),
        ("arm_id_aa64pfr", ArmRegister::Aa64Pfr),
        ("arm_id_aa64smfr", ArmRegister::Aa64Smfr),
        ("arm_id_aa64zfr", ArmRegister::Aa64Zfr),
    ];
    for (prefix, reg) in groups {
        if let Some(num) = lhs.strip_prefix(prefix) {
            if let Ok(index) = num.parse::<usize>() {
                return Some((*reg, index));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn intel_descriptor() -> RawDescriptor {
        RawDescriptorBuilder::new()
            .leaf(
                LeafClass::Basic,
                0,
                [0x16, 0x756e_6547, 0x6c65_746e, 0x4965_6e69],
            )
            .leaf(LeafClass::Basic, 1, [0x0008_06ea, 0x0810_0800, 0x7ffa_fbbf, 0xbfeb_fbff])
            .leaf(LeafClass::Ext, 0, [0x8000_0008, 0, 0, 0])
            .build()
    }

    fn arm_descriptor() -> RawDescriptor {
        RawDescriptorBuilder::new()
            .arm_reg(ArmRegister::Midr, 0, 0x0000_0000_410f_d083)
            .arm_reg(ArmRegister::Aa64Isar, 0, 0x0000_1001_1212_0000)
            .build()
    }

    #[test]
    fn test_round_trip_x86() {
        let set = RawDescriptorSet::from(vec![intel_descriptor()]);
        let text = write(&set);
        let parsed = parse(&text).unwrap();
        assert_eq!(parsed, set);
        assert_eq!(write(&parsed), text);
    }

    #[test]
    fn test_round_trip_multi_cpu() {
        let set = RawDescriptorSet::from(vec![intel_descriptor(), intel_descriptor()]);
        let text = write(&set);
        assert!(text.contains("_________________ Logical CPU #0 _________________"));
        assert!(text.contains("_________________ Logical CPU #1 _________________"));
        let parsed = parse(&text).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(write(&parsed), text);
    }

    #[test]
    fn test_round_trip_arm() {
        let set = RawDescriptorSet::from(vec![arm_descriptor()]);
        let text = write(&set);
        assert!(text.contains("arm_midr=00000000410fd083"));
        let parsed = parse(&text).unwrap();
        assert_eq!(parsed, set);
        assert_eq!(write(&parsed), text);
    }

    #[test]
    fn test_parse_lookup_by_tag_not_order() {
        // Leaf lines shuffled out of emission order must land in the
        // same slots.
        let text = "ext_cpuid[0]=80000008 00000000 00000000 00000000\n\
                    basic_cpuid[1]=000806ea 08100800 7ffafbbf bfebfbff\n\
                    basic_cpuid[0]=00000016 756e6547 6c65746e 49656e69\n";
        let set = parse(text).unwrap();
        let cpu = set.get(0).unwrap();
        assert_eq!(cpu.leaf(LeafClass::Basic, 0).unwrap().ebx(), 0x756e_6547);
        assert_eq!(cpu.leaf(LeafClass::Ext, 0).unwrap().eax(), 0x8000_0008);
    }

    #[test]
    fn test_parse_skips_unknown_and_denylisted_lines() {
        let text = "basic_cpuid[0]=00000016 756e6547 6c65746e 49656e69\n\
                    msr[0x1b]=00000000 fee00c00\n\
                    some_future_tag[0]=01020304 00000000 00000000 00000000\n\
                    total_logical_cpus=8\n";
        let set = parse(text).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.get(0).unwrap().has_x86_data());
    }

    #[test]
    fn test_parse_errors() {
        #[derive(Debug)]
        struct TestData<'a> {
            text: &'a str,
            reason_contains: &'a str,
        }

        let tests = &[
            TestData {
                text: "",
                reason_contains: "no recognizable leaf data",
            },
            TestData {
                text: "basic_cpuid[0]=00000016 756e6547\n",
                reason_contains: "expected 4 register values",
            },
            TestData {
                text: "basic_cpuid[0]=zz000016 756e6547 6c65746e 49656e69\n",
                reason_contains: "bad register value",
            },
            TestData {
                text: "arm_midr=xyzzy\n",
                reason_contains: "bad register value",
            },
            TestData {
                text: "_________________ Logical CPU #1 _________________\n\
                       basic_cpuid[0]=00000016 756e6547 6c65746e 49656e69\n",
                reason_contains: "out of order",
            },
        ];

        for (i, d) in tests.iter().enumerate() {
            let msg = format!("test[{}]: {:?}", i, d);
            let err = parse(d.text).unwrap_err();
            let text = format!("{}", err);
            assert!(text.contains(d.reason_contains), "{}: got '{}'", msg, text);
        }
    }

    #[test]
    fn test_out_of_capacity_index_ignored() {
        let text = "basic_cpuid[0]=00000016 756e6547 6c65746e 49656e69\n\
                    basic_cpuid[99]=11111111 22222222 33333333 44444444\n";
        let set = parse(text).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.get(0).unwrap().leaf(LeafClass::Basic, 99).is_none());
    }

    #[test]
    fn test_file_io_plain_and_gzip() {
        let dir = tempdir().unwrap();
        let set = RawDescriptorSet::from(vec![intel_descriptor()]);

        let plain = dir.path().join("capture.txt");
        save(&plain, &set).unwrap();
        assert_eq!(load(&plain).unwrap(), set);

        let gz = dir.path().join("capture.txt.gz");
        save(&gz, &set).unwrap();
        // Compressed file must not be plain text.
        let bytes = std::fs::read(&gz).unwrap();
        assert_ne!(&bytes[..2], b"ve");
        assert_eq!(load(&gz).unwrap(), set);
    }
}
