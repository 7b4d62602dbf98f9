// Copyright (c) 2024 The cpuident developers
//
// SPDX-License-Identifier: Apache-2.0
//

//! Intel processor signatures, most specific entries first.

use super::{entry, MatchEntry};
use super::MatchField::{Any as A, Is, OneOf, Range};

pub(super) const ENTRIES: &[MatchEntry] = &[
    // Netburst (family 0xF). Brand-qualified server parts come before
    // the desktop fallbacks.
    entry!(Is(0xf), Is(2), A, A, A, A, A, A, Some("Xeon"), "Xeon (Prestonia)", "130 nm"),
    entry!(Is(0xf), Is(4), A, A, A, A, A, A, Some("Xeon"), "Xeon (Nocona)", "90 nm"),
    entry!(Is(0xf), Is(1), A, A, A, A, A, A, None, "Willamette (Pentium 4)", "180 nm"),
    entry!(Is(0xf), Is(2), A, A, A, A, A, A, None, "Northwood (Pentium 4)", "130 nm"),
    entry!(Is(0xf), Is(3), A, A, A, A, A, A, None, "Prescott (Pentium 4)", "90 nm"),
    entry!(Is(0xf), Is(4), A, A, A, A, A, A, None, "Prescott (Pentium 4)", "90 nm"),
    entry!(Is(0xf), Is(6), A, A, A, A, A, A, None, "Cedar Mill (Pentium 4)", "65 nm"),

    // Pentium M / early Core (family 6, unfolded models).
    entry!(Is(6), Is(9), A, A, Is(9), A, A, A, None, "Banias (Pentium M)", "130 nm"),
    entry!(Is(6), Is(0xd), A, A, Is(0xd), A, A, A, None, "Dothan (Pentium M)", "90 nm"),
    entry!(Is(6), Is(0xe), A, A, Is(0xe), A, A, A, None, "Yonah (Core Duo)", "65 nm"),

    // Core 2 (family 6, model 0xF / ext 0x17). Quad-core dies first,
    // then the cache-size split for Wolfdale.
    entry!(Is(6), Is(0xf), A, A, Is(0xf), Is(4), A, A, None, "Kentsfield (Core 2 Quad)", "65 nm"),
    entry!(Is(6), Is(0xf), A, A, Is(0xf), A, A, A, None, "Conroe (Core 2 Duo)", "65 nm"),
    entry!(Is(6), Is(7), A, A, Is(0x17), Is(4), A, A, None, "Yorkfield (Core 2 Quad)", "45 nm"),
    entry!(Is(6), Is(7), A, A, Is(0x17), A, A, A, None, "Wolfdale (Core 2 Duo) (6144K)", "45 nm"),
    entry!(Is(6), Is(7), A, A, Is(0x17), A, A, A, None, "Wolfdale (Core 2 Duo) (3072K)", "45 nm"),
    entry!(Is(6), Is(7), A, A, Is(0x17), A, A, A, None, "Wolfdale (Core 2 Duo)", "45 nm"),

    // Atom lines.
    entry!(Is(6), A, A, A, Is(0x1c), A, A, A, None, "Diamondville (Atom)", "45 nm"),
    entry!(Is(6), A, A, A, Is(0x37), A, A, A, None, "Bay Trail (Atom)", "22 nm"),
    entry!(Is(6), A, A, A, Is(0x5c), A, A, A, None, "Apollo Lake (Atom)", "14 nm"),

    // Nehalem / Westmere.
    entry!(Is(6), A, A, A, Is(0x1a), A, A, A, Some("Xeon"), "Xeon (Gainestown)", "45 nm"),
    entry!(Is(6), A, A, A, Is(0x1a), A, A, A, None, "Bloomfield (Core i7)", "45 nm"),
    entry!(Is(6), A, A, A, Is(0x1e), A, A, A, None, "Lynnfield (Core i7)", "45 nm"),
    entry!(Is(6), A, A, A, Is(0x25), A, A, A, None, "Clarkdale (Core i5)", "32 nm"),
    entry!(Is(6), A, A, A, Is(0x2c), A, A, A, None, "Gulftown (Core i7)", "32 nm"),

    // Sandy Bridge / Ivy Bridge.
    entry!(Is(6), A, A, A, Is(0x2a), A, A, A, None, "Sandy Bridge (Core i5)", "32 nm"),
    entry!(Is(6), A, A, A, Is(0x2d), A, A, A, Some("Xeon"), "Xeon (Sandy Bridge-EP)", "32 nm"),
    entry!(Is(6), A, A, A, Is(0x3a), A, A, A, None, "Ivy Bridge (Core i5)", "22 nm"),
    entry!(Is(6), A, A, A, Is(0x3e), A, A, A, Some("Xeon"), "Xeon (Ivy Bridge-EP)", "22 nm"),

    // Haswell / Broadwell.
    entry!(Is(6), A, A, A, OneOf(&[0x3c, 0x45, 0x46]), A, A, A, None, "Haswell (Core i5)", "22 nm"),
    entry!(Is(6), A, A, A, Is(0x3f), A, A, A, Some("Xeon"), "Xeon (Haswell-EP)", "22 nm"),
    entry!(Is(6), A, A, A, OneOf(&[0x3d, 0x47]), A, A, A, None, "Broadwell (Core i5)", "14 nm"),
    entry!(Is(6), A, A, A, Is(0x4f), A, A, A, Some("Xeon"), "Xeon (Broadwell-EP)", "14 nm"),

    // Skylake client. The cache-size token splits the i7 dies from the
    // smaller parts sharing the same signature.
    entry!(Is(6), A, A, A, OneOf(&[0x4e, 0x5e]), A, A, A, Some("Xeon"), "Xeon E3 (Skylake)", "14 nm"),
    entry!(Is(6), A, A, A, OneOf(&[0x4e, 0x5e]), A, A, A, None, "Skylake (Core i7) (8192K)", "14 nm"),
    entry!(Is(6), A, A, A, OneOf(&[0x4e, 0x5e]), A, A, A, None, "Skylake (Core i5) (6144K)", "14 nm"),
    entry!(Is(6), A, A, A, OneOf(&[0x4e, 0x5e]), A, A, A, None, "Skylake (Core i3)", "14 nm"),
    entry!(Is(6), A, A, A, Is(0x55), A, A, A, None, "Xeon (Skylake-SP)", "14 nm"),

    // Kaby Lake / Coffee Lake share ext model 0x8E/0x9E; core count
    // and cache size tell the dies apart.
    entry!(Is(6), A, A, A, Is(0x9e), A, A, A, Some("Xeon"), "Xeon E3 (Coffee Lake)", "14 nm"),
    entry!(Is(6), A, A, A, OneOf(&[0x8e, 0x9e]), Range(6, 8), A, A, None, "Coffee Lake (Core i7) (12288K)", "14 nm"),
    entry!(Is(6), A, A, A, OneOf(&[0x8e, 0x9e]), Range(6, 8), A, A, None, "Coffee Lake (Core i7)", "14 nm"),
    entry!(Is(6), A, A, A, OneOf(&[0x8e, 0x9e]), A, A, A, None, "Kaby Lake (Core i5)", "14 nm"),

    // Comet Lake / Rocket Lake / hybrid client parts.
    entry!(Is(6), A, A, A, Is(0xa5), A, A, A, None, "Comet Lake (Core i5)", "14 nm"),
    entry!(Is(6), A, A, A, Is(0xa7), A, A, A, None, "Rocket Lake (Core i5)", "14 nm"),
    entry!(Is(6), A, A, A, OneOf(&[0x97, 0x9a]), A, A, A, None, "Alder Lake (Core i5)", "Intel 7"),
    entry!(Is(6), A, A, A, OneOf(&[0xb7, 0xba, 0xbf]), A, A, A, None, "Raptor Lake (Core i5)", "Intel 7"),

    // Ice Lake / Sapphire Rapids servers.
    entry!(Is(6), A, A, A, Is(0x6a), A, A, A, None, "Xeon (Ice Lake-SP)", "10 nm"),
    entry!(Is(6), A, A, A, Is(0x8f), A, A, A, None, "Xeon (Sapphire Rapids)", "Intel 7"),
];
