// Copyright (c) 2024 The cpuident developers
//
// SPDX-License-Identifier: Apache-2.0
//

//! AMD and Hygon processor signatures, most specific entries first.

use super::{entry, MatchEntry};
use super::MatchField::{Any as A, Is, OneOf, Range};

pub(super) const ENTRIES: &[MatchEntry] = &[
    // K6 / K7 (unfolded families).
    entry!(Is(5), Is(8), A, A, A, A, A, A, None, "K6-2", "250 nm"),
    entry!(Is(5), Is(9), A, A, A, A, A, A, None, "K6-III", "250 nm"),
    entry!(Is(6), Is(4), A, A, A, A, A, A, None, "Athlon (Thunderbird)", "180 nm"),
    entry!(Is(6), Is(6), A, A, A, A, A, A, Some("Duron"), "Duron (Morgan)", "180 nm"),
    entry!(Is(6), Is(6), A, A, A, A, A, A, None, "Athlon XP (Palomino)", "180 nm"),
    entry!(Is(6), Is(8), A, A, A, A, A, A, None, "Athlon XP (Thoroughbred)", "130 nm"),
    entry!(Is(6), Is(0xa), A, A, A, A, A, A, None, "Athlon XP (Barton)", "130 nm"),

    // K8 (family 0xF): Opteron servers first, then the L2 split
    // between Athlon 64 dies.
    entry!(Is(0xf), A, A, Is(0xf), A, A, A, A, Some("Opteron"), "Opteron (Sledgehammer)", "130 nm"),
    entry!(Is(0xf), A, A, Is(0xf), A, Is(2), A, A, None, "Athlon 64 X2 (Manchester)", "90 nm"),
    entry!(Is(0xf), A, A, Is(0xf), A, A, Is(1024), A, None, "Athlon 64 (ClawHammer)", "130 nm"),
    entry!(Is(0xf), A, A, Is(0xf), A, A, Is(512), A, None, "Athlon 64 (Newcastle)", "130 nm"),
    entry!(Is(0xf), A, A, Is(0xf), A, A, Is(256), A, None, "Sempron (Paris)", "90 nm"),

    // K10 (ext family 0x10).
    entry!(Is(0xf), A, A, Is(0x10), A, Is(4), A, A, Some("Phenom"), "Phenom II X4 (Deneb)", "45 nm"),
    entry!(Is(0xf), A, A, Is(0x10), A, Is(6), A, A, None, "Phenom II X6 (Thuban)", "45 nm"),
    entry!(Is(0xf), A, A, Is(0x10), A, A, A, A, None, "Phenom (Agena)", "65 nm"),

    // Bobcat / Jaguar low-power cores.
    entry!(Is(0xf), A, A, Is(0x14), A, A, A, A, None, "Bobcat (Ontario)", "40 nm"),
    entry!(Is(0xf), A, A, Is(0x16), A, A, A, A, None, "Jaguar (Kabini)", "28 nm"),

    // Bulldozer derivatives (ext family 0x15).
    entry!(Is(0xf), A, A, Is(0x15), OneOf(&[0x0, 0x1]), A, A, A, None, "Bulldozer (Zambezi)", "32 nm"),
    entry!(Is(0xf), A, A, Is(0x15), OneOf(&[0x2, 0x10, 0x13]), A, A, A, None, "Piledriver (Vishera)", "32 nm"),
    entry!(Is(0xf), A, A, Is(0x15), Range(0x30, 0x3f), A, A, A, None, "Steamroller (Kaveri)", "28 nm"),
    entry!(Is(0xf), A, A, Is(0x15), Range(0x60, 0x7f), A, A, A, None, "Excavator (Carrizo)", "28 nm"),

    // Zen (ext family 0x17). EPYC brand rows precede the Ryzen dies.
    entry!(Is(0xf), A, A, Is(0x17), Is(0x1), A, A, A, Some("EPYC"), "EPYC (Naples)", "14 nm"),
    entry!(Is(0xf), A, A, Is(0x17), Is(0x31), A, A, A, Some("EPYC"), "EPYC (Rome)", "7 nm"),
    entry!(Is(0xf), A, A, Is(0x17), Is(0x1), A, A, A, None, "Ryzen 7 (Summit Ridge)", "14 nm"),
    entry!(Is(0xf), A, A, Is(0x17), Is(0x8), A, A, A, None, "Ryzen 7 (Pinnacle Ridge)", "12 nm"),
    entry!(Is(0xf), A, A, Is(0x17), OneOf(&[0x11, 0x18]), A, A, A, None, "Ryzen 5 (Raven Ridge)", "14 nm"),
    entry!(Is(0xf), A, A, Is(0x17), Is(0x71), A, A, A, None, "Ryzen 7 (Matisse)", "7 nm"),
    entry!(Is(0xf), A, A, Is(0x17), Is(0x60), A, A, A, None, "Ryzen 7 (Renoir)", "7 nm"),

    // Zen 3 / Zen 4 (ext families 0x19 and up).
    entry!(Is(0xf), A, A, Is(0x19), Is(0x1), A, A, A, Some("EPYC"), "EPYC (Milan)", "7 nm"),
    entry!(Is(0xf), A, A, Is(0x19), Is(0x21), A, A, A, None, "Ryzen 7 (Vermeer)", "7 nm"),
    entry!(Is(0xf), A, A, Is(0x19), Is(0x50), A, A, A, None, "Ryzen 7 (Cezanne)", "7 nm"),
    entry!(Is(0xf), A, A, Is(0x19), Is(0x61), A, A, A, None, "Ryzen 7 (Raphael)", "5 nm"),
    entry!(Is(0xf), A, A, Is(0x19), Is(0x74), A, A, A, None, "Ryzen 7 (Phoenix)", "4 nm"),

    // Hygon Dhyana, a licensed Zen derivative.
    entry!(Is(0xf), A, A, Is(0x18), A, A, A, A, None, "Dhyana (Moksha)", "14 nm"),
];
