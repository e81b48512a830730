use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use crate::module::{FULL_SIZE, HALF_SIZE};
use crate::translate::translate;
use crate::{DeviceSession, FakeClock, ModuleKind, SimTransport, Tunables};

const BASE: u16 = 0x50;

fn kind_strategy() -> impl Strategy<Value = ModuleKind> {
    prop_oneof![
        Just(ModuleKind::SfpPlus),
        Just(ModuleKind::QsfpPlus),
        Just(ModuleKind::Qsfp28),
        Just(ModuleKind::QsfpDd),
        Just(ModuleKind::Unknown),
    ]
}

/// Valid `(kind, offset, length)` requests as the engine would hand them to
/// the translator: in-bounds, non-empty, no overrun.
fn request_strategy() -> impl Strategy<Value = (ModuleKind, u64, usize)> {
    kind_strategy().prop_flat_map(|kind| {
        let size = kind.exposed_size();
        (0..size).prop_flat_map(move |ofs| {
            let max_len = (size - ofs).min(512) as usize;
            (Just(kind), Just(ofs), 1..=max_len)
        })
    })
}

/// Reads that avoid byte 127 of the lower half (the page-select register
/// itself, whose value legitimately changes as pages are switched).
fn qsfp_read_strategy() -> impl Strategy<Value = (u64, usize)> {
    let size = ModuleKind::Qsfp28.exposed_size();
    prop_oneof![
        (0u64..127).prop_flat_map(|ofs| (Just(ofs), 1..=(127 - ofs) as usize)),
        ((HALF_SIZE as u64)..size).prop_flat_map(move |ofs| {
            let max_len = (size - ofs).min(256) as usize;
            (Just(ofs), 1..=max_len)
        }),
    ]
}

fn lower_pattern(ofs: u64) -> u8 {
    (ofs as u8).wrapping_mul(3).wrapping_add(1)
}

fn page_pattern(page: u8, k: u8) -> u8 {
    page.wrapping_mul(31).wrapping_add(k)
}

fn model_byte(ofs: u64) -> u8 {
    if ofs < HALF_SIZE as u64 {
        lower_pattern(ofs)
    } else {
        let page = (ofs / HALF_SIZE as u64 - 1) as u8;
        let k = (ofs % HALF_SIZE as u64) as u8;
        page_pattern(page, k)
    }
}

proptest! {
    #[test]
    fn translation_stays_within_one_bank_or_page((kind, ofs, len) in request_strategy()) {
        let m = translate(kind, BASE, ofs, len);
        prop_assert!(m.len >= 1);
        prop_assert!(m.len <= len);
        match kind {
            ModuleKind::SfpPlus => {
                prop_assert_eq!(m.bus_addr, BASE + (ofs / FULL_SIZE as u64) as u16);
                prop_assert_eq!(m.reg as u64, ofs % FULL_SIZE as u64);
                prop_assert!(m.reg as usize + m.len <= FULL_SIZE);
                prop_assert_eq!(m.page, None);
            }
            ModuleKind::QsfpPlus | ModuleKind::Qsfp28 | ModuleKind::QsfpDd => {
                prop_assert_eq!(m.bus_addr, BASE);
                if ofs < HALF_SIZE as u64 {
                    prop_assert_eq!(m.page, None);
                    prop_assert_eq!(m.reg as u64, ofs);
                    prop_assert!(m.reg as usize + m.len <= HALF_SIZE);
                } else {
                    prop_assert_eq!(m.page, Some((ofs / HALF_SIZE as u64 - 1) as u8));
                    prop_assert!(m.reg as usize >= HALF_SIZE);
                    prop_assert!(m.reg as usize + m.len <= FULL_SIZE);
                    // The mapping reconstructs the flat offset exactly.
                    let page = m.page.unwrap() as u64;
                    let k = (m.reg as usize - HALF_SIZE) as u64;
                    prop_assert_eq!((page + 1) * HALF_SIZE as u64 + k, ofs);
                }
            }
            ModuleKind::Unknown => {
                prop_assert_eq!(m.bus_addr, BASE);
                prop_assert_eq!(m.reg as u64, ofs);
                prop_assert_eq!(m.len, len);
                prop_assert_eq!(m.page, None);
            }
        }
    }

    #[test]
    fn qsfp_upper_offsets_resolve_to_register_and_page(
        (page, k) in (0u64..256, 0u64..128)
    ) {
        let ofs = HALF_SIZE as u64 + page * HALF_SIZE as u64 + k;
        let m = translate(ModuleKind::Qsfp28, BASE, ofs, 1);
        prop_assert_eq!(m.page, Some(page as u8));
        prop_assert_eq!(m.reg as u64, k + HALF_SIZE as u64);
    }

    #[test]
    fn qsfp_reads_match_module_content_and_are_idempotent(
        reads in prop::collection::vec(qsfp_read_strategy(), 1..24)
    ) {
        let clock = FakeClock::new();
        let sim = Arc::new(SimTransport::qsfp(BASE));
        let lower: Vec<u8> = (0..HALF_SIZE as u64).map(lower_pattern).collect();
        sim.load_lower(BASE, &lower);
        for page in 0..=255u8 {
            let content: Vec<u8> = (0..HALF_SIZE as u8).map(|k| page_pattern(page, k)).collect();
            sim.load_page(BASE, page, &content);
        }
        let session = DeviceSession::attach_with_clock(
            sim,
            BASE,
            ModuleKind::Qsfp28,
            Arc::new(Tunables::new()),
            clock.clone(),
        );

        for (ofs, len) in reads {
            let mut first = vec![0u8; len];
            let n = session.read_at(ofs, &mut first).unwrap();
            prop_assert!(n >= 1 && n <= len);

            let mut second = vec![0u8; n];
            prop_assert_eq!(session.read_at(ofs, &mut second).unwrap(), n);
            prop_assert_eq!(&first[..n], &second[..]);

            for (i, &byte) in first[..n].iter().enumerate() {
                prop_assert_eq!(byte, model_byte(ofs + i as u64));
            }

            // Wander across retention boundaries so re-confirmation paths
            // are exercised mid-sequence.
            clock.advance(Duration::from_millis(400));
        }
    }
}
