//! End-to-end cell scenarios
//!
//! Each test builds a context for an explicit host profile, so the results
//! do not depend on the machine running them.

mod common;

use std::sync::Arc;

use ncurses_cell::attr::{color_pair, pair_number};
use ncurses_cell::profile::{GenericCharWidth, WideCharWidth};
use ncurses_cell::{resolve_for, Attr, Context, EncodedCharacter, Error, HostProfile, LayoutKind, WideCodec};

use common::FakeLibrary;

fn profile(wide: WideCharWidth, windows: bool) -> HostProfile {
    let library = if windows { "libncursesw6" } else { "libncursesw.so.6" };
    HostProfile::new(library, wide, GenericCharWidth::Bits32, windows)
}

// ============================================================================
// Layout sizes
// ============================================================================

#[test]
fn test_wide_layout_field_bytes_for_every_profile() {
    for id in [
        "linux-x64",
        "ubuntu.16.04-x64",
        "rhel.7-x64",
        "win10-x64",
        "win-x86",
        "osx.13-arm64",
        "freebsd-x64",
        "haiku-x64",
    ] {
        let host = resolve_for(id);
        let ctx = Context::with_profile(host.clone());
        let layout = ctx.wide_layout();
        assert_eq!(
            layout.field_bytes(),
            host.attr_len() + host.wide_char_width.bytes() * 5 + 4,
            "host {}",
            id
        );
        assert_eq!(layout.attr_len, host.attr_len(), "host {}", id);
        assert_eq!(layout.payload_len, host.payload_len());
        assert!(layout.size >= layout.field_bytes());
        assert_eq!(layout.size % layout.align, 0);
    }
}

// ============================================================================
// Scenario A: 4-byte wchar_t, non-Windows
// ============================================================================

#[test]
fn test_scenario_a_utf32_cell() {
    let ctx = Context::with_profile(profile(WideCharWidth::Four, false));
    let cell = ctx.encode_one('A', Attr::empty(), None).unwrap();

    assert_eq!(cell.kind(), LayoutKind::WideUtf32);
    let payload = cell.payload();
    assert_eq!(&payload[..4], &0x41u32.to_ne_bytes());
    assert!(payload[4..].iter().all(|&b| b == 0));
    assert_eq!(cell.attr(), 0);
    assert_eq!(cell.ext_color(), 0);
}

// ============================================================================
// Scenario B: 2-byte wchar_t, Windows
// ============================================================================

#[test]
fn test_scenario_b_utf16_cell_with_color_pair() {
    let ctx = Context::with_profile(profile(WideCharWidth::Two, true));
    let cell = ctx
        .encode_char_with_attrs('A', Attr::from_word(color_pair(3)))
        .unwrap();

    assert_eq!(cell.kind(), LayoutKind::WideUtf16);
    let payload = cell.payload();
    assert_eq!(&payload[..2], &0x41u16.to_ne_bytes());
    assert!(payload[2..].iter().all(|&b| b == 0));
    assert_eq!(pair_number(u32::try_from(cell.attr()).unwrap()), 3);
    assert_eq!(ctx.decode_char(&cell).color_pair, 3);
}

// ============================================================================
// Scenario C: string layout
// ============================================================================

#[test]
fn test_scenario_c_string_output_length() {
    for wide in [WideCharWidth::Four, WideCharWidth::Two] {
        let ctx = Context::with_profile(profile(wide, wide == WideCharWidth::Two));

        let plain = ctx.encode_string("hi", Attr::empty(), None, false).unwrap();
        assert_eq!(plain.output_len(), 2);
        assert_eq!(plain.len_with_terminator(), 2);

        let terminated = ctx.encode_string("hi", Attr::empty(), None, true).unwrap();
        assert_eq!(terminated.output_len(), 2);
        assert_eq!(terminated.len_with_terminator(), 3);

        let chars: Vec<char> = terminated.iter().map(|cell| cell.decode_one()).collect();
        assert_eq!(chars, vec!['h', 'i']);
    }
}

#[test]
fn test_string_cells_carry_attributes() {
    let ctx = Context::with_profile(resolve_for("linux-x64"));
    let encoded = ctx.encode_string("ok", Attr::BOLD | Attr::UNDERLINE, Some(300), false).unwrap();
    for cell in encoded.iter() {
        let decoded = ctx.decode_char(&cell);
        assert_eq!(decoded.attrs, Attr::BOLD | Attr::UNDERLINE);
        assert_eq!(decoded.color_pair, 300);
    }
}

#[test]
fn test_native_filled_cells_decode() {
    // Cells as the library would hand them back from win_wchnstr
    let ctx = Context::with_profile(resolve_for("linux-x64"));
    let encoded = ctx.encode_string("row text", Attr::empty(), None, true).unwrap();
    let mut cells: Vec<EncodedCharacter> = encoded.iter().collect();
    cells.push(ctx.codec().cell(&[], 0, 0).unwrap());

    let raw: Vec<_> = cells.iter().filter_map(|c| c.as_utf32().copied()).collect();
    assert_eq!(ctx.decode_string(&raw[..]), "row text");
}

// ============================================================================
// Construction paths
// ============================================================================

#[test]
fn test_four_construction_paths_agree() {
    let ctx = Context::with_profile(resolve_for("linux-x64"));
    let bold = Attr::BOLD;

    let from_char = ctx.encode_char('x').unwrap();
    let from_char_attr = ctx.encode_char_with_attrs('x', bold).unwrap();
    let from_raw = ctx.encode_generic(u64::from(b'x')).unwrap();
    let from_raw_attr = ctx.encode_generic_with_attrs(u64::from(b'x'), bold).unwrap();

    assert_eq!(from_char, from_raw);
    assert_eq!(from_char_attr, from_raw_attr);
    assert_eq!(from_char_attr.attr(), u64::from(bold.bits()));
}

// ============================================================================
// ABI 5 on LP64 hosts: 64-bit attr_t
// ============================================================================

#[test]
fn test_abi5_lp64_cells_use_a_long_attribute_word() {
    for id in ["rhel.7-x64", "centos.7-x64", "debian.9-x64", "ubuntu.16.04-x64"] {
        let ctx = Context::with_profile(resolve_for(id));
        let layout = ctx.wide_layout();
        assert_eq!(layout.kind, LayoutKind::WideUtf32Long, "host {}", id);
        assert_eq!(layout.attr_len, 8);
        assert_eq!(layout.payload_offset, 8);
        assert_eq!(layout.ext_color_offset, Some(28));
        assert_eq!(layout.size, 32);

        let cell = ctx.encode_one('A', Attr::BOLD, Some(5)).unwrap();
        assert_eq!(cell.kind(), layout.kind);
        assert_eq!(ctx.decode_char(&cell).color_pair, 5);
    }
}

#[test]
fn test_raw_generic_character_keeps_every_bit() {
    let raw = 0x100_0000_0078;

    let long = Context::with_profile(resolve_for("rhel.7-x64"));
    let cell = long.encode_generic(raw).unwrap();
    assert_eq!(cell.attr(), 0x100_0000_0000);
    assert_eq!(cell.decode_one(), 'x');

    let short = Context::with_profile(resolve_for("linux-x64"));
    let err = short.encode_generic(raw).unwrap_err();
    assert!(err.is_encoding());
}

#[test]
fn test_unrepresentable_input_fails_without_output() {
    let ctx = Context::with_profile(resolve_for("linux-x64"));
    let err = ctx.encode_cluster("ab", Attr::empty(), None).unwrap_err();
    assert!(err.is_encoding());

    let err = ctx.encode_narrow('λ', Attr::empty(), None).unwrap_err();
    assert!(err.is_encoding());
}

// ============================================================================
// Scenario D: binding with a missing symbol
// ============================================================================

#[test]
fn test_scenario_d_missing_symbol_fails_binding() {
    let ctx = Context::with_profile(resolve_for("linux-x64"));
    let err = ctx
        .bind_native_entry_points_with(Arc::new(FakeLibrary::without(&["win_wch"])))
        .unwrap_err();

    match &err {
        Error::SymbolBinding { library, symbols } => {
            assert_eq!(library, "libncursesw.so.6");
            assert_eq!(symbols, "win_wch");
        },
        other => panic!("unexpected error: {other:?}"),
    }
    // No entry point is usable afterwards
    assert_eq!(ctx.entry_points().unwrap_err(), err);
}

#[test]
fn test_binding_complete_library() {
    let ctx = Context::with_profile(resolve_for("linux-x64"));
    let table = ctx
        .bind_native_entry_points_with(Arc::new(FakeLibrary::complete()))
        .unwrap();
    assert_eq!(table.version().unwrap(), "ncurses 6.4.20230520");
    assert!(std::ptr::eq(table, ctx.entry_points().unwrap()));
}
