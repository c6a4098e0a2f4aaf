//! ヘックスダンプ
//!
//! print_hex_dump_bytes 形式: `オフセット: 16進列  ASCII列`

use alloc::string::String;
use core::fmt::Write;

use crate::config::{HEXDUMP_MAX_BYTES, HEXDUMP_ROW_BYTES};

/// 1行分を整形
pub fn format_row(offset: usize, chunk: &[u8]) -> String {
    let mut line = String::with_capacity(12 + HEXDUMP_ROW_BYTES * 4);
    let _ = write!(line, "{:08x}:", offset);

    for i in 0..HEXDUMP_ROW_BYTES {
        match chunk.get(i) {
            Some(byte) => {
                let _ = write!(line, " {:02x}", byte);
            }
            None => line.push_str("   "),
        }
    }

    line.push_str("  ");
    for &byte in chunk {
        line.push(if byte.is_ascii_graphic() || byte == b' ' {
            byte as char
        } else {
            '.'
        });
    }
    line
}

/// 全行を順に返す
pub fn rows(data: &[u8]) -> impl Iterator<Item = String> + '_ {
    data.chunks(HEXDUMP_ROW_BYTES)
        .enumerate()
        .map(|(i, chunk)| format_row(i * HEXDUMP_ROW_BYTES, chunk))
}

/// trace レベルでダンプを出力
///
/// 先頭 `HEXDUMP_MAX_BYTES` バイトまで。残りは省略行にまとめる。
pub fn log_dump(prefix: &str, data: &[u8]) {
    let shown = data.len().min(HEXDUMP_MAX_BYTES);
    for row in rows(&data[..shown]) {
        log::trace!("{}{}", prefix, row);
    }
    if shown < data.len() {
        log::trace!("{}... {} more bytes", prefix, data.len() - shown);
    }
}
