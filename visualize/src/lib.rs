// MIT LICENSE
//
// Copyright (c) 2021 Dash Core Group
//
// Permission is hereby granted, free of charge, to any
// person obtaining a copy of this software and associated
// documentation files (the "Software"), to deal in the
// Software without restriction, including without
// limitation the rights to use, copy, modify, merge,
// publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software
// is furnished to do so, subject to the following
// conditions:
//
// The above copyright notice and this permission notice
// shall be included in all copies or substantial portions
// of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF
// ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED
// TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A
// PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT
// SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY
// CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR
// IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

//! Rendering of staged keys, values and chunk boundaries for `Debug` output
//! and log fields.

use core::fmt;
use std::io::{Result, Write};

static HEX_LEN: usize = 8;
static STR_LEN: usize = 32;

/// Pretty visualization of staging components.
pub trait Visualize {
    /// Write a human-friendly representation into the drawer.
    fn visualize<W: Write>(&self, drawer: Drawer<W>) -> Result<Drawer<W>>;
}

/// Wrapper struct with a `Debug` implementation to represent bytes vector in
/// human-friendly way.
#[derive(PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct DebugBytes(pub Vec<u8>);

impl fmt::Debug for DebugBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut v = Vec::new();
        visualize_to_vec(&mut v, self.0.as_slice());

        f.write_str(&String::from_utf8_lossy(&v))
    }
}

/// Wrapper struct with a `Debug` implementation to represent a sequence of
/// chunk boundary ids, the open chunk sentinel rendered as `open`.
#[derive(PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct DebugBoundaries(pub Vec<u64>);

impl fmt::Debug for DebugBoundaries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut v = Vec::new();
        visualize_to_vec(&mut v, self.0.as_slice());

        f.write_str(&String::from_utf8_lossy(&v))
    }
}

/// A `io::Write` proxy the `Visualize` implementations draw into.
pub struct Drawer<W: Write> {
    write: W,
}

impl<W: Write> Drawer<W> {
    /// Wrap a writer.
    pub fn new(write: W) -> Self {
        Drawer { write }
    }

    /// Write `buf` unchanged.
    pub fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.write.write_all(buf)
    }
}

/// Hex representation of `bytes`, shortened to its head and tail when long.
pub fn to_hex(bytes: &[u8]) -> String {
    let encoded = hex::encode(bytes);
    let remaining = encoded.len().saturating_sub(HEX_LEN);
    if encoded.len() > 2 * HEX_LEN {
        format!("{}..{}", &encoded[0..HEX_LEN], &encoded[remaining..])
    } else {
        encoded
    }
}

impl Visualize for [u8] {
    fn visualize<W: Write>(&self, mut drawer: Drawer<W>) -> Result<Drawer<W>> {
        let hex_repr = to_hex(self);
        let str_repr = std::str::from_utf8(self);
        drawer.write(format!("[hex: {hex_repr}").as_bytes())?;
        if let Ok(str_repr) = str_repr {
            let str_part: String = str_repr.chars().take(STR_LEN).collect();
            drawer.write(format!(", str: {str_part}").as_bytes())?;
        }
        drawer.write(b"]")?;
        Ok(drawer)
    }
}

impl Visualize for u64 {
    fn visualize<W: Write>(&self, mut drawer: Drawer<W>) -> Result<Drawer<W>> {
        if *self == u64::MAX {
            drawer.write(b"open")?;
        } else {
            drawer.write(self.to_string().as_bytes())?;
        }
        Ok(drawer)
    }
}

impl Visualize for [u64] {
    fn visualize<W: Write>(&self, mut drawer: Drawer<W>) -> Result<Drawer<W>> {
        drawer.write(b"[")?;
        for (i, id) in self.iter().enumerate() {
            if i > 0 {
                drawer.write(b", ")?;
            }
            drawer = id.visualize(drawer)?;
        }
        drawer.write(b"]")?;
        Ok(drawer)
    }
}

/// `visualize` shortcut to write into provided buffer, should be a `Vec` not a
/// slice because slices won't grow if needed.
pub fn visualize_to_vec<T: Visualize + ?Sized>(v: &mut Vec<u8>, value: &T) {
    let drawer = Drawer::new(v);
    value
        .visualize(drawer)
        .expect("error while writing into slice");
}
