//! ToUnicode CMap decoding.
//!
//! Only the parts a ToUnicode CMap uses are read: `codespacerange` for the
//! code width, `bfchar` and `bfrange` for the mapping.
use std::collections::HashMap;

/// Largest `bfrange` expanded into the table.
const MAX_RANGE: u32 = 0xFFFF;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Hex(Vec<u8>),
    Word(String),
    ArrayStart,
    ArrayEnd,
}

/// A parsed ToUnicode CMap.
#[derive(Debug, Clone, Default)]
pub struct ToUnicode {
    map: HashMap<u32, String>,
    code_len: Option<usize>,
}

impl ToUnicode {
    pub fn parse(data: &[u8]) -> Self {
        let tokens = tokenize(data);
        let mut cmap = Self::default();
        let mut i = 0;
        while i < tokens.len() {
            match &tokens[i] {
                Token::Word(w) if w == "begincodespacerange" => {
                    i += 1;
                    while let Some(Token::Hex(lo)) = tokens.get(i) {
                        cmap.code_len.get_or_insert(lo.len().max(1));
                        i += 2;
                    }
                },
                Token::Word(w) if w == "beginbfchar" => {
                    i += 1;
                    while let (Some(Token::Hex(src)), Some(Token::Hex(dst))) = (tokens.get(i), tokens.get(i + 1)) {
                        cmap.map.insert(code_of(src), utf16be(dst));
                        i += 2;
                    }
                },
                Token::Word(w) if w == "beginbfrange" => {
                    i += 1;
                    while let (Some(Token::Hex(lo)), Some(Token::Hex(hi))) = (tokens.get(i), tokens.get(i + 1)) {
                        let (lo, hi) = (code_of(lo), code_of(hi));
                        i += 2;
                        match tokens.get(i) {
                            Some(Token::Hex(dst)) => {
                                cmap.insert_range(lo, hi, dst);
                                i += 1;
                            },
                            Some(Token::ArrayStart) => {
                                i += 1;
                                let mut code = lo;
                                while let Some(Token::Hex(dst)) = tokens.get(i) {
                                    cmap.map.insert(code, utf16be(dst));
                                    code = code.saturating_add(1);
                                    i += 1;
                                }
                                if tokens.get(i) == Some(&Token::ArrayEnd) {
                                    i += 1;
                                }
                            },
                            _ => break,
                        }
                    }
                },
                _ => i += 1,
            }
        }
        cmap
    }

    fn insert_range(&mut self, lo: u32, hi: u32, dst: &[u8]) {
        if hi < lo || hi - lo > MAX_RANGE {
            return;
        }
        let mut units = utf16_units(dst);
        if units.is_empty() {
            return;
        }
        for code in lo..=hi {
            self.map.insert(code, String::from_utf16_lossy(&units));
            if let Some(last) = units.last_mut() {
                *last = last.wrapping_add(1);
            }
        }
    }

    /// Code width in bytes from the codespace ranges, if declared.
    #[inline]
    pub fn code_len(&self) -> Option<usize> {
        self.code_len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn lookup(&self, code: u32) -> Option<&str> {
        self.map.get(&code).map(String::as_str)
    }

    /// Decode a string operand using `code_len`-byte codes.
    ///
    /// Unmapped codes become U+FFFD.
    pub fn decode(&self, bytes: &[u8], code_len: usize) -> String {
        let mut out = String::new();
        for chunk in bytes.chunks(code_len.max(1)) {
            match self.lookup(code_of(chunk)) {
                Some(text) => out.push_str(text),
                None => out.push(char::REPLACEMENT_CHARACTER),
            }
        }
        out
    }
}

fn code_of(bytes: &[u8]) -> u32 {
    bytes.iter().take(4).fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|c| u16::from_be_bytes([c[0], c.get(1).copied().unwrap_or(0)]))
        .collect()
}

fn utf16be(bytes: &[u8]) -> String {
    String::from_utf16_lossy(&utf16_units(bytes))
}

fn tokenize(data: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let b = data[i];
        match b {
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            },
            b'<' if data.get(i + 1) == Some(&b'<') => i += 2,
            b'>' if data.get(i + 1) == Some(&b'>') => i += 2,
            b'<' => {
                let start = i + 1;
                let end = data[start..]
                    .iter()
                    .position(|&c| c == b'>')
                    .map_or(data.len(), |p| start + p);
                tokens.push(Token::Hex(hex_bytes(&data[start..end])));
                i = end + 1;
            },
            b'[' => {
                tokens.push(Token::ArrayStart);
                i += 1;
            },
            b']' => {
                tokens.push(Token::ArrayEnd);
                i += 1;
            },
            b'(' => {
                // Literal strings only appear in the CMap header; skip them.
                let mut depth = 0usize;
                while i < data.len() {
                    match data[i] {
                        b'\\' => i += 1,
                        b'(' => depth += 1,
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        },
                        _ => {},
                    }
                    i += 1;
                }
                i += 1;
            },
            c if c.is_ascii_whitespace() => i += 1,
            _ => {
                let start = i;
                while i < data.len() && !is_delimiter(data[i]) {
                    i += 1;
                }
                if i == start {
                    i += 1;
                    continue;
                }
                tokens.push(Token::Word(String::from_utf8_lossy(&data[start..i]).into_owned()));
            },
        }
    }
    tokens
}

#[inline]
fn is_delimiter(b: u8) -> bool {
    b.is_ascii_whitespace() || matches!(b, b'<' | b'>' | b'[' | b']' | b'(' | b')' | b'%')
}

fn hex_bytes(hex: &[u8]) -> Vec<u8> {
    let digits: Vec<u8> = hex
        .iter()
        .filter_map(|&c| (c as char).to_digit(16).map(|d| d as u8))
        .collect();
    digits
        .chunks(2)
        .map(|pair| (pair[0] << 4) | pair.get(1).copied().unwrap_or(0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CMAP: &str = r#"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def
/CMapName /Adobe-Identity-UCS def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
2 beginbfchar
<0003> <0020>
<0024> <0041>
endbfchar
2 beginbfrange
<0044> <0046> <0061>
<0050> <0051> [<00660069> <00660066>]
endbfrange
endcmap
"#;

    #[test]
    fn test_parse_and_decode() {
        let cmap = ToUnicode::parse(CMAP.as_bytes());
        assert_eq!(cmap.code_len(), Some(2));
        assert_eq!(cmap.lookup(0x0003), Some(" "));
        assert_eq!(cmap.lookup(0x0045), Some("b"));
        assert_eq!(cmap.lookup(0x0051), Some("ff"));
        let text = cmap.decode(&[0x00, 0x24, 0x00, 0x03, 0x00, 0x46, 0x00, 0x50], 2);
        assert_eq!(text, "A cfi");
    }

    #[test]
    fn test_unmapped_code() {
        let cmap = ToUnicode::parse(b"1 beginbfchar <41> <0042> endbfchar");
        assert_eq!(cmap.code_len(), None);
        assert_eq!(cmap.decode(b"AZ", 1), "B\u{FFFD}");
    }
}
