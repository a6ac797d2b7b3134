use serde::{Deserialize, Serialize};

/// RGB color of a console text fragment, `0xRRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanColor(pub u32);

/// One styled fragment of a console line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColoredSpan {
    pub text: String,
    pub color: Option<SpanColor>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl ColoredSpan {
    pub fn plain(text: impl Into<String>) -> Self {
        ColoredSpan {
            text: text.into(),
            color: None,
            bold: false,
            italic: false,
            underline: false,
        }
    }
}

const ESC: char = '\u{1b}';

/// ANSI SGR color codes 30-37 and 90-97.
fn ansi_color(code: &str) -> Option<SpanColor> {
    let rgb = match code {
        "30" => 0x000000, // Black
        "31" => 0xAA0000, // Red
        "32" => 0x00AA00, // Green
        "33" => 0xAAAA00, // Yellow
        "34" => 0x0000AA, // Blue
        "35" => 0xAA00AA, // Magenta
        "36" => 0x00AAAA, // Cyan
        "37" => 0xAAAAAA, // White
        "90" => 0x555555, // Bright Black (Gray)
        "91" => 0xFF5555, // Bright Red
        "92" => 0x55FF55, // Bright Green
        "93" => 0xFFFF55, // Bright Yellow
        "94" => 0x5555FF, // Bright Blue
        "95" => 0xFF55FF, // Bright Magenta
        "96" => 0x55FFFF, // Bright Cyan
        "97" => 0xFFFFFF, // Bright White
        _ => return None,
    };
    Some(SpanColor(rgb))
}

/// Legacy game color codes `0`-`9`, `a`-`f` (case-insensitive).
fn legacy_color(code: char) -> Option<SpanColor> {
    let rgb = match code {
        '0' => 0x000000, // Black
        '1' => 0x0000AA, // Dark Blue
        '2' => 0x00AA00, // Dark Green
        '3' => 0x00AAAA, // Dark Aqua
        '4' => 0xAA0000, // Dark Red
        '5' => 0xAA00AA, // Dark Purple
        '6' => 0xFFAA00, // Gold
        '7' => 0xAAAAAA, // Gray
        '8' => 0x555555, // Dark Gray
        '9' => 0x5555FF, // Blue
        'a' => 0x55FF55, // Green
        'b' => 0x55FFFF, // Aqua
        'c' => 0xFF5555, // Red
        'd' => 0xFF55FF, // Light Purple
        'e' => 0xFFFF55, // Yellow
        'f' => 0xFFFFFF, // White
        _ => return None,
    };
    Some(SpanColor(rgb))
}

/// `true` for every legacy code char the marker grammar accepts,
/// including `k` (obfuscated) and `m` (strikethrough) which carry no
/// attribute of their own and are consumed silently.
fn is_legacy_code(code: char) -> bool {
    legacy_color(code).is_some() || matches!(code, 'k'..='o' | 'r')
}

struct Attrs {
    color: Option<SpanColor>,
    bold: bool,
    italic: bool,
    underline: bool,
}

impl Attrs {
    fn reset(&mut self) {
        self.color = None;
        self.bold = false;
        self.italic = false;
        self.underline = false;
    }
}

/// Splits a console line into styled spans, recognizing ANSI SGR
/// sequences (`ESC [ params m`) and legacy `§`/`&` color codes left to
/// right, first match wins. A malformed ANSI escape (no terminating
/// `m`) is kept as literal text. Never returns an empty list: a line
/// without codes yields one unstyled span equal to the input.
pub fn parse(line: &str) -> Vec<ColoredSpan> {
    let chars: Vec<char> = line.chars().collect();
    let mut spans: Vec<ColoredSpan> = Vec::new();
    let mut text = String::new();
    let mut attrs = Attrs {
        color: None,
        bold: false,
        italic: false,
        underline: false,
    };

    let flush = |spans: &mut Vec<ColoredSpan>, text: &mut String, attrs: &Attrs| {
        if !text.is_empty() {
            spans.push(ColoredSpan {
                text: std::mem::take(text),
                color: attrs.color,
                bold: attrs.bold,
                italic: attrs.italic,
                underline: attrs.underline,
            });
        }
    };

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];

        // ANSI escape: ESC [ <params> m
        if c == ESC && i + 1 < chars.len() && chars[i + 1] == '[' {
            if let Some(end) = chars[i + 2..].iter().position(|&c| c == 'm') {
                flush(&mut spans, &mut text, &attrs);
                let params: String = chars[i + 2..i + 2 + end].iter().collect();
                for code in params.split(';') {
                    match code {
                        "0" => attrs.reset(),
                        "1" => attrs.bold = true,
                        "3" => attrs.italic = true,
                        "4" => attrs.underline = true,
                        "22" => attrs.bold = false,
                        "23" => attrs.italic = false,
                        "24" => attrs.underline = false,
                        _ => {
                            if let Some(color) = ansi_color(code) {
                                attrs.color = Some(color);
                            }
                            // unrecognized codes are ignored
                        }
                    }
                }
                i += 2 + end + 1;
                continue;
            }
            // no terminator before end of line: literal from here on
        }

        // Legacy game code: §X or &X
        if (c == '§' || c == '&') && i + 1 < chars.len() {
            let code = chars[i + 1].to_ascii_lowercase();
            if is_legacy_code(code) {
                flush(&mut spans, &mut text, &attrs);
                if let Some(color) = legacy_color(code) {
                    attrs.color = Some(color);
                } else {
                    match code {
                        'l' => attrs.bold = true,
                        'o' => attrs.italic = true,
                        'n' => attrs.underline = true,
                        // unlike ANSI 0, `r` is the only legacy code
                        // that clears color
                        'r' => attrs.reset(),
                        _ => {} // k, m: consumed, no attribute
                    }
                }
                i += 2;
                continue;
            }
        }

        text.push(c);
        i += 1;
    }

    flush(&mut spans, &mut text, &attrs);
    if spans.is_empty() {
        spans.push(ColoredSpan::plain(line));
    }
    spans
}

/// Removes both escape grammars and returns the plain text. Unlike
/// [`parse`], a line made of codes only strips to the empty string.
pub fn strip_codes(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];

        if c == ESC && i + 1 < chars.len() && chars[i + 1] == '[' {
            if let Some(end) = chars[i + 2..].iter().position(|&c| c == 'm') {
                i += 2 + end + 1;
                continue;
            }
        }

        if (c == '§' || c == '&') && i + 1 < chars.len() {
            if is_legacy_code(chars[i + 1].to_ascii_lowercase()) {
                i += 2;
                continue;
            }
        }

        out.push(c);
        i += 1;
    }
    out
}
