//! ANSI stream compressor.
//!
//! Parses an emitted ANSI stream back into (fg, bg, glyph) cells per line,
//! drops codes that cannot affect visible output (foreground under a space,
//! background under a full block), folds runs of identical cells, and
//! re-emits with SGR introductions only where the effective state changes.
//! Lines end with a reset and state tracking restarts at line boundaries,
//! so the result is stable under recompression.

use crate::error::RenderError;
use crate::glyph;

/// One parsed cell: the codes in effect and the glyph character.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Cell {
    fg: Option<String>,
    bg: Option<String>,
    glyph: char,
}

/// Compress an ANSI stream produced by the emitter (or by a previous run
/// of this function; compression is idempotent).
pub fn compress_ansi(ansi: &str) -> Result<String, RenderError> {
    let mut out = String::with_capacity(ansi.len() / 2);
    let body = ansi.strip_suffix('\n').unwrap_or(ansi);
    for line in body.split('\n') {
        compress_line(line, &mut out)?;
    }
    Ok(out)
}

fn compress_line(line: &str, out: &mut String) -> Result<(), RenderError> {
    let cells = parse_line(line)?;

    // Terminal state after the previous line's reset.
    let mut cur_fg: Option<&str> = None;
    let mut cur_bg: Option<&str> = None;

    let mut i = 0;
    while i < cells.len() {
        let cell = &cells[i];
        let (eff_fg, eff_bg) = effective_codes(cell);

        let mut run_len = 1;
        while i + run_len < cells.len() {
            let next = &cells[i + run_len];
            let (next_fg, next_bg) = effective_codes(next);
            if next.glyph == cell.glyph && next_fg == eff_fg && next_bg == eff_bg {
                run_len += 1;
            } else {
                break;
            }
        }

        let mut params: Vec<&str> = Vec::new();
        if let Some(fg) = eff_fg {
            if cur_fg != Some(fg) {
                params.push(fg);
                cur_fg = Some(fg);
            }
        }
        if let Some(bg) = eff_bg {
            if cur_bg != Some(bg) {
                params.push(bg);
                cur_bg = Some(bg);
            }
        }
        if !params.is_empty() {
            out.push_str("\x1b[");
            out.push_str(&params.join(";"));
            out.push('m');
        }
        for _ in 0..run_len {
            out.push(cell.glyph);
        }
        i += run_len;
    }

    out.push_str("\x1b[0m\n");
    Ok(())
}

/// Codes that can affect this cell's visible output.
fn effective_codes(cell: &Cell) -> (Option<&str>, Option<&str>) {
    let is_space = cell.glyph == glyph::glyph_char(glyph::SPACE);
    let is_full = cell.glyph == glyph::glyph_char(glyph::FULL_BLOCK);
    let fg = if is_space { None } else { cell.fg.as_deref() };
    let bg = if is_full { None } else { cell.bg.as_deref() };
    (fg, bg)
}

/// Parse one line into cells, tracking SGR state.
fn parse_line(line: &str) -> Result<Vec<Cell>, RenderError> {
    let mut cells = Vec::new();
    let mut fg: Option<String> = None;
    let mut bg: Option<String> = None;

    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            match chars.next() {
                Some('[') => {}
                _ => return Err(RenderError::Ansi("escape without CSI".into())),
            }
            let mut params = String::new();
            loop {
                match chars.next() {
                    Some('m') => break,
                    Some(p) if p.is_ascii_digit() || p == ';' => params.push(p),
                    Some(p) => {
                        return Err(RenderError::Ansi(format!("unexpected CSI byte {p:?}")))
                    }
                    None => return Err(RenderError::Ansi("unterminated SGR sequence".into())),
                }
            }
            apply_sgr(&params, &mut fg, &mut bg)?;
        } else {
            cells.push(Cell {
                fg: fg.clone(),
                bg: bg.clone(),
                glyph: c,
            });
        }
    }
    Ok(cells)
}

/// Apply an SGR parameter list to the tracked color state.
fn apply_sgr(
    params: &str,
    fg: &mut Option<String>,
    bg: &mut Option<String>,
) -> Result<(), RenderError> {
    let tokens: Vec<&str> = params.split(';').collect();
    let mut i = 0;
    while i < tokens.len() {
        let tok = tokens[i];
        match tok {
            "0" => {
                *fg = None;
                *bg = None;
                i += 1;
            }
            "38" | "48" => {
                // Extended color: 38;5;N or 38;2;r;g;b (same for 48).
                let arity = match tokens.get(i + 1) {
                    Some(&"5") => 3,
                    Some(&"2") => 5,
                    _ => {
                        return Err(RenderError::Ansi(format!(
                            "malformed extended color code in {params:?}"
                        )))
                    }
                };
                if i + arity > tokens.len() {
                    return Err(RenderError::Ansi(format!(
                        "truncated extended color code in {params:?}"
                    )));
                }
                let code = tokens[i..i + arity].join(";");
                if tok == "38" {
                    *fg = Some(code);
                } else {
                    *bg = Some(code);
                }
                i += arity;
            }
            t if t.starts_with("10") || t.starts_with('4') => {
                *bg = Some(t.to_string());
                i += 1;
            }
            t if t.starts_with('3') || t.starts_with('9') => {
                *fg = Some(t.to_string());
                i += 1;
            }
            t => {
                return Err(RenderError::Ansi(format!("unknown SGR parameter {t:?}")));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_run_length_folding() {
        let input = "\x1b[37;40m█\x1b[37;40m█\x1b[37;40m█\x1b[0m\n";
        let out = compress_ansi(input).unwrap();
        // Full block: bg elided, one SGR, three glyphs, one reset.
        assert_eq!(out, "\x1b[37m███\x1b[0m\n");
    }

    #[test]
    fn test_space_elides_fg() {
        let input = "\x1b[37;40m \x1b[0m\n";
        let out = compress_ansi(input).unwrap();
        assert_eq!(out, "\x1b[40m \x1b[0m\n");
    }

    #[test]
    fn test_full_block_elides_bg() {
        let input = "\x1b[31;47m█\x1b[0m\n";
        let out = compress_ansi(input).unwrap();
        assert_eq!(out, "\x1b[31m█\x1b[0m\n");
    }

    #[test]
    fn test_sgr_only_on_change() {
        // Same colors, different glyphs: one SGR introduction.
        let input = "\x1b[31;40m▀\x1b[31;40m▌\x1b[31;40m▀\x1b[0m\n";
        let out = compress_ansi(input).unwrap();
        assert_eq!(out, "\x1b[31;40m▀▌▀\x1b[0m\n");
    }

    #[test]
    fn test_partial_state_change() {
        // fg persists; only bg changes mid-line.
        let input = "\x1b[31;40m▀\x1b[31;47m▀\x1b[0m\n";
        let out = compress_ansi(input).unwrap();
        assert_eq!(out, "\x1b[31;40m▀\x1b[47m▀\x1b[0m\n");
    }

    #[test]
    fn test_state_resets_at_line_boundary() {
        let input = "\x1b[31;40m▀\x1b[0m\n\x1b[31;40m▀\x1b[0m\n";
        let out = compress_ansi(input).unwrap();
        // The second line must reintroduce both codes after the reset.
        assert_eq!(out, "\x1b[31;40m▀\x1b[0m\n\x1b[31;40m▀\x1b[0m\n");
    }

    #[test]
    fn test_idempotent() {
        let input = "\x1b[37;40m█\x1b[37;40m█\x1b[30;40m \x1b[31;47m▚\x1b[31;47m▚\x1b[0m\n\
                     \x1b[30;40m \x1b[30;40m \x1b[0m\n";
        let once = compress_ansi(input).unwrap();
        let twice = compress_ansi(&once).unwrap();
        assert_eq!(once, twice, "compressor must be idempotent");
    }

    #[test]
    fn test_extended_codes_parse_as_units() {
        let input = "\x1b[38;5;124;48;5;17m▀\x1b[38;5;124;48;5;17m▀\x1b[0m\n";
        let out = compress_ansi(input).unwrap();
        assert_eq!(out, "\x1b[38;5;124;48;5;17m▀▀\x1b[0m\n");

        let tc = "\x1b[38;2;1;2;3;48;2;4;5;6m▀\x1b[0m\n";
        let out = compress_ansi(tc).unwrap();
        assert_eq!(out, "\x1b[38;2;1;2;3;48;2;4;5;6m▀\x1b[0m\n");
    }

    #[test]
    fn test_space_runs_merge_across_fg_differences() {
        // Two spaces with different (invisible) foregrounds on the same bg
        // are one run once fg is elided.
        let input = "\x1b[31;40m \x1b[37;40m \x1b[0m\n";
        let out = compress_ansi(input).unwrap();
        assert_eq!(out, "\x1b[40m  \x1b[0m\n");
    }

    #[test]
    fn test_malformed_streams_rejected() {
        assert!(compress_ansi("\x1b[31;40").is_err(), "unterminated SGR");
        assert!(compress_ansi("\x1bX").is_err(), "escape without CSI");
        assert!(compress_ansi("\x1b[38;9;1m ").is_err(), "bad extended code");
        assert!(compress_ansi("\x1b[7m ").is_err(), "unsupported parameter");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(compress_ansi("").unwrap(), "\x1b[0m\n");
    }
}
