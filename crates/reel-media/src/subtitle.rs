//! Subtitle preparation for the `drawtext` filter.
//!
//! Covers text escaping for the filter-graph language, greedy word wrapping,
//! side-channel text files for long or non-ASCII text, and best-effort font
//! file resolution.

use std::path::PathBuf;

use tracing::debug;

use reel_models::subtitle::DEFAULT_FONT_FAMILY;
use reel_models::SubtitleSpec;

use crate::error::MediaResult;
use crate::filters::{SubtitleDirective, SubtitleText};
use crate::temp::TempFileSet;

/// Default maximum characters per subtitle line.
pub const DEFAULT_MAX_LINE_CHARS: usize = 40;

/// Characters with meaning inside a filter option value.
const OPTION_SPECIAL: &[char] = &['\\', '\'', '"', '`', ':'];
/// Characters with meaning in the filter-graph description.
const GRAPH_SPECIAL: &[char] = &['\\', '\'', '[', ']', ',', ';'];

fn escape_chars(input: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape a value for use as a filter option inside a filter graph.
///
/// Two levels apply: the option parser (`\`, quotes, `:`) and the graph
/// parser (`\`, `'`, brackets, `,`, `;`).
pub fn escape_filter_value(value: &str) -> String {
    escape_chars(&escape_chars(value, OPTION_SPECIAL), GRAPH_SPECIAL)
}

/// Greedy word wrap. Words longer than `max_chars` are split.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        let mut current_len = 0;

        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();

            while word.len() > max_chars {
                if current_len > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }

            let word_len = word.len();
            if current_len > 0 && current_len + 1 + word_len > max_chars {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.extend(word);
            current_len += word_len;
        }

        if current_len > 0 {
            lines.push(current);
        }
    }

    lines
}

/// Font file candidates for one family, per platform.
#[derive(Debug, Clone)]
pub struct FontCandidates {
    pub family: String,
    pub linux: Vec<PathBuf>,
    pub macos: Vec<PathBuf>,
    pub windows: Vec<PathBuf>,
}

impl FontCandidates {
    fn new(family: &str, linux: &[&str], macos: &[&str], windows: &[&str]) -> Self {
        let paths = |list: &[&str]| list.iter().map(PathBuf::from).collect::<Vec<_>>();
        Self {
            family: family.to_string(),
            linux: paths(linux),
            macos: paths(macos),
            windows: paths(windows),
        }
    }

    /// Candidates for the current platform first, then the others.
    fn ordered(&self) -> impl Iterator<Item = &PathBuf> {
        let (first, second, third) = match std::env::consts::OS {
            "macos" => (&self.macos, &self.linux, &self.windows),
            "windows" => (&self.windows, &self.linux, &self.macos),
            _ => (&self.linux, &self.macos, &self.windows),
        };
        first.iter().chain(second).chain(third)
    }
}

/// Resolves a font family to a font file on disk.
#[derive(Debug, Clone)]
pub struct FontResolver {
    table: Vec<FontCandidates>,
    default_family: String,
}

impl Default for FontResolver {
    fn default() -> Self {
        Self::new(builtin_font_table())
    }
}

impl FontResolver {
    pub fn new(table: Vec<FontCandidates>) -> Self {
        Self {
            table,
            default_family: DEFAULT_FONT_FAMILY.to_string(),
        }
    }

    pub fn with_default_family(mut self, family: impl Into<String>) -> Self {
        self.default_family = family.into();
        self
    }

    fn candidates(&self, family: &str) -> Option<&FontCandidates> {
        self.table
            .iter()
            .find(|c| c.family.eq_ignore_ascii_case(family.trim()))
    }

    fn first_existing(&self, family: &str) -> Option<PathBuf> {
        self.candidates(family)?
            .ordered()
            .find(|path| path.is_file())
            .cloned()
    }

    /// Font file for `family`, falling back to the default family.
    ///
    /// `None` means no candidate exists and drawtext should use its own default.
    pub fn resolve(&self, family: &str) -> Option<PathBuf> {
        if let Some(path) = self.first_existing(family) {
            return Some(path);
        }
        let fallback = self.first_existing(&self.default_family);
        debug!(
            family = family,
            fallback = ?fallback,
            "Requested font not found, using default family"
        );
        fallback
    }
}

fn builtin_font_table() -> Vec<FontCandidates> {
    vec![
        FontCandidates::new(
            "DejaVu Sans",
            &[
                "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
                "/usr/share/fonts/TTF/DejaVuSans.ttf",
                "/usr/share/fonts/dejavu/DejaVuSans.ttf",
            ],
            &["/Library/Fonts/DejaVuSans.ttf"],
            &["C:\\Windows\\Fonts\\DejaVuSans.ttf"],
        ),
        FontCandidates::new(
            "Arial",
            &[
                "/usr/share/fonts/truetype/msttcorefonts/Arial.ttf",
                "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
            ],
            &[
                "/System/Library/Fonts/Supplemental/Arial.ttf",
                "/Library/Fonts/Arial.ttf",
            ],
            &["C:\\Windows\\Fonts\\arial.ttf"],
        ),
        FontCandidates::new(
            "Helvetica",
            &["/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf"],
            &["/System/Library/Fonts/Helvetica.ttc"],
            &["C:\\Windows\\Fonts\\arial.ttf"],
        ),
        FontCandidates::new(
            "Times New Roman",
            &[
                "/usr/share/fonts/truetype/msttcorefonts/Times_New_Roman.ttf",
                "/usr/share/fonts/truetype/liberation/LiberationSerif-Regular.ttf",
            ],
            &["/System/Library/Fonts/Supplemental/Times New Roman.ttf"],
            &["C:\\Windows\\Fonts\\times.ttf"],
        ),
        FontCandidates::new(
            "Roboto",
            &[
                "/usr/share/fonts/truetype/roboto/unhinted/RobotoTTF/Roboto-Regular.ttf",
                "/usr/share/fonts/truetype/roboto/Roboto-Regular.ttf",
            ],
            &["/Library/Fonts/Roboto-Regular.ttf"],
            &["C:\\Windows\\Fonts\\Roboto-Regular.ttf"],
        ),
        FontCandidates::new(
            "Noto Sans",
            &[
                "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
                "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
                "/usr/share/fonts/noto/NotoSans-Regular.ttf",
            ],
            &["/Library/Fonts/NotoSans-Regular.ttf"],
            &["C:\\Windows\\Fonts\\NotoSans-Regular.ttf"],
        ),
        FontCandidates::new(
            "Impact",
            &["/usr/share/fonts/truetype/msttcorefonts/Impact.ttf"],
            &["/System/Library/Fonts/Supplemental/Impact.ttf"],
            &["C:\\Windows\\Fonts\\impact.ttf"],
        ),
    ]
}

/// Subtitle ready for the filter plan, plus the text file it may own.
#[derive(Debug, Clone)]
pub struct PreparedSubtitle {
    pub directive: SubtitleDirective,
    /// Side-channel text file to delete right after the render.
    pub text_file: Option<PathBuf>,
}

/// Whether wrapped text must go through a text file instead of inline.
fn needs_text_file(text: &str, lines: &[String]) -> bool {
    !text.is_ascii() || lines.len() > 1
}

/// Wrap the text, decide inline vs file, resolve the font.
///
/// The text file is registered in `temp` under `file_stem`.
pub async fn prepare_subtitle(
    spec: &SubtitleSpec,
    max_line_chars: usize,
    fonts: &FontResolver,
    temp: &mut TempFileSet,
    file_stem: &str,
) -> MediaResult<PreparedSubtitle> {
    let lines = wrap_text(&spec.text, max_line_chars);

    let (text, text_file) = if needs_text_file(&spec.text, &lines) {
        let path = temp.path(&format!("{}.txt", file_stem));
        tokio::fs::write(&path, lines.join("\n")).await?;
        (SubtitleText::File(path.clone()), Some(path))
    } else {
        (SubtitleText::Inline(lines.join(" ")), None)
    };

    let directive = SubtitleDirective {
        text,
        font_file: fonts.resolve(&spec.font_family),
        font_size: spec.font_size,
        color: spec.color.clone(),
        position: spec.position,
        background: spec
            .background
            .as_ref()
            .map(|bg| (bg.color.clone(), (bg.opacity / 100.0).clamp(0.0, 1.0))),
    };

    Ok(PreparedSubtitle {
        directive,
        text_file,
    })
}
