//! Two-pass diagram layout.
//!
//! Pass 1 sizes every word box from text metrics alone (no renderer to ask).
//! Pass 2 places boxes in centered, wrapping rows, like a `flex-wrap` row
//! with `justify-content: center`, and derives [`WordPosition`]s for the
//! main band, which feed [`compute_connectors`].
//!
//! Below the main panel sit two text panels, the explanation and the word
//! details, laid out line by line with word-aware wrapping.
//!
//! Coordinates: topic boxes and panels are in document space. Main-band
//! boxes, positions and connectors are relative to the main panel's
//! top-left corner, the way the browser version measured them against
//! their container.

use crate::analysis::{SentenceAnalysis, WordNode};
use crate::utils::sanitize::plain_paragraphs;

use super::connectors::{compute_connectors, Connector, WordPosition};
use super::details::{word_details, WordDetail};

/// Notice shown in the fragment banner.
pub const FRAGMENT_NOTICE: &str = "This appears to be an incomplete sentence or fragment. It may be missing key components like a verb or not express a complete thought.";

/// Metrics and spacing for layout. Units are CSS pixels.
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// Outer margin around the whole document.
    pub margin: f64,
    /// Width of the main panel (and of every band).
    pub container_width: f64,
    pub container_padding: f64,
    /// Empty space above the first main row, for arcs.
    pub arc_headroom: f64,
    pub min_container_height: f64,
    /// Gap between items in a row and between rows.
    pub gap: f64,
    pub text_font: f64,
    pub reading_font: f64,
    pub pos_font: f64,
    pub line_height: f64,
    /// Advance of CJK / kana / full-width characters, in ems.
    pub wide_advance: f64,
    /// Advance of everything else, in ems.
    pub narrow_advance: f64,
    pub box_padding: f64,
    pub box_border: f64,
    pub box_max_width: f64,
    pub particle_font: f64,
    pub particle_reading_font: f64,
    pub particle_padding_x: f64,
    pub particle_padding_y: f64,
    /// How far a particle chip tucks under its word box.
    pub particle_overlap: f64,
    /// Vertical drop of the particle chip below the box top.
    pub particle_offset_y: f64,
    /// Minimum banner height; long notices grow it.
    pub banner_height: f64,
    pub banner_padding: f64,
    pub banner_title_font: f64,
    pub banner_font: f64,
    pub band_label_height: f64,
    pub band_gap: f64,
    /// Vertical space between the main, explanation and details panels.
    pub section_gap: f64,
    pub panel_padding: f64,
    pub heading_font: f64,
    pub body_font: f64,
    pub paragraph_gap: f64,
    pub detail_font: f64,
    pub detail_row_padding: f64,
    pub detail_row_gap: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            margin: 24.0,
            container_width: 896.0,
            container_padding: 32.0,
            arc_headroom: 64.0,
            min_container_height: 400.0,
            gap: 16.0,
            text_font: 20.0,
            reading_font: 14.0,
            pos_font: 12.0,
            line_height: 1.4,
            wide_advance: 1.0,
            narrow_advance: 0.6,
            box_padding: 16.0,
            box_border: 2.0,
            box_max_width: 150.0,
            particle_font: 14.0,
            particle_reading_font: 11.0,
            particle_padding_x: 8.0,
            particle_padding_y: 4.0,
            particle_overlap: 8.0,
            particle_offset_y: 10.0,
            banner_height: 64.0,
            banner_padding: 16.0,
            banner_title_font: 14.0,
            banner_font: 12.0,
            band_label_height: 28.0,
            band_gap: 24.0,
            section_gap: 24.0,
            panel_padding: 24.0,
            heading_font: 18.0,
            body_font: 14.0,
            paragraph_gap: 8.0,
            detail_font: 16.0,
            detail_row_padding: 12.0,
            detail_row_gap: 8.0,
        }
    }
}

impl LayoutConfig {
    /// Rendered width of `text` at `font_size`.
    pub fn text_width(&self, text: &str, font_size: f64) -> f64 {
        text.chars()
            .map(|c| {
                if is_wide(c) {
                    self.wide_advance
                } else {
                    self.narrow_advance
                }
            })
            .sum::<f64>()
            * font_size
    }

    /// Greedy character wrap of `text` to `max_width`. Never returns an
    /// empty list; an overlong single character gets a line of its own.
    pub fn wrap(&self, text: &str, font_size: f64, max_width: f64) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current = String::new();
        let mut width = 0.0;
        for c in text.chars() {
            let advance = self.text_width(c.encode_utf8(&mut [0; 4]), font_size);
            if !current.is_empty() && width + advance > max_width {
                lines.push(std::mem::take(&mut current));
                width = 0.0;
            }
            current.push(c);
            width += advance;
        }
        lines.push(current);
        lines
    }

    /// Greedy wrap at word boundaries: after whitespace and around wide
    /// characters. A word wider than `max_width` falls back to [`wrap`].
    ///
    /// [`wrap`]: LayoutConfig::wrap
    pub fn wrap_words(&self, text: &str, font_size: f64, max_width: f64) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current = String::new();
        for segment in break_segments(text) {
            let candidate = format!("{current}{segment}");
            if current.is_empty()
                || self.text_width(candidate.trim_end(), font_size) <= max_width
            {
                current = candidate;
                continue;
            }
            lines.push(current.trim_end().to_string());
            current = segment.to_string();
        }
        lines.push(current.trim_end().to_string());
        lines
            .into_iter()
            .flat_map(|line| {
                if self.text_width(&line, font_size) > max_width {
                    self.wrap(&line, font_size, max_width)
                } else {
                    vec![line]
                }
            })
            .collect()
    }

    pub fn line_px(&self, font_size: f64) -> f64 {
        font_size * self.line_height
    }

    /// Text baseline for a line box whose top is `top`.
    pub fn baseline(&self, top: f64, font_size: f64) -> f64 {
        top + (self.line_px(font_size) + font_size * 0.7) / 2.0
    }

    fn box_inner_max(&self) -> f64 {
        self.box_max_width - 2.0 * (self.box_padding + self.box_border)
    }
}

/// Split `text` into unbreakable pieces. Whitespace stays attached to the
/// piece before it; every wide character is a piece of its own.
fn break_segments(text: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;
    for (i, c) in text.char_indices() {
        if let Some(p) = prev {
            let after_space = p.is_whitespace() && !c.is_whitespace();
            let around_wide = !c.is_whitespace() && (is_wide(p) || is_wide(c));
            if after_space || around_wide {
                segments.push(&text[start..i]);
                start = i;
            }
        }
        prev = Some(c);
    }
    if start < text.len() {
        segments.push(&text[start..]);
    }
    segments
}

/// CJK ideographs, kana, full-width forms and the CJK punctuation block.
fn is_wide(c: char) -> bool {
    matches!(c as u32,
        0x1100..=0x115F
        | 0x2E80..=0x303E
        | 0x3040..=0x33FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xA960..=0xA97F
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6
        | 0x20000..=0x3FFFD)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    fn offset(&self, dx: f64, dy: f64) -> Rect {
        Rect {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}

/// Pass-1 result for one word: box size plus wrapped label lines.
#[derive(Debug, Clone, PartialEq)]
pub struct WordMetrics {
    pub box_size: Size,
    pub text_lines: Vec<String>,
    pub reading_lines: Vec<String>,
    pub pos_lines: Vec<String>,
    pub particle_size: Option<Size>,
    /// Particle reading shown under the chip, if it differs from the text.
    pub particle_reading: Option<String>,
}

impl WordMetrics {
    /// Footprint of box + particle chip, which is what flow layout places.
    pub fn item_size(&self, config: &LayoutConfig) -> Size {
        match self.particle_size {
            Some(p) => Size {
                width: self.box_size.width + p.width - config.particle_overlap,
                height: self
                    .box_size
                    .height
                    .max(config.particle_offset_y + p.height),
            },
            None => self.box_size,
        }
    }
}

/// Pass 1: size a word box from its labels.
pub fn measure_word(word: &WordNode, config: &LayoutConfig) -> WordMetrics {
    let inner_max = config.box_inner_max();
    let text_lines = config.wrap(&word.text, config.text_font, inner_max);
    let reading_lines = word
        .reading
        .as_deref()
        .filter(|r| !r.is_empty())
        .map(|r| config.wrap(r, config.reading_font, inner_max))
        .unwrap_or_default();
    let pos_lines = config.wrap(&word.part_of_speech, config.pos_font, inner_max);

    let widest = |lines: &[String], font: f64| {
        lines
            .iter()
            .map(|l| config.text_width(l, font))
            .fold(0.0_f64, f64::max)
    };
    let inner_width = widest(&text_lines, config.text_font)
        .max(widest(&reading_lines, config.reading_font))
        .max(widest(&pos_lines, config.pos_font));

    let mut inner_height = text_lines.len() as f64 * config.line_px(config.text_font) + 4.0;
    if !reading_lines.is_empty() {
        inner_height += reading_lines.len() as f64 * config.line_px(config.reading_font) + 8.0;
    }
    inner_height += pos_lines.len() as f64 * config.line_px(config.pos_font);

    let frame = 2.0 * (config.box_padding + config.box_border);
    let box_size = Size {
        width: inner_width + frame,
        height: inner_height + frame,
    };

    let (particle_size, particle_reading) = match &word.attached_particle {
        Some(p) => {
            let reading = p
                .reading
                .as_deref()
                .filter(|r| !r.is_empty() && *r != p.text)
                .map(str::to_string);
            let mut width = config.text_width(&p.text, config.particle_font);
            let mut height = config.line_px(config.particle_font);
            if let Some(r) = &reading {
                width = width.max(config.text_width(r, config.particle_reading_font));
                height += config.line_px(config.particle_reading_font);
            }
            let chip = Size {
                width: width + 2.0 * (config.particle_padding_x + config.box_border),
                height: height + 2.0 * (config.particle_padding_y + config.box_border),
            };
            (Some(chip), reading)
        }
        None => (None, None),
    };

    WordMetrics {
        box_size,
        text_lines,
        reading_lines,
        pos_lines,
        particle_size,
        particle_reading,
    }
}

/// A placed word.
#[derive(Debug, Clone, PartialEq)]
pub struct WordBox {
    pub id: String,
    pub is_topic: bool,
    /// The word box proper (arrows attach here).
    pub rect: Rect,
    pub particle: Option<Rect>,
    pub metrics: WordMetrics,
}

/// Pass 2 helper: centered wrapping rows. Returns each item's top-left
/// offset within a band of `max_width`, and the band's total height.
pub fn flow(items: &[Size], max_width: f64, gap: f64) -> (Vec<(f64, f64)>, f64) {
    let mut offsets = vec![(0.0, 0.0); items.len()];
    let mut y = 0.0;
    let mut start = 0;
    while start < items.len() {
        let mut end = start;
        let mut row_width = 0.0_f64;
        while end < items.len() {
            let added = if end == start {
                items[end].width
            } else {
                gap + items[end].width
            };
            if end > start && row_width + added > max_width {
                break;
            }
            row_width += added;
            end += 1;
        }
        let row_height = items[start..end]
            .iter()
            .map(|s| s.height)
            .fold(0.0_f64, f64::max);
        let mut x = ((max_width - row_width) / 2.0).max(0.0);
        for (i, item) in items.iter().enumerate().take(end).skip(start) {
            offsets[i] = (x, y);
            x += item.width + gap;
        }
        y += row_height;
        start = end;
        if start < items.len() {
            y += gap;
        }
    }
    (offsets, y)
}

fn place(
    words: &[&WordNode],
    config: &LayoutConfig,
    origin_x: f64,
    origin_y: f64,
    band_width: f64,
) -> (Vec<WordBox>, f64) {
    let metrics: Vec<WordMetrics> = words.iter().map(|w| measure_word(w, config)).collect();
    let sizes: Vec<Size> = metrics.iter().map(|m| m.item_size(config)).collect();
    let (offsets, height) = flow(&sizes, band_width, config.gap);

    let boxes = words
        .iter()
        .zip(metrics)
        .zip(offsets)
        .map(|((word, metrics), (dx, dy))| {
            let rect = Rect {
                x: origin_x + dx,
                y: origin_y + dy,
                width: metrics.box_size.width,
                height: metrics.box_size.height,
            };
            let particle = metrics.particle_size.map(|p| Rect {
                x: rect.x + rect.width - config.particle_overlap,
                y: rect.y + config.particle_offset_y,
                width: p.width,
                height: p.height,
            });
            WordBox {
                id: word.id.clone(),
                is_topic: word.is_topic,
                rect,
                particle,
                metrics,
            }
        })
        .collect();
    (boxes, height)
}

/// Topic band above the main panel.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicBand {
    /// Baseline of the "Topic (Context)" label.
    pub label_y: f64,
    pub boxes: Vec<WordBox>,
    /// y of the dashed separator under the band.
    pub separator_y: f64,
}

/// One line of text; `y` is the baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub y: f64,
    pub text: String,
}

/// Fragment warning at the top of the document.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentBanner {
    pub rect: Rect,
    /// Baseline of the "Sentence Fragment" title.
    pub title_y: f64,
    pub lines: Vec<TextLine>,
}

/// The explanation, flattened to wrapped plain-text lines.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplanationPanel {
    pub rect: Rect,
    pub heading_y: f64,
    pub lines: Vec<TextLine>,
}

/// One row of the word-details list.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailRow {
    pub rect: Rect,
    /// Baseline of the text / reading / part-of-speech line.
    pub head_y: f64,
    pub detail: WordDetail,
    /// Wrapped `Modifies:` line, empty when the word modifies nothing.
    pub modifies_lines: Vec<TextLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailsPanel {
    pub rect: Rect,
    pub heading_y: f64,
    pub rows: Vec<DetailRow>,
}

/// Full diagram geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramLayout {
    pub width: f64,
    pub height: f64,
    pub fragment_banner: Option<FragmentBanner>,
    pub topic_band: Option<TopicBand>,
    /// Main panel in document space.
    pub main_panel: Rect,
    /// Main-band boxes, relative to `main_panel`.
    pub main_boxes: Vec<WordBox>,
    /// Arrows, relative to `main_panel`.
    pub connectors: Vec<Connector>,
    pub explanation: ExplanationPanel,
    pub word_details: DetailsPanel,
}

impl DiagramLayout {
    pub fn positions(&self) -> Vec<WordPosition> {
        measure_positions(&self.main_boxes)
    }

    /// Main-band box for `id`, in document space.
    pub fn main_box_in_document(&self, id: &str) -> Option<Rect> {
        self.main_boxes
            .iter()
            .find(|b| b.id == id)
            .map(|b| b.rect.offset(self.main_panel.x, self.main_panel.y))
    }
}

/// Derive arrow-anchor geometry from placed boxes.
pub fn measure_positions(boxes: &[WordBox]) -> Vec<WordPosition> {
    boxes
        .iter()
        .map(|b| WordPosition {
            id: b.id.clone(),
            center_x: b.rect.center_x(),
            center_y: b.rect.center_y(),
            width: b.rect.width,
            height: b.rect.height,
        })
        .collect()
}

/// Lay out a whole analysis. Pure: same input, same geometry.
pub fn layout(analysis: &SentenceAnalysis, config: &LayoutConfig) -> DiagramLayout {
    let band_width = config.container_width - 2.0 * config.container_padding;
    let mut y = config.margin;

    let fragment_banner = analysis.is_fragment.then(|| {
        let banner = layout_banner(config, y);
        y = banner.rect.bottom() + config.gap;
        banner
    });

    let topics = analysis.topic_words();
    let topic_band = (!topics.is_empty()).then(|| {
        let label_y = y + config.band_label_height * 0.6;
        let (boxes, height) = place(
            &topics,
            config,
            config.margin + config.container_padding,
            y + config.band_label_height,
            band_width,
        );
        let separator_y = y + config.band_label_height + height + config.gap;
        y = separator_y + config.band_gap;
        TopicBand {
            label_y,
            boxes,
            separator_y,
        }
    });

    let mains = analysis.main_words();
    let (main_boxes, content_height) = place(
        &mains,
        config,
        config.container_padding,
        config.arc_headroom,
        band_width,
    );
    let panel_height = (config.arc_headroom + content_height + config.container_padding)
        .max(config.min_container_height);
    let main_panel = Rect {
        x: config.margin,
        y,
        width: config.container_width,
        height: panel_height,
    };

    let positions = measure_positions(&main_boxes);
    let connectors = compute_connectors(&analysis.words, &positions);

    let explanation = explanation_panel(
        &analysis.explanation,
        config,
        main_panel.bottom() + config.section_gap,
    );
    let word_details = details_panel(
        analysis,
        config,
        explanation.rect.bottom() + config.section_gap,
    );

    DiagramLayout {
        width: config.container_width + 2.0 * config.margin,
        height: word_details.rect.bottom() + config.margin,
        fragment_banner,
        topic_band,
        main_panel,
        main_boxes,
        connectors,
        explanation,
        word_details,
    }
}

fn layout_banner(config: &LayoutConfig, top: f64) -> FragmentBanner {
    let pad = config.banner_padding;
    let title_y = config.baseline(top + pad, config.banner_title_font);
    let mut cursor = top + pad + config.line_px(config.banner_title_font) + 4.0;
    let lines = config
        .wrap_words(
            FRAGMENT_NOTICE,
            config.banner_font,
            config.container_width - 2.0 * pad,
        )
        .into_iter()
        .map(|text| {
            let line = TextLine {
                y: config.baseline(cursor, config.banner_font),
                text,
            };
            cursor += config.line_px(config.banner_font);
            line
        })
        .collect();
    FragmentBanner {
        rect: Rect {
            x: config.margin,
            y: top,
            width: config.container_width,
            height: (cursor + pad - top).max(config.banner_height),
        },
        title_y,
        lines,
    }
}

/// Panel frame shared by the explanation and details panels: heading
/// baseline and the y where content starts.
fn panel_heading(config: &LayoutConfig, top: f64, spacing: f64) -> (f64, f64) {
    let heading_top = top + config.panel_padding;
    (
        config.baseline(heading_top, config.heading_font),
        heading_top + config.line_px(config.heading_font) + spacing,
    )
}

fn panel_rect(config: &LayoutConfig, top: f64, content_bottom: f64) -> Rect {
    Rect {
        x: config.margin,
        y: top,
        width: config.container_width,
        height: content_bottom + config.panel_padding - top,
    }
}

fn explanation_panel(explanation: &str, config: &LayoutConfig, top: f64) -> ExplanationPanel {
    let (heading_y, mut cursor) = panel_heading(config, top, 16.0);
    let text_width = config.container_width - 2.0 * config.panel_padding;
    let mut lines = Vec::new();
    for (i, paragraph) in plain_paragraphs(explanation).iter().enumerate() {
        if i > 0 {
            cursor += config.paragraph_gap;
        }
        for text in config.wrap_words(paragraph, config.body_font, text_width) {
            lines.push(TextLine {
                y: config.baseline(cursor, config.body_font),
                text,
            });
            cursor += config.line_px(config.body_font);
        }
    }
    ExplanationPanel {
        rect: panel_rect(config, top, cursor),
        heading_y,
        lines,
    }
}

fn details_panel(analysis: &SentenceAnalysis, config: &LayoutConfig, top: f64) -> DetailsPanel {
    let (heading_y, mut cursor) = panel_heading(config, top, 12.0);
    let row_x = config.margin + config.panel_padding;
    let row_width = config.container_width - 2.0 * config.panel_padding;
    let pad = config.detail_row_padding;

    let mut rows = Vec::new();
    for (i, detail) in word_details(analysis).into_iter().enumerate() {
        if i > 0 {
            cursor += config.detail_row_gap;
        }
        let row_top = cursor;
        let head_y = config.baseline(row_top + pad, config.detail_font);
        let mut inner = row_top + pad + config.line_px(config.detail_font);
        let modifies_lines = detail
            .modifies
            .as_deref()
            .map(|label| config.wrap_words(label, config.body_font, row_width - 2.0 * pad))
            .unwrap_or_default()
            .into_iter()
            .map(|text| {
                let line = TextLine {
                    y: config.baseline(inner, config.body_font),
                    text,
                };
                inner += config.line_px(config.body_font);
                line
            })
            .collect();
        let rect = Rect {
            x: row_x,
            y: row_top,
            width: row_width,
            height: inner + pad - row_top,
        };
        cursor = rect.bottom();
        rows.push(DetailRow {
            rect,
            head_y,
            detail,
            modifies_lines,
        });
    }
    DetailsPanel {
        rect: panel_rect(config, top, cursor),
        heading_y,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::watashi_wa;

    fn cfg() -> LayoutConfig {
        LayoutConfig::default()
    }

    #[test]
    fn test_text_width_wide_vs_narrow() {
        let c = cfg();
        assert_eq!(c.text_width("花", 20.0), 20.0);
        assert_eq!(c.text_width("ab", 10.0), 12.0);
        assert_eq!(c.text_width("見ました", 20.0), 80.0);
        assert_eq!(c.text_width("", 20.0), 0.0);
    }

    #[test]
    fn test_wrap_breaks_long_text() {
        let c = cfg();
        // Inner width 114 at 20px: five wide chars per line.
        let lines = c.wrap("あいうえおかきくけこさ", 20.0, c.box_inner_max());
        assert_eq!(lines, vec!["あいうえお", "かきくけこ", "さ"]);
        assert_eq!(c.wrap("", 20.0, 100.0), vec![String::new()]);
    }

    #[test]
    fn test_wrap_words_breaks_at_spaces() {
        let c = cfg();
        // 6px per narrow char at 10px: "the quick" is 54px.
        assert_eq!(
            c.wrap_words("the quick brown fox", 10.0, 60.0),
            vec!["the quick", "brown fox"]
        );
        assert_eq!(c.wrap_words("私は花を見た", 10.0, 25.0), vec!["私は", "花を", "見た"]);
        // A word that cannot fit is split by character.
        assert_eq!(c.wrap_words("abcdefghij", 10.0, 30.0), vec!["abcde", "fghij"]);
    }

    #[test]
    fn test_box_width_capped() {
        let c = cfg();
        let mut word = watashi_wa().words[3].clone();
        word.text = "とてもとてもながいことば".into();
        let m = measure_word(&word, &c);
        assert!(m.box_size.width <= c.box_max_width);
        assert!(m.text_lines.len() > 1);
    }

    #[test]
    fn test_particle_reading_hidden_when_same_as_text() {
        let c = cfg();
        let mut word = watashi_wa().words[0].clone();
        word.attached_particle.as_mut().unwrap().reading = Some("は".into());
        assert!(measure_word(&word, &c).particle_reading.is_none());
        word.attached_particle.as_mut().unwrap().reading = Some("わ".into());
        assert_eq!(measure_word(&word, &c).particle_reading.as_deref(), Some("わ"));
    }

    #[test]
    fn test_item_size_includes_particle() {
        let c = cfg();
        let analysis = watashi_wa();
        let with = measure_word(&analysis.words[2], &c);
        let chip = with.particle_size.unwrap();
        let item = with.item_size(&c);
        assert_eq!(item.width, with.box_size.width + chip.width - c.particle_overlap);
        let without = measure_word(&analysis.words[3], &c);
        assert_eq!(without.item_size(&c), without.box_size);
    }

    #[test]
    fn test_flow_centers_single_row() {
        let items = [
            Size { width: 100.0, height: 50.0 },
            Size { width: 100.0, height: 70.0 },
        ];
        let (offsets, height) = flow(&items, 400.0, 16.0);
        // Row width 216, left margin (400 - 216) / 2 = 92.
        assert_eq!(offsets, vec![(92.0, 0.0), (208.0, 0.0)]);
        assert_eq!(height, 70.0);
    }

    #[test]
    fn test_flow_wraps_rows() {
        let items = [Size { width: 150.0, height: 40.0 }; 3];
        let (offsets, height) = flow(&items, 320.0, 16.0);
        assert_eq!(offsets[0].1, 0.0);
        assert_eq!(offsets[1].1, 0.0);
        assert_eq!(offsets[2], (85.0, 56.0));
        assert_eq!(height, 96.0);
    }

    #[test]
    fn test_flow_oversized_item_gets_own_row() {
        let items = [Size { width: 500.0, height: 10.0 }];
        let (offsets, _) = flow(&items, 300.0, 16.0);
        assert_eq!(offsets, vec![(0.0, 0.0)]);
    }

    #[test]
    fn test_flow_empty() {
        let (offsets, height) = flow(&[], 300.0, 16.0);
        assert!(offsets.is_empty());
        assert_eq!(height, 0.0);
    }

    #[test]
    fn test_layout_partitions_and_orders() {
        let layout = layout(&watashi_wa(), &cfg());
        let band = layout.topic_band.as_ref().unwrap();
        assert_eq!(band.boxes.len(), 1);
        assert_eq!(band.boxes[0].id, "w1");
        let ids: Vec<&str> = layout.main_boxes.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["w2", "w3", "w4"]);
        // Left-to-right by position.
        assert!(layout.main_boxes[0].rect.x < layout.main_boxes[1].rect.x);
        assert!(layout.main_boxes[1].rect.x < layout.main_boxes[2].rect.x);
        assert!(layout.fragment_banner.is_none());
    }

    #[test]
    fn test_topic_band_sits_above_main_panel() {
        let layout = layout(&watashi_wa(), &cfg());
        let band = layout.topic_band.unwrap();
        assert!(band.separator_y < layout.main_panel.y);
        assert!(band.boxes[0].rect.bottom() < band.separator_y);
    }

    #[test]
    fn test_layout_connectors_follow_modifies() {
        let layout = layout(&watashi_wa(), &cfg());
        let edges: Vec<(&str, &str)> = layout
            .connectors
            .iter()
            .map(|c| (c.from.as_str(), c.to.as_str()))
            .collect();
        assert_eq!(edges, vec![("w2", "w3"), ("w3", "w4")]);
        // Arcs start at the top-center of the source box.
        let src = &layout.main_boxes[0].rect;
        assert_eq!(layout.connectors[0].start.x, src.center_x());
        assert!((layout.connectors[0].start.y - src.y).abs() < 1e-9);
        // First row starts below the headroom, so arcs stay inside the panel.
        assert!(layout.connectors.iter().all(|c| c.control.y >= 0.0));
    }

    #[test]
    fn test_positions_only_for_main_band() {
        let layout = layout(&watashi_wa(), &cfg());
        let ids: Vec<String> = layout.positions().into_iter().map(|p| p.id).collect();
        assert!(!ids.contains(&"w1".to_string()));
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_fragment_banner_pushes_content_down() {
        let mut analysis = watashi_wa();
        let plain = layout(&analysis, &cfg());
        analysis.is_fragment = true;
        let fragment = layout(&analysis, &cfg());
        assert!(fragment.main_panel.y > plain.main_panel.y);
        assert!(fragment.height > plain.height);

        let banner = fragment.fragment_banner.unwrap();
        let joined: Vec<&str> = banner.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(joined.join(" "), FRAGMENT_NOTICE);
        assert!(banner.lines.len() > 1);
        let last = banner.lines.last().unwrap();
        assert!(last.y < banner.rect.bottom());
    }

    #[test]
    fn test_text_panels_stack_below_main_panel() {
        let layout = layout(&watashi_wa(), &cfg());
        let explanation = &layout.explanation;
        let details = &layout.word_details;
        assert!(explanation.rect.y > layout.main_panel.bottom());
        assert!(details.rect.y > explanation.rect.bottom());
        assert_eq!(layout.height, details.rect.bottom() + cfg().margin);
        assert_eq!(
            explanation.lines[0].text,
            "This sentence follows the SOV pattern."
        );
        assert!(explanation.heading_y < explanation.lines[0].y);
    }

    #[test]
    fn test_detail_rows_in_position_order() {
        let layout = layout(&watashi_wa(), &cfg());
        let rows = &layout.word_details.rows;
        let ids: Vec<&str> = rows.iter().map(|r| r.detail.id.as_str()).collect();
        assert_eq!(ids, vec!["w1", "w2", "w3", "w4"]);
        for pair in rows.windows(2) {
            assert!(pair[0].rect.bottom() < pair[1].rect.y);
        }
        // Only words that modify something get the second line.
        assert!(rows[0].modifies_lines.is_empty());
        assert_eq!(rows[1].modifies_lines[0].text, "Modifies: 花");
        assert!(rows[1].rect.height > rows[0].rect.height);
        assert!(rows.iter().all(|r| r.rect.bottom() < layout.word_details.rect.bottom()));
    }

    #[test]
    fn test_layout_is_idempotent() {
        let analysis = watashi_wa();
        assert_eq!(layout(&analysis, &cfg()), layout(&analysis, &cfg()));
    }

    #[test]
    fn test_empty_analysis_has_min_panel() {
        let mut analysis = watashi_wa();
        analysis.words.clear();
        let layout = layout(&analysis, &cfg());
        assert!(layout.topic_band.is_none());
        assert!(layout.connectors.is_empty());
        assert_eq!(layout.main_panel.height, cfg().min_container_height);
    }

    #[test]
    fn test_main_box_in_document() {
        let layout = layout(&watashi_wa(), &cfg());
        let doc = layout.main_box_in_document("w2").unwrap();
        assert_eq!(doc.x, layout.main_panel.x + layout.main_boxes[0].rect.x);
        assert!(layout.main_box_in_document("w1").is_none());
    }
}
